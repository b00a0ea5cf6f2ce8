//! Job descriptors shared by fragments and the compiled job document.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A presubmit, postsubmit or periodic job.
///
/// Jobs keep the scheduler service's own field names so they can be copied
/// into `config.yaml` verbatim. Keys this type does not model are preserved
/// in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub name: String,

    /// Status context reported on the pull request
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,

    /// Execution agent (e.g. `tekton-pipeline`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub always_run: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub optional: Option<bool>,

    /// Regex matched against comments to trigger the job
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rerun_command: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip_report: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_if_changed: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub branches: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skip_branches: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_concurrency: Option<u32>,

    /// Cron schedule (periodics, or jobs that are also run on a timer)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cron: Option<String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

impl Job {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_cron(mut self, cron: impl Into<String>) -> Self {
        self.cron = Some(cron.into());
        self
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }
}
