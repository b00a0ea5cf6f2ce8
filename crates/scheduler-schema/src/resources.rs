//! Custom resources that carry or reference fragments.
//!
//! These are read-only inputs to resolution. Each is a Kubernetes-style
//! envelope (`apiVersion`, `kind`, `metadata`, `spec`).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::fragment::Fragment;
use crate::API_VERSION;

pub const KIND_SCHEDULER: &str = "Scheduler";
pub const KIND_SOURCE_REPOSITORY: &str = "SourceRepository";
pub const KIND_SOURCE_REPOSITORY_GROUP: &str = "SourceRepositoryGroup";
pub const KIND_ENVIRONMENT: &str = "Environment";

/// Name of the environment that carries team settings.
pub const DEV_ENVIRONMENT: &str = "dev";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObjectMeta {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
}

/// Kubernetes-style resource envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resource<T> {
    pub api_version: String,
    pub kind: String,
    pub metadata: ObjectMeta,
    pub spec: T,
}

impl<T> Resource<T> {
    pub fn new(kind: &str, name: impl Into<String>, spec: T) -> Self {
        Self {
            api_version: API_VERSION.to_string(),
            kind: kind.to_string(),
            metadata: ObjectMeta {
                name: name.into(),
                ..Default::default()
            },
            spec,
        }
    }

    pub fn name(&self) -> &str {
        &self.metadata.name
    }
}

/// Reference to another resource by name
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceReference {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    pub name: String,
}

impl ResourceReference {
    pub fn scheduler(name: impl Into<String>) -> Self {
        Self {
            kind: Some(KIND_SCHEDULER.to_string()),
            name: name.into(),
        }
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self {
            kind: None,
            name: name.into(),
        }
    }
}

/// A named, persisted fragment
pub type Scheduler = Resource<Fragment>;

impl Scheduler {
    pub fn scheduler(name: impl Into<String>, fragment: Fragment) -> Self {
        Self::new(KIND_SCHEDULER, name, fragment)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceRepositorySpec {
    pub org: String,
    pub repo: String,

    /// Git hosting provider URL (e.g. `https://github.com`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduler: Option<ResourceReference>,
}

pub type SourceRepository = Resource<SourceRepositorySpec>;

impl SourceRepository {
    pub fn repository(
        name: impl Into<String>,
        org: impl Into<String>,
        repo: impl Into<String>,
        scheduler: Option<&str>,
    ) -> Self {
        Self::new(
            KIND_SOURCE_REPOSITORY,
            name,
            SourceRepositorySpec {
                org: org.into(),
                repo: repo.into(),
                provider: None,
                scheduler: scheduler.map(ResourceReference::scheduler),
            },
        )
    }

    pub fn key(&self) -> String {
        crate::repo_key(&self.spec.org, &self.spec.repo)
    }

    pub fn scheduler_name(&self) -> Option<&str> {
        non_blank(self.spec.scheduler.as_ref())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceRepositoryGroupSpec {
    /// Member `SourceRepository` resources, by name
    #[serde(default)]
    pub repositories: Vec<ResourceReference>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduler: Option<ResourceReference>,
}

pub type SourceRepositoryGroup = Resource<SourceRepositoryGroupSpec>;

impl SourceRepositoryGroup {
    pub fn group(name: impl Into<String>, members: &[&str], scheduler: Option<&str>) -> Self {
        Self::new(
            KIND_SOURCE_REPOSITORY_GROUP,
            name,
            SourceRepositoryGroupSpec {
                repositories: members.iter().map(|m| ResourceReference::named(*m)).collect(),
                scheduler: scheduler.map(ResourceReference::scheduler),
            },
        )
    }

    pub fn contains(&self, repository: &str) -> bool {
        self.spec.repositories.iter().any(|r| r.name == repository)
    }

    pub fn scheduler_name(&self) -> Option<&str> {
        non_blank(self.spec.scheduler.as_ref())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentSpec {
    #[serde(default)]
    pub source: EnvironmentSource,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_settings: Option<TeamSettings>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentSource {
    /// Git URL of the repository holding the GitOps configuration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_scheduler: Option<ResourceReference>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

pub type Environment = Resource<EnvironmentSpec>;

impl Environment {
    pub fn dev(source_url: Option<&str>, default_scheduler: Option<&str>) -> Self {
        Self::new(
            KIND_ENVIRONMENT,
            DEV_ENVIRONMENT,
            EnvironmentSpec {
                source: EnvironmentSource {
                    url: source_url.map(str::to_string),
                },
                team_settings: default_scheduler.map(|name| TeamSettings {
                    default_scheduler: Some(ResourceReference::scheduler(name)),
                    extra: BTreeMap::new(),
                }),
            },
        )
    }

    pub fn source_url(&self) -> Option<&str> {
        self.spec.source.url.as_deref().filter(|u| !u.trim().is_empty())
    }

    pub fn default_scheduler_name(&self) -> Option<&str> {
        non_blank(self.spec.team_settings.as_ref()?.default_scheduler.as_ref())
    }

    /// Point the team settings at a default scheduler.
    pub fn set_default_scheduler(&mut self, name: &str) {
        self.spec
            .team_settings
            .get_or_insert_with(TeamSettings::default)
            .default_scheduler = Some(ResourceReference::scheduler(name));
    }
}

fn non_blank(reference: Option<&ResourceReference>) -> Option<&str> {
    reference.map(|r| r.name.as_str()).filter(|n| !n.trim().is_empty())
}
