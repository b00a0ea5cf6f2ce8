//! Compile report
//!
//! Written next to the compiled documents so a later reader can tell which
//! inputs and settings produced them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::config::ConfigSource;

pub const SCHEMA_VERSION: u32 = 1;

pub const SCHEMA_ID: &str = "gitops-scheduler/compile_report@1";

/// File name of the report inside the output directory
pub const REPORT_FILE: &str = "compile_report.json";

/// A written document and its digest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputDigest {
    pub path: String,
    pub sha256: String,
    pub bytes: usize,
}

impl OutputDigest {
    pub fn of(path: impl Into<String>, contents: &str) -> Self {
        Self {
            path: path.into(),
            sha256: hex::encode(Sha256::digest(contents.as_bytes())),
            bytes: contents.len(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompileReport {
    pub schema_version: u32,
    pub schema_id: String,
    pub created_at: DateTime<Utc>,

    /// Repositories considered
    pub repositories: usize,

    /// Repositories that produced a leaf
    pub leaves: usize,

    /// Repositories with no applicable scheduler, as `org/repo`
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skipped: Vec<String>,

    /// Configuration layers in effect
    pub config_sources: Vec<ConfigSource>,

    pub outputs: Vec<OutputDigest>,
}

impl CompileReport {
    pub fn new(repositories: usize, leaves: usize) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            schema_id: SCHEMA_ID.to_string(),
            created_at: Utc::now(),
            repositories,
            leaves,
            skipped: Vec::new(),
            config_sources: Vec::new(),
            outputs: Vec::new(),
        }
    }

    pub fn with_skipped(mut self, skipped: Vec<String>) -> Self {
        self.skipped = skipped;
        self
    }

    pub fn with_sources(mut self, sources: Vec<ConfigSource>) -> Self {
        self.config_sources = sources;
        self
    }

    pub fn record_output(&mut self, path: impl Into<String>, contents: &str) {
        self.outputs.push(OutputDigest::of(path, contents));
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
