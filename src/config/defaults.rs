//! Built-in settings (layer 1)

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::resolve::Bootstrap;

/// Host config location, relative to `$HOME`
pub const HOST_CONFIG_PATH: &str = ".config/gitops-scheduler/config.toml";

/// Repo config location, relative to the working directory
pub const REPO_CONFIG_PATH: &str = ".gitops/scheduler.toml";

/// Typed view of the merged configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Directory scanned for resource YAML
    pub resources_dir: PathBuf,

    /// Directory receiving `config.yaml`, `plugins.yaml` and the report
    pub output_dir: PathBuf,

    /// Default log filter when `RUST_LOG` is unset
    pub log_level: String,

    pub bootstrap: Bootstrap,

    /// Team default scheduler used when the environment names none
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_scheduler: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            resources_dir: PathBuf::from("."),
            output_dir: PathBuf::from("config"),
            log_level: "info".to_string(),
            bootstrap: Bootstrap::default(),
            default_scheduler: None,
        }
    }
}

impl Settings {
    /// The defaults as a merge layer.
    pub fn to_value(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}
