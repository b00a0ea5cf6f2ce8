//! Effective configuration with provenance
//!
//! Records the merged settings together with every file that contributed to
//! them, so a compile report can say exactly which configuration produced it.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use tracing::debug;

use super::defaults::{Settings, HOST_CONFIG_PATH};
use super::merge::overlay_all;

pub const SCHEMA_VERSION: u32 = 1;

pub const SCHEMA_ID: &str = "gitops-scheduler/effective_config@1";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ConfigOrigin {
    Builtin,
    Host,
    Repo,
    Cli,
}

/// A contributing config layer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConfigSource {
    pub origin: ConfigOrigin,

    /// File path (None for builtin/cli)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// SHA-256 of the raw file bytes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
}

impl ConfigSource {
    fn inline(origin: ConfigOrigin) -> Self {
        Self {
            origin,
            path: None,
            digest: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EffectiveConfig {
    pub schema_version: u32,
    pub schema_id: String,
    pub created_at: DateTime<Utc>,

    pub settings: Settings,

    /// Contributing layers, lowest precedence first
    pub sources: Vec<ConfigSource>,
}

impl EffectiveConfig {
    /// Default host config path, if `$HOME` is set.
    pub fn host_config_path() -> Option<PathBuf> {
        std::env::var_os("HOME").map(|home| PathBuf::from(home).join(HOST_CONFIG_PATH))
    }

    /// Merge the layers. Missing host or repo files are skipped.
    pub fn build(
        host_config_path: Option<&Path>,
        repo_config_path: Option<&Path>,
        cli_overrides: Option<Value>,
    ) -> Result<Self, ConfigError> {
        let mut layers = vec![Settings::default()
            .to_value()
            .map_err(|e| ConfigError::Parse(format!("built-in defaults: {}", e)))?];
        let mut sources = vec![ConfigSource::inline(ConfigOrigin::Builtin)];

        for (origin, path) in [
            (ConfigOrigin::Host, host_config_path),
            (ConfigOrigin::Repo, repo_config_path),
        ] {
            let Some(path) = path.filter(|p| p.exists()) else {
                continue;
            };
            let (value, digest) = load_toml(path)?;
            debug!(path = %path.display(), ?origin, "loaded config layer");
            layers.push(value);
            sources.push(ConfigSource {
                origin,
                path: Some(path.display().to_string()),
                digest: Some(digest),
            });
        }

        if let Some(cli) = cli_overrides.filter(|v| v.as_object().is_some_and(|m| !m.is_empty())) {
            layers.push(cli);
            sources.push(ConfigSource::inline(ConfigOrigin::Cli));
        }

        let settings: Settings = serde_json::from_value(overlay_all(layers))
            .map_err(|e| ConfigError::Parse(e.to_string()))?;
        validate(&settings)?;

        Ok(Self {
            schema_version: SCHEMA_VERSION,
            schema_id: SCHEMA_ID.to_string(),
            created_at: Utc::now(),
            settings,
            sources,
        })
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Read a TOML file, returning its JSON form and the digest of its bytes.
fn load_toml(path: &Path) -> Result<(Value, String), ConfigError> {
    let bytes = fs::read(path).map_err(|e| ConfigError::Io {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    let digest = hex::encode(Sha256::digest(&bytes));

    let text = std::str::from_utf8(&bytes)
        .map_err(|e| ConfigError::Parse(format!("{}: invalid UTF-8: {}", path.display(), e)))?;
    let value: Value = toml::from_str(text)
        .map_err(|e| ConfigError::Parse(format!("{}: {}", path.display(), e)))?;
    Ok((value, digest))
}

fn validate(settings: &Settings) -> Result<(), ConfigError> {
    let required = [
        ("resources_dir", settings.resources_dir.as_os_str().is_empty()),
        ("output_dir", settings.output_dir.as_os_str().is_empty()),
        ("log_level", settings.log_level.trim().is_empty()),
        ("bootstrap.config_path", settings.bootstrap.config_path.trim().is_empty()),
        ("bootstrap.plugins_path", settings.bootstrap.plugins_path.trim().is_empty()),
        ("bootstrap.config_map", settings.bootstrap.config_map.trim().is_empty()),
        ("bootstrap.plugins_map", settings.bootstrap.plugins_map.trim().is_empty()),
    ];
    if let Some((key, _)) = required.iter().find(|(_, empty)| *empty) {
        return Err(ConfigError::Validation(format!("{} must not be empty", key)));
    }

    if settings.bootstrap.config_path == settings.bootstrap.plugins_path {
        return Err(ConfigError::Validation(
            "bootstrap.config_path and bootstrap.plugins_path must differ".to_string(),
        ));
    }

    if settings
        .default_scheduler
        .as_deref()
        .is_some_and(|s| s.trim().is_empty())
    {
        return Err(ConfigError::Validation(
            "default_scheduler must not be blank".to_string(),
        ));
    }
    Ok(())
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read {}: {message}", path.display())]
    Io { path: PathBuf, message: String },

    #[error("parse error: {0}")]
    Parse(String),

    #[error("invalid configuration: {0}")]
    Validation(String),
}
