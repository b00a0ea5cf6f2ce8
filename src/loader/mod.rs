//! Resource loading and document output
//!
//! Reads the custom resources from a directory tree of YAML files and writes
//! compiled documents and imported resources back out.

use std::fs;
use std::path::{Path, PathBuf};

use scheduler_schema::resources::{
    KIND_ENVIRONMENT, KIND_SCHEDULER, KIND_SOURCE_REPOSITORY, KIND_SOURCE_REPOSITORY_GROUP,
    DEV_ENVIRONMENT,
};
use scheduler_schema::{Environment, Scheduler, SourceRepository, SourceRepositoryGroup};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::decompile::Decompiled;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("IO error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot walk {}: {source}", root.display())]
    Walk {
        root: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("invalid YAML in {}: {source}", path.display())]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

impl LoadError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    fn yaml(path: &Path, source: serde_yaml::Error) -> Self {
        Self::Yaml {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// All resources found under a directory, each list sorted by name
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResourceSet {
    pub schedulers: Vec<Scheduler>,
    pub repositories: Vec<SourceRepository>,
    pub groups: Vec<SourceRepositoryGroup>,
    pub environments: Vec<Environment>,
}

impl ResourceSet {
    /// Load every `.yaml`/`.yml` file under `root`.
    ///
    /// Files may hold several documents. Documents of other kinds, or without
    /// a kind, are ignored.
    pub fn load_dir(root: &Path) -> Result<Self, LoadError> {
        let mut set = Self::default();

        for entry in WalkDir::new(root)
            .follow_links(false)
            .sort_by(|a, b| a.file_name().cmp(b.file_name()))
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !is_hidden(e.file_name()))
        {
            let entry = entry.map_err(|source| LoadError::Walk {
                root: root.to_path_buf(),
                source,
            })?;
            if entry.file_type().is_file() && is_yaml(entry.path()) {
                set.load_file(entry.path())?;
            }
        }

        set.schedulers.sort_by(|a, b| a.name().cmp(b.name()));
        set.repositories.sort_by(|a, b| a.name().cmp(b.name()));
        set.groups.sort_by(|a, b| a.name().cmp(b.name()));
        set.environments.sort_by(|a, b| a.name().cmp(b.name()));

        info!(
            root = %root.display(),
            schedulers = set.schedulers.len(),
            repositories = set.repositories.len(),
            groups = set.groups.len(),
            environments = set.environments.len(),
            "loaded resources"
        );
        Ok(set)
    }

    fn load_file(&mut self, path: &Path) -> Result<(), LoadError> {
        let text = fs::read_to_string(path).map_err(|e| LoadError::io(path, e))?;

        for document in serde_yaml::Deserializer::from_str(&text) {
            let value = serde_yaml::Value::deserialize(document)
                .map_err(|e| LoadError::yaml(path, e))?;
            let Some(kind) = value.get("kind").and_then(serde_yaml::Value::as_str) else {
                continue;
            };

            match kind {
                KIND_SCHEDULER => self.schedulers.push(from_value(path, value)?),
                KIND_SOURCE_REPOSITORY => self.repositories.push(from_value(path, value)?),
                KIND_SOURCE_REPOSITORY_GROUP => self.groups.push(from_value(path, value)?),
                KIND_ENVIRONMENT => self.environments.push(from_value(path, value)?),
                other => debug!(path = %path.display(), kind = other, "ignoring resource"),
            }
        }
        Ok(())
    }

    /// The `dev` environment, which carries the team settings.
    pub fn dev_environment(&self) -> Option<&Environment> {
        self.environments.iter().find(|e| e.name() == DEV_ENVIRONMENT)
    }
}

fn from_value<T: DeserializeOwned>(path: &Path, value: serde_yaml::Value) -> Result<T, LoadError> {
    serde_yaml::from_value(value).map_err(|e| LoadError::yaml(path, e))
}

fn is_yaml(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    )
}

fn is_hidden(name: &std::ffi::OsStr) -> bool {
    name.to_str().is_some_and(|n| n.starts_with('.'))
}

/// Read one YAML document.
pub fn read_yaml<T: DeserializeOwned>(path: &Path) -> Result<T, LoadError> {
    let text = fs::read_to_string(path).map_err(|e| LoadError::io(path, e))?;
    serde_yaml::from_str(&text).map_err(|e| LoadError::yaml(path, e))
}

/// Write one YAML document, creating parent directories.
pub fn write_yaml<T: Serialize>(path: &Path, value: &T) -> Result<(), LoadError> {
    let text = serde_yaml::to_string(value).map_err(|e| LoadError::yaml(path, e))?;
    write_text(path, &text)
}

/// Write a text file, creating parent directories.
pub fn write_text(path: &Path, text: &str) -> Result<(), LoadError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| LoadError::io(parent, e))?;
    }
    fs::write(path, text).map_err(|e| LoadError::io(path, e))
}

/// Write imported resources as `schedulers/<name>.yaml` and
/// `repositories/<name>.yaml` under `dir`. Returns the written paths.
pub fn write_resources(dir: &Path, decompiled: &Decompiled) -> Result<Vec<PathBuf>, LoadError> {
    let mut written = Vec::new();

    for scheduler in decompiled.scheduler_resources() {
        let path = dir.join("schedulers").join(format!("{}.yaml", scheduler.name()));
        write_yaml(&path, &scheduler)?;
        written.push(path);
    }
    for repository in &decompiled.repositories {
        let path = dir
            .join("repositories")
            .join(format!("{}.yaml", repository.name()));
        write_yaml(&path, repository)?;
        written.push(path);
    }

    debug!(dir = %dir.display(), files = written.len(), "wrote imported resources");
    Ok(written)
}

/// Point an Environment file's team settings at `scheduler`.
pub fn set_environment_default(path: &Path, scheduler: &str) -> Result<(), LoadError> {
    let mut environment: Environment = read_yaml(path)?;
    environment.set_default_scheduler(scheduler);
    write_yaml(path, &environment)
}
