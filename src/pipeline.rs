//! Command pipelines
//!
//! Each CLI command is one function here: load settings and inputs, run the
//! core transformation, write the outputs. The binary only parses flags and
//! maps errors to exit codes.

use std::path::{Path, PathBuf};

use scheduler_schema::{Environment, Fragment, JobDoc, PluginDoc};
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::compile::{compile, CompileError};
use crate::config::{ConfigError, EffectiveConfig, Settings, REPO_CONFIG_PATH};
use crate::decompile::{decompile, Decompiled, DecompileError};
use crate::loader::{read_yaml, set_environment_default, write_resources, write_text, LoadError, ResourceSet};
use crate::report::{CompileReport, REPORT_FILE};
use crate::resolve::{generate_with, ChainLink, ResolveError, Resolver};

/// Job document file name
pub const CONFIG_FILE: &str = "config.yaml";

/// Plugin document file name
pub const PLUGINS_FILE: &str = "plugins.yaml";

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Compile(#[from] CompileError),

    #[error("malformed document: {0}")]
    Decompile(#[from] DecompileError),

    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("no SourceRepository for '{0}'")]
    UnknownRepository(String),
}

impl PipelineError {
    /// Process exit code: 1 configuration or IO, 2 merge collision, 3 malformed document.
    pub fn exit_code(&self) -> i32 {
        match self {
            PipelineError::Resolve(ResolveError::Merge { .. }) => 2,
            PipelineError::Resolve(ResolveError::NoRepositories) => 1,
            PipelineError::Compile(CompileError::Protection { .. }) => 2,
            PipelineError::Compile(CompileError::InvalidRepository { .. }) => 3,
            PipelineError::Decompile(_) => 3,
            PipelineError::Config(_)
            | PipelineError::Load(_)
            | PipelineError::Yaml(_)
            | PipelineError::Serialization(_)
            | PipelineError::UnknownRepository(_) => 1,
        }
    }
}

pub type PipelineResult<T> = Result<T, PipelineError>;

/// Merge the tool's settings from the standard locations.
///
/// `repo_config` overrides the repo config path; `cli` holds flag overrides
/// in config-key form.
pub fn load_settings(
    repo_config: Option<&Path>,
    cli: serde_json::Value,
) -> PipelineResult<EffectiveConfig> {
    let host = EffectiveConfig::host_config_path();
    let repo = repo_config.map_or_else(|| PathBuf::from(REPO_CONFIG_PATH), Path::to_path_buf);
    Ok(EffectiveConfig::build(host.as_deref(), Some(&repo), Some(cli))?)
}

/// The team environment, falling back to the configured default scheduler.
fn team_environment(resources: &ResourceSet, settings: &Settings) -> Option<Environment> {
    let mut environment = resources.dev_environment().cloned();
    if let Some(name) = &settings.default_scheduler {
        let environment = environment.get_or_insert_with(|| Environment::dev(None, None));
        if environment.default_scheduler_name().is_none() {
            environment.set_default_scheduler(name);
        }
    }
    environment
}

/// Resolve, compile and write `config.yaml`, `plugins.yaml` and the report.
pub fn run_generate(config: &EffectiveConfig) -> PipelineResult<CompileReport> {
    let settings = &config.settings;
    let resources = ResourceSet::load_dir(&settings.resources_dir)?;
    let environment = team_environment(&resources, settings);
    if environment.is_none() {
        warn!("no dev Environment found, repositories get no team default or bootstrap");
    }

    let leaves = generate_with(
        &resources.repositories,
        &resources.groups,
        &resources.schedulers,
        environment.as_ref(),
        &settings.bootstrap,
    )?;
    let skipped: Vec<String> = resources
        .repositories
        .iter()
        .map(|r| r.key())
        .filter(|key| !leaves.iter().any(|leaf| leaf.key() == *key))
        .collect();

    let (jobs, plugins) = compile(&leaves)?;
    let mut report = CompileReport::new(resources.repositories.len(), leaves.len())
        .with_skipped(skipped)
        .with_sources(config.sources.clone());

    write_documents(&settings.output_dir, &jobs, &plugins, &mut report)?;

    let report_path = settings.output_dir.join(REPORT_FILE);
    write_text(&report_path, &report.to_json()?)?;
    info!(output = %settings.output_dir.display(), leaves = report.leaves, "generated scheduler configuration");
    Ok(report)
}

fn write_documents(
    dir: &Path,
    jobs: &JobDoc,
    plugins: &PluginDoc,
    report: &mut CompileReport,
) -> PipelineResult<()> {
    for (name, text) in [(CONFIG_FILE, jobs.to_yaml()?), (PLUGINS_FILE, plugins.to_yaml()?)] {
        write_text(&dir.join(name), &text)?;
        report.record_output(name, &text);
    }
    Ok(())
}

/// How one repository's effective fragment comes about
#[derive(Debug, Clone, Serialize)]
pub struct Explanation {
    pub repository: String,
    pub boot_repository: bool,
    pub chain: Vec<ChainLink>,
    pub effective: Fragment,
}

/// Resolve one repository, keeping the chain for display.
pub fn explain_repository(settings: &Settings, key: &str) -> PipelineResult<Explanation> {
    let resources = ResourceSet::load_dir(&settings.resources_dir)?;
    let repository = resources
        .repositories
        .iter()
        .find(|r| r.key().eq_ignore_ascii_case(key))
        .ok_or_else(|| PipelineError::UnknownRepository(key.to_string()))?;

    let environment = team_environment(&resources, settings);
    let resolver = Resolver::new(
        &resources.groups,
        &resources.schedulers,
        environment.as_ref(),
        &settings.bootstrap,
    );

    let effective = resolver
        .resolve(repository)?
        .map(|leaf| leaf.fragment)
        .unwrap_or_default();
    Ok(Explanation {
        repository: repository.key(),
        boot_repository: resolver.is_boot_repository(repository),
        chain: resolver.chain(repository),
        effective,
    })
}

/// Decompile existing documents into resources under `output`.
///
/// With `environment`, the Environment file at that path is updated to use
/// the reconstructed team default scheduler.
pub fn run_import(
    config_yaml: &Path,
    plugins_yaml: &Path,
    output: &Path,
    environment: Option<&Path>,
) -> PipelineResult<Decompiled> {
    let jobs: JobDoc = read_yaml(config_yaml)?;
    let plugins: PluginDoc = read_yaml(plugins_yaml)?;
    let decompiled = decompile(&jobs, &plugins)?;

    let written = write_resources(output, &decompiled)?;
    if let Some(path) = environment {
        set_environment_default(path, &decompiled.default_scheduler)?;
    }

    info!(
        output = %output.display(),
        files = written.len(),
        repositories = decompiled.repositories.len(),
        "imported scheduler configuration"
    );
    Ok(decompiled)
}
