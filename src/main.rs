//! GitOps Scheduler CLI
//!
//! Entry point for the `gitops-scheduler` command-line tool.

use clap::{Parser, Subcommand};
use gitops_scheduler::config::EffectiveConfig;
use gitops_scheduler::pipeline::{self, PipelineError};
use std::path::PathBuf;
use std::process;
use tracing::error;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "gitops-scheduler")]
#[command(about = "Compile scheduler fragments into pipeline scheduler configuration", version)]
struct Cli {
    /// Enable debug logging
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    /// Path to repo config file (default: .gitops/scheduler.toml)
    #[arg(long, short = 'c', global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve every repository and write config.yaml and plugins.yaml
    Generate {
        /// Directory holding the resource YAML
        #[arg(long, short = 'd')]
        dir: Option<PathBuf>,

        /// Directory receiving the compiled documents
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },

    /// Show a repository's precedence chain and effective fragment
    Explain {
        /// Repository as org/repo
        #[arg(long, short = 'r')]
        repo: String,

        /// Directory holding the resource YAML
        #[arg(long, short = 'd')]
        dir: Option<PathBuf>,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Reconstruct schedulers and repositories from existing documents
    Import {
        /// Existing job document
        #[arg(long)]
        config_yaml: PathBuf,

        /// Existing plugin document
        #[arg(long)]
        plugins_yaml: PathBuf,

        /// Directory receiving the resources
        #[arg(long, short = 'o', default_value = ".")]
        output: PathBuf,

        /// Environment file to point at the reconstructed default scheduler
        #[arg(long)]
        environment: Option<PathBuf>,
    },
}

fn main() {
    let cli = Cli::parse();

    let overrides = cli_overrides(&cli.command);
    let config = match pipeline::load_settings(cli.config.as_deref(), overrides) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading configuration: {}", e);
            process::exit(e.exit_code());
        }
    };
    init_logging(cli.verbose, &config.settings.log_level);

    let result = match cli.command {
        Commands::Generate { .. } => run_generate(&config),
        Commands::Explain { repo, json, .. } => run_explain(&config, &repo, json),
        Commands::Import {
            config_yaml,
            plugins_yaml,
            output,
            environment,
        } => run_import(config_yaml, plugins_yaml, output, environment),
    };

    if let Err(e) = result {
        error!("{}", e);
        eprintln!("Error: {}", e);
        process::exit(e.exit_code());
    }
}

fn init_logging(verbose: bool, level: &str) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

/// Flags that override config keys, as a config layer.
fn cli_overrides(command: &Commands) -> serde_json::Value {
    let mut overrides = serde_json::Map::new();
    let (dir, output) = match command {
        Commands::Generate { dir, output } => (dir, output),
        Commands::Explain { dir, .. } => (dir, &None),
        Commands::Import { .. } => (&None, &None),
    };
    if let Some(dir) = dir {
        overrides.insert("resources_dir".into(), dir.display().to_string().into());
    }
    if let Some(output) = output {
        overrides.insert("output_dir".into(), output.display().to_string().into());
    }
    serde_json::Value::Object(overrides)
}

fn run_generate(config: &EffectiveConfig) -> Result<(), PipelineError> {
    let report = pipeline::run_generate(config)?;

    println!(
        "Compiled {} of {} repositories into {}",
        report.leaves,
        report.repositories,
        config.settings.output_dir.display()
    );
    for skipped in &report.skipped {
        println!("  skipped {} (no scheduler applies)", skipped);
    }
    for output in &report.outputs {
        println!("  {}  {}", &output.sha256[..12], output.path);
    }
    Ok(())
}

fn run_explain(config: &EffectiveConfig, repo: &str, json: bool) -> Result<(), PipelineError> {
    let explanation = pipeline::explain_repository(&config.settings, repo)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&explanation)?);
        return Ok(());
    }

    println!("Repository: {}", explanation.repository);
    if explanation.boot_repository {
        println!("Boot repository: yes");
    }
    if explanation.chain.is_empty() {
        println!("No schedulers apply.");
        return Ok(());
    }

    println!("Precedence chain (lowest first):");
    for (i, link) in explanation.chain.iter().enumerate() {
        match &link.group {
            Some(group) => println!("  {}. {:?}: {} (group {})", i + 1, link.level, link.source, group),
            None => println!("  {}. {:?}: {}", i + 1, link.level, link.source),
        }
    }
    println!();
    println!("Effective fragment:");
    print!("{}", serde_yaml::to_string(&explanation.effective)?);
    Ok(())
}

fn run_import(
    config_yaml: PathBuf,
    plugins_yaml: PathBuf,
    output: PathBuf,
    environment: Option<PathBuf>,
) -> Result<(), PipelineError> {
    let decompiled =
        pipeline::run_import(&config_yaml, &plugins_yaml, &output, environment.as_deref())?;

    println!(
        "Imported {} repositories and {} schedulers into {}",
        decompiled.repositories.len(),
        decompiled.schedulers.len(),
        output.display()
    );
    if environment.is_some() {
        println!("Default scheduler: {}", decompiled.default_scheduler);
    }
    Ok(())
}
