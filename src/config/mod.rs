//! Tool configuration
//!
//! Settings are merged from four layers, later layers winning:
//! 1. Built-in defaults
//! 2. Host config (~/.config/gitops-scheduler/config.toml)
//! 3. Repo config (.gitops/scheduler.toml)
//! 4. CLI flags

mod defaults;
mod effective;
mod merge;

pub use defaults::{Settings, HOST_CONFIG_PATH, REPO_CONFIG_PATH};
pub use effective::{ConfigError, ConfigOrigin, ConfigSource, EffectiveConfig};
pub use merge::{overlay, overlay_all};
