//! GitOps Scheduler - hierarchical scheduler configuration compiler
//!
//! Resolves sparse scheduler fragments attached at team, repository-group and
//! repository scope into one effective fragment per repository, compiles the
//! result into the job and plugin documents a pipeline scheduler service
//! reads, and reconstructs fragments from existing documents.

pub mod compile;
pub mod config;
pub mod decompile;
pub mod loader;
pub mod merge;
pub mod pipeline;
pub mod report;
pub mod resolve;

pub use compile::{compile, CompileError};
pub use decompile::{decompile, Decompiled, DecompileError, DEFAULT_SCHEDULER};
pub use merge::{build, build_peers, Merge, MergeError};
pub use resolve::{generate, generate_with, Bootstrap, Leaf, ResolveError};
pub use scheduler_schema as schema;
