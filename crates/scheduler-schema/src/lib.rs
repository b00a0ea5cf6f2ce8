//! Scheduler Schema Types
//!
//! Defines the sparse scheduling-policy fragment, the custom resources that
//! reference fragments, and the two flat documents consumed by the scheduler
//! service (`config.yaml` and `plugins.yaml`).

pub mod fragment;
pub mod job;
pub mod jobdoc;
pub mod list;
pub mod plugindoc;
pub mod resources;

pub use fragment::{
    AgentChoice, ApprovePolicy, Attachment, ConfigMapSpec, ConfigUpdaterPolicy, ContextPolicy,
    ExternalPlugin, Fragment, GlobalProtectionPolicy, KeeperQuery, LgtmPolicy, MergePolicy,
    ProtectionPolicy, QueryList, Restrictions, ReviewPolicy, StatusChecks, TriggerPolicy,
    WelcomeMessage,
};
pub use job::Job;
pub use jobdoc::{
    BranchProtection, BranchProtectionPolicy, ContextOptions, JobDoc, Keeper, OrgBranchProtection,
    OrgContextOptions, Plank, RepoBranchProtection, RepoContextPolicy,
};
pub use list::{JobSet, ReplaceableList};
pub use plugindoc::{Approve, ConfigUpdater, Lgtm, PluginDoc, Trigger, Welcome};
pub use resources::{
    Environment, EnvironmentSpec, ObjectMeta, Resource, ResourceReference, Scheduler,
    SourceRepository, SourceRepositoryGroup, SourceRepositoryGroupSpec, SourceRepositorySpec,
};

/// API version stamped on every resource this crate produces.
pub const API_VERSION: &str = "jenkins.io/v1";

/// Name of the bot plugin that syncs the scheduler service's own configuration.
pub const CONFIG_UPDATER_PLUGIN: &str = "config-updater";

/// Attachment name carrying the job report template URL.
pub const REPORT_TEMPLATE_ATTACHMENT: &str = "reportTemplate";

/// Join an org and repository name into the canonical `org/repo` key.
pub fn repo_key(org: &str, repo: &str) -> String {
    format!("{}/{}", org, repo)
}

/// Split a canonical `org/repo` key.
///
/// The org part may itself contain `/` (nested groups); the repository is
/// always the last path segment. Returns `None` when either side is empty.
pub fn split_repo_key(key: &str) -> Option<(&str, &str)> {
    let (org, repo) = key.rsplit_once('/')?;
    if org.is_empty() || repo.is_empty() {
        return None;
    }
    Some((org, repo))
}
