//! Sparse scheduling-policy fragments.
//!
//! Every field of a [`Fragment`] is optional: an absent field means the
//! scope that owns the fragment has no opinion, and a lower-precedence scope
//! may fill it in.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::list::{JobSet, ReplaceableList};

/// Scheduling policy for one scope (team, repository group, repository or
/// bootstrap injection).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fragment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduler_agent: Option<AgentChoice>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy: Option<GlobalProtectionPolicy>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub presubmits: Option<JobSet>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub postsubmits: Option<JobSet>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub periodics: Option<JobSet>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger: Option<TriggerPolicy>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approve: Option<ApprovePolicy>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lgtm: Option<LgtmPolicy>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_plugins: Option<ReplaceableList<ExternalPlugin>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plugins: Option<ReplaceableList<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merger: Option<MergePolicy>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_updater: Option<ConfigUpdaterPolicy>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub welcome: Option<ReplaceableList<WelcomeMessage>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachments: Option<ReplaceableList<Attachment>>,
}

impl Fragment {
    /// Plugin names in order, or an empty slice when the field is absent.
    pub fn plugin_names(&self) -> &[String] {
        self.plugins.as_ref().map(|p| p.items.as_slice()).unwrap_or_default()
    }

    /// True when no field is set.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Execution agent choice
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentChoice {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent: Option<String>,
}

/// Branch protection for a repository plus per-branch overrides
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalProtectionPolicy {
    /// Protect every repository with a presubmit job
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protect_tested: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy: Option<ProtectionPolicy>,

    /// Per-branch overrides keyed by branch name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branches: Option<BTreeMap<String, ProtectionPolicy>>,
}

/// Branch protection rules
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProtectionPolicy {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protect: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_status_checks: Option<StatusChecks>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admins: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restrictions: Option<Restrictions>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_pull_request_reviews: Option<ReviewPolicy>,

    /// Branch name regexes the policy applies to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include: Option<ReplaceableList<String>>,

    /// Branch name regexes the policy skips
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclude: Option<ReplaceableList<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatusChecks {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contexts: Option<ReplaceableList<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strict: Option<bool>,
}

/// Users and teams allowed to push
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Restrictions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub users: Option<ReplaceableList<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub teams: Option<ReplaceableList<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewPolicy {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dismiss_stale_reviews: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub require_code_owner_reviews: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_approving_review_count: Option<u32>,
}

/// `trigger` plugin behaviour
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerPolicy {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trusted_org: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub join_org_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub only_org_members: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ignore_ok_to_test: Option<bool>,
}

/// `approve` plugin behaviour
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovePolicy {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issue_required: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub require_self_approval: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lgtm_acts_as_approve: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ignore_review_state: Option<bool>,
}

/// `lgtm` plugin behaviour
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LgtmPolicy {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub review_acts_as_lgtm: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub store_tree_hash: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trusted_team_for_sticky_lgtm: Option<String>,
}

/// A webhook endpoint that receives forwarded events
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExternalPlugin {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub events: Vec<String>,
}

/// Merge-queue ("keeper") behaviour
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergePolicy {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sync_period: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_update_period: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pr_status_base_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blocker_label: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub squash_label: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_goroutines: Option<u32>,

    /// `merge`, `squash` or `rebase`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merge_method: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub queries: Option<QueryList>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_policy: Option<ContextPolicy>,
}

/// Which status checks gate a merge
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextPolicy {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_contexts: Option<ReplaceableList<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub optional_contexts: Option<ReplaceableList<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_if_present_contexts: Option<ReplaceableList<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip_unknown_contexts: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_branch_protection: Option<bool>,
}

/// Merge-queue search queries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QueryList(pub Vec<KeeperQuery>);

/// A pull-request search the merge queue polls.
///
/// Serialized with the scheduler service's field names so the same value can
/// live in a fragment and in `config.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KeeperQuery {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub repos: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub orgs: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<String>,

    #[serde(default, rename = "missingLabels", skip_serializing_if = "Vec::is_empty")]
    pub missing_labels: Vec<String>,

    #[serde(default, rename = "excludedBranches", skip_serializing_if = "Vec::is_empty")]
    pub excluded_branches: Vec<String>,

    #[serde(default, rename = "includedBranches", skip_serializing_if = "Vec::is_empty")]
    pub included_branches: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub milestone: Option<String>,

    #[serde(default, rename = "reviewApprovedRequired", skip_serializing_if = "Option::is_none")]
    pub review_approved_required: Option<bool>,
}

impl KeeperQuery {
    /// Structural equality ignoring the repository list.
    pub fn same_search(&self, other: &KeeperQuery) -> bool {
        self.orgs == other.orgs
            && self.labels == other.labels
            && self.missing_labels == other.missing_labels
            && self.excluded_branches == other.excluded_branches
            && self.included_branches == other.included_branches
            && self.milestone == other.milestone
            && self.review_approved_required == other.review_approved_required
    }
}

/// Files the `config-updater` plugin mirrors into config maps
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigUpdaterPolicy {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub map: Option<BTreeMap<String, ConfigMapSpec>>,
}

/// Target location of a mirrored file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigMapSpec {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
}

impl ConfigMapSpec {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: None,
            key: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WelcomeMessage {
    pub message_template: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    pub name: String,

    #[serde(default)]
    pub urls: Vec<String>,
}
