//! The compiled job document (`config.yaml`).
//!
//! Field names follow the scheduler service's wire format. Conversions to and
//! from the fragment-side policy types live next to the wire types.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::fragment::{
    ContextPolicy, KeeperQuery, ProtectionPolicy, Restrictions, ReviewPolicy, StatusChecks,
};
use crate::job::Job;
use crate::list::ReplaceableList;

/// Jobs, branch protection and merge-queue configuration for every repository
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobDoc {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub presubmits: BTreeMap<String, Vec<Job>>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub postsubmits: BTreeMap<String, Vec<Job>>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub periodics: Vec<Job>,

    #[serde(default, rename = "branch-protection", skip_serializing_if = "BranchProtection::is_empty")]
    pub branch_protection: BranchProtection,

    #[serde(default, skip_serializing_if = "Keeper::is_empty")]
    pub keeper: Keeper,

    #[serde(default, skip_serializing_if = "Plank::is_empty")]
    pub plank: Plank,
}

impl JobDoc {
    pub fn from_yaml(s: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(s)
    }

    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }
}

/// Branch protection tree: global → org → repo → branch
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BranchProtection {
    #[serde(default, rename = "protect-tested-repos", skip_serializing_if = "Option::is_none")]
    pub protect_tested_repos: Option<bool>,

    #[serde(flatten)]
    pub policy: BranchProtectionPolicy,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub orgs: BTreeMap<String, OrgBranchProtection>,
}

impl BranchProtection {
    pub fn is_empty(&self) -> bool {
        self.protect_tested_repos.is_none() && self.policy.is_empty() && self.orgs.is_empty()
    }

    /// Repository-level node, if present.
    pub fn repo(&self, org: &str, repo: &str) -> Option<&RepoBranchProtection> {
        self.orgs.get(org)?.repos.get(repo)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrgBranchProtection {
    #[serde(flatten)]
    pub policy: BranchProtectionPolicy,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub repos: BTreeMap<String, RepoBranchProtection>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RepoBranchProtection {
    #[serde(flatten)]
    pub policy: BranchProtectionPolicy,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub branches: BTreeMap<String, BranchProtectionPolicy>,
}

/// Branch protection rules in wire form
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BranchProtectionPolicy {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protect: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_status_checks: Option<WireStatusChecks>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enforce_admins: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restrictions: Option<WireRestrictions>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_pull_request_reviews: Option<WireReviewPolicy>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub include: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclude: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WireStatusChecks {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub contexts: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strict: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WireRestrictions {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub users: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub teams: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WireReviewPolicy {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dismiss_stale_reviews: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub require_code_owner_reviews: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_approving_review_count: Option<u32>,
}

fn items(list: &Option<ReplaceableList<String>>) -> Vec<String> {
    list.as_ref().map(|l| l.items.clone()).unwrap_or_default()
}

fn non_empty(items: &[String]) -> Option<ReplaceableList<String>> {
    if items.is_empty() {
        None
    } else {
        Some(ReplaceableList::new(items.to_vec()))
    }
}

impl BranchProtectionPolicy {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn from_policy(policy: &ProtectionPolicy) -> Self {
        Self {
            protect: policy.protect,
            required_status_checks: policy.required_status_checks.as_ref().map(|checks| {
                WireStatusChecks {
                    contexts: items(&checks.contexts),
                    strict: checks.strict,
                }
            }),
            enforce_admins: policy.admins,
            restrictions: policy.restrictions.as_ref().map(|r| WireRestrictions {
                users: items(&r.users),
                teams: items(&r.teams),
            }),
            required_pull_request_reviews: policy.required_pull_request_reviews.as_ref().map(|r| {
                WireReviewPolicy {
                    dismiss_stale_reviews: r.dismiss_stale_reviews,
                    require_code_owner_reviews: r.require_code_owner_reviews,
                    required_approving_review_count: r.required_approving_review_count,
                }
            }),
            include: items(&policy.include),
            exclude: items(&policy.exclude),
        }
    }

    pub fn to_policy(&self) -> ProtectionPolicy {
        ProtectionPolicy {
            protect: self.protect,
            required_status_checks: self.required_status_checks.as_ref().map(|checks| {
                StatusChecks {
                    contexts: non_empty(&checks.contexts),
                    strict: checks.strict,
                }
            }),
            admins: self.enforce_admins,
            restrictions: self.restrictions.as_ref().map(|r| Restrictions {
                users: non_empty(&r.users),
                teams: non_empty(&r.teams),
            }),
            required_pull_request_reviews: self.required_pull_request_reviews.as_ref().map(|r| {
                ReviewPolicy {
                    dismiss_stale_reviews: r.dismiss_stale_reviews,
                    require_code_owner_reviews: r.require_code_owner_reviews,
                    required_approving_review_count: r.required_approving_review_count,
                }
            }),
            include: non_empty(&self.include),
            exclude: non_empty(&self.exclude),
        }
    }
}

/// Merge-queue configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Keeper {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub queries: Vec<KeeperQuery>,

    /// Merge method keyed by `org/repo`
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub merge_method: BTreeMap<String, String>,

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

    #[serde(default, skip_serializing_if = "ContextOptions::is_empty")]
    pub context_options: ContextOptions,
}

impl Keeper {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// True when any of the global (not per-repository) settings is set.
    pub fn has_global_settings(&self) -> bool {
        self.sync_period.is_some()
            || self.status_update_period.is_some()
            || self.target_url.is_some()
            || self.pr_status_base_url.is_some()
            || self.blocker_label.is_some()
            || self.squash_label.is_some()
            || self.max_goroutines.is_some()
    }
}

/// Status-check requirements, globally and per repository
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ContextOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_branch_protection: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip_unknown_contexts: Option<bool>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub orgs: BTreeMap<String, OrgContextOptions>,
}

impl ContextOptions {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn repo(&self, org: &str, repo: &str) -> Option<&RepoContextPolicy> {
        self.orgs.get(org)?.repos.get(repo)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrgContextOptions {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub repos: BTreeMap<String, RepoContextPolicy>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RepoContextPolicy {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required_contexts: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub optional_contexts: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required_if_present_contexts: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip_unknown_contexts: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_branch_protection: Option<bool>,
}

impl RepoContextPolicy {
    pub fn from_policy(policy: &ContextPolicy) -> Self {
        Self {
            required_contexts: items(&policy.required_contexts),
            optional_contexts: items(&policy.optional_contexts),
            required_if_present_contexts: items(&policy.required_if_present_contexts),
            skip_unknown_contexts: policy.skip_unknown_contexts,
            from_branch_protection: policy.from_branch_protection,
        }
    }

    pub fn to_policy(&self) -> ContextPolicy {
        ContextPolicy {
            required_contexts: non_empty(&self.required_contexts),
            optional_contexts: non_empty(&self.optional_contexts),
            required_if_present_contexts: non_empty(&self.required_if_present_contexts),
            skip_unknown_contexts: self.skip_unknown_contexts,
            from_branch_protection: self.from_branch_protection,
        }
    }
}

/// Job-runner settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Plank {
    /// Report template keyed by `*`, org or `org/repo`
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub report_templates: BTreeMap<String, String>,
}

impl Plank {
    pub fn is_empty(&self) -> bool {
        self.report_templates.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_job_doc() {
        let yaml = r#"
presubmits:
  acme/app:
    - name: pr-build
      context: pr-build
      always_run: true
periodics:
  - name: nightly
    cron: "0 2 * * *"
branch-protection:
  protect-tested-repos: true
  orgs:
    acme:
      repos:
        app:
          protect: true
          required_status_checks:
            contexts: [pr-build]
keeper:
  merge_method:
    acme/app: squash
  sync_period: 1m
  context_options:
    orgs:
      acme:
        repos:
          app:
            required-contexts: [pr-build]
"#;
        let doc = JobDoc::from_yaml(yaml).unwrap();
        assert_eq!(doc.presubmits["acme/app"][0].name, "pr-build");
        assert_eq!(doc.periodics[0].cron.as_deref(), Some("0 2 * * *"));
        assert_eq!(doc.branch_protection.protect_tested_repos, Some(true));

        let repo = doc.branch_protection.repo("acme", "app").unwrap();
        assert_eq!(repo.policy.protect, Some(true));
        assert_eq!(
            repo.policy.required_status_checks.as_ref().unwrap().contexts,
            vec!["pr-build"]
        );

        assert_eq!(doc.keeper.merge_method["acme/app"], "squash");
        assert!(doc.keeper.has_global_settings());
        let ctx = doc.keeper.context_options.repo("acme", "app").unwrap();
        assert_eq!(ctx.required_contexts, vec!["pr-build"]);
    }

    #[test]
    fn test_empty_sections_are_omitted() {
        let yaml = JobDoc::default().to_yaml().unwrap();
        assert_eq!(yaml.trim(), "{}");
    }

    #[test]
    fn test_protection_policy_conversion() {
        let policy = ProtectionPolicy {
            protect: Some(true),
            admins: Some(false),
            required_status_checks: Some(StatusChecks {
                contexts: Some(ReplaceableList::new(vec!["ci".to_string()])),
                strict: None,
            }),
            ..Default::default()
        };
        let wire = BranchProtectionPolicy::from_policy(&policy);
        assert_eq!(wire.enforce_admins, Some(false));
        assert_eq!(wire.required_status_checks.as_ref().unwrap().contexts, vec!["ci"]);
        assert_eq!(wire.to_policy(), policy);
    }
}
