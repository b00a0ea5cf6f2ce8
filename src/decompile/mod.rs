//! Reverse compiler
//!
//! Reconstructs a flat set of schedulers and repositories from existing job
//! and plugin documents, for importing a hand-maintained configuration.
//! The result is lossy: `replace` flags and any scope hierarchy beyond one
//! team default and one scheduler per repository cannot be recovered.

use std::collections::{BTreeMap, BTreeSet};

use scheduler_schema::{
    split_repo_key, Attachment, ConfigUpdaterPolicy, Fragment, GlobalProtectionPolicy, JobDoc,
    JobSet, KeeperQuery, MergePolicy, PluginDoc, QueryList, ReplaceableList, Scheduler,
    SourceRepository, WelcomeMessage, CONFIG_UPDATER_PLUGIN, REPORT_TEMPLATE_ATTACHMENT,
};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Name of the team-level scheduler holding the global settings.
pub const DEFAULT_SCHEDULER: &str = "default";

/// Malformed-document errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecompileError {
    #[error("malformed repository key '{key}' in {section}: expected 'org/repo'")]
    MalformedKey { section: &'static str, key: String },
}

/// Flat resources reconstructed from compiled documents
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Decompiled {
    /// Fragments by scheduler name, including the team default
    pub schedulers: BTreeMap<String, Fragment>,

    /// One repository per `org/repo` key, sorted by key
    pub repositories: Vec<SourceRepository>,

    /// Name of the team default scheduler
    pub default_scheduler: String,
}

impl Decompiled {
    /// The schedulers as resources, ordered by name.
    pub fn scheduler_resources(&self) -> Vec<Scheduler> {
        self.schedulers
            .iter()
            .map(|(name, fragment)| Scheduler::scheduler(name.clone(), fragment.clone()))
            .collect()
    }
}

/// Derive a resource name from a repository key.
///
/// Lowercase, with path and punctuation separators turned into `-`.
pub fn resource_name(org: &str, repo: &str) -> String {
    format!("{}-{}", org, repo)
        .to_lowercase()
        .chars()
        .map(|c| match c {
            '/' | '.' | '_' => '-',
            c => c,
        })
        .collect()
}

/// Split job and plugin documents into per-repository schedulers.
pub fn decompile(jobs: &JobDoc, plugins: &PluginDoc) -> Result<Decompiled, DecompileError> {
    let keys = repository_keys(jobs, plugins)?;

    let mut decompiled = Decompiled {
        default_scheduler: DEFAULT_SCHEDULER.to_string(),
        ..Default::default()
    };
    decompiled
        .schedulers
        .insert(DEFAULT_SCHEDULER.to_string(), default_fragment(jobs));

    for key in &keys.repos {
        // Validated by `repository_keys`.
        let Some((org, repo)) = split_repo_key(key) else {
            continue;
        };

        let mut name = resource_name(org, repo);
        if decompiled.schedulers.contains_key(&name) {
            let base = name.clone();
            let mut n = 2;
            while decompiled.schedulers.contains_key(&name) {
                name = format!("{}-{}", base, n);
                n += 1;
            }
            debug!(repository = %key, scheduler = %name, "scheduler name taken, using suffix");
        }

        decompiled
            .schedulers
            .insert(name.clone(), repository_fragment(jobs, plugins, key, org, repo));
        decompiled
            .repositories
            .push(SourceRepository::repository(name.clone(), org, repo, Some(name.as_str())));
    }

    info!(
        repositories = decompiled.repositories.len(),
        schedulers = decompiled.schedulers.len(),
        "decompiled scheduler documents"
    );
    Ok(decompiled)
}

/// Keys found in the documents, split by scope
#[derive(Debug, Default)]
struct KeyIndex {
    /// `org/repo` keys, sorted
    repos: BTreeSet<String>,

    /// Org-wide entries (plugins, external plugins, merge method)
    orgs: BTreeSet<String>,
}

impl KeyIndex {
    fn add(&mut self, section: &'static str, key: &str, org_allowed: bool) -> Result<(), DecompileError> {
        if split_repo_key(key).is_some() {
            self.repos.insert(key.to_string());
        } else if org_allowed && !key.contains('/') && !key.trim().is_empty() {
            self.orgs.insert(key.to_string());
        } else {
            return Err(DecompileError::MalformedKey {
                section,
                key: key.to_string(),
            });
        }
        Ok(())
    }

    /// Add a repository named by an org/repo tree node.
    fn add_node(&mut self, section: &'static str, org: &str, repo: &str) -> Result<(), DecompileError> {
        let key = scheduler_schema::repo_key(org, repo);
        if split_repo_key(&key) != Some((org, repo)) {
            return Err(DecompileError::MalformedKey { section, key });
        }
        self.repos.insert(key);
        Ok(())
    }
}

/// Every repository any per-repository section mentions, validated.
fn repository_keys(jobs: &JobDoc, plugins: &PluginDoc) -> Result<KeyIndex, DecompileError> {
    let mut index = KeyIndex::default();

    for key in jobs.presubmits.keys() {
        index.add("presubmits", key, false)?;
    }
    for key in jobs.postsubmits.keys() {
        index.add("postsubmits", key, false)?;
    }
    for key in plugins.plugins.keys() {
        index.add("plugins", key, true)?;
    }
    for key in plugins.external_plugins.keys() {
        index.add("external_plugins", key, true)?;
    }
    for key in jobs.keeper.merge_method.keys() {
        index.add("keeper.merge_method", key, true)?;
    }
    for (org, options) in &jobs.keeper.context_options.orgs {
        for repo in options.repos.keys() {
            index.add_node("keeper.context_options", org, repo)?;
        }
    }
    for (org, protection) in &jobs.branch_protection.orgs {
        for repo in protection.repos.keys() {
            index.add_node("branch-protection", org, repo)?;
        }
    }

    for org in &index.orgs {
        let has_repos = index
            .repos
            .iter()
            .filter_map(|key| split_repo_key(key))
            .any(|(repo_org, _)| repo_org == org);
        if !has_repos {
            warn!(org = %org, "org-wide entries name no known repository, dropping them");
        }
    }
    Ok(index)
}

/// The team default: periodics and everything global.
fn default_fragment(jobs: &JobDoc) -> Fragment {
    let mut fragment = Fragment::default();

    if !jobs.periodics.is_empty() {
        fragment.periodics = Some(JobSet::new(jobs.periodics.clone()));
    }

    if let Some(url) = jobs.plank.report_templates.get("*") {
        fragment.attachments = Some(ReplaceableList::new(vec![Attachment {
            name: REPORT_TEMPLATE_ATTACHMENT.to_string(),
            urls: vec![url.clone()],
        }]));
    }

    let keeper = &jobs.keeper;
    if keeper.has_global_settings() {
        fragment.merger = Some(MergePolicy {
            sync_period: keeper.sync_period.clone(),
            status_update_period: keeper.status_update_period.clone(),
            target_url: keeper.target_url.clone(),
            pr_status_base_url: keeper.pr_status_base_url.clone(),
            blocker_label: keeper.blocker_label.clone(),
            squash_label: keeper.squash_label.clone(),
            max_goroutines: keeper.max_goroutines,
            ..Default::default()
        });
    }

    let protection = &jobs.branch_protection;
    if protection.protect_tested_repos.is_some() || !protection.policy.is_empty() {
        fragment.policy = Some(GlobalProtectionPolicy {
            protect_tested: protection.protect_tested_repos,
            policy: (!protection.policy.is_empty()).then(|| protection.policy.to_policy()),
            branches: None,
        });
    }

    fragment
}

fn repository_fragment(
    jobs: &JobDoc,
    plugins: &PluginDoc,
    key: &str,
    org: &str,
    repo: &str,
) -> Fragment {
    let job_set = |jobs: Option<&Vec<scheduler_schema::Job>>| {
        jobs.filter(|j| !j.is_empty()).map(|j| JobSet::new(j.clone()))
    };

    let names = with_org_entries(&plugins.plugins, key, org);
    let external = with_org_entries(&plugins.external_plugins, key, org);
    let config_updater = names
        .iter()
        .any(|p| p == CONFIG_UPDATER_PLUGIN)
        .then(|| &plugins.config_updater.maps)
        .filter(|maps| !maps.is_empty())
        .map(|maps| ConfigUpdaterPolicy {
            map: Some(maps.clone()),
        });

    let welcome: Vec<WelcomeMessage> = plugins
        .welcome
        .iter()
        .filter(|w| w.names(key))
        .map(|w| WelcomeMessage {
            message_template: w.message_template.clone(),
        })
        .collect();

    Fragment {
        presubmits: job_set(jobs.presubmits.get(key)),
        postsubmits: job_set(jobs.postsubmits.get(key)),
        policy: repository_protection(jobs, org, repo),
        plugins: (!names.is_empty()).then(|| ReplaceableList::new(names)),
        external_plugins: (!external.is_empty()).then(|| ReplaceableList::new(external)),
        approve: plugins.approve.iter().find(|a| a.names(key)).map(|a| a.to_policy()),
        lgtm: plugins.lgtm.iter().find(|l| l.names(key)).map(|l| l.to_policy()),
        trigger: plugins.triggers.iter().find(|t| t.names(key)).map(|t| t.to_policy()),
        config_updater,
        merger: repository_merger(jobs, key, org, repo),
        welcome: (!welcome.is_empty()).then(|| ReplaceableList::new(welcome)),
        ..Default::default()
    }
}

/// The repository's own entries followed by its org's missing ones.
fn with_org_entries<T: Clone + PartialEq>(
    map: &BTreeMap<String, Vec<T>>,
    key: &str,
    org: &str,
) -> Vec<T> {
    let mut entries = map.get(key).cloned().unwrap_or_default();
    for entry in map.get(org).into_iter().flatten() {
        if !entries.contains(entry) {
            entries.push(entry.clone());
        }
    }
    entries
}

fn repository_protection(jobs: &JobDoc, org: &str, repo: &str) -> Option<GlobalProtectionPolicy> {
    let node = jobs.branch_protection.repo(org, repo)?;
    let policy = (!node.policy.is_empty()).then(|| node.policy.to_policy());
    let branches = (!node.branches.is_empty()).then(|| {
        node.branches
            .iter()
            .map(|(branch, p)| (branch.clone(), p.to_policy()))
            .collect()
    });
    if policy.is_none() && branches.is_none() {
        return None;
    }
    Some(GlobalProtectionPolicy {
        protect_tested: None,
        policy,
        branches,
    })
}

fn repository_merger(jobs: &JobDoc, key: &str, org: &str, repo: &str) -> Option<MergePolicy> {
    let keeper = &jobs.keeper;
    let queries: Vec<KeeperQuery> = keeper
        .queries
        .iter()
        .filter(|q| q.repos.iter().any(|r| r == key))
        .map(|q| KeeperQuery {
            repos: Vec::new(),
            ..q.clone()
        })
        .collect();

    let merger = MergePolicy {
        merge_method: keeper
            .merge_method
            .get(key)
            .or_else(|| keeper.merge_method.get(org))
            .cloned(),
        context_policy: keeper.context_options.repo(org, repo).map(|c| c.to_policy()),
        queries: (!queries.is_empty()).then(|| QueryList(queries)),
        ..Default::default()
    };
    (merger != MergePolicy::default()).then_some(merger)
}

#[cfg(test)]
mod tests {
    use super::*;
    use scheduler_schema::{Approve, ApprovePolicy, ConfigMapSpec, Job};

    fn jobs_for(key: &str, names: &[&str]) -> JobDoc {
        let mut jobs = JobDoc::default();
        jobs.presubmits.insert(
            key.to_string(),
            names.iter().map(|n| Job::named(*n)).collect(),
        );
        jobs
    }

    #[test]
    fn test_resource_name() {
        assert_eq!(resource_name("Acme", "my_app.v2"), "acme-my-app-v2");
        assert_eq!(resource_name("group/sub", "app"), "group-sub-app");
    }

    #[test]
    fn test_one_repository_per_key() {
        let mut jobs = jobs_for("acme/app", &["lint"]);
        jobs.postsubmits
            .insert("acme/lib".to_string(), vec![Job::named("release")]);
        let mut plugins = PluginDoc::default();
        plugins
            .plugins
            .insert("acme/app".to_string(), vec!["approve".to_string()]);

        let decompiled = decompile(&jobs, &plugins).unwrap();
        let keys: Vec<String> = decompiled.repositories.iter().map(|r| r.key()).collect();
        assert_eq!(keys, vec!["acme/app", "acme/lib"]);
        assert_eq!(decompiled.default_scheduler, DEFAULT_SCHEDULER);
        assert!(decompiled.schedulers.contains_key(DEFAULT_SCHEDULER));

        let app = &decompiled.schedulers["acme-app"];
        assert_eq!(app.presubmits.as_ref().unwrap().names(), vec!["lint"]);
        assert_eq!(app.plugin_names(), ["approve"]);
        assert_eq!(
            decompiled.repositories[0].scheduler_name(),
            Some("acme-app")
        );
    }

    #[test]
    fn test_malformed_key() {
        let jobs = jobs_for("no-slash", &["lint"]);
        let err = decompile(&jobs, &PluginDoc::default()).unwrap_err();
        assert_eq!(
            err,
            DecompileError::MalformedKey {
                section: "presubmits",
                key: "no-slash".to_string(),
            }
        );
    }

    #[test]
    fn test_merge_method_alone_makes_a_repository() {
        let mut jobs = jobs_for("acme/app", &["lint"]);
        jobs.keeper
            .merge_method
            .insert("acme/queue".to_string(), "squash".to_string());

        let decompiled = decompile(&jobs, &PluginDoc::default()).unwrap();
        let keys: Vec<_> = decompiled.repositories.iter().map(|r| r.key()).collect();
        assert_eq!(keys, vec!["acme/app", "acme/queue"]);
        let merger = decompiled.schedulers["acme-queue"].merger.as_ref().unwrap();
        assert_eq!(merger.merge_method.as_deref(), Some("squash"));
    }

    #[test]
    fn test_context_options_and_protection_make_repositories() {
        let mut jobs = JobDoc::default();
        jobs.keeper
            .context_options
            .orgs
            .entry("acme".to_string())
            .or_default()
            .repos
            .insert(
                "ctx".to_string(),
                scheduler_schema::RepoContextPolicy {
                    required_contexts: vec!["ci/build".to_string()],
                    ..Default::default()
                },
            );
        let mut node = scheduler_schema::RepoBranchProtection::default();
        node.policy.protect = Some(true);
        jobs.branch_protection
            .orgs
            .entry("acme".to_string())
            .or_default()
            .repos
            .insert("guarded".to_string(), node);

        let decompiled = decompile(&jobs, &PluginDoc::default()).unwrap();
        assert!(decompiled.schedulers["acme-ctx"].merger.is_some());
        assert!(decompiled.schedulers["acme-guarded"].policy.is_some());
    }

    #[test]
    fn test_org_plugins_apply_to_org_repositories() {
        let mut plugins = PluginDoc::default();
        plugins.plugins.insert("acme".to_string(), vec!["approve".to_string()]);
        plugins.plugins.insert(
            "acme/app".to_string(),
            vec!["lgtm".to_string(), "approve".to_string()],
        );
        let jobs = jobs_for("acme/lib", &["lint"]);

        let decompiled = decompile(&jobs, &plugins).unwrap();
        let app = decompiled.schedulers["acme-app"].plugins.as_ref().unwrap();
        assert_eq!(app.items, vec!["lgtm", "approve"]);
        let lib = decompiled.schedulers["acme-lib"].plugins.as_ref().unwrap();
        assert_eq!(lib.items, vec!["approve"]);
        assert!(!decompiled.schedulers.contains_key("acme"));
    }

    #[test]
    fn test_org_entries_without_repositories_are_dropped() {
        let mut plugins = PluginDoc::default();
        plugins.plugins.insert("other".to_string(), vec!["approve".to_string()]);
        let jobs = jobs_for("acme/app", &["lint"]);

        let decompiled = decompile(&jobs, &plugins).unwrap();
        assert_eq!(decompiled.repositories.len(), 1);
        assert!(decompiled.schedulers["acme-app"].plugins.is_none());
    }

    #[test]
    fn test_org_merge_method_yields_to_repository_method() {
        let mut jobs = jobs_for("acme/app", &["lint"]);
        jobs.presubmits
            .insert("acme/lib".to_string(), vec![Job::named("lint")]);
        jobs.keeper.merge_method.insert("acme".to_string(), "rebase".to_string());
        jobs.keeper.merge_method.insert("acme/app".to_string(), "squash".to_string());

        let decompiled = decompile(&jobs, &PluginDoc::default()).unwrap();
        let method = |name: &str| {
            decompiled.schedulers[name]
                .merger
                .as_ref()
                .and_then(|m| m.merge_method.clone())
        };
        assert_eq!(method("acme-app").as_deref(), Some("squash"));
        assert_eq!(method("acme-lib").as_deref(), Some("rebase"));
    }

    #[test]
    fn test_empty_repository_part_is_malformed() {
        let mut plugins = PluginDoc::default();
        plugins.plugins.insert("acme/".to_string(), vec!["approve".to_string()]);
        let err = decompile(&JobDoc::default(), &plugins).unwrap_err();
        assert!(matches!(err, DecompileError::MalformedKey { section: "plugins", .. }));
    }

    #[test]
    fn test_shared_entries_are_split_per_repository() {
        let mut plugins = PluginDoc::default();
        for key in ["acme/a", "acme/b"] {
            plugins.plugins.insert(key.to_string(), vec!["approve".to_string()]);
        }
        let policy = ApprovePolicy {
            issue_required: Some(true),
            ..Default::default()
        };
        plugins.approve.push(Approve::for_repo("acme/b", &policy));

        let decompiled = decompile(&JobDoc::default(), &plugins).unwrap();
        assert!(decompiled.schedulers["acme-a"].approve.is_none());
        assert_eq!(
            decompiled.schedulers["acme-b"].approve.as_ref().unwrap().issue_required,
            Some(true)
        );
    }

    #[test]
    fn test_config_updater_only_for_enabled_repositories() {
        let mut plugins = PluginDoc::default();
        plugins.plugins.insert(
            "acme/env".to_string(),
            vec![CONFIG_UPDATER_PLUGIN.to_string()],
        );
        plugins.plugins.insert("acme/app".to_string(), vec!["lgtm".to_string()]);
        plugins
            .config_updater
            .maps
            .insert("config/config.yaml".to_string(), ConfigMapSpec::named("config"));

        let decompiled = decompile(&JobDoc::default(), &plugins).unwrap();
        assert!(decompiled.schedulers["acme-env"].config_updater.is_some());
        assert!(decompiled.schedulers["acme-app"].config_updater.is_none());
    }

    #[test]
    fn test_globals_go_to_default_scheduler() {
        let mut jobs = jobs_for("acme/app", &["lint"]);
        jobs.periodics.push(Job::named("nightly").with_cron("0 0 * * *"));
        jobs.keeper.sync_period = Some("1m".to_string());
        jobs.plank
            .report_templates
            .insert("*".to_string(), "https://reports".to_string());

        let decompiled = decompile(&jobs, &PluginDoc::default()).unwrap();
        let default = &decompiled.schedulers[DEFAULT_SCHEDULER];
        assert_eq!(default.periodics.as_ref().unwrap().names(), vec!["nightly"]);
        assert_eq!(
            default.merger.as_ref().unwrap().sync_period.as_deref(),
            Some("1m")
        );
        assert_eq!(
            default.attachments.as_ref().unwrap().items[0].urls,
            vec!["https://reports"]
        );
        assert!(decompiled.schedulers["acme-app"].periodics.is_none());
    }

    #[test]
    fn test_scheduler_name_collision_gets_suffix() {
        let mut jobs = jobs_for("acme/my.app", &["lint"]);
        jobs.presubmits
            .insert("acme/my_app".to_string(), vec![Job::named("lint")]);
        let decompiled = decompile(&jobs, &PluginDoc::default()).unwrap();
        let names: Vec<&str> = decompiled
            .repositories
            .iter()
            .filter_map(|r| r.scheduler_name())
            .collect();
        assert_eq!(names, vec!["acme-my-app", "acme-my-app-2"]);
    }
}
