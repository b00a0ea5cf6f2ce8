//! Forward compiler
//!
//! Flattens the per-repository leaves into the two documents the scheduler
//! service reads: the job document (`config.yaml`) and the plugin document
//! (`plugins.yaml`). Compilation is purely additive across leaves.

use std::collections::BTreeMap;

use scheduler_schema::{
    Approve, BranchProtectionPolicy, Fragment, GlobalProtectionPolicy, JobDoc, Lgtm, MergePolicy,
    PluginDoc, RepoBranchProtection, RepoContextPolicy, Trigger, Welcome,
    REPORT_TEMPLATE_ATTACHMENT,
};
use thiserror::Error;
use tracing::{debug, info};

use crate::merge::{fold_query, Merge, MergeError};
use crate::resolve::Leaf;

/// Compilation errors
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("invalid repository '{org}/{repo}': org and repository must be non-empty")]
    InvalidRepository { org: String, repo: String },

    #[error("failed to fold branch protection for {repository}: {source}")]
    Protection {
        repository: String,
        #[source]
        source: MergeError,
    },
}

/// Compile leaves into the job and plugin documents.
pub fn compile(leaves: &[Leaf]) -> Result<(JobDoc, PluginDoc), CompileError> {
    let mut compiler = Compiler::default();
    for leaf in leaves {
        compiler.add(leaf)?;
    }
    let (jobs, plugins) = compiler.finish();

    info!(
        leaves = leaves.len(),
        presubmits = jobs.presubmits.len(),
        periodics = jobs.periodics.len(),
        plugin_repos = plugins.plugins.len(),
        "compiled scheduler documents"
    );
    Ok((jobs, plugins))
}

#[derive(Default)]
struct Compiler {
    jobs: JobDoc,
    plugins: PluginDoc,
    /// Repository-level protection, folded before conversion to wire form
    protection: BTreeMap<(String, String), GlobalProtectionPolicy>,
}

impl Compiler {
    fn add(&mut self, leaf: &Leaf) -> Result<(), CompileError> {
        if leaf.org.trim().is_empty() || leaf.repo.trim().is_empty() {
            return Err(CompileError::InvalidRepository {
                org: leaf.org.clone(),
                repo: leaf.repo.clone(),
            });
        }

        let key = leaf.key();
        let fragment = &leaf.fragment;
        debug!(repository = %key, "compiling leaf");

        self.add_jobs(&key, fragment);
        if let Some(policy) = &fragment.policy {
            self.add_protection(leaf, policy)?;
        }
        if let Some(merger) = &fragment.merger {
            self.add_keeper(leaf, &key, merger);
        }
        self.add_attachments(fragment);
        self.add_plugins(&key, fragment);
        Ok(())
    }

    fn add_jobs(&mut self, key: &str, fragment: &Fragment) {
        if let Some(presubmits) = fragment.presubmits.as_ref().filter(|s| !s.items.is_empty()) {
            self.jobs
                .presubmits
                .entry(key.to_string())
                .or_default()
                .extend(presubmits.items.iter().cloned());
        }
        if let Some(postsubmits) = fragment.postsubmits.as_ref().filter(|s| !s.items.is_empty()) {
            self.jobs
                .postsubmits
                .entry(key.to_string())
                .or_default()
                .extend(postsubmits.items.iter().cloned());
        }
        if let Some(periodics) = &fragment.periodics {
            for job in &periodics.items {
                if !self.jobs.periodics.iter().any(|p| p.name == job.name) {
                    self.jobs.periodics.push(job.clone());
                }
            }
        }
    }

    fn add_protection(
        &mut self,
        leaf: &Leaf,
        policy: &GlobalProtectionPolicy,
    ) -> Result<(), CompileError> {
        if policy.protect_tested.is_some() {
            self.jobs.branch_protection.protect_tested_repos = policy.protect_tested;
        }

        let repo_level = GlobalProtectionPolicy {
            protect_tested: None,
            ..policy.clone()
        };
        let slot = self
            .protection
            .entry((leaf.org.clone(), leaf.repo.clone()))
            .or_default();
        slot.merge_from(&repo_level)
            .map_err(|source| CompileError::Protection {
                repository: leaf.key(),
                source,
            })
    }

    fn add_keeper(&mut self, leaf: &Leaf, key: &str, merger: &MergePolicy) {
        let keeper = &mut self.jobs.keeper;

        // Global settings: a present value overwrites, absent never clears.
        overwrite(&mut keeper.sync_period, &merger.sync_period);
        overwrite(&mut keeper.status_update_period, &merger.status_update_period);
        overwrite(&mut keeper.target_url, &merger.target_url);
        overwrite(&mut keeper.pr_status_base_url, &merger.pr_status_base_url);
        overwrite(&mut keeper.blocker_label, &merger.blocker_label);
        overwrite(&mut keeper.squash_label, &merger.squash_label);
        overwrite(&mut keeper.max_goroutines, &merger.max_goroutines);

        if let Some(method) = &merger.merge_method {
            keeper.merge_method.insert(key.to_string(), method.clone());
        }

        if let Some(context) = &merger.context_policy {
            keeper
                .context_options
                .orgs
                .entry(leaf.org.clone())
                .or_default()
                .repos
                .insert(leaf.repo.clone(), RepoContextPolicy::from_policy(context));
        }

        if let Some(queries) = &merger.queries {
            for query in &queries.0 {
                let mut tagged = query.clone();
                tagged.repos = vec![key.to_string()];
                fold_query(&mut keeper.queries, &tagged);
            }
        }
    }

    fn add_attachments(&mut self, fragment: &Fragment) {
        let Some(attachments) = &fragment.attachments else {
            return;
        };
        let template = attachments
            .items
            .iter()
            .filter(|a| a.name == REPORT_TEMPLATE_ATTACHMENT)
            .find_map(|a| a.urls.first());
        if let Some(url) = template {
            self.jobs
                .plank
                .report_templates
                .entry("*".to_string())
                .or_insert_with(|| url.clone());
        }
    }

    fn add_plugins(&mut self, key: &str, fragment: &Fragment) {
        let doc = &mut self.plugins;

        let names = fragment.plugin_names();
        if !names.is_empty() {
            append_missing(doc.plugins.entry(key.to_string()).or_default(), names);
        }

        if let Some(external) = fragment.external_plugins.as_ref().filter(|l| !l.is_empty()) {
            append_missing(
                doc.external_plugins.entry(key.to_string()).or_default(),
                &external.items,
            );
        }

        if let Some(approve) = &fragment.approve {
            doc.approve.push(Approve::for_repo(key, approve));
        }
        if let Some(lgtm) = &fragment.lgtm {
            doc.lgtm.push(Lgtm::for_repo(key, lgtm));
        }
        if let Some(trigger) = &fragment.trigger {
            doc.triggers.push(Trigger::for_repo(key, trigger));
        }

        if let Some(welcome) = &fragment.welcome {
            for message in &welcome.items {
                match doc
                    .welcome
                    .iter_mut()
                    .find(|w| w.message_template == message.message_template)
                {
                    Some(existing) if existing.names(key) => {}
                    Some(existing) => existing.repos.push(key.to_string()),
                    None => doc.welcome.push(Welcome {
                        repos: vec![key.to_string()],
                        message_template: message.message_template.clone(),
                    }),
                }
            }
        }

        if let Some(maps) = fragment.config_updater.as_ref().and_then(|c| c.map.as_ref()) {
            for (path, spec) in maps {
                doc.config_updater
                    .maps
                    .entry(path.clone())
                    .or_insert_with(|| spec.clone());
            }
        }
    }

    fn finish(mut self) -> (JobDoc, PluginDoc) {
        for ((org, repo), policy) in self.protection {
            let node = RepoBranchProtection {
                policy: policy
                    .policy
                    .as_ref()
                    .map(BranchProtectionPolicy::from_policy)
                    .unwrap_or_default(),
                branches: policy
                    .branches
                    .iter()
                    .flatten()
                    .map(|(branch, p)| (branch.clone(), BranchProtectionPolicy::from_policy(p)))
                    .collect(),
            };
            if node.policy.is_empty() && node.branches.is_empty() {
                continue;
            }
            self.jobs
                .branch_protection
                .orgs
                .entry(org)
                .or_default()
                .repos
                .insert(repo, node);
        }
        (self.jobs, self.plugins)
    }
}

fn overwrite<T: Clone>(target: &mut Option<T>, value: &Option<T>) {
    if value.is_some() {
        target.clone_from(value);
    }
}

fn append_missing<T: PartialEq + Clone>(target: &mut Vec<T>, items: &[T]) {
    for item in items {
        if !target.contains(item) {
            target.push(item.clone());
        }
    }
}
