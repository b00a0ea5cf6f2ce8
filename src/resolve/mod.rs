//! Resolution orchestrator
//!
//! Turns the loaded resources into one effective fragment ("leaf") per
//! repository by assembling each repository's precedence chain and merging it.

mod bootstrap;
mod chain;
mod source_url;

pub use bootstrap::Bootstrap;
pub use chain::{ChainBuilder, ChainLink, Level, SchedulerIndex};
pub use source_url::parse_git_url;

use scheduler_schema::{
    Environment, Fragment, Scheduler, SourceRepository, SourceRepositoryGroup,
};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::merge::{build, build_peers, MergeError};

/// Resolution errors
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("no source repositories to resolve")]
    NoRepositories,

    #[error("failed to merge schedulers for {repository}: {source}")]
    Merge {
        repository: String,
        #[source]
        source: MergeError,
    },
}

/// A repository and its effective fragment
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Leaf {
    pub org: String,
    pub repo: String,
    pub fragment: Fragment,
}

impl Leaf {
    pub fn new(org: impl Into<String>, repo: impl Into<String>, fragment: Fragment) -> Self {
        Self {
            org: org.into(),
            repo: repo.into(),
            fragment,
        }
    }

    /// Canonical `org/repo` key
    pub fn key(&self) -> String {
        scheduler_schema::repo_key(&self.org, &self.repo)
    }
}

/// Shared read-only lookup tables for resolving repositories.
pub struct Resolver<'a> {
    schedulers: SchedulerIndex<'a>,
    groups: &'a [SourceRepositoryGroup],
    team_default: Option<&'a str>,
    boot: Option<(String, String)>,
    bootstrap: Fragment,
}

impl<'a> Resolver<'a> {
    pub fn new(
        groups: &'a [SourceRepositoryGroup],
        schedulers: &'a [Scheduler],
        environment: Option<&'a Environment>,
        bootstrap: &Bootstrap,
    ) -> Self {
        let team_default = environment.and_then(Environment::default_scheduler_name);
        let boot = environment.and_then(Environment::source_url).and_then(|url| {
            let parsed = parse_git_url(url);
            if parsed.is_none() {
                warn!(url, "cannot determine boot repository from environment source URL");
            }
            parsed
        });

        Self {
            schedulers: SchedulerIndex::new(schedulers),
            groups,
            team_default,
            boot,
            bootstrap: bootstrap.fragment(),
        }
    }

    /// True when the repository hosts the GitOps bootstrap configuration.
    pub fn is_boot_repository(&self, repository: &SourceRepository) -> bool {
        match &self.boot {
            Some((org, repo)) => {
                org.eq_ignore_ascii_case(&repository.spec.org)
                    && repo.eq_ignore_ascii_case(&repository.spec.repo)
            }
            None => false,
        }
    }

    /// The repository's precedence chain, lowest precedence first.
    pub fn chain(&self, repository: &SourceRepository) -> Vec<ChainLink> {
        let mut builder =
            ChainBuilder::new(&self.schedulers, repository.key()).team(self.team_default);

        for group in self.groups.iter().filter(|g| g.contains(repository.name())) {
            if let Some(scheduler) = group.scheduler_name() {
                builder = builder.group(group.name(), scheduler);
            }
        }

        builder = builder.repository(repository.scheduler_name());

        if self.is_boot_repository(repository) {
            builder = builder.bootstrap(self.bootstrap.clone());
        }
        builder.build()
    }

    /// Resolve one repository; `None` when no scope has an opinion about it.
    pub fn resolve(&self, repository: &SourceRepository) -> Result<Option<Leaf>, ResolveError> {
        let chain = self.chain(repository);
        if chain.is_empty() {
            debug!(repository = %repository.key(), "no schedulers apply, skipping");
            return Ok(None);
        }

        debug!(
            repository = %repository.key(),
            chain = ?chain.iter().map(|l| l.source.as_str()).collect::<Vec<_>>(),
            "merging scheduler chain"
        );

        let fragment = fold_chain(chain).map_err(|source| ResolveError::Merge {
            repository: repository.key(),
            source,
        })?;

        Ok(Some(Leaf::new(
            repository.spec.org.clone(),
            repository.spec.repo.clone(),
            fragment,
        )))
    }
}

/// Merge a chain, folding the group links as peers of one level first.
fn fold_chain(chain: Vec<ChainLink>) -> Result<Fragment, MergeError> {
    let mut fragments = Vec::with_capacity(chain.len());
    let mut groups = Vec::new();
    for link in chain {
        if link.level == Level::Group {
            groups.push(link.fragment);
            continue;
        }
        if !groups.is_empty() {
            fragments.push(build_peers(&std::mem::take(&mut groups))?);
        }
        fragments.push(link.fragment);
    }
    if !groups.is_empty() {
        fragments.push(build_peers(&groups)?);
    }
    build(&fragments)
}

/// Resolve every repository into a leaf, using the default bootstrap paths.
pub fn generate(
    repositories: &[SourceRepository],
    groups: &[SourceRepositoryGroup],
    schedulers: &[Scheduler],
    environment: Option<&Environment>,
) -> Result<Vec<Leaf>, ResolveError> {
    generate_with(repositories, groups, schedulers, environment, &Bootstrap::default())
}

/// Resolve every repository into a leaf.
///
/// Fails when there are no repositories or when any chain fails to merge; no
/// partial output is returned. Leaves are sorted by `org/repo`.
pub fn generate_with(
    repositories: &[SourceRepository],
    groups: &[SourceRepositoryGroup],
    schedulers: &[Scheduler],
    environment: Option<&Environment>,
    bootstrap: &Bootstrap,
) -> Result<Vec<Leaf>, ResolveError> {
    if repositories.is_empty() {
        return Err(ResolveError::NoRepositories);
    }

    let resolver = Resolver::new(groups, schedulers, environment, bootstrap);
    let mut leaves = Vec::with_capacity(repositories.len());
    for repository in repositories {
        if let Some(leaf) = resolver.resolve(repository)? {
            leaves.push(leaf);
        }
    }
    leaves.sort_by_key(Leaf::key);

    info!(
        repositories = repositories.len(),
        leaves = leaves.len(),
        "resolved scheduler configuration"
    );
    Ok(leaves)
}
