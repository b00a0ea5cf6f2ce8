//! Precedence chain assembly
//!
//! A repository's chain has four levels, lowest precedence first:
//! 1. Team default scheduler
//! 2. Repository group schedulers (one link per group; the first group
//!    added sits closest to the repository)
//! 3. The repository's own scheduler
//! 4. Bootstrap injection (boot repository only)
//!
//! The builder slots links by level, so the order of builder calls does not
//! affect the resulting chain.

use std::collections::BTreeMap;

use scheduler_schema::{Fragment, Scheduler};
use serde::Serialize;
use tracing::warn;

/// Scope a chain link comes from, in ascending precedence
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Team,
    Group,
    Repository,
    Bootstrap,
}

/// One fragment in a precedence chain
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChainLink {
    pub level: Level,

    /// Scheduler name, or `bootstrap` for the injected fragment
    pub source: String,

    /// Group name for group links
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,

    pub fragment: Fragment,
}

/// Schedulers by name
#[derive(Debug, Default)]
pub struct SchedulerIndex<'a> {
    by_name: BTreeMap<&'a str, &'a Fragment>,
}

impl<'a> SchedulerIndex<'a> {
    pub fn new(schedulers: &'a [Scheduler]) -> Self {
        let mut by_name = BTreeMap::new();
        for scheduler in schedulers {
            if by_name.insert(scheduler.name(), &scheduler.spec).is_some() {
                warn!(scheduler = scheduler.name(), "duplicate scheduler name, using the last one");
            }
        }
        Self { by_name }
    }

    pub fn get(&self, name: &str) -> Option<&'a Fragment> {
        self.by_name.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

/// Builds the precedence chain for one repository.
pub struct ChainBuilder<'a> {
    schedulers: &'a SchedulerIndex<'a>,
    repository: String,
    team: Option<ChainLink>,
    groups: Vec<ChainLink>,
    own: Option<ChainLink>,
    bootstrap: Option<ChainLink>,
}

impl<'a> ChainBuilder<'a> {
    pub fn new(schedulers: &'a SchedulerIndex<'a>, repository: impl Into<String>) -> Self {
        Self {
            schedulers,
            repository: repository.into(),
            team: None,
            groups: Vec::new(),
            own: None,
            bootstrap: None,
        }
    }

    pub fn team(mut self, scheduler: Option<&str>) -> Self {
        if let Some(name) = scheduler {
            self.team = self.lookup(Level::Team, name, None);
        }
        self
    }

    /// Each group is prepended, so earlier groups outrank later ones.
    pub fn group(mut self, group: &str, scheduler: &str) -> Self {
        if let Some(link) = self.lookup(Level::Group, scheduler, Some(group)) {
            self.groups.insert(0, link);
        }
        self
    }

    pub fn repository(mut self, scheduler: Option<&str>) -> Self {
        if let Some(name) = scheduler {
            self.own = self.lookup(Level::Repository, name, None);
        }
        self
    }

    pub fn bootstrap(mut self, fragment: Fragment) -> Self {
        self.bootstrap = Some(ChainLink {
            level: Level::Bootstrap,
            source: "bootstrap".to_string(),
            group: None,
            fragment,
        });
        self
    }

    /// The chain, lowest precedence first.
    pub fn build(self) -> Vec<ChainLink> {
        self.team
            .into_iter()
            .chain(self.groups)
            .chain(self.own)
            .chain(self.bootstrap)
            .collect()
    }

    fn lookup(&self, level: Level, name: &str, group: Option<&str>) -> Option<ChainLink> {
        match self.schedulers.get(name) {
            Some(fragment) => Some(ChainLink {
                level,
                source: name.to_string(),
                group: group.map(str::to_string),
                fragment: fragment.clone(),
            }),
            None => {
                warn!(
                    repository = %self.repository,
                    scheduler = name,
                    level = ?level,
                    "scheduler not found, skipping level"
                );
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scheduler_schema::{AgentChoice, Scheduler};

    fn scheduler(name: &str) -> Scheduler {
        Scheduler::scheduler(
            name,
            Fragment {
                scheduler_agent: Some(AgentChoice {
                    agent: Some(name.to_string()),
                }),
                ..Default::default()
            },
        )
    }

    #[test]
    fn test_levels_are_ordered_by_precedence() {
        let schedulers = vec![scheduler("team"), scheduler("group"), scheduler("repo")];
        let index = SchedulerIndex::new(&schedulers);

        let chain = ChainBuilder::new(&index, "acme/app")
            .bootstrap(Fragment::default())
            .repository(Some("repo"))
            .group("frontend", "group")
            .team(Some("team"))
            .build();

        let levels: Vec<Level> = chain.iter().map(|l| l.level).collect();
        assert_eq!(
            levels,
            vec![Level::Team, Level::Group, Level::Repository, Level::Bootstrap]
        );
        assert_eq!(chain[1].group.as_deref(), Some("frontend"));
        assert_eq!(chain[2].source, "repo");
    }

    #[test]
    fn test_missing_scheduler_skips_level() {
        let schedulers = vec![scheduler("team")];
        let index = SchedulerIndex::new(&schedulers);

        let chain = ChainBuilder::new(&index, "acme/app")
            .team(Some("team"))
            .group("frontend", "missing")
            .repository(Some("also-missing"))
            .build();

        assert_eq!(chain.len(), 1);
        assert_eq!(chain[0].level, Level::Team);
    }

    #[test]
    fn test_first_group_is_closest_to_repository() {
        let schedulers = vec![scheduler("a"), scheduler("b")];
        let index = SchedulerIndex::new(&schedulers);

        let chain = ChainBuilder::new(&index, "acme/app")
            .group("g1", "b")
            .group("g2", "a")
            .build();

        let sources: Vec<&str> = chain.iter().map(|l| l.source.as_str()).collect();
        assert_eq!(sources, vec!["a", "b"]);
    }

    #[test]
    fn test_empty_chain() {
        let index = SchedulerIndex::default();
        assert!(ChainBuilder::new(&index, "acme/app").team(None).repository(None).build().is_empty());
    }
}
