//! Resolution Orchestrator Tests
//!
//! End-to-end resolution of repositories through team, group, repository and
//! bootstrap scopes.

use gitops_scheduler::schema::{
    AgentChoice, Environment, Fragment, Job, JobSet, ReplaceableList, Scheduler, SourceRepository,
    SourceRepositoryGroup, CONFIG_UPDATER_PLUGIN,
};
use gitops_scheduler::{generate, generate_with, Bootstrap, ResolveError};

const BOOT_URL: &str = "https://github.com/acme/environment-dev.git";

fn plugins(items: &[&str], replace: bool) -> Fragment {
    let items = items.iter().map(|s| s.to_string()).collect();
    Fragment {
        plugins: Some(if replace {
            ReplaceableList::replacing(items)
        } else {
            ReplaceableList::new(items)
        }),
        ..Default::default()
    }
}

fn agent(name: &str) -> Fragment {
    Fragment {
        scheduler_agent: Some(AgentChoice {
            agent: Some(name.to_string()),
        }),
        ..Default::default()
    }
}

fn plugin_names(fragment: &Fragment) -> Vec<&str> {
    fragment.plugin_names().iter().map(String::as_str).collect()
}

#[test]
fn test_no_repositories_is_an_error() {
    let schedulers = vec![Scheduler::scheduler("default", agent("tekton"))];
    let err = generate(&[], &[], &schedulers, None).unwrap_err();
    assert!(matches!(err, ResolveError::NoRepositories));
}

#[test]
fn test_boot_repository_always_gets_config_updater() {
    let schedulers = vec![
        Scheduler::scheduler("default", plugins(&["lgtm"], false)),
        Scheduler::scheduler("env", plugins(&["x"], true)),
    ];
    let repos = vec![SourceRepository::repository(
        "acme-environment-dev",
        "acme",
        "environment-dev",
        Some("env"),
    )];
    let environment = Environment::dev(Some(BOOT_URL), Some("default"));

    let leaves = generate(&repos, &[], &schedulers, Some(&environment)).unwrap();
    assert_eq!(leaves.len(), 1);

    let fragment = &leaves[0].fragment;
    assert_eq!(plugin_names(fragment), vec![CONFIG_UPDATER_PLUGIN, "x"]);
    let maps = fragment.config_updater.as_ref().unwrap().map.as_ref().unwrap();
    assert_eq!(maps["config/config.yaml"].name, "config");
    assert_eq!(maps["config/plugins.yaml"].name, "plugins");
}

#[test]
fn test_boot_repository_keeps_lower_plugins_without_replace() {
    let schedulers = vec![Scheduler::scheduler("default", plugins(&["lgtm"], false))];
    let repos = vec![SourceRepository::repository(
        "env",
        "acme",
        "environment-dev",
        None,
    )];
    let environment = Environment::dev(Some("git@github.com:acme/environment-dev.git"), Some("default"));

    let leaves = generate(&repos, &[], &schedulers, Some(&environment)).unwrap();
    assert_eq!(plugin_names(&leaves[0].fragment), vec![CONFIG_UPDATER_PLUGIN, "lgtm"]);
}

#[test]
fn test_custom_bootstrap_paths() {
    let bootstrap = Bootstrap {
        config_map: "lighthouse-config".to_string(),
        namespace: Some("jx".to_string()),
        ..Default::default()
    };
    let repos = vec![SourceRepository::repository("env", "acme", "environment-dev", None)];
    let environment = Environment::dev(Some(BOOT_URL), None);

    let leaves = generate_with(&repos, &[], &[], Some(&environment), &bootstrap).unwrap();
    let maps = leaves[0].fragment.config_updater.clone().unwrap().map.unwrap();
    assert_eq!(maps["config/config.yaml"].name, "lighthouse-config");
    assert_eq!(maps["config/config.yaml"].namespace.as_deref(), Some("jx"));
}

#[test]
fn test_precedence_team_group_repository() {
    let schedulers = vec![
        Scheduler::scheduler(
            "default",
            Fragment {
                presubmits: Some(JobSet::new(vec![Job::named("lint")])),
                ..agent("jenkins")
            },
        ),
        Scheduler::scheduler("frontend", plugins(&["size"], false)),
        Scheduler::scheduler("app", agent("tekton")),
    ];
    let groups = vec![SourceRepositoryGroup::group(
        "frontend",
        &["acme-app"],
        Some("frontend"),
    )];
    let repos = vec![
        SourceRepository::repository("acme-app", "acme", "app", Some("app")),
        SourceRepository::repository("acme-lib", "acme", "lib", None),
    ];
    let environment = Environment::dev(None, Some("default"));

    let leaves = generate(&repos, &groups, &schedulers, Some(&environment)).unwrap();
    assert_eq!(leaves.len(), 2);

    let app = &leaves[0];
    assert_eq!(app.key(), "acme/app");
    assert_eq!(
        app.fragment.scheduler_agent.as_ref().unwrap().agent.as_deref(),
        Some("tekton")
    );
    assert_eq!(plugin_names(&app.fragment), vec!["size"]);
    assert_eq!(app.fragment.presubmits.as_ref().unwrap().names(), vec!["lint"]);

    let lib = &leaves[1];
    assert_eq!(lib.key(), "acme/lib");
    assert_eq!(
        lib.fragment.scheduler_agent.as_ref().unwrap().agent.as_deref(),
        Some("jenkins")
    );
    assert!(lib.fragment.plugins.is_none());
}

#[test]
fn test_missing_references_skip_levels() {
    let schedulers = vec![Scheduler::scheduler("app", agent("tekton"))];
    let groups = vec![SourceRepositoryGroup::group("g", &["acme-app"], Some("ghost-group"))];
    let repos = vec![
        SourceRepository::repository("acme-app", "acme", "app", Some("app")),
        SourceRepository::repository("acme-idle", "acme", "idle", Some("ghost")),
    ];
    let environment = Environment::dev(None, Some("ghost-default"));

    let leaves = generate(&repos, &groups, &schedulers, Some(&environment)).unwrap();
    assert_eq!(leaves.len(), 1, "repository with no applicable scheduler yields no leaf");
    assert_eq!(leaves[0].key(), "acme/app");
}

#[test]
fn test_collision_aborts_whole_generate() {
    let schedulers = vec![
        Scheduler::scheduler(
            "default",
            Fragment {
                presubmits: Some(JobSet::new(vec![Job::named("build")])),
                ..Default::default()
            },
        ),
        Scheduler::scheduler(
            "dup",
            Fragment {
                presubmits: Some(JobSet::new(vec![Job::named("build"), Job::named("build")])),
                ..Default::default()
            },
        ),
    ];
    let repos = vec![
        SourceRepository::repository("fine", "acme", "fine", None),
        SourceRepository::repository("broken", "acme", "broken", Some("dup")),
    ];
    let environment = Environment::dev(None, Some("default"));

    let err = generate(&repos, &[], &schedulers, Some(&environment)).unwrap_err();
    match err {
        ResolveError::Merge { repository, .. } => assert_eq!(repository, "acme/broken"),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_groups_defining_different_jobs_of_one_name_collide() {
    let build_job = |context: &str| Fragment {
        presubmits: Some(JobSet::new(vec![Job::named("build").with_context(context)])),
        ..Default::default()
    };
    let schedulers = vec![
        Scheduler::scheduler("ga", build_job("a")),
        Scheduler::scheduler("gb", build_job("b")),
    ];
    let groups = vec![
        SourceRepositoryGroup::group("a", &["acme-app"], Some("ga")),
        SourceRepositoryGroup::group("b", &["acme-app"], Some("gb")),
    ];
    let repos = vec![SourceRepository::repository("acme-app", "acme", "app", None)];

    let err = generate(&repos, &groups, &schedulers, None).unwrap_err();
    match err {
        ResolveError::Merge { repository, source } => {
            assert_eq!(repository, "acme/app");
            assert!(source.to_string().contains("'build'"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_groups_sharing_an_identical_job_resolve() {
    let shared = Fragment {
        presubmits: Some(JobSet::new(vec![Job::named("build").with_context("ci")])),
        ..Default::default()
    };
    let schedulers = vec![
        Scheduler::scheduler("ga", shared.clone()),
        Scheduler::scheduler("gb", shared),
    ];
    let groups = vec![
        SourceRepositoryGroup::group("a", &["acme-app"], Some("ga")),
        SourceRepositoryGroup::group("b", &["acme-app"], Some("gb")),
    ];
    let repos = vec![SourceRepository::repository("acme-app", "acme", "app", None)];

    let leaves = generate(&repos, &groups, &schedulers, None).unwrap();
    assert_eq!(leaves[0].fragment.presubmits.as_ref().unwrap().names(), vec!["build"]);
}

#[test]
fn test_first_listed_group_is_closest_to_repository() {
    let schedulers = vec![
        Scheduler::scheduler("first", agent("first")),
        Scheduler::scheduler("second", agent("second")),
        Scheduler::scheduler("team", agent("team")),
    ];
    let groups = vec![
        SourceRepositoryGroup::group("a", &["acme-app"], Some("first")),
        SourceRepositoryGroup::group("b", &["acme-app"], Some("second")),
    ];
    let repos = vec![SourceRepository::repository("acme-app", "acme", "app", None)];
    let environment = Environment::dev(None, Some("team"));

    let leaves = generate(&repos, &groups, &schedulers, Some(&environment)).unwrap();
    assert_eq!(
        leaves[0].fragment.scheduler_agent.as_ref().unwrap().agent.as_deref(),
        Some("first")
    );
}
