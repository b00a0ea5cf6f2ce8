//! Compile / Decompile Round Trip
//!
//! Decompiling compiled documents and compiling the result again reproduces
//! the documents when the input has no hierarchy to lose.

use gitops_scheduler::schema::{
    ApprovePolicy, ContextPolicy, Environment, Fragment, Job, JobSet, MergePolicy,
    ReplaceableList, Scheduler, WelcomeMessage,
};
use gitops_scheduler::{compile, decompile, generate, Leaf, DEFAULT_SCHEDULER};

fn leaves() -> Vec<Leaf> {
    let shared = Fragment {
        periodics: Some(JobSet::new(vec![Job::named("nightly").with_cron("0 3 * * *")])),
        merger: Some(MergePolicy {
            sync_period: Some("1m".to_string()),
            ..Default::default()
        }),
        ..Default::default()
    };

    let app = Fragment {
        presubmits: Some(JobSet::new(vec![Job::named("lint"), Job::named("unit")])),
        plugins: Some(ReplaceableList::new(vec!["approve".to_string(), "lgtm".to_string()])),
        approve: Some(ApprovePolicy {
            require_self_approval: Some(false),
            ..Default::default()
        }),
        merger: Some(MergePolicy {
            merge_method: Some("squash".to_string()),
            sync_period: Some("1m".to_string()),
            ..Default::default()
        }),
        welcome: Some(ReplaceableList::new(vec![WelcomeMessage {
            message_template: "Welcome!".to_string(),
        }])),
        ..shared.clone()
    };

    let lib = Fragment {
        postsubmits: Some(JobSet::new(vec![Job::named("release")])),
        ..shared
    };

    vec![Leaf::new("acme", "app", app), Leaf::new("acme", "lib", lib)]
}

#[test]
fn test_round_trip_reproduces_documents() {
    let (jobs, plugins) = compile(&leaves()).unwrap();
    let decompiled = decompile(&jobs, &plugins).unwrap();

    let schedulers: Vec<Scheduler> = decompiled.scheduler_resources();
    let environment = Environment::dev(None, Some(&decompiled.default_scheduler));
    let regenerated = generate(&decompiled.repositories, &[], &schedulers, Some(&environment)).unwrap();
    let (jobs_again, plugins_again) = compile(&regenerated).unwrap();

    assert_eq!(jobs_again, jobs);
    assert_eq!(plugins_again, plugins);
}

#[test]
fn test_round_trip_keeps_merge_only_repositories() {
    let queue = Fragment {
        merger: Some(MergePolicy {
            merge_method: Some("squash".to_string()),
            ..Default::default()
        }),
        ..Default::default()
    };
    let contexts = Fragment {
        merger: Some(MergePolicy {
            context_policy: Some(ContextPolicy {
                required_contexts: Some(ReplaceableList::new(vec!["ci/build".to_string()])),
                ..Default::default()
            }),
            ..Default::default()
        }),
        ..Default::default()
    };
    let mut input = leaves();
    input.push(Leaf::new("acme", "contexts", contexts));
    input.push(Leaf::new("acme", "queue", queue));

    let (jobs, plugins) = compile(&input).unwrap();
    let decompiled = decompile(&jobs, &plugins).unwrap();
    let keys: Vec<String> = decompiled.repositories.iter().map(|r| r.key()).collect();
    assert_eq!(keys, vec!["acme/app", "acme/contexts", "acme/lib", "acme/queue"]);

    let schedulers = decompiled.scheduler_resources();
    let environment = Environment::dev(None, Some(&decompiled.default_scheduler));
    let regenerated = generate(&decompiled.repositories, &[], &schedulers, Some(&environment)).unwrap();
    let (jobs_again, plugins_again) = compile(&regenerated).unwrap();

    assert_eq!(jobs_again, jobs);
    assert_eq!(plugins_again, plugins);
}

#[test]
fn test_decompiled_default_holds_globals() {
    let (jobs, plugins) = compile(&leaves()).unwrap();
    let decompiled = decompile(&jobs, &plugins).unwrap();

    assert_eq!(decompiled.default_scheduler, DEFAULT_SCHEDULER);
    let default = &decompiled.schedulers[DEFAULT_SCHEDULER];
    assert_eq!(default.periodics.as_ref().unwrap().names(), vec!["nightly"]);
    assert_eq!(
        default.merger.as_ref().unwrap().sync_period.as_deref(),
        Some("1m")
    );

    let app = &decompiled.schedulers["acme-app"];
    assert!(app.periodics.is_none());
    assert_eq!(
        app.merger.as_ref().unwrap().merge_method.as_deref(),
        Some("squash")
    );
    assert!(app.merger.as_ref().unwrap().sync_period.is_none());
}

#[test]
fn test_round_trip_is_lossy_for_replace_flags() {
    let leaf = Leaf::new(
        "acme",
        "app",
        Fragment {
            plugins: Some(ReplaceableList::replacing(vec!["x".to_string()])),
            ..Default::default()
        },
    );
    let (jobs, plugins) = compile(&[leaf]).unwrap();
    let decompiled = decompile(&jobs, &plugins).unwrap();

    let plugins = decompiled.schedulers["acme-app"].plugins.as_ref().unwrap();
    assert_eq!(plugins.items, vec!["x"]);
    assert!(!plugins.replace);
}

#[test]
fn test_documents_survive_yaml() {
    let (jobs, plugins) = compile(&leaves()).unwrap();

    let jobs_yaml = jobs.to_yaml().unwrap();
    let plugins_yaml = plugins.to_yaml().unwrap();
    assert!(jobs_yaml.contains("merge_method"));
    assert!(plugins_yaml.contains("message_template"));

    let reparsed = gitops_scheduler::schema::JobDoc::from_yaml(&jobs_yaml).unwrap();
    assert_eq!(reparsed, jobs);
    let reparsed = gitops_scheduler::schema::PluginDoc::from_yaml(&plugins_yaml).unwrap();
    assert_eq!(reparsed, plugins);
}
