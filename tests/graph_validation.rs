use std::collections::BTreeMap;

use sitepipe::config::{validate_config, ConfigFile, TaskConfig};
use sitepipe::dag::{TaskDef, TaskGraph};
use sitepipe::errors::ConfigError;
use sitepipe::step::TransformRegistry;

fn def(name: &str, after: &[&str]) -> TaskDef {
    TaskDef {
        name: name.to_string(),
        after: after.iter().map(|s| s.to_string()).collect(),
        watch: vec![],
        steps: vec![],
    }
}

fn graph(defs: &[TaskDef]) -> TaskGraph {
    let mut graph = TaskGraph::new();
    for d in defs {
        graph.register(d.clone()).expect("register");
    }
    graph
}

#[test]
fn acyclic_graph_validates() {
    let g = graph(&[def("a", &[]), def("b", &["a"]), def("c", &["a", "b"])]);
    assert!(g.validate().is_ok());
}

#[test]
fn cycle_is_reported_with_every_member() {
    let g = graph(&[
        def("a", &["c"]),
        def("b", &["a"]),
        def("c", &["b"]),
        def("d", &[]),
    ]);

    match g.validate() {
        Err(ConfigError::Cycle { cycle }) => {
            assert_eq!(cycle, vec!["a", "b", "c"]);
        }
        other => panic!("expected cycle error, got {other:?}"),
    }
}

#[test]
fn self_dependency_is_a_cycle() {
    let g = graph(&[def("a", &["a"])]);
    match g.validate() {
        Err(ConfigError::Cycle { cycle }) => assert_eq!(cycle, vec!["a"]),
        other => panic!("expected cycle error, got {other:?}"),
    }
}

#[test]
fn unknown_dependency_is_rejected() {
    let g = graph(&[def("a", &["ghost"])]);
    match g.validate() {
        Err(ConfigError::UnknownDependency { task, missing }) => {
            assert_eq!(task, "a");
            assert_eq!(missing, "ghost");
        }
        other => panic!("expected unknown dependency error, got {other:?}"),
    }
}

#[test]
fn reregistering_identical_definition_is_a_noop() {
    let mut g = TaskGraph::new();
    g.register(def("a", &[])).unwrap();
    g.register(def("a", &[])).unwrap();
    assert_eq!(g.len(), 1);
}

#[test]
fn reregistering_different_definition_fails() {
    let mut g = TaskGraph::new();
    g.register(def("a", &[])).unwrap();
    match g.register(def("a", &["b"])) {
        Err(ConfigError::DuplicateTask { task }) => assert_eq!(task, "a"),
        other => panic!("expected duplicate task error, got {other:?}"),
    }
}

#[test]
fn registration_order_is_preserved() {
    let g = graph(&[def("zeta", &[]), def("mid", &[]), def("alpha", &[])]);
    let order: Vec<&str> = g.tasks().collect();
    assert_eq!(order, vec!["zeta", "mid", "alpha"]);
}

fn parse_config(toml_src: &str) -> ConfigFile {
    toml::from_str(toml_src).expect("parse config")
}

#[test]
fn parses_full_toml_config_with_defaults() {
    let cfg = parse_config(
        r#"
        [entry]
        build = ["styles"]

        [task.styles]
        watch = ["src/scss/**/*.scss"]

        [[task.styles.steps]]
        transform = "exec"
        inputs = ["src/scss/*.scss", "!src/scss/_*.scss"]
        dest = "build/css"
        options = { command = "scssc {inputs} -o {dest}" }
        "#,
    );

    assert_eq!(cfg.watch.debounce_ms, 150);
    assert_eq!(cfg.project.dist, std::path::PathBuf::from("build"));
    let styles = &cfg.task["styles"];
    assert_eq!(styles.steps.len(), 1);
    assert_eq!(styles.steps[0].transform, "exec");
    assert_eq!(styles.steps[0].options["command"], "scssc {inputs} -o {dest}");

    let registry = TransformRegistry::builtin();
    assert!(validate_config(&cfg, &registry).is_ok());
}

#[test]
fn config_without_tasks_is_invalid() {
    let cfg = parse_config("");
    let registry = TransformRegistry::builtin();
    assert!(matches!(
        validate_config(&cfg, &registry),
        Err(ConfigError::Invalid(_))
    ));
}

#[test]
fn unknown_transform_is_rejected_before_any_run() {
    let cfg = parse_config(
        r#"
        [task.styles]
        [[task.styles.steps]]
        transform = "minify"
        dest = "build/css"
        "#,
    );
    let registry = TransformRegistry::builtin();
    match validate_config(&cfg, &registry) {
        Err(ConfigError::UnknownTransform {
            task,
            step_index,
            transform,
        }) => {
            assert_eq!(task, "styles");
            assert_eq!(step_index, 0);
            assert_eq!(transform, "minify");
        }
        other => panic!("expected unknown transform error, got {other:?}"),
    }
}

#[test]
fn malformed_glob_is_rejected_before_any_run() {
    let cfg = parse_config(
        r#"
        [task.styles]
        watch = ["src/[scss"]
        "#,
    );
    let registry = TransformRegistry::builtin();
    match validate_config(&cfg, &registry) {
        Err(ConfigError::BadGlob { task, .. }) => assert_eq!(task, "styles"),
        other => panic!("expected bad glob error, got {other:?}"),
    }
}

#[test]
fn entry_referencing_unknown_task_is_invalid() {
    let cfg = parse_config(
        r#"
        [entry]
        build = ["ghost"]

        [task.styles]
        "#,
    );
    let registry = TransformRegistry::builtin();
    assert!(matches!(
        validate_config(&cfg, &registry),
        Err(ConfigError::Invalid(_))
    ));
}

#[test]
fn deploy_entry_requires_deploy_section() {
    let cfg = parse_config(
        r#"
        [entry]
        deploy = "upload"

        [task.upload]
        "#,
    );
    let registry = TransformRegistry::builtin();
    assert!(matches!(
        validate_config(&cfg, &registry),
        Err(ConfigError::Invalid(_))
    ));
}

#[test]
fn validation_uses_config_task_map() {
    // Same graph expressed through TaskConfig deserialization plumbing.
    let mut tasks = BTreeMap::new();
    tasks.insert(
        "b".to_string(),
        TaskConfig {
            after: vec!["a".to_string()],
            watch: vec![],
            steps: vec![],
        },
    );
    tasks.insert(
        "a".to_string(),
        TaskConfig {
            after: vec!["b".to_string()],
            watch: vec![],
            steps: vec![],
        },
    );

    let mut cfg = parse_config("[task.placeholder]");
    cfg.task = tasks;

    let registry = TransformRegistry::builtin();
    assert!(matches!(
        validate_config(&cfg, &registry),
        Err(ConfigError::Cycle { .. })
    ));
}
