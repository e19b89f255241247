use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use sitepipe::dag::{TaskDef, TaskGraph};
use sitepipe::engine::{RuntimeEvent, TriggerReason};
use sitepipe::errors::ConfigError;
use sitepipe::watch::{build_watch_profiles, spawn_debouncer, spawn_watcher};
use tempfile::TempDir;
use tokio::sync::mpsc;
use tokio::time::timeout;

fn def(name: &str, watch: &[&str]) -> TaskDef {
    TaskDef {
        name: name.to_string(),
        after: vec![],
        watch: watch.iter().map(|s| s.to_string()).collect(),
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
fn profiles_are_built_only_for_watching_tasks() {
    let g = graph(&[
        def("styles", &["src/scss/**/*.scss"]),
        def("images", &[]),
        def("templates", &["src/html/**/*.html", "!src/html/_*.html"]),
    ]);

    let profiles = build_watch_profiles(&g).unwrap();
    let names: Vec<&str> = profiles.iter().map(|p| p.name()).collect();
    assert_eq!(names, vec!["styles", "templates"]);
}

#[test]
fn profile_matching_honours_excludes() {
    let g = graph(&[def(
        "templates",
        &["src/html/**/*.html", "!src/html/_*.html"],
    )]);
    let profiles = build_watch_profiles(&g).unwrap();
    let profile = &profiles[0];

    assert!(profile.matches("src/html/index.html"));
    assert!(profile.matches("src/html/blog/post.html"));
    assert!(!profile.matches("src/html/_layout.html"));
    assert!(!profile.matches("src/scss/site.scss"));
}

#[test]
fn malformed_watch_pattern_fails_profile_compilation() {
    let g = graph(&[def("styles", &["src/[scss"])]);
    match build_watch_profiles(&g) {
        Err(ConfigError::BadGlob { task, .. }) => assert_eq!(task, "styles"),
        other => panic!("expected bad glob error, got {other:?}"),
    }
}

#[tokio::test]
async fn debouncer_coalesces_a_burst_into_one_batch() {
    let (raw_tx, raw_rx) = mpsc::unbounded_channel::<PathBuf>();
    let (batch_tx, mut batch_rx) = mpsc::channel::<Vec<PathBuf>>(4);
    spawn_debouncer(Duration::from_millis(50), raw_rx, batch_tx);

    raw_tx.send(PathBuf::from("/p/a.scss")).unwrap();
    raw_tx.send(PathBuf::from("/p/b.scss")).unwrap();
    raw_tx.send(PathBuf::from("/p/a.scss")).unwrap();

    let batch = timeout(Duration::from_secs(2), batch_rx.recv())
        .await
        .expect("batch within timeout")
        .expect("channel open");

    assert_eq!(
        batch,
        vec![PathBuf::from("/p/a.scss"), PathBuf::from("/p/b.scss")]
    );
}

#[tokio::test]
async fn debouncer_separates_bursts_by_quiet_gaps() {
    let (raw_tx, raw_rx) = mpsc::unbounded_channel::<PathBuf>();
    let (batch_tx, mut batch_rx) = mpsc::channel::<Vec<PathBuf>>(4);
    spawn_debouncer(Duration::from_millis(30), raw_rx, batch_tx);

    raw_tx.send(PathBuf::from("/p/a.scss")).unwrap();
    let first = timeout(Duration::from_secs(2), batch_rx.recv())
        .await
        .expect("first batch")
        .expect("channel open");
    assert_eq!(first, vec![PathBuf::from("/p/a.scss")]);

    raw_tx.send(PathBuf::from("/p/b.scss")).unwrap();
    let second = timeout(Duration::from_secs(2), batch_rx.recv())
        .await
        .expect("second batch")
        .expect("channel open");
    assert_eq!(second, vec![PathBuf::from("/p/b.scss")]);
}

fn write(root: &Path, rel: &str, contents: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

#[tokio::test]
async fn file_change_triggers_the_matching_task() {
    let dir = TempDir::new().unwrap();
    fs::create_dir_all(dir.path().join("src/scss")).unwrap();
    fs::create_dir_all(dir.path().join("notes")).unwrap();

    let g = graph(&[
        def("styles", &["src/scss/**/*.scss"]),
        def("images", &["src/img/**"]),
    ]);
    let profiles = build_watch_profiles(&g).unwrap();

    let (rt_tx, mut rt_rx) = mpsc::channel::<RuntimeEvent>(16);
    let handle = spawn_watcher(
        dir.path().to_path_buf(),
        profiles,
        Duration::from_millis(50),
        rt_tx,
    )
    .unwrap();

    // Give the watcher a moment to arm before producing events.
    tokio::time::sleep(Duration::from_millis(200)).await;
    write(dir.path(), "src/scss/site.scss", "body {}");
    write(dir.path(), "notes/todo.txt", "unwatched");

    let event = timeout(Duration::from_secs(10), rt_rx.recv())
        .await
        .expect("trigger within timeout")
        .expect("channel open");

    match event {
        RuntimeEvent::TasksTriggered { tasks, reason } => {
            assert_eq!(tasks, vec!["styles"]);
            assert_eq!(reason, TriggerReason::FileWatch);
        }
        other => panic!("expected trigger batch, got {other:?}"),
    }

    handle.unsubscribe_all();
}
