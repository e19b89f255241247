use std::fs;
use std::path::Path;

use sitepipe::glob::GlobList;
use tempfile::TempDir;

fn patterns(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

fn write(root: &Path, rel: &str, contents: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

fn file_names(paths: &[std::path::PathBuf]) -> Vec<String> {
    paths
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect()
}

#[test]
fn negation_excludes_partials() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "src/a.scss", "a {}");
    write(dir.path(), "src/b.scss", "b {}");
    write(dir.path(), "src/_partials.scss", "p {}");

    let globs = GlobList::parse(&patterns(&["src/*.scss", "!src/_partials.scss"])).unwrap();
    let resolved = globs.resolve(dir.path()).unwrap();

    assert_eq!(file_names(&resolved), vec!["a.scss", "b.scss"]);
    assert!(resolved.iter().all(|p| p.is_absolute()));
}

#[test]
fn resolution_order_is_stable_across_calls() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "src/z.scss", "");
    write(dir.path(), "src/a.scss", "");
    write(dir.path(), "src/m.scss", "");

    let globs = GlobList::parse(&patterns(&["src/*.scss"])).unwrap();
    let first = globs.resolve(dir.path()).unwrap();
    let second = globs.resolve(dir.path()).unwrap();

    assert_eq!(first, second);
    assert_eq!(file_names(&first), vec!["a.scss", "m.scss", "z.scss"]);
}

#[test]
fn overlapping_includes_are_deduplicated() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "src/a.scss", "");

    let globs = GlobList::parse(&patterns(&["src/*.scss", "src/a.scss"])).unwrap();
    let resolved = globs.resolve(dir.path()).unwrap();

    assert_eq!(file_names(&resolved), vec!["a.scss"]);
}

#[test]
fn empty_match_set_is_valid() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "src/a.txt", "");

    let globs = GlobList::parse(&patterns(&["src/*.scss"])).unwrap();
    let resolved = globs.resolve(dir.path()).unwrap();

    assert!(resolved.is_empty());
}

#[test]
fn directories_never_match() {
    let dir = TempDir::new().unwrap();
    fs::create_dir_all(dir.path().join("src/widget.scss")).unwrap();
    write(dir.path(), "src/real.scss", "");

    let globs = GlobList::parse(&patterns(&["src/*.scss"])).unwrap();
    let resolved = globs.resolve(dir.path()).unwrap();

    assert_eq!(file_names(&resolved), vec!["real.scss"]);
}

#[test]
fn malformed_pattern_fails_to_compile() {
    assert!(GlobList::parse(&patterns(&["src/[scss"])).is_err());
}

#[test]
fn exclude_only_list_matches_nothing() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "src/a.scss", "");

    let globs = GlobList::parse(&patterns(&["!src/_*.scss"])).unwrap();
    assert!(globs.is_empty());
    assert!(globs.resolve(dir.path()).unwrap().is_empty());
}

#[test]
fn recursive_glob_spans_subdirectories() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "src/scss/site.scss", "");
    write(dir.path(), "src/scss/components/button.scss", "");
    write(dir.path(), "src/js/app.js", "");

    let globs = GlobList::parse(&patterns(&["src/scss/**/*.scss"])).unwrap();
    let resolved = globs.resolve(dir.path()).unwrap();

    assert_eq!(resolved.len(), 2);
}
