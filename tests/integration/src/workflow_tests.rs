//! Workflow tests: pull, materialize, commit, prune, branch
//!
//! Each test copies the demo project from `test-fixtures/projects/demo` into a
//! fresh git repository and drives it through the public API the way a sync
//! command would.

use assert_fs::TempDir;
use assert_fs::prelude::*;
use predicates::prelude::*;
use serde_json::Value;
use snproject_core::{Project, ProjectConfig, Record, VersionControl};
use snproject_git::{GitDeleteHook, GitRepository};
use snproject_test_utils::git::real_git_repo_with_commit;
use std::path::{Path, PathBuf};

const EXPECTED_FILES: &[&str] = &[
    "sn/Demo App/Business Rule/incident/Set Priority.js",
    "sn/Demo App/Script Include/StringUtil.js",
    "sn/Demo App/Test Suite/Smoke.json",
    "sn/Demo App/Test/Login works.json",
    "sn/Demo App/UI Page/home/client_script.client.js",
    "sn/Demo App/UI Page/home/html.html",
    "sn/Demo App/UI Script/Desktop/helpers.js",
];

// =============================================================================
// Test Infrastructure
// =============================================================================

fn fixture_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../../test-fixtures/projects/demo")
}

struct Workspace {
    temp: TempDir,
    repo: GitRepository,
    project: Project,
}

impl Workspace {
    fn new() -> Self {
        let temp = TempDir::new().unwrap();
        temp.copy_from(fixture_dir(), &["*"]).unwrap();
        let repo = GitRepository::from_repository(real_git_repo_with_commit(temp.path())).unwrap();
        let config = ProjectConfig::load(&temp.path().join("project.toml")).unwrap();
        let project = Project::open(config).unwrap();
        project.setup().unwrap();
        Self {
            temp,
            repo,
            project,
        }
    }

    fn records(&self) -> Vec<Record> {
        let raw = std::fs::read_to_string(self.temp.path().join("records.json")).unwrap();
        let payloads: Vec<Value> = serde_json::from_str(&raw).unwrap();
        payloads
            .iter()
            .map(|p| Record::from_json(p).unwrap())
            .collect()
    }

    fn files(&self) -> Vec<String> {
        let mut files = Vec::new();
        collect(&self.temp.path().join("sn"), self.temp.path(), &mut files);
        files.sort();
        files
    }
}

fn collect(dir: &Path, root: &Path, out: &mut Vec<String>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect(&path, root, out);
        } else {
            out.push(
                path.strip_prefix(root)
                    .unwrap()
                    .to_string_lossy()
                    .replace('\\', "/"),
            );
        }
    }
}

// =============================================================================
// Scenarios
// =============================================================================

#[test]
fn pull_materializes_demo_project() {
    let mut ws = Workspace::new();
    let records = ws.records();

    let report = ws.project.save_all(&records);

    assert!(report.success, "errors: {:?}", report.errors);
    assert_eq!(report.actions.len(), EXPECTED_FILES.len());
    assert_eq!(ws.files(), EXPECTED_FILES);

    ws.temp
        .child("sn/Demo App/Script Include/StringUtil.js")
        .assert(predicate::str::contains(" * Created By  : admin"))
        .assert(predicate::str::ends_with(" */\nvar StringUtil = Class.create();\n"));
    ws.temp
        .child("sn/Demo App/UI Page/home/html.html")
        .assert(predicate::str::starts_with("<!--\n"));
    ws.temp
        .child("sn/Demo App/Business Rule/incident/Old Rule.js")
        .assert(predicate::path::missing());
    ws.temp
        .child("config/snproject.db")
        .assert(predicate::path::is_file());
}

#[test]
fn second_pull_changes_nothing() {
    let mut ws = Workspace::new();
    let records = ws.records();
    ws.project.save_all(&records);
    ws.repo.add(&[Path::new("sn")]).unwrap();
    ws.repo.commit("Initial pull").unwrap();

    let again = ws.project.save_all(&records);

    assert!(again.success);
    assert!(again.actions.is_empty(), "actions: {:?}", again.actions);
    assert!(matches!(
        ws.repo.commit("Nothing"),
        Err(snproject_core::Error::VersionControl { .. })
    ));
}

#[test]
fn records_gone_upstream_are_deleted_and_staged() {
    let mut ws = Workspace::new();
    let records = ws.records();
    ws.project.save_all(&records);
    ws.repo.add(&[Path::new("sn")]).unwrap();
    ws.repo.commit("Initial pull").unwrap();

    let surviving: Vec<&str> = records
        .iter()
        .map(|r| r.sys_id())
        .filter(|id| *id != "si1")
        .collect();
    let mut hook = GitDeleteHook::new(&ws.repo);
    let removed = ws.project.remove_missing(&surviving, &mut hook).unwrap();

    assert_eq!(removed.len(), 1);
    ws.temp
        .child("sn/Demo App/Script Include")
        .assert(predicate::path::missing());
    assert!(ws.project.get_file_by_id("si1").is_none());
    ws.repo.commit("Remove StringUtil").unwrap();
}

#[test]
fn request_arguments_cover_patterns_and_filters() {
    let ws = Workspace::new();

    let ui_script = ws.project.request_arguments("sys_ui_script");
    assert!(ui_script.display_value);
    assert!(ui_script.field_names.iter().any(|f| f.name == "ui_type"));

    let rule = ws.project.request_arguments("sys_script");
    assert_eq!(rule.query_field_names, vec!["active".to_string()]);
    assert!(rule.field_names.iter().any(|f| f.name == "collection"));
}

#[test]
fn feature_branch_keeps_its_own_associations() {
    let mut ws = Workspace::new();
    let records = ws.records();
    ws.project.save_all(&records);

    ws.project.clone_branch("master", "feature").unwrap();
    ws.project.switch_branch("feature");
    assert_eq!(ws.project.get_tests().len(), 1);
    assert_eq!(ws.project.get_test_suites().len(), 1);

    // Removing in the feature branch leaves master's metadata alone
    ws.project
        .remove(&["t1"], &mut snproject_core::FsDelete)
        .unwrap();
    assert!(ws.project.get_tests().is_empty());

    ws.project.switch_branch("master");
    assert_eq!(ws.project.get_tests().len(), 1);
}
