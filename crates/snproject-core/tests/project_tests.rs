//! End-to-end tests for Project save/remove against a real directory

use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use snproject_core::{
    Error, FsDelete, Project, ProjectConfig, Record, RecordMeta, RecordStore,
};
use snproject_fs::NormalizedPath;
use snproject_test_utils::project::TestProject;
use snproject_test_utils::records::{record, script_include};
use std::path::{Path, PathBuf};

fn open_project(test: &TestProject, rules: Value) -> Project {
    open_with(test, rules, |config| config)
}

fn open_with(
    test: &TestProject,
    rules: Value,
    adjust: impl FnOnce(ProjectConfig) -> ProjectConfig,
) -> Project {
    let entities = test.write_entities(&rules);
    let config = adjust(ProjectConfig::new(test.root()).with_entities_file(entities));
    let project = Project::open(config).unwrap();
    project.setup().unwrap();
    project
}

fn load(payload: &Value) -> Record {
    Record::from_json(payload).unwrap().with_meta(RecordMeta {
        app_name: "Demo".into(),
        ..Default::default()
    })
}

fn script_rules() -> Value {
    json!({
        "sys_script_include": {
            "name": "Script Include",
            "key": "name",
            "fields": {"script": ".js"}
        }
    })
}

#[test]
fn script_include_lands_under_display_name() {
    let test = TestProject::new();
    let mut project = open_project(
        &test,
        json!({
            "script_include": {
                "name": "script_include_display",
                "key": "<name>",
                "fields": {"script": ".js"}
            }
        }),
    );
    let payload = record("script_include", "abc", &[("name", "x"), ("script", "var a=1;")]);

    let report = project.save(&load(&payload)).unwrap();

    assert_eq!(report.files.len(), 1);
    let file = &report.files[0];
    assert!(file.modified);
    assert_eq!(file.sys_id, "abc");
    assert!(file.path.ends_with("script_include_display/x.js"));

    assert_eq!(
        test.files_under("sn"),
        vec!["sn/Demo/script_include_display/x.js"]
    );
    let body = test.read("sn/Demo/script_include_display/x.js");
    assert!(body.starts_with("/*\n * Application : Demo\n * ClassName   : script_include\n"));
    assert!(body.ends_with(" */\nvar a=1;\n"));
}

#[test]
fn saving_unchanged_record_twice_writes_nothing() {
    let test = TestProject::new();
    let mut project = open_project(&test, script_rules());
    let record = load(&script_include("1", "Util", "var Util = {};"));

    let first = project.save(&record).unwrap();
    let before = test.files_under("sn");
    let second = project.save(&record).unwrap();

    assert!(first.files.iter().all(|f| f.modified));
    assert!(second.files.iter().all(|f| !f.modified));
    assert_eq!(
        first.files.iter().map(|f| &f.path).collect::<Vec<_>>(),
        second.files.iter().map(|f| &f.path).collect::<Vec<_>>()
    );
    assert_eq!(test.files_under("sn"), before);
}

#[test]
fn identical_names_get_suffixes_in_call_order() {
    let test = TestProject::new();
    let mut project = open_project(&test, script_rules());

    for sys_id in ["a", "b", "c"] {
        project
            .save(&load(&script_include(sys_id, "Util", sys_id)))
            .unwrap();
    }

    assert_eq!(
        test.files_under("sn"),
        vec![
            "sn/Demo/Script Include/Util.js",
            "sn/Demo/Script Include/Util_1.js",
            "sn/Demo/Script Include/Util_2.js",
        ]
    );
    test.assert_file_contains("sn/Demo/Script Include/Util_1.js", "\nb\n");

    // Resaving keeps every record on its own path
    let again = project.save(&load(&script_include("b", "Util", "b"))).unwrap();
    assert!(again.files[0].path.ends_with("Util_1.js"));
    assert!(!again.files[0].modified);
}

#[test]
fn renamed_key_moves_the_file() {
    let test = TestProject::new();
    let mut project = open_project(&test, script_rules());

    project
        .save(&load(&script_include("1", "OldName", "var x = 1;")))
        .unwrap();
    let report = project
        .save(&load(&script_include("1", "NewName", "var x = 1;")))
        .unwrap();

    assert!(report.files[0].modified);
    assert_eq!(
        test.files_under("sn"),
        vec!["sn/Demo/Script Include/NewName.js"]
    );
    test.assert_file_contains("sn/Demo/Script Include/NewName.js", "var x = 1;");

    let entry = project.get_file_by_id("1").unwrap();
    assert_eq!(
        entry.branch("master").unwrap().fields[0].path,
        "sn/Demo/Script Include/NewName.js"
    );
}

#[test]
fn inclusion_filter_decides_what_is_written() {
    let test = TestProject::new();
    let mut project = open_project(
        &test,
        json!({
            "sys_script": {
                "name": "Business Rule",
                "key": "name",
                "query": "active=true^name=foo^ORname=bar",
                "fields": {"script": ".js"}
            }
        }),
    );

    let inactive = record(
        "sys_script",
        "1",
        &[("active", "false"), ("name", "bar"), ("script", "a")],
    );
    let active = record(
        "sys_script",
        "2",
        &[("active", "true"), ("name", "bar"), ("script", "b")],
    );
    let no_flag = record("sys_script", "3", &[("name", "foo"), ("script", "c")]);

    assert!(project.save(&load(&inactive)).unwrap().files.is_empty());
    assert_eq!(project.save(&load(&active)).unwrap().files.len(), 1);
    assert_eq!(project.save(&load(&no_flag)).unwrap().files.len(), 1);

    assert_eq!(
        test.files_under("sn"),
        vec![
            "sn/Demo/Business Rule/bar.js",
            "sn/Demo/Business Rule/foo.js",
        ]
    );
}

#[test]
fn line_ending_drift_is_not_a_change() {
    let test = TestProject::new();
    let mut project = open_project(&test, script_rules());

    project
        .save(&load(&script_include("1", "Util", "a();\r\nb();\r\n")))
        .unwrap();
    let report = project
        .save(&load(&script_include("1", "Util", "a();\nb();")))
        .unwrap();

    assert!(!report.files[0].modified);
}

#[test]
fn json_changes_follow_update_timestamp() {
    let test = TestProject::new();
    let mut project = open_project(
        &test,
        json!({"sys_properties": {"name": "Property", "key": "name", "json": true}}),
    );
    let at = |timestamp: &str, value: &str| {
        load(&record(
            "sys_properties",
            "p1",
            &[
                ("name", "glide.demo"),
                ("value", value),
                ("sys_updated_on", timestamp),
            ],
        ))
    };

    assert!(project.save(&at("2024-01-01 00:00:00", "1")).unwrap().files[0].modified);
    assert!(!project.save(&at("2024-01-01 00:00:00", "1")).unwrap().files[0].modified);
    assert!(project.save(&at("2024-01-02 00:00:00", "1")).unwrap().files[0].modified);

    let written: Value =
        serde_json::from_str(&test.read("sn/Demo/Property/glide.demo.json")).unwrap();
    assert_eq!(written["value"], json!(1));
}

#[test]
fn unknown_classes_are_kept_as_json_when_enabled() {
    let test = TestProject::new();
    let mut project = open_with(&test, json!({}), |mut config| {
        config.include_unknown_entities = true;
        config
    });

    let report = project
        .save(&load(&record("u_thing", "t1", &[("u_label", "x")])))
        .unwrap();

    assert_eq!(report.files.len(), 1);
    test.assert_file_exists("sn/Demo/_/u_thing/t1.json");
}

#[test]
fn unknown_classes_are_skipped_by_default() {
    let test = TestProject::new();
    let mut project = open_project(&test, script_rules());

    let report = project
        .save(&load(&record("u_thing", "t1", &[("u_label", "x")])))
        .unwrap();

    assert!(report.files.is_empty());
    assert!(report.is_success());
    assert!(project.get_file_by_id("t1").is_none());
}

#[test]
fn emptied_field_removes_its_file() {
    let test = TestProject::new();
    let mut project = open_project(
        &test,
        json!({
            "sys_ui_page": {
                "name": "UI Page",
                "key": "name",
                "fields": {"html": ".html", "client_script": ".client.js"}
            }
        }),
    );

    project
        .save(&load(&record(
            "sys_ui_page",
            "p",
            &[("name", "home"), ("html", "<p/>"), ("client_script", "go();")],
        )))
        .unwrap();
    let report = project
        .save(&load(&record(
            "sys_ui_page",
            "p",
            &[("name", "home"), ("html", "<p/>"), ("client_script", "")],
        )))
        .unwrap();

    assert_eq!(report.removed.len(), 1);
    assert_eq!(
        test.files_under("sn"),
        vec!["sn/Demo/UI Page/home/html.html"]
    );
    let entry = project.get_file_by_id("p").unwrap();
    assert_eq!(entry.branch("master").unwrap().fields.len(), 1);
}

#[test]
fn remove_deletes_files_and_empty_directories() {
    let test = TestProject::new();
    let mut project = open_project(
        &test,
        json!({
            "sys_script_include": {
                "name": "Script Include",
                "key": "name",
                "subDirPattern": "<api_name>",
                "fields": {"script": ".js"}
            }
        }),
    );
    let mut payload = script_include("1", "Util", "x");
    payload["api_name"] = json!("lib");
    project.save(&load(&payload)).unwrap();
    project
        .save(&load(&script_include("2", "Other", "y")))
        .unwrap();

    let removed = project.remove(&["1"], &mut FsDelete).unwrap();

    assert_eq!(removed.len(), 1);
    assert!(removed[0].ends_with("lib/Util.js"));
    test.assert_file_not_exists("sn/Demo/Script Include/lib");
    test.assert_file_exists("sn/Demo/Script Include/{--none--}/Other.js");
    assert!(project.get_file_by_id("1").is_none());
    assert!(project.get_file_by_id("2").is_some());
}

#[test]
fn failed_delete_keeps_metadata() {
    let test = TestProject::new();
    let mut project = open_project(&test, script_rules());
    project.save(&load(&script_include("1", "Util", "x"))).unwrap();

    let mut refuse = |path: &Path| -> snproject_core::Result<bool> {
        Err(Error::DeleteFailed {
            path: path.to_path_buf(),
            message: "locked".into(),
        })
    };
    let removed = project.remove(&["1"], &mut refuse).unwrap();

    assert!(removed.is_empty());
    test.assert_file_exists("sn/Demo/Script Include/Util.js");
    assert!(project.get_file_by_id("1").is_some());
}

#[test]
fn remove_missing_prunes_records_gone_upstream() {
    let test = TestProject::new();
    let mut project = open_project(&test, script_rules());
    for (id, name) in [("1", "A"), ("2", "B"), ("3", "C")] {
        project.save(&load(&script_include(id, name, id))).unwrap();
    }

    let mut deleted: Vec<PathBuf> = Vec::new();
    let mut record_delete = |path: &Path| -> snproject_core::Result<bool> {
        deleted.push(path.to_path_buf());
        std::fs::remove_file(path)?;
        Ok(true)
    };
    let removed = project.remove_missing(&["2"], &mut record_delete).unwrap();

    assert_eq!(removed.len(), 2);
    assert_eq!(deleted.len(), 2);
    assert_eq!(
        test.files_under("sn"),
        vec!["sn/Demo/Script Include/B.js"]
    );
}

#[test]
fn branches_are_isolated() {
    let test = TestProject::new();
    let mut project = open_project(
        &test,
        json!({
            "sys_atf_test": {"name": "Test", "key": "name", "json": true},
            "sys_atf_test_suite": {"name": "Test Suite", "key": "name", "json": true}
        }),
    );
    project.switch_branch("a");
    project
        .save(&load(&record("sys_atf_test", "t1", &[("name", "login")])))
        .unwrap();

    project.switch_branch("b");
    assert!(project.get_tests().is_empty());
    assert!(project.get_file_by_id("t1").is_none());

    project.switch_branch("a");
    assert_eq!(project.get_tests().len(), 1);
    assert!(project.get_test_suites().is_empty());

    project.clone_branch("a", "b").unwrap();
    project.delete_branch("a").unwrap();
    assert!(project.get_tests().is_empty());
    test.assert_file_exists("sn/Demo/Test/login.json");

    project.switch_branch("b");
    assert_eq!(project.get_tests().len(), 1);
}

#[test]
fn index_survives_reopen() {
    let test = TestProject::new();
    let record = load(&script_include("1", "Util", "x"));
    {
        let mut project = open_project(&test, script_rules());
        project.save(&record).unwrap();
    }

    let mut project = open_project(&test, script_rules());
    let report = project.save(&record).unwrap();
    assert!(!report.files[0].modified);

    // Another record with the same name still sees the path as taken
    let other = project
        .save(&load(&script_include("2", "Util", "y")))
        .unwrap();
    assert!(other.files[0].path.ends_with("Util_1.js"));

    let store =
        RecordStore::open(&NormalizedPath::new(test.root().join("config/snproject.db"))).unwrap();
    assert_eq!(store.len(), 2);
}

#[test]
fn save_all_collects_actions() {
    let test = TestProject::new();
    let mut project = open_project(&test, script_rules());
    let records = vec![
        load(&script_include("1", "A", "a")),
        load(&script_include("2", "B", "b")),
    ];

    let report = project.save_all(&records);

    assert!(report.success);
    assert_eq!(report.actions.len(), 2);
    assert!(report.errors.is_empty());
}

#[test]
fn forgetting_a_record_frees_its_path() {
    let test = TestProject::new();
    let mut project = open_project(&test, script_rules());
    project.save(&load(&script_include("1", "Util", "x"))).unwrap();

    assert!(project.delete_file_by_id("1").unwrap());
    assert!(!project.delete_file_by_id("1").unwrap());

    let report = project
        .save(&load(&script_include("2", "Util", "y")))
        .unwrap();
    assert!(report.files[0].path.ends_with("Util.js"));
}

#[test]
fn upstream_edit_without_script_change_refreshes_header() {
    let test = TestProject::new();
    let mut project = open_project(&test, script_rules());
    let edited = |on: &str, by: &str| {
        load(&record(
            "sys_script_include",
            "1",
            &[
                ("name", "Util"),
                ("script", "var x = 1;"),
                ("sys_updated_on", on),
                ("sys_updated_by", by),
            ],
        ))
    };

    project.save(&edited("2024-01-01 10:00:00", "alice")).unwrap();
    let report = project.save(&edited("2025-06-06 12:00:00", "bob")).unwrap();

    assert!(report.files[0].modified);
    test.assert_file_contains("sn/Demo/Script Include/Util.js", " * Updated By  : bob");
    test.assert_file_contains(
        "sn/Demo/Script Include/Util.js",
        " * Updated On  : 2025-06-06 12:00:00",
    );
}

#[test]
fn field_and_document_of_one_record_never_share_a_path() {
    let test = TestProject::new();
    let mut project = open_project(
        &test,
        json!({
            "u_payload": {
                "name": "Payload",
                "key": "name",
                "json": true,
                "fields": {"payload": ".json"}
            }
        }),
    );
    let payload = load(&record(
        "u_payload",
        "1",
        &[("name", "x"), ("payload", "{\"a\": 1}")],
    ));

    let first = project.save(&payload).unwrap();

    assert_eq!(
        test.files_under("sn"),
        vec!["sn/Demo/Payload/x.json", "sn/Demo/Payload/x_1.json"]
    );
    assert!(test.read("sn/Demo/Payload/x.json").ends_with("{\"a\": 1}\n"));
    let document: Value = serde_json::from_str(&test.read("sn/Demo/Payload/x_1.json")).unwrap();
    assert_eq!(document["payload"], json!("$ref:sn/Demo/Payload/x.json"));

    let second = project.save(&payload).unwrap();
    assert!(second.files.iter().all(|f| !f.modified));
    assert_eq!(
        first.files.iter().map(|f| &f.path).collect::<Vec<_>>(),
        second.files.iter().map(|f| &f.path).collect::<Vec<_>>()
    );
}

#[test]
fn save_all_writes_the_index_once_at_the_end() {
    let test = TestProject::new();
    let mut project = open_project(&test, script_rules());
    let records: Vec<Record> = (1..=5)
        .map(|n| load(&script_include(&n.to_string(), &format!("S{n}"), "x")))
        .collect();

    let report = project.save_all(&records);

    assert!(report.success);
    assert!(!project.store().is_dirty());
    let store =
        RecordStore::open(&NormalizedPath::new(test.root().join("config/snproject.db"))).unwrap();
    assert_eq!(store.len(), 5);
}
