use pretty_assertions::assert_eq;
use rstest::rstest;
use serde::Deserialize;
use snproject_fs::{ConfigFormat, ConfigStore, NormalizedPath};
use std::fs;
use tempfile::TempDir;

#[derive(Debug, Deserialize, PartialEq)]
struct TestConfig {
    name: String,
    count: i32,
}

#[rstest]
#[case("config.toml", "name = \"test\"\ncount = 42\n")]
#[case("config.json", r#"{"name": "test", "count": 42}"#)]
#[case("config.yaml", "name: test\ncount: 42\n")]
#[case("config.yml", "name: test\ncount: 42\n")]
fn test_load_detects_format(#[case] file_name: &str, #[case] content: &str) {
    let temp = TempDir::new().unwrap();
    let file_path = temp.path().join(file_name);
    fs::write(&file_path, content).unwrap();

    let config: TestConfig = ConfigStore::new()
        .load(&NormalizedPath::new(&file_path))
        .unwrap();

    assert_eq!(
        config,
        TestConfig {
            name: "test".into(),
            count: 42
        }
    );
}

#[test]
fn test_load_unsupported_format() {
    let temp = TempDir::new().unwrap();
    let file_path = temp.path().join("config.ini");
    fs::write(&file_path, "name=test").unwrap();

    let result: snproject_fs::Result<TestConfig> =
        ConfigStore::new().load(&NormalizedPath::new(&file_path));
    assert!(matches!(
        result,
        Err(snproject_fs::Error::UnsupportedFormat { .. })
    ));
}

#[rstest]
#[case("broken.toml", "name = ", "TOML")]
#[case("broken.json", "{\"name\": ", "JSON")]
#[case("broken.yaml", "name: [", "YAML")]
fn test_parse_error_names_format(
    #[case] file_name: &str,
    #[case] content: &str,
    #[case] format: &str,
) {
    let temp = TempDir::new().unwrap();
    let file_path = temp.path().join(file_name);
    fs::write(&file_path, content).unwrap();

    let err = ConfigStore::new()
        .load::<TestConfig>(&NormalizedPath::new(&file_path))
        .unwrap_err();

    assert!(matches!(err, snproject_fs::Error::ConfigParse { .. }));
    assert!(err.to_string().contains(format), "{err}");
}

#[test]
fn test_missing_file_is_io_error() {
    let temp = TempDir::new().unwrap();
    let path = NormalizedPath::new(temp.path().join("missing.json"));

    let result = ConfigStore::new().load::<TestConfig>(&path);
    assert!(matches!(result, Err(snproject_fs::Error::Io { .. })));
}

#[test]
fn test_format_from_extension() {
    assert_eq!(
        ConfigFormat::from_path(&NormalizedPath::new("a/Entities.YML")),
        Some(ConfigFormat::Yaml)
    );
    assert_eq!(ConfigFormat::from_path(&NormalizedPath::new("a/b")), None);
}
