//! [`TestProject`] for project scenarios.

use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A temporary project directory with helpers for setup and assertions.
///
/// # Example
///
/// ```rust,no_run
/// use snproject_test_utils::project::TestProject;
/// use serde_json::json;
///
/// let project = TestProject::new();
/// let entities = project.write_entities(&json!({
///     "sys_script_include": {"key": "name", "fields": {"script": ".js"}}
/// }));
/// project.assert_file_not_exists("sn");
/// ```
pub struct TestProject {
    temp_dir: TempDir,
}

impl Default for TestProject {
    fn default() -> Self {
        Self::new()
    }
}

impl TestProject {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().unwrap_or_else(|e| panic!("TestProject: tempdir: {e}"));
        Self { temp_dir }
    }

    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Write the entity rule document to `config/entities.json` and return
    /// its path.
    pub fn write_entities(&self, rules: &Value) -> PathBuf {
        let path = self.root().join("config").join("entities.json");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, serde_json::to_string_pretty(rules).unwrap()).unwrap();
        path
    }

    /// Write `content` to `path` relative to the root, creating parents.
    pub fn write_file(&self, path: &str, content: &str) -> PathBuf {
        let full_path = self.root().join(path);
        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&full_path, content).unwrap();
        full_path
    }

    /// Contents of `path` below the root. Panics if unreadable.
    pub fn read(&self, path: &str) -> String {
        fs::read_to_string(self.root().join(path))
            .unwrap_or_else(|e| panic!("cannot read {path}: {e}"))
    }

    /// Every file below `dir` (relative to the root), as sorted `/` separated
    /// paths relative to the root.
    pub fn files_under(&self, dir: &str) -> Vec<String> {
        fn walk(dir: &Path, root: &Path, out: &mut Vec<String>) {
            let Ok(entries) = fs::read_dir(dir) else {
                return;
            };
            for entry in entries.flatten() {
                let path = entry.path();
                if path.is_dir() {
                    walk(&path, root, out);
                } else if let Ok(relative) = path.strip_prefix(root) {
                    out.push(relative.to_string_lossy().replace('\\', "/"));
                }
            }
        }
        let mut files = Vec::new();
        walk(&self.root().join(dir), self.root(), &mut files);
        files.sort();
        files
    }

    /// Panics unless `path` exists below the root.
    pub fn assert_file_exists(&self, path: &str) {
        if !self.root().join(path).exists() {
            panic!("{path} is missing; project holds {:?}", self.files_under(""));
        }
    }

    /// Panics if `path` exists below the root.
    pub fn assert_file_not_exists(&self, path: &str) {
        if self.root().join(path).exists() {
            panic!("{path} should have been removed");
        }
    }

    /// Panics unless the file at `path` contains `needle`.
    pub fn assert_file_contains(&self, path: &str, needle: &str) {
        let body = self.read(path);
        if !body.contains(needle) {
            panic!("{path} lacks {needle:?}\n--- body ---\n{body}");
        }
    }
}
