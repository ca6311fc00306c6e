//! Results of sync operations

use crate::Error;
use std::path::PathBuf;

/// One unit handled by `save`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedFile {
    /// Absolute path on disk
    pub path: PathBuf,
    pub sys_id: String,
    pub updated_by: Option<String>,
    /// False when the stored hash matched and nothing was written
    pub modified: bool,
}

/// A unit `save` could not place or write.
#[derive(Debug)]
pub struct UnitFailure {
    pub unit_id: String,
    pub error: Error,
}

/// Outcome of saving one record.
#[derive(Debug, Default)]
pub struct SaveReport {
    pub files: Vec<SavedFile>,
    pub failures: Vec<UnitFailure>,
    /// Files of units the record no longer produces
    pub removed: Vec<PathBuf>,
}

impl SaveReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// Files written or moved in this save.
    pub fn modified(&self) -> impl Iterator<Item = &SavedFile> {
        self.files.iter().filter(|f| f.modified)
    }
}

/// Outcome of a batch of saves.
#[derive(Debug, Clone, Default)]
pub struct SyncReport {
    /// Whether every record saved without failures
    pub success: bool,
    /// Paths written or moved
    pub actions: Vec<String>,
    /// One message per failed record or unit
    pub errors: Vec<String>,
}

impl SyncReport {
    pub fn success() -> Self {
        Self {
            success: true,
            actions: Vec::new(),
            errors: Vec::new(),
        }
    }

    pub fn with_error(mut self, error: String) -> Self {
        self.success = false;
        self.errors.push(error);
        self
    }

    /// Fold one record's report in.
    pub fn absorb(&mut self, sys_id: &str, report: SaveReport) {
        self.actions.extend(
            report
                .modified()
                .map(|f| format!("Wrote {}", f.path.display())),
        );
        self.actions.extend(
            report
                .removed
                .iter()
                .map(|p| format!("Removed {}", p.display())),
        );
        for failure in report.failures {
            self.success = false;
            self.errors
                .push(format!("{} ({}): {}", sys_id, failure.unit_id, failure.error));
        }
    }
}
