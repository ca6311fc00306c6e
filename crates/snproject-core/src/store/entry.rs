//! Record store entries

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One file a record produced within a branch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitEntry {
    /// `FIELD:<name>` or `JSON`
    pub id: String,
    pub hash: String,
    /// Path relative to the project root, `/` separated
    pub path: String,
    pub name: String,
}

/// A record's contribution to one branch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BranchEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_by: Option<String>,
    pub updated_on: DateTime<Utc>,
    #[serde(default)]
    pub fields: Vec<UnitEntry>,
}

impl BranchEntry {
    pub fn new(updated_by: Option<String>) -> Self {
        Self {
            updated_by,
            updated_on: Utc::now(),
            fields: Vec::new(),
        }
    }

    pub fn unit(&self, id: &str) -> Option<&UnitEntry> {
        self.fields.iter().find(|u| u.id == id)
    }

    /// Insert or replace the unit with the same id.
    pub fn upsert_unit(&mut self, unit: UnitEntry) {
        match self.fields.iter_mut().find(|u| u.id == unit.id) {
            Some(existing) => *existing = unit,
            None => self.fields.push(unit),
        }
    }

    pub fn remove_unit(&mut self, id: &str) -> Option<UnitEntry> {
        let pos = self.fields.iter().position(|u| u.id == id)?;
        Some(self.fields.remove(pos))
    }

    /// Refresh the last-update stamp.
    pub fn touch(&mut self, updated_by: Option<String>) {
        if updated_by.is_some() {
            self.updated_by = updated_by;
        }
        self.updated_on = Utc::now();
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|u| u.path.as_str())
    }
}

/// Everything the store knows about one record, across branches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordEntry {
    /// Empty in indexes written before the identity was stored
    #[serde(default)]
    pub sys_id: String,
    pub class_name: String,
    #[serde(default)]
    pub app_name: String,
    #[serde(default)]
    pub branches: BTreeMap<String, BranchEntry>,
}

impl RecordEntry {
    pub fn new(
        sys_id: impl Into<String>,
        class_name: impl Into<String>,
        app_name: impl Into<String>,
    ) -> Self {
        Self {
            sys_id: sys_id.into(),
            class_name: class_name.into(),
            app_name: app_name.into(),
            branches: BTreeMap::new(),
        }
    }

    pub fn branch(&self, name: &str) -> Option<&BranchEntry> {
        self.branches.get(name)
    }

    pub fn in_branch(&self, name: &str) -> bool {
        self.branches.contains_key(name)
    }
}
