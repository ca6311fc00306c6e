//! Entity rule configuration and its compiled form

use crate::query::Query;
use crate::record::Record;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// How records of one class map to files, as written in configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EntityRule {
    /// Display name used as a path segment; defaults to the class name
    pub name: Option<String>,
    /// Pattern for the primary file name
    pub key: Option<String>,
    /// Encoded inclusion filter
    pub query: Option<String>,
    /// Render the whole record as JSON
    pub json: bool,
    /// Field name → file extension (including the dot)
    pub fields: BTreeMap<String, String>,
    /// Pattern for extra path segments
    pub sub_dir_pattern: Option<String>,
    /// Classes that inherit this rule
    pub alias: Vec<String>,
    /// Set on rules synthesized from an alias
    #[serde(skip_serializing_if = "Option::is_none", rename = "copyOfClassName")]
    pub copy_of: Option<String>,
}

impl EntityRule {
    /// Fill unset `key`/`query`/`subDirPattern` from `source` and take over
    /// its field table. Applying the same source twice changes nothing.
    pub fn merge_from(&mut self, source: &EntityRule) {
        if self.key.is_none() {
            self.key = source.key.clone();
        }
        if self.query.is_none() {
            self.query = source.query.clone();
        }
        if self.sub_dir_pattern.is_none() {
            self.sub_dir_pattern = source.sub_dir_pattern.clone();
        }
        for (field, extension) in &source.fields {
            self.fields.insert(field.clone(), extension.clone());
        }
    }

    /// A rule for `alias_class` cloned from this one.
    pub fn synthesize_alias(&self, source_class: &str, alias_class: &str) -> EntityRule {
        let base_name = self.name.as_deref().unwrap_or(source_class);
        EntityRule {
            name: Some(format!("{}:{}", base_name, alias_class)),
            alias: Vec::new(),
            copy_of: Some(source_class.to_string()),
            ..self.clone()
        }
    }
}

/// A resolved entity rule, merged with defaults and ready for use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entity {
    pub class_name: String,
    pub name: String,
    pub key: Option<String>,
    pub query: Option<String>,
    pub json: bool,
    pub fields: BTreeMap<String, String>,
    pub sub_dir_pattern: Option<String>,
    pub copy_of: Option<String>,
    filter: Option<Query>,
}

impl Entity {
    pub fn compile(class_name: &str, rule: &EntityRule) -> Self {
        let query = rule.query.clone().filter(|q| !q.trim().is_empty());
        Self {
            class_name: class_name.to_string(),
            name: rule
                .name
                .clone()
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| class_name.to_string()),
            key: rule.key.clone(),
            filter: query.as_deref().map(Query::parse),
            query,
            json: rule.json,
            fields: rule.fields.clone(),
            sub_dir_pattern: rule.sub_dir_pattern.clone(),
            copy_of: rule.copy_of.clone(),
        }
    }

    /// Parsed inclusion filter, if any.
    pub fn filter(&self) -> Option<&Query> {
        self.filter.as_ref()
    }

    /// Whether the record passes this entity's inclusion filter.
    pub fn includes(&self, record: &Record) -> bool {
        self.filter.as_ref().is_none_or(|q| q.matches(record))
    }
}
