//! Record model
//!
//! Records arrive as loosely shaped JSON objects where a field is either a
//! scalar or a `{value, display_value}` pair. They are normalized here, at the
//! boundary, into [`FieldValue`] so nothing downstream has to care.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Field holding the record identity
pub const SYS_ID: &str = "sys_id";
/// Field holding the record class
pub const SYS_CLASS_NAME: &str = "sys_class_name";
/// Field holding the last update timestamp
pub const SYS_UPDATED_ON: &str = "sys_updated_on";
/// Field holding the last editor
pub const SYS_UPDATED_BY: &str = "sys_updated_by";
/// Field holding the creation timestamp
pub const SYS_CREATED_ON: &str = "sys_created_on";
/// Field holding the creator
pub const SYS_CREATED_BY: &str = "sys_created_by";
/// System tag field, never rendered
pub const SYS_TAGS: &str = "sys_tags";

/// A single normalized field value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldValue {
    /// Raw value as stored upstream
    pub value: String,
    /// Human readable value, when upstream supplied one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_value: Option<String>,
}

impl FieldValue {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            display_value: None,
        }
    }

    pub fn with_display(value: impl Into<String>, display_value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            display_value: Some(display_value.into()),
        }
    }

    /// Raw value or display value, depending on `display`.
    ///
    /// Falls back to the raw value when no display value was supplied.
    pub fn get(&self, display: bool) -> &str {
        if display {
            self.display_value.as_deref().unwrap_or(&self.value)
        } else {
            &self.value
        }
    }

    fn from_json(value: &Value) -> Self {
        match value {
            Value::Object(map) if map.contains_key("value") => Self {
                value: map.get("value").map(scalar_to_string).unwrap_or_default(),
                display_value: map.get("display_value").map(scalar_to_string),
            },
            other => Self::new(scalar_to_string(other)),
        }
    }
}

fn scalar_to_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}

/// Transient metadata attached by the caller before a record is processed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordMeta {
    /// Source instance, e.g. `https://dev1234.example.com`
    pub host_name: Option<String>,
    /// Overrides the class read from `sys_class_name`
    pub class_name: Option<String>,
    /// Application the record belongs to
    pub app_name: String,
    /// Application scope
    pub scope_name: Option<String>,
    /// Process or user on whose behalf the sync runs
    pub updated_by: Option<String>,
}

/// An externally sourced configuration record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    class_name: String,
    sys_id: String,
    fields: BTreeMap<String, FieldValue>,
    meta: RecordMeta,
}

impl Record {
    /// Create an empty record of the given class and identity.
    pub fn new(class_name: impl Into<String>, sys_id: impl Into<String>) -> Self {
        let class_name = class_name.into();
        let sys_id = sys_id.into();
        let mut fields = BTreeMap::new();
        fields.insert(SYS_ID.to_string(), FieldValue::new(sys_id.clone()));
        Self {
            class_name,
            sys_id,
            fields,
            meta: RecordMeta::default(),
        }
    }

    /// Normalize a fetched JSON object.
    ///
    /// The class is taken from `sys_class_name`; attach [`RecordMeta`] to
    /// override it.
    pub fn from_json(value: &Value) -> Result<Self> {
        let object = value.as_object().ok_or_else(|| Error::InvalidRecord {
            message: "record must be a JSON object".to_string(),
        })?;

        let fields: BTreeMap<String, FieldValue> = object
            .iter()
            .map(|(name, value)| (name.clone(), FieldValue::from_json(value)))
            .collect();

        let sys_id = fields
            .get(SYS_ID)
            .map(|f| f.value.clone())
            .filter(|id| !id.is_empty())
            .ok_or_else(|| Error::InvalidRecord {
                message: "record has no sys_id".to_string(),
            })?;
        let class_name = fields
            .get(SYS_CLASS_NAME)
            .map(|f| f.value.clone())
            .unwrap_or_default();

        Ok(Self {
            class_name,
            sys_id,
            fields,
            meta: RecordMeta::default(),
        })
    }

    /// Attach caller metadata.
    pub fn with_meta(mut self, meta: RecordMeta) -> Self {
        if let Some(class_name) = meta.class_name.as_ref().filter(|c| !c.is_empty()) {
            self.class_name = class_name.clone();
        }
        self.meta = meta;
        self
    }

    /// Set a scalar field.
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_field(name, FieldValue::new(value));
        self
    }

    /// Set a field carrying both raw and display value.
    pub fn with_display_field(
        mut self,
        name: impl Into<String>,
        value: impl Into<String>,
        display_value: impl Into<String>,
    ) -> Self {
        self.set_field(name, FieldValue::with_display(value, display_value));
        self
    }

    pub fn set_field(&mut self, name: impl Into<String>, value: FieldValue) {
        let name = name.into();
        if name == SYS_ID && !value.value.is_empty() {
            self.sys_id = value.value.clone();
        }
        self.fields.insert(name, value);
    }

    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    pub fn sys_id(&self) -> &str {
        &self.sys_id
    }

    pub fn meta(&self) -> &RecordMeta {
        &self.meta
    }

    pub fn fields(&self) -> &BTreeMap<String, FieldValue> {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    /// Raw value of a field, `None` when absent or empty.
    pub fn value(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .map(|f| f.value.as_str())
            .filter(|v| !v.is_empty())
    }

    /// Application name, from metadata.
    pub fn app_name(&self) -> &str {
        &self.meta.app_name
    }

    /// Upstream update timestamp, falling back to the creation timestamp.
    pub fn updated_on(&self) -> Option<&str> {
        self.value(SYS_UPDATED_ON).or_else(|| self.value(SYS_CREATED_ON))
    }

    /// Editor to record in the index: caller metadata first, then upstream.
    pub fn updated_by(&self) -> Option<&str> {
        self.meta
            .updated_by
            .as_deref()
            .or_else(|| self.value(SYS_UPDATED_BY))
    }
}
