//! Upstream record payloads.
//!
//! Values are wrapped as `{value, display_value}` pairs the way the remote
//! platform returns them with display values requested.

use serde_json::{Map, Value, json};

/// A record payload of `class_name` with `fields` as plain values.
pub fn record(class_name: &str, sys_id: &str, fields: &[(&str, &str)]) -> Value {
    let mut object = Map::new();
    object.insert("sys_id".to_string(), json!(sys_id));
    object.insert("sys_class_name".to_string(), json!(class_name));
    for (name, value) in fields {
        object.insert(name.to_string(), json!(value));
    }
    Value::Object(object)
}

/// Like [`record`], with every field as a `{value, display_value}` pair.
pub fn record_with_display(
    class_name: &str,
    sys_id: &str,
    fields: &[(&str, &str, &str)],
) -> Value {
    let mut value = record(class_name, sys_id, &[]);
    if let Value::Object(object) = &mut value {
        for (name, raw, display) in fields {
            object.insert(
                name.to_string(),
                json!({ "value": raw, "display_value": display }),
            );
        }
    }
    value
}

/// A script include with a name and a script body.
pub fn script_include(sys_id: &str, name: &str, script: &str) -> Value {
    record(
        "sys_script_include",
        sys_id,
        &[
            ("name", name),
            ("script", script),
            ("sys_updated_on", "2024-01-01 10:00:00"),
            ("sys_updated_by", "admin"),
        ],
    )
}
