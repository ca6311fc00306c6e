//! Content rendering
//!
//! Turns a classified record into file units. Field mode writes one file per
//! non-empty mapped field with a provenance header; JSON mode writes the
//! flattened record. Paths are returned as sanitized relative segments; the
//! path allocator may still suffix the last one.

use crate::entity::{Classification, Entity};
use crate::pattern::{NONE_PLACEHOLDER, substitute, substitute_opt};
use crate::record::{
    Record, SYS_CREATED_BY, SYS_CREATED_ON, SYS_TAGS, SYS_UPDATED_BY, SYS_UPDATED_ON,
};
use serde_json::{Map, Number, Value};
use snproject_fs::{compute_body_checksum, compute_content_checksum, relative_key, sanitize_segment};
use std::collections::HashMap;

/// Unit id of the JSON rendering of a record
pub const JSON_UNIT_ID: &str = "JSON";
/// Directory segment grouping classes without a rule
pub const UNKNOWN_SEGMENT: &str = "_";
/// Prefix of a back-reference to a unit written as its own file
pub const REFERENCE_PREFIX: &str = "$ref:";

const SCRIPT_EXTENSIONS: &[&str] = &[
    "js", "jsx", "ts", "tsx", "css", "scss", "less", "java", "groovy",
];
const MARKUP_EXTENSIONS: &[&str] = &["html", "xhtml", "htm", "xml", "svg", "jelly"];

/// Unit id of a field rendered to its own file.
pub fn field_unit_id(field: &str) -> String {
    format!("FIELD:{}", field)
}

/// Field of a JSON unit that points at another unit instead of holding content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackReference {
    pub field: String,
    pub unit_id: String,
}

/// One rendered file.
#[derive(Debug, Clone, PartialEq)]
pub struct FileUnit {
    /// Stable id within the record: `FIELD:<name>` or `JSON`
    pub id: String,
    /// Field name or `json`
    pub name: String,
    /// Sanitized relative path segments
    pub path: Vec<String>,
    pub body: String,
    pub hash: String,
    pub sys_id: String,
    pub updated_by: Option<String>,
    document: Option<Map<String, Value>>,
    references: Vec<BackReference>,
}

impl FileUnit {
    /// Relative path joined with `/`.
    pub fn relative_path(&self) -> String {
        relative_key(&self.path)
    }

    pub fn is_json(&self) -> bool {
        self.id == JSON_UNIT_ID
    }

    pub fn references(&self) -> &[BackReference] {
        &self.references
    }

    /// Point back-references at the given unit paths and re-render the body.
    ///
    /// `paths` maps unit id to relative path. The hash of a JSON unit does
    /// not depend on its body, so it is left alone.
    pub fn resolve_references(&mut self, paths: &HashMap<String, String>) {
        let Some(document) = self.document.as_mut() else {
            return;
        };
        let mut changed = false;
        for reference in &self.references {
            if let Some(path) = paths.get(&reference.unit_id) {
                document.insert(
                    reference.field.clone(),
                    Value::String(format!("{}{}", REFERENCE_PREFIX, path)),
                );
                changed = true;
            }
        }
        if changed {
            self.body = render_document(document);
        }
    }
}

/// Options shaping rendered output.
#[derive(Debug, Clone)]
pub struct RenderOptions {
    /// First path segment of every unit
    pub namespace: String,
    /// Application segment for records without one
    pub app_name: String,
    pub include_unknown: bool,
    pub all_as_json: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            namespace: "sn".to_string(),
            app_name: "noname".to_string(),
            include_unknown: false,
            all_as_json: false,
        }
    }
}

/// Application segment of a record's paths.
pub fn app_name<'a>(record: &'a Record, options: &'a RenderOptions) -> &'a str {
    match record.app_name() {
        "" => &options.app_name,
        name => name,
    }
}

/// Render a classified record into file units.
///
/// Records without a matching rule produce a single JSON unit when unknown
/// classes are included, and nothing otherwise.
pub fn render(
    record: &Record,
    classification: &Classification,
    options: &RenderOptions,
) -> Vec<FileUnit> {
    match (&classification.entity, classification.passes_filter) {
        (Some(entity), true) => render_entity(record, entity, options),
        _ if options.include_unknown => vec![render_unknown(record, options)],
        _ => Vec::new(),
    }
}

fn render_entity(record: &Record, entity: &Entity, options: &RenderOptions) -> Vec<FileUnit> {
    let base_app = app_name(record, options).to_string();
    let mut base = vec![
        options.namespace.clone(),
        base_app.clone(),
        entity.name.clone(),
    ];
    if let Some(sub_dir) = substitute_opt(entity.sub_dir_pattern.as_deref(), record) {
        base.extend(
            sub_dir
                .trim_matches(|c| c == '/' || c == '\\')
                .split(['/', '\\'])
                .filter(|s| !s.is_empty())
                .map(str::to_string),
        );
    }

    let key_value = entity
        .key
        .as_deref()
        .map(|key| substitute(key, record))
        .filter(|k| !k.is_empty())
        .unwrap_or_else(|| NONE_PLACEHOLDER.to_string());

    let multi_field = entity.fields.len() > 1;
    let mut dir = base;
    if multi_field {
        dir.push(key_value.clone());
    }

    let mut units = Vec::new();
    for (field, extension) in &entity.fields {
        let Some(value) = record.value(field) else {
            continue;
        };
        let file_name = if multi_field {
            format!("{}{}", field, extension)
        } else {
            format!("{}{}", key_value, extension)
        };
        let body = format!("{}{}", header(record, &base_app, extension), value);
        let mut path = dir.clone();
        path.push(file_name);

        units.push(FileUnit {
            id: field_unit_id(field),
            name: field.clone(),
            path: sanitize_all(&path),
            hash: compute_body_checksum(&body),
            body,
            sys_id: record.sys_id().to_string(),
            updated_by: record.updated_by().map(str::to_string),
            document: None,
            references: Vec::new(),
        });
    }

    if entity.json || options.all_as_json {
        let stem = if entity.key.is_some() {
            key_value
        } else {
            record.sys_id().to_string()
        };
        let mut path = dir;
        path.push(format!("{}.json", stem));

        let references: Vec<BackReference> = units
            .iter()
            .map(|u| BackReference {
                field: u.name.clone(),
                unit_id: u.id.clone(),
            })
            .collect();
        let paths: HashMap<String, String> = units
            .iter()
            .map(|u| (u.id.clone(), u.relative_path()))
            .collect();

        let mut unit = json_unit(record, sanitize_all(&path), references);
        unit.resolve_references(&paths);
        units.push(unit);
    }

    units
}

fn render_unknown(record: &Record, options: &RenderOptions) -> FileUnit {
    let path = vec![
        options.namespace.clone(),
        app_name(record, options).to_string(),
        UNKNOWN_SEGMENT.to_string(),
        record.class_name().to_string(),
        format!("{}.json", record.sys_id()),
    ];
    json_unit(record, sanitize_all(&path), Vec::new())
}

fn json_unit(record: &Record, path: Vec<String>, references: Vec<BackReference>) -> FileUnit {
    let document = flatten(record);
    let body = render_document(&document);
    // Upstream timestamp drives change detection; the body only when there is none
    let hash = match record.updated_on() {
        Some(timestamp) => compute_content_checksum(timestamp),
        None => compute_body_checksum(&body),
    };

    FileUnit {
        id: JSON_UNIT_ID.to_string(),
        name: "json".to_string(),
        path,
        body,
        hash,
        sys_id: record.sys_id().to_string(),
        updated_by: record.updated_by().map(str::to_string),
        document: Some(document),
        references,
    }
}

fn render_document(document: &Map<String, Value>) -> String {
    serde_json::to_string_pretty(document).unwrap_or_else(|_| "{}".to_string())
}

/// Flatten a record into sorted, type-coerced JSON.
fn flatten(record: &Record) -> Map<String, Value> {
    record
        .fields()
        .iter()
        .filter(|(name, _)| !name.contains('.') && name.as_str() != SYS_TAGS)
        .map(|(name, value)| (name.clone(), coerce(&value.value)))
        .collect()
}

/// `"true"`/`"false"`/`"null"` become literals and plain decimal numbers
/// become numbers. Strings with leading zeros stay strings.
fn coerce(raw: &str) -> Value {
    match raw {
        "true" => return Value::Bool(true),
        "false" => return Value::Bool(false),
        "null" => return Value::Null,
        _ => {}
    }
    if !looks_numeric(raw) {
        return Value::String(raw.to_string());
    }
    if let Ok(int) = raw.parse::<i64>() {
        return Value::Number(int.into());
    }
    raw.parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map(Value::Number)
        .unwrap_or_else(|| Value::String(raw.to_string()))
}

fn looks_numeric(raw: &str) -> bool {
    let digits = raw.strip_prefix('-').unwrap_or(raw);
    let (int_part, frac_part) = match digits.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (digits, None),
    };
    let valid_int = !int_part.is_empty()
        && int_part.bytes().all(|b| b.is_ascii_digit())
        && (int_part == "0" || !int_part.starts_with('0'));
    let valid_frac = frac_part.is_none_or(|f| !f.is_empty() && f.bytes().all(|b| b.is_ascii_digit()));
    valid_int && valid_frac
}

fn sanitize_all(segments: &[String]) -> Vec<String> {
    segments.iter().map(|s| sanitize_segment(s)).collect()
}

enum CommentStyle {
    Block,
    Markup,
    None,
}

fn comment_style(extension: &str) -> CommentStyle {
    let ext = extension.trim_start_matches('.').to_ascii_lowercase();
    if SCRIPT_EXTENSIONS.contains(&ext.as_str()) {
        CommentStyle::Block
    } else if MARKUP_EXTENSIONS.contains(&ext.as_str()) {
        CommentStyle::Markup
    } else {
        CommentStyle::None
    }
}

/// Provenance lines written at the top of a field file.
pub fn header_lines(record: &Record, app_name: &str) -> Vec<String> {
    let mut lines = vec![
        format!("Application : {}", app_name),
        format!("ClassName   : {}", record.class_name()),
    ];
    let labelled = [
        ("Created On  : ", SYS_CREATED_ON),
        ("Created By  : ", SYS_CREATED_BY),
        ("Updated On  : ", SYS_UPDATED_ON),
        ("Updated By  : ", SYS_UPDATED_BY),
    ];
    for (label, field) in labelled {
        if let Some(value) = record.value(field) {
            lines.push(format!("{}{}", label, value));
        }
    }
    if let Some(host) = record.meta().host_name.as_deref() {
        lines.push(format!(
            "URL         : {}/{}.do?sys_id={}",
            host.trim_end_matches('/'),
            record.class_name(),
            record.sys_id()
        ));
    }
    lines
}

fn header(record: &Record, app_name: &str, extension: &str) -> String {
    let (open, close) = match comment_style(extension) {
        CommentStyle::Block => ("/*", " */"),
        CommentStyle::Markup => ("<!--", "-->"),
        CommentStyle::None => return String::new(),
    };
    let mut out = String::from(open);
    out.push('\n');
    for line in header_lines(record, app_name) {
        out.push_str(" * ");
        out.push_str(&line);
        out.push('\n');
    }
    out.push_str(close);
    out.push('\n');
    out
}
