//! Field pattern resolution
//!
//! Entity keys and sub-directory patterns are small templates such as
//! `<collection>/<when>/<name>` or `<cat_item!dv|variable_set|'global'>`.
//! A placeholder lists alternatives left to right; the first one that yields a
//! non-empty value wins:
//!
//! - `'text'` is a literal
//! - `name` is the raw field value
//! - `name!dv` is the display value
//! - `name?` marks the field optional: if it has no value the placeholder and
//!   one directly following `/` are dropped
//!
//! A placeholder no alternative satisfies renders as [`NONE_PLACEHOLDER`].
//! A pattern without placeholders is a bare field name.

use crate::record::Record;
use regex::Regex;
use std::ops::Range;
use std::sync::LazyLock;

/// Rendered in place of a placeholder that could not be resolved
pub const NONE_PLACEHOLDER: &str = "{--none--}";

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<([^>]+)>").unwrap());

/// A field referenced by a pattern.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldRef {
    pub name: String,
    pub optional: bool,
    pub display_value: bool,
}

impl FieldRef {
    pub fn required(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            optional: false,
            display_value: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Alternative {
    Literal(String),
    Field(FieldRef),
}

impl Alternative {
    fn parse(text: &str) -> Self {
        if text.starts_with('\'') {
            return Self::Literal(text.replace('\'', ""));
        }
        let mut name = text;
        let mut optional = false;
        let mut display_value = false;
        if let Some(stripped) = name.strip_suffix('?') {
            optional = true;
            name = stripped;
        }
        if let Some(stripped) = name.strip_suffix("!dv") {
            display_value = true;
            name = stripped;
        }
        Self::Field(FieldRef {
            name: name.to_string(),
            optional,
            display_value,
        })
    }
}

#[derive(Debug)]
struct Placeholder<'a> {
    range: Range<usize>,
    body: &'a str,
}

/// Scan `pattern` for placeholders.
///
/// The cursor strictly advances on every iteration, so the scan finishes in
/// at most `pattern.len() + 1` steps whatever the input looks like.
fn placeholders(pattern: &str) -> Vec<Placeholder<'_>> {
    let mut found = Vec::new();
    let mut cursor = 0;
    let max_steps = pattern.len() + 1;

    for _ in 0..max_steps {
        if cursor > pattern.len() {
            break;
        }
        let Some(captures) = PLACEHOLDER.captures_at(pattern, cursor) else {
            break;
        };
        let (Some(whole), Some(body)) = (captures.get(0), captures.get(1)) else {
            break;
        };
        found.push(Placeholder {
            range: whole.range(),
            body: body.as_str(),
        });
        cursor = whole.end().max(cursor + 1);
    }

    found
}

/// Whether the pattern contains at least one placeholder.
pub fn has_placeholders(pattern: &str) -> bool {
    PLACEHOLDER.is_match(pattern)
}

/// List the fields a pattern references, in order of appearance.
///
/// Literal alternatives are skipped. A pattern without placeholders is a
/// single required field reference.
pub fn parse_fields(pattern: &str) -> Vec<FieldRef> {
    let found = placeholders(pattern);
    if found.is_empty() {
        return vec![FieldRef::required(pattern)];
    }

    found
        .iter()
        .flat_map(|p| p.body.split('|'))
        .filter_map(|alt| match Alternative::parse(alt) {
            Alternative::Field(field) => Some(field),
            Alternative::Literal(_) => None,
        })
        .collect()
}

enum Resolution {
    Replace(String),
    Remove,
    Unresolved,
}

fn resolve(body: &str, record: &Record) -> Resolution {
    for alt in body.split('|') {
        match Alternative::parse(alt) {
            Alternative::Literal(text) => return Resolution::Replace(text),
            Alternative::Field(field) => {
                let value = record
                    .field(&field.name)
                    .map(|v| v.get(field.display_value))
                    .unwrap_or_default();
                if !value.is_empty() {
                    return Resolution::Replace(value.to_string());
                }
                if field.optional {
                    return Resolution::Remove;
                }
            }
        }
    }
    Resolution::Unresolved
}

/// Substitute every placeholder of `pattern` against `record`.
///
/// A pattern without placeholders returns the raw value of the field it
/// names, or [`NONE_PLACEHOLDER`] when that field is empty.
pub fn substitute(pattern: &str, record: &Record) -> String {
    let found = placeholders(pattern);
    if found.is_empty() {
        return record
            .value(pattern)
            .map(str::to_string)
            .unwrap_or_else(|| NONE_PLACEHOLDER.to_string());
    }

    let mut output = String::with_capacity(pattern.len());
    let mut cursor = 0;
    for placeholder in found {
        if placeholder.range.start < cursor {
            continue;
        }
        output.push_str(&pattern[cursor..placeholder.range.start]);
        cursor = placeholder.range.end;
        match resolve(placeholder.body, record) {
            Resolution::Replace(value) => output.push_str(&value),
            Resolution::Remove => {
                if pattern[cursor..].starts_with('/') {
                    cursor += 1;
                }
            }
            Resolution::Unresolved => output.push_str(NONE_PLACEHOLDER),
        }
    }
    output.push_str(&pattern[cursor..]);
    output
}

/// Substitute an optional pattern; `None` stays `None`.
pub fn substitute_opt(pattern: Option<&str>, record: &Record) -> Option<String> {
    pattern.map(|p| substitute(p, record))
}
