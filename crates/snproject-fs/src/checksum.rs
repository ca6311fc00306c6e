//! Change-detection hashes for rendered file units
//!
//! Every hash stored in the record index has the form `sha256:<hex>`.

use sha2::{Digest, Sha256};

const PREFIX: &str = "sha256:";

/// Hash of `content` exactly as given.
pub fn compute_content_checksum(content: &str) -> String {
    let digest = Sha256::digest(content.as_bytes());
    format!("{PREFIX}{digest:x}")
}

/// Normalize line endings of a rendered body.
///
/// `\r\n` and lone `\r` become `\n`, and any run of trailing newlines is
/// collapsed into exactly one. Empty input stays empty.
pub fn normalize_line_endings(content: &str) -> String {
    let unified = content.replace("\r\n", "\n").replace('\r', "\n");
    let trimmed = unified.trim_end_matches('\n');
    if trimmed.is_empty() {
        return String::new();
    }
    let mut normalized = String::with_capacity(trimmed.len() + 1);
    normalized.push_str(trimmed);
    normalized.push('\n');
    normalized
}

/// Checksum of a rendered body, insensitive to line-ending convention.
pub fn compute_body_checksum(body: &str) -> String {
    compute_content_checksum(&normalize_line_endings(body))
}
