//! Normalized path handling and path segment sanitization

use std::fmt;
use std::path::{Path, PathBuf};

/// Longest file name (in bytes) accepted by common filesystems.
const MAX_SEGMENT_BYTES: usize = 255;

/// Characters that are never allowed in a path segment.
const ILLEGAL_CHARS: &[char] = &['/', '?', '<', '>', '\\', ':', '*', '|', '"'];

/// Device names reserved on Windows, with or without an extension.
const WINDOWS_RESERVED: &[&str] = &[
    "con", "prn", "aux", "nul", "com0", "com1", "com2", "com3", "com4", "com5", "com6", "com7",
    "com8", "com9", "lpt0", "lpt1", "lpt2", "lpt3", "lpt4", "lpt5", "lpt6", "lpt7", "lpt8",
    "lpt9",
];

/// Replacement for segments that sanitize down to nothing.
const EMPTY_SEGMENT: &str = "_";

/// Filesystem path stored with `/` separators.
///
/// Keys in the record index and the path cache are `/`-separated whatever the
/// host platform, so project paths are kept in the same form and only turned
/// into a [`PathBuf`] when they reach the filesystem.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NormalizedPath {
    inner: String,
}

impl NormalizedPath {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            inner: to_forward_slashes(&path.as_ref().to_string_lossy()),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.inner
    }

    /// Host path for I/O.
    pub fn to_native(&self) -> PathBuf {
        PathBuf::from(&self.inner)
    }

    /// Append `segment`, which may itself contain separators.
    pub fn join(&self, segment: &str) -> Self {
        let segment = to_forward_slashes(segment);
        let mut inner = self.inner.clone();
        if !inner.is_empty() && !inner.ends_with('/') {
            inner.push('/');
        }
        inner.push_str(segment.trim_start_matches('/'));
        Self { inner }
    }

    /// Append each of `segments` in order.
    pub fn join_all<S: AsRef<str>>(&self, segments: &[S]) -> Self {
        segments
            .iter()
            .fold(self.clone(), |acc, segment| acc.join(segment.as_ref()))
    }

    /// Containing directory. `None` for a bare name; the root's child yields `/`.
    pub fn parent(&self) -> Option<Self> {
        let trimmed = self.inner.trim_end_matches('/');
        let idx = trimmed.rfind('/')?;
        let inner = if idx == 0 {
            "/".to_string()
        } else {
            trimmed[..idx].to_string()
        };
        Some(Self { inner })
    }

    /// Last component, ignoring a trailing separator.
    pub fn file_name(&self) -> Option<&str> {
        self.inner
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .filter(|name| !name.is_empty())
    }

    pub fn exists(&self) -> bool {
        self.to_native().exists()
    }

    pub fn is_dir(&self) -> bool {
        self.to_native().is_dir()
    }

    pub fn is_file(&self) -> bool {
        self.to_native().is_file()
    }

    /// Whether `self` equals `root` or lies below it.
    pub fn starts_with(&self, root: &NormalizedPath) -> bool {
        let root = root.inner.trim_end_matches('/');
        self.inner == root
            || (self.inner.starts_with(root) && self.inner[root.len()..].starts_with('/'))
    }

    /// Text after the last `.` of the file name. Dotfiles have none.
    pub fn extension(&self) -> Option<&str> {
        let name = self.file_name()?;
        match name.rfind('.') {
            Some(0) | None => None,
            Some(idx) => Some(&name[idx + 1..]),
        }
    }
}

fn to_forward_slashes(path: &str) -> String {
    path.replace('\\', "/")
}

impl AsRef<Path> for NormalizedPath {
    fn as_ref(&self) -> &Path {
        Path::new(&self.inner)
    }
}

impl fmt::Display for NormalizedPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.inner)
    }
}

impl From<&Path> for NormalizedPath {
    fn from(path: &Path) -> Self {
        Self::new(path)
    }
}

/// Make a single path segment safe to use as a file or directory name.
///
/// Strips separators, characters that are illegal on common filesystems and
/// control characters, rejects dot-only and Windows device names, drops
/// trailing dots and spaces, and truncates to 255 bytes. A segment that ends
/// up empty becomes `_`.
pub fn sanitize_segment(segment: &str) -> String {
    let mut cleaned: String = segment
        .chars()
        .filter(|c| !ILLEGAL_CHARS.contains(c) && !c.is_control())
        .collect();

    if cleaned.len() > MAX_SEGMENT_BYTES {
        let mut end = MAX_SEGMENT_BYTES;
        while !cleaned.is_char_boundary(end) {
            end -= 1;
        }
        cleaned.truncate(end);
    }

    if !cleaned.is_empty() && cleaned.chars().all(|c| c == '.') {
        cleaned.clear();
    }

    let stem = cleaned
        .split('.')
        .next()
        .unwrap_or_default()
        .to_ascii_lowercase();
    if WINDOWS_RESERVED.contains(&stem.as_str()) {
        cleaned.clear();
    }

    let trimmed_len = cleaned.trim_end_matches(['.', ' ']).len();
    cleaned.truncate(trimmed_len);

    if cleaned.is_empty() {
        EMPTY_SEGMENT.to_string()
    } else {
        cleaned
    }
}

/// Join relative path segments into the `/`-separated key used by the
/// record index and the path cache.
pub fn relative_key<S: AsRef<str>>(segments: &[S]) -> String {
    segments
        .iter()
        .map(|s| s.as_ref())
        .collect::<Vec<_>>()
        .join("/")
}
