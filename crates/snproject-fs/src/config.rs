//! Project and entity document loading
//!
//! The project file and the entity rule document may be written as TOML,
//! JSON or YAML. The format follows the file extension.

use crate::{Error, NormalizedPath, Result, io};
use serde::de::DeserializeOwned;
use std::fmt;

/// Document syntax, chosen by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Toml,
    Json,
    Yaml,
}

impl ConfigFormat {
    /// Format for `path`, or `None` for an unknown extension.
    pub fn from_path(path: &NormalizedPath) -> Option<Self> {
        match path.extension()?.to_ascii_lowercase().as_str() {
            "toml" => Some(Self::Toml),
            "json" => Some(Self::Json),
            "yaml" | "yml" => Some(Self::Yaml),
            _ => None,
        }
    }

    fn parse<T: DeserializeOwned>(self, content: &str) -> std::result::Result<T, String> {
        match self {
            Self::Toml => toml::from_str(content).map_err(|e| e.to_string()),
            Self::Json => serde_json::from_str(content).map_err(|e| e.to_string()),
            Self::Yaml => serde_yaml::from_str(content).map_err(|e| e.to_string()),
        }
    }
}

impl fmt::Display for ConfigFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Toml => "TOML",
            Self::Json => "JSON",
            Self::Yaml => "YAML",
        })
    }
}

/// Reads typed documents from disk.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConfigStore;

impl ConfigStore {
    pub fn new() -> Self {
        Self
    }

    /// Read and deserialize `path`.
    ///
    /// # Errors
    ///
    /// [`Error::UnsupportedFormat`] for an unknown extension, [`Error::Io`]
    /// if the file cannot be read and [`Error::ConfigParse`] if it does not
    /// deserialize into `T`.
    pub fn load<T: DeserializeOwned>(&self, path: &NormalizedPath) -> Result<T> {
        let format = ConfigFormat::from_path(path).ok_or_else(|| Error::UnsupportedFormat {
            extension: path.extension().unwrap_or("").to_string(),
        })?;
        let content = io::read_text(path)?;
        let value = format.parse(&content).map_err(|message| Error::ConfigParse {
            path: path.to_native(),
            format: format.to_string(),
            message,
        })?;
        tracing::debug!(path = %path, format = %format, "Loaded document");
        Ok(value)
    }
}
