// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! File formats and environment placeholder resolution.
//!
//! Every file goes through the same pipeline:
//!
//! ```text
//!   read ─► resolve ${VAR} / ${VAR:default} ─► deserialize (YAML | TOML | JSON)
//! ```

use std::env;
use std::fs;
use std::path::Path;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::de::DeserializeOwned;
use tracing::warn;

use crate::error::{LoadError, LoadResult};

static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)(?::([^}]*))?\}").expect("Failed to compile placeholder pattern")
});

// =============================================================================
// ConfigFormat
// =============================================================================

/// Supported file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// YAML.
    Yaml,
    /// TOML.
    Toml,
    /// JSON.
    Json,
}

impl ConfigFormat {
    /// Determines the format from the file extension.
    pub fn from_path(path: &Path) -> LoadResult<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);

        match ext.as_deref() {
            Some("yaml") | Some("yml") => Ok(ConfigFormat::Yaml),
            Some("toml") => Ok(ConfigFormat::Toml),
            Some("json") => Ok(ConfigFormat::Json),
            Some(other) => Err(LoadError::UnsupportedFormat {
                format: other.to_string(),
            }),
            None => Err(LoadError::UnsupportedFormat {
                format: "(no extension)".to_string(),
            }),
        }
    }

    /// Deserializes `content`.
    pub fn parse<T: DeserializeOwned>(&self, origin: &str, content: &str) -> LoadResult<T> {
        match self {
            ConfigFormat::Yaml => serde_yaml::from_str(content).map_err(|e| LoadError::parse(origin, e.to_string())),
            ConfigFormat::Toml => toml::from_str(content).map_err(|e| LoadError::parse(origin, e.to_string())),
            ConfigFormat::Json => serde_json::from_str(content).map_err(|e| LoadError::parse(origin, e.to_string())),
        }
    }
}

// =============================================================================
// Placeholders
// =============================================================================

/// Replaces `${VAR}` and `${VAR:default}` using `lookup`.
///
/// Unknown variables without a default are left in place.
pub fn resolve_placeholders_with<F>(content: &str, lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    PLACEHOLDER
        .replace_all(content, |caps: &Captures<'_>| {
            let name = &caps[1];
            match (lookup(name), caps.get(2)) {
                (Some(value), _) => value,
                (None, Some(default)) => default.as_str().to_string(),
                (None, None) => {
                    warn!(variable = name, "Environment variable not set, placeholder kept");
                    caps[0].to_string()
                }
            }
        })
        .into_owned()
}

/// Replaces placeholders from the process environment.
pub fn resolve_placeholders(content: &str) -> String {
    resolve_placeholders_with(content, |name| env::var(name).ok())
}

/// Reads a file, resolves placeholders and deserializes it by extension.
pub fn load_file<T: DeserializeOwned>(path: &Path) -> LoadResult<T> {
    let format = ConfigFormat::from_path(path)?;
    if !path.exists() {
        return Err(LoadError::FileNotFound {
            path: path.to_path_buf(),
        });
    }
    let raw = fs::read_to_string(path).map_err(|e| LoadError::io(path, e))?;
    format.parse(&path.display().to_string(), &resolve_placeholders(&raw))
}
