// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Runtime settings.
//!
//! # Sources, lowest to highest precedence
//!
//! ```text
//!   defaults ─► settings file (YAML | TOML | JSON) ─► CONDUIT_* variables ─► CLI flags
//! ```
//!
//! CLI flags are applied by the binary; this module covers the first three.
//!
//! | Variable                     | Field                  |
//! |------------------------------|------------------------|
//! | `CONDUIT_FETCH_TIMEOUT_SECS` | `fetch_timeout_secs`   |
//! | `CONDUIT_CLEANUP_GRACE_MS`   | `cleanup_grace_ms`     |
//! | `CONDUIT_INVENTORY`          | `inventory`            |
//! | `CONDUIT_LOG_LEVEL`          | `logging.level`        |
//! | `CONDUIT_LOG_FORMAT`         | `logging.format`       |

use std::env;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{LoadError, LoadResult};
use crate::format::load_file;

/// Prefix of every settings override variable.
pub const ENV_PREFIX: &str = "CONDUIT";

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

// =============================================================================
// LogFormat
// =============================================================================

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable, multi-field lines.
    #[default]
    Text,
    /// One JSON object per event.
    Json,
    /// Single-line abbreviated output.
    Compact,
}

impl LogFormat {
    /// Returns the format name.
    pub fn as_str(&self) -> &'static str {
        match self {
            LogFormat::Text => "text",
            LogFormat::Json => "json",
            LogFormat::Compact => "compact",
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" | "pretty" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            "compact" => Ok(LogFormat::Compact),
            other => Err(format!("unknown log format '{}', expected text|json|compact", other)),
        }
    }
}

// =============================================================================
// Settings
// =============================================================================

/// Logging settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Default level when `RUST_LOG` is unset.
    pub level: String,
    /// Output format.
    pub format: LogFormat,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Text,
        }
    }
}

/// Process-wide runtime settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Deadline for a whole orchestrated call in seconds; `0` disables it.
    pub fetch_timeout_secs: u64,
    /// Budget for the detached disconnect after cancellation.
    pub cleanup_grace_ms: u64,
    /// Inventory file used when `--inventory` is not given.
    pub inventory: Option<PathBuf>,
    /// Logging.
    pub logging: LoggingSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            fetch_timeout_secs: 60,
            cleanup_grace_ms: 5_000,
            inventory: None,
            logging: LoggingSettings::default(),
        }
    }
}

impl Settings {
    /// Loads settings from a file, then applies `CONDUIT_*` overrides.
    pub fn load(path: &Path) -> LoadResult<Self> {
        let mut settings: Settings = load_file(path)?;
        settings.apply_env_overrides()?;
        settings.validate()?;
        debug!(path = %path.display(), "Settings loaded");
        Ok(settings)
    }

    /// Defaults plus `CONDUIT_*` overrides, for runs without a settings file.
    pub fn from_env() -> LoadResult<Self> {
        let mut settings = Settings::default();
        settings.apply_env_overrides()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Applies overrides from the process environment.
    pub fn apply_env_overrides(&mut self) -> LoadResult<()> {
        self.apply_overrides_with(|name| env::var(name).ok())
    }

    /// Applies overrides read through `lookup`.
    pub fn apply_overrides_with<F>(&mut self, lookup: F) -> LoadResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |suffix: &str| {
            let name = format!("{}_{}", ENV_PREFIX, suffix);
            lookup(&name).map(|value| (name, value))
        };

        if let Some((name, value)) = var("FETCH_TIMEOUT_SECS") {
            self.fetch_timeout_secs = parse_u64(&name, &value)?;
        }
        if let Some((name, value)) = var("CLEANUP_GRACE_MS") {
            self.cleanup_grace_ms = parse_u64(&name, &value)?;
        }
        if let Some((_, value)) = var("INVENTORY") {
            if !value.trim().is_empty() {
                self.inventory = Some(PathBuf::from(value.trim()));
            }
        }
        if let Some((_, value)) = var("LOG_LEVEL") {
            self.logging.level = value.trim().to_ascii_lowercase();
        }
        if let Some((name, value)) = var("LOG_FORMAT") {
            self.logging.format = value
                .parse()
                .map_err(|message| LoadError::InvalidEnvVar { name, message })?;
        }
        Ok(())
    }

    /// Checks value ranges.
    pub fn validate(&self) -> LoadResult<()> {
        if !LOG_LEVELS.contains(&self.logging.level.as_str()) {
            return Err(LoadError::validation(
                "logging.level",
                format!("'{}' is not one of {}", self.logging.level, LOG_LEVELS.join("|")),
            ));
        }
        if self.cleanup_grace_ms == 0 {
            return Err(LoadError::validation("cleanup_grace_ms", "must be greater than zero"));
        }
        Ok(())
    }

    /// Overall fetch deadline, if any.
    pub fn fetch_timeout(&self) -> Option<Duration> {
        (self.fetch_timeout_secs > 0).then(|| Duration::from_secs(self.fetch_timeout_secs))
    }

    /// Cleanup grace period.
    pub fn cleanup_grace(&self) -> Duration {
        Duration::from_millis(self.cleanup_grace_ms)
    }
}

fn parse_u64(name: &str, value: &str) -> LoadResult<u64> {
    value.trim().parse().map_err(|_| LoadError::InvalidEnvVar {
        name: name.to_string(),
        message: format!("expected a non-negative integer, got '{}'", value),
    })
}
