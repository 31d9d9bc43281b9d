// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Error types for the conduit binary.
//!
//! | Exit code | Class                                          |
//! |-----------|------------------------------------------------|
//! | 1         | configuration, validation, unknown ids         |
//! | 2         | initialization (logging)                       |
//! | 3         | driver and runtime failures                    |
//! | 4         | I/O                                            |

use conduit_config::LoadError;
use conduit_core::error::ConfigError;
use conduit_engine::EngineError;
use thiserror::Error;

/// Result type alias for conduit-bin operations.
pub type BinResult<T> = Result<T, BinError>;

/// Errors that can occur in the conduit binary.
#[derive(Debug, Error)]
pub enum BinError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Initialization error.
    #[error("Initialization error: {0}")]
    Initialization(String),

    /// Runtime error.
    #[error("Runtime error: {0}")]
    Runtime(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(String),

    /// Settings or inventory file error.
    #[error(transparent)]
    Load(#[from] LoadError),

    /// Rejected metadata or details.
    #[error(transparent)]
    Validation(#[from] ConfigError),

    /// Engine error.
    #[error(transparent)]
    Engine(#[from] EngineError),
}

impl BinError {
    /// Creates a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Creates an initialization error.
    pub fn init(msg: impl Into<String>) -> Self {
        Self::Initialization(msg.into())
    }

    /// Creates a runtime error.
    pub fn runtime(msg: impl Into<String>) -> Self {
        Self::Runtime(msg.into())
    }

    /// Creates an I/O error.
    pub fn io(msg: impl Into<String>) -> Self {
        Self::Io(msg.into())
    }

    /// Returns the exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Configuration(_) | Self::Validation(_) => 1,
            Self::Initialization(_) => 2,
            Self::Runtime(_) => 3,
            Self::Io(_) => 4,
            Self::Load(e) if e.is_io() => 4,
            Self::Load(_) => 1,
            Self::Engine(e) => match e {
                EngineError::NotFound { .. } | EngineError::Config(_) => 1,
                EngineError::Driver(_)
                | EngineError::NoCompatibleResources { .. }
                | EngineError::AllResourcesFailed { .. } => 3,
            },
        }
    }

    /// Returns the localized message for errors that carry one.
    pub fn user_message(&self) -> Option<String> {
        match self {
            Self::Load(e) => Some(e.user_message()),
            Self::Validation(e) => Some(e.user_message()),
            Self::Engine(e) => Some(e.user_message()),
            _ => None,
        }
    }
}

impl From<std::io::Error> for BinError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

// =============================================================================
// Error Reporting
// =============================================================================

/// Reports an error on stderr.
pub fn report_error(error: &BinError) {
    eprintln!("Error: {}", error);
    if let Some(message) = error.user_message() {
        eprintln!("  {}", message);
    }

    let mut source = std::error::Error::source(error);
    while let Some(cause) = source {
        eprintln!("  Caused by: {}", cause);
        source = cause.source();
    }
}

/// Reports an error and exits with the appropriate code.
pub fn report_error_and_exit(error: BinError) -> ! {
    report_error(&error);
    std::process::exit(error.exit_code())
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use conduit_core::error::DriverError;

    use super::*;

    #[test]
    fn test_error_creation() {
        let err = BinError::config("no inventory");
        assert_eq!(err.to_string(), "Configuration error: no inventory");
        assert!(err.user_message().is_none());
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(BinError::config("x").exit_code(), 1);
        assert_eq!(BinError::init("x").exit_code(), 2);
        assert_eq!(BinError::runtime("x").exit_code(), 3);
        assert_eq!(BinError::io("x").exit_code(), 4);
    }

    #[test]
    fn test_exit_codes_by_error_class() {
        assert_eq!(BinError::from(ConfigError::missing_field("url")).exit_code(), 1);
        assert_eq!(
            BinError::from(EngineError::not_found("platform", 9)).exit_code(),
            1
        );
        assert_eq!(
            BinError::from(EngineError::from(DriverError::timeout("fetch"))).exit_code(),
            3
        );
        assert_eq!(
            BinError::from(LoadError::FileNotFound {
                path: PathBuf::from("inv.yaml")
            })
            .exit_code(),
            4
        );
        assert_eq!(BinError::from(LoadError::duplicate("alias", "a@1")).exit_code(), 1);
    }

    #[test]
    fn test_user_message_is_forwarded() {
        let err = BinError::from(ConfigError::missing_field("url"));
        assert!(err.user_message().is_some());
    }
}
