// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Engine error type.
//!
//! ```text
//! EngineError
//! ├── NotFound                - missing platform / resource / device link
//! ├── Config(ConfigError)     - metadata or details rejected by the validator
//! ├── Driver(DriverError)     - factory, connect or probe failure
//! ├── NoCompatibleResources   - nothing to fetch on the platform
//! └── AllResourcesFailed      - every resource failed; carries the report
//! ```

use conduit_core::error::{ConduitError, ConfigError, DriverError};
use thiserror::Error;

use crate::report::FetchReport;

/// Errors surfaced by the engine for one request.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A record is missing from the store.
    #[error("{kind} '{id}' not found")]
    NotFound {
        /// Record kind (`platform`, `resource`, `device link`).
        kind: &'static str,
        /// Identifier that was looked up.
        id: String,
    },

    /// Validation failure.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Driver failure that aborted the request.
    #[error(transparent)]
    Driver(#[from] DriverError),

    /// The platform has no resource to fetch.
    #[error("No compatible resources found for platform '{platform_id}'")]
    NoCompatibleResources {
        /// Platform identifier.
        platform_id: i64,
    },

    /// Every resource failed.
    #[error("All {} resources failed", report.len())]
    AllResourcesFailed {
        /// The per-resource failures.
        report: Box<FetchReport>,
    },
}

impl EngineError {
    /// Creates a not-found error.
    pub fn not_found(kind: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            kind,
            id: id.to_string(),
        }
    }

    /// Returns the error type for logging.
    pub fn error_type(&self) -> &'static str {
        match self {
            EngineError::NotFound { .. } => "not_found",
            EngineError::Config(e) => e.error_type(),
            EngineError::Driver(e) => e.error_type(),
            EngineError::NoCompatibleResources { .. } => "no_compatible_resources",
            EngineError::AllResourcesFailed { .. } => "all_resources_failed",
        }
    }

    /// Returns `true` if retrying the request may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            EngineError::Driver(e) => e.is_retryable(),
            EngineError::AllResourcesFailed { report } => report
                .iter()
                .filter_map(|(_, outcome)| outcome.failure())
                .any(|f| matches!(f.error_type.as_str(), "timeout" | "connection_failed" | "not_connected")),
            _ => false,
        }
    }

    /// Returns a user-friendly error message.
    pub fn user_message(&self) -> String {
        match self {
            EngineError::NotFound { kind, id } => format!("{}을(를) 찾을 수 없습니다: {}", kind, id),
            EngineError::Config(e) => e.user_message(),
            EngineError::Driver(e) => e.user_message(),
            EngineError::NoCompatibleResources { .. } => "호환되는 리소스가 없습니다".to_string(),
            EngineError::AllResourcesFailed { .. } => "모든 리소스 조회에 실패했습니다".to_string(),
        }
    }

    /// The report of a fetch in which every resource failed.
    pub fn report(&self) -> Option<&FetchReport> {
        match self {
            EngineError::AllResourcesFailed { report } => Some(report.as_ref()),
            _ => None,
        }
    }
}

impl From<ConduitError> for EngineError {
    fn from(error: ConduitError) -> Self {
        match error {
            ConduitError::Config(e) => EngineError::Config(e),
            ConduitError::Driver(e) => EngineError::Driver(e),
        }
    }
}

/// Result alias for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;
