// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Error types for loading settings and inventory files.

use std::path::PathBuf;

use thiserror::Error;

/// Failures while reading, parsing or checking a configuration file.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The file does not exist.
    #[error("File not found: {path}")]
    FileNotFound {
        /// Path that was looked up.
        path: PathBuf,
    },

    /// The file could not be read.
    #[error("Failed to read '{path}': {source}")]
    Io {
        /// Path to the file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The extension maps to no known format.
    #[error("Unsupported configuration format: {format}")]
    UnsupportedFormat {
        /// The offending extension.
        format: String,
    },

    /// The content did not deserialize.
    #[error("Failed to parse {origin}: {message}")]
    Parse {
        /// File path or `<string>`.
        origin: String,
        /// Parser message.
        message: String,
    },

    /// An environment override holds an unusable value.
    #[error("Invalid environment variable value for '{name}': {message}")]
    InvalidEnvVar {
        /// Variable name.
        name: String,
        /// Reason.
        message: String,
    },

    /// Two records share an identifier.
    #[error("Duplicate {kind}: {id}")]
    Duplicate {
        /// Record kind.
        kind: &'static str,
        /// The duplicated identifier.
        id: String,
    },

    /// A record points at a platform that does not exist.
    #[error("{kind} '{id}' references unknown platform {platform_id}")]
    DanglingReference {
        /// Record kind.
        kind: &'static str,
        /// Record identifier.
        id: String,
        /// Missing platform.
        platform_id: i64,
    },

    /// A value is present but not acceptable.
    #[error("Validation failed for '{field}': {message}")]
    Validation {
        /// The field.
        field: String,
        /// Reason.
        message: String,
    },
}

impl LoadError {
    /// Creates an I/O error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Creates a parse error.
    pub fn parse(origin: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Parse {
            origin: origin.into(),
            message: message.into(),
        }
    }

    /// Creates a duplicate error.
    pub fn duplicate(kind: &'static str, id: impl ToString) -> Self {
        Self::Duplicate {
            kind,
            id: id.to_string(),
        }
    }

    /// Creates a validation error.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Returns `true` for failures reading the file rather than its content.
    pub fn is_io(&self) -> bool {
        matches!(self, LoadError::FileNotFound { .. } | LoadError::Io { .. })
    }

    /// Returns the error type for logging.
    pub fn error_type(&self) -> &'static str {
        match self {
            LoadError::FileNotFound { .. } => "file_not_found",
            LoadError::Io { .. } => "io",
            LoadError::UnsupportedFormat { .. } => "unsupported_format",
            LoadError::Parse { .. } => "parse",
            LoadError::InvalidEnvVar { .. } => "invalid_env_var",
            LoadError::Duplicate { .. } => "duplicate",
            LoadError::DanglingReference { .. } => "dangling_reference",
            LoadError::Validation { .. } => "validation",
        }
    }

    /// Returns a user-friendly error message.
    pub fn user_message(&self) -> String {
        match self {
            LoadError::FileNotFound { path } => format!("파일을 찾을 수 없습니다: {}", path.display()),
            LoadError::Io { path, .. } => format!("파일을 읽을 수 없습니다: {}", path.display()),
            LoadError::UnsupportedFormat { format } => format!("지원하지 않는 파일 형식: {}", format),
            LoadError::Parse { origin, message } => format!("설정 파싱 실패 ({}): {}", origin, message),
            LoadError::InvalidEnvVar { name, .. } => format!("잘못된 환경 변수 값: {}", name),
            LoadError::Duplicate { kind, id } => format!("중복된 {}: {}", kind, id),
            LoadError::DanglingReference { kind, id, platform_id } => {
                format!("{} '{}'이(가) 존재하지 않는 플랫폼 {}을(를) 참조합니다", kind, id, platform_id)
            }
            LoadError::Validation { field, message } => format!("잘못된 값 ({}): {}", field, message),
        }
    }
}

/// Result alias for loading.
pub type LoadResult<T> = Result<T, LoadError>;
