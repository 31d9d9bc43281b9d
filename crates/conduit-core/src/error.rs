// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Unified error hierarchy for the driver layer.
//!
//! Two families of errors exist:
//!
//! - [`ConfigError`] is raised by the validator when untrusted metadata or
//!   resource details are rejected. These errors are always user-correctable.
//! - [`DriverError`] is raised while building or driving a connector
//!   (connection, query, upstream HTTP failures, timeouts, cancellation).
//!
//! # Error Hierarchy
//!
//! ```text
//! ConduitError (root)
//! ├── ConfigError     - Metadata / details validation
//! └── DriverError     - Factory, connection and fetch failures
//! ```
//!
//! # Examples
//!
//! ```
//! use conduit_core::error::{ConduitError, DriverError};
//!
//! let error = DriverError::timeout("connect");
//! assert!(error.is_retryable());
//!
//! let root: ConduitError = error.into();
//! assert_eq!(root.error_type(), "timeout");
//! ```

use thiserror::Error;

use crate::output::HttpResponse;

// =============================================================================
// ConduitError - Root Error Type
// =============================================================================

/// The root error type of the driver layer.
#[derive(Debug, Error)]
pub enum ConduitError {
    /// Validation error.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Driver error.
    #[error("Driver error: {0}")]
    Driver(#[from] DriverError),
}

impl ConduitError {
    /// Returns `true` if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            ConduitError::Config(_) => false,
            ConduitError::Driver(e) => e.is_retryable(),
        }
    }

    /// Returns a user-friendly error message.
    pub fn user_message(&self) -> String {
        match self {
            ConduitError::Config(e) => format!("설정 오류: {}", e.user_message()),
            ConduitError::Driver(e) => format!("플랫폼 통신 오류: {}", e.user_message()),
        }
    }

    /// Returns the stable error tag of the wrapped error.
    pub fn error_type(&self) -> &'static str {
        match self {
            ConduitError::Config(e) => e.error_type(),
            ConduitError::Driver(e) => e.error_type(),
        }
    }

    /// Returns the HTTP status code a response layer should use.
    pub fn status_code(&self) -> u16 {
        match self {
            ConduitError::Config(_) => 400,
            ConduitError::Driver(e) => e.status_code(),
        }
    }

    /// Returns the upstream response attached to this error, if any.
    pub fn upstream_response(&self) -> Option<&HttpResponse> {
        match self {
            ConduitError::Driver(DriverError::UpstreamHttp { response, .. }) => Some(response),
            _ => None,
        }
    }
}

// =============================================================================
// ConfigError
// =============================================================================

/// Validation errors for platform metadata and resource details.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// The document did not parse as JSON of the expected shape.
    #[error("Malformed {kind}: {message}")]
    MalformedConfig {
        /// What was being parsed (e.g. `REST metadata`).
        kind: String,
        /// Parser message.
        message: String,
    },

    /// Required field is missing or empty.
    #[error("Missing required field: {field}")]
    MissingField {
        /// The missing field name.
        field: String,
    },

    /// Endpoint URL is unusable.
    #[error("Invalid endpoint '{value}' for '{field}': {message}")]
    InvalidEndpoint {
        /// Field holding the URL.
        field: String,
        /// The rejected value.
        value: String,
        /// Reason.
        message: String,
    },

    /// Time range does not match the negative-duration grammar.
    #[error("Invalid time range '{value}': expected '-<digits><s|m|h|d|w|y>'")]
    InvalidTimeRange {
        /// The rejected value.
        value: String,
    },

    /// A field is present but its value is not acceptable.
    #[error("Invalid value for '{field}': {message}")]
    InvalidField {
        /// The field name.
        field: String,
        /// Reason.
        message: String,
    },

    /// Unknown platform type string.
    #[error("Unsupported platform type: {value}")]
    UnsupportedPlatformType {
        /// The offending value.
        value: String,
    },

    /// Unknown resource type string.
    #[error("Unsupported resource type: {value}")]
    UnsupportedResourceType {
        /// The offending value.
        value: String,
    },

    /// Canonical re-serialization failed.
    #[error("Failed to serialize sanitized {kind}: {message}")]
    Serialization {
        /// What was being serialized.
        kind: String,
        /// Serializer message.
        message: String,
    },
}

impl ConfigError {
    /// Creates a malformed config error.
    pub fn malformed(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self::MalformedConfig {
            kind: kind.into(),
            message: message.into(),
        }
    }

    /// Creates a missing field error.
    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingField { field: field.into() }
    }

    /// Creates an invalid endpoint error.
    pub fn invalid_endpoint(
        field: impl Into<String>,
        value: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::InvalidEndpoint {
            field: field.into(),
            value: value.into(),
            message: message.into(),
        }
    }

    /// Creates an invalid time range error.
    pub fn invalid_time_range(value: impl Into<String>) -> Self {
        Self::InvalidTimeRange { value: value.into() }
    }

    /// Creates an invalid field error.
    pub fn invalid_field(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidField {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Returns a user-friendly error message.
    pub fn user_message(&self) -> String {
        match self {
            ConfigError::MalformedConfig { kind, .. } => format!("JSON 형식이 올바르지 않습니다 ({})", kind),
            ConfigError::MissingField { field } => format!("필수 항목 누락: {}", field),
            ConfigError::InvalidEndpoint { field, value, .. } => {
                format!("잘못된 엔드포인트 ({}): {}", field, value)
            }
            ConfigError::InvalidTimeRange { value } => {
                format!("잘못된 조회 기간: {} (예: -1h, -30m, -7d)", value)
            }
            ConfigError::InvalidField { field, message } => {
                format!("잘못된 값 ({}): {}", field, message)
            }
            ConfigError::UnsupportedPlatformType { value } => {
                format!("지원하지 않는 플랫폼 유형: {}", value)
            }
            ConfigError::UnsupportedResourceType { value } => {
                format!("지원하지 않는 리소스 유형: {}", value)
            }
            ConfigError::Serialization { .. } => "설정을 저장 형식으로 변환하지 못했습니다".to_string(),
        }
    }

    /// Returns the error type for logging.
    pub fn error_type(&self) -> &'static str {
        match self {
            ConfigError::MalformedConfig { .. } => "malformed_config",
            ConfigError::MissingField { .. } => "missing_field",
            ConfigError::InvalidEndpoint { .. } => "invalid_endpoint",
            ConfigError::InvalidTimeRange { .. } => "invalid_time_range",
            ConfigError::InvalidField { .. } => "invalid_field",
            ConfigError::UnsupportedPlatformType { .. } => "unsupported_platform_type",
            ConfigError::UnsupportedResourceType { .. } => "unsupported_resource_type",
            ConfigError::Serialization { .. } => "serialization",
        }
    }
}

// =============================================================================
// DriverError
// =============================================================================

/// Driver construction and runtime errors.
#[derive(Debug, Error)]
pub enum DriverError {
    /// The factory does not know this platform type.
    #[error("Unsupported platform type: {value}")]
    UnsupportedPlatformType {
        /// The offending value.
        value: String,
    },

    /// Metadata could not be turned into a driver.
    #[error("Invalid metadata: {message}")]
    InvalidMetadata {
        /// Reason.
        message: String,
    },

    /// Details handed to a driver belong to another driver kind.
    #[error("Invalid resource details: {message}")]
    InvalidDetails {
        /// Reason.
        message: String,
    },

    /// Resource type cannot be served by the platform type.
    #[error("Resource type '{resource_type}' is not compatible with platform type '{platform_type}'")]
    IncompatibleResourceType {
        /// The resource type.
        resource_type: String,
        /// The platform type.
        platform_type: String,
    },

    /// The platform is disabled.
    #[error("Platform '{platform_id}' is inactive")]
    PlatformInactive {
        /// Platform identifier.
        platform_id: i64,
    },

    /// Deadline expired.
    #[error("Operation '{operation}' timed out")]
    Timeout {
        /// The interrupted operation.
        operation: String,
    },

    /// Caller canceled the operation.
    #[error("Operation '{operation}' was canceled")]
    Canceled {
        /// The interrupted operation.
        operation: String,
    },

    /// Connection failed.
    #[error("Connection failed: {message}")]
    ConnectionFailed {
        /// Error message.
        message: String,
        /// Underlying error.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Operation requires an open connection.
    #[error("Driver is not connected")]
    NotConnected,

    /// The backend rejected or failed a query.
    #[error("Query failed: {message}")]
    QueryError {
        /// Error message.
        message: String,
    },

    /// The backend returned zero results.
    #[error("No data returned for '{address}'")]
    NoData {
        /// The address that was read.
        address: String,
    },

    /// The upstream answered with a failure status.
    #[error("Upstream returned HTTP {status}")]
    UpstreamHttp {
        /// HTTP status code.
        status: u16,
        /// The full response so callers can inspect it.
        response: Box<HttpResponse>,
    },

    /// The upstream answered with something that could not be decoded.
    #[error("Invalid response: {message}")]
    InvalidResponse {
        /// Error message.
        message: String,
    },

    /// Protocol-specific error.
    #[error("Protocol error: {message}")]
    Protocol {
        /// Error message.
        message: String,
    },
}

impl DriverError {
    /// Creates an unsupported platform type error.
    pub fn unsupported_platform_type(value: impl Into<String>) -> Self {
        Self::UnsupportedPlatformType { value: value.into() }
    }

    /// Creates an invalid metadata error.
    pub fn invalid_metadata(message: impl Into<String>) -> Self {
        Self::InvalidMetadata { message: message.into() }
    }

    /// Creates an invalid details error.
    pub fn invalid_details(message: impl Into<String>) -> Self {
        Self::InvalidDetails { message: message.into() }
    }

    /// Creates an incompatible resource type error.
    pub fn incompatible(resource_type: impl Into<String>, platform_type: impl Into<String>) -> Self {
        Self::IncompatibleResourceType {
            resource_type: resource_type.into(),
            platform_type: platform_type.into(),
        }
    }

    /// Creates a timeout error.
    pub fn timeout(operation: impl Into<String>) -> Self {
        Self::Timeout { operation: operation.into() }
    }

    /// Creates a canceled error.
    pub fn canceled(operation: impl Into<String>) -> Self {
        Self::Canceled { operation: operation.into() }
    }

    /// Creates a connection failed error.
    pub fn connection_failed(message: impl Into<String>) -> Self {
        Self::ConnectionFailed {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a connection failed error with a source.
    pub fn connection_failed_with<E>(message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::ConnectionFailed {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Creates a query error.
    pub fn query(message: impl Into<String>) -> Self {
        Self::QueryError { message: message.into() }
    }

    /// Creates a no data error.
    pub fn no_data(address: impl Into<String>) -> Self {
        Self::NoData { address: address.into() }
    }

    /// Creates an upstream HTTP error carrying the response.
    pub fn upstream(response: HttpResponse) -> Self {
        Self::UpstreamHttp {
            status: response.status_code,
            response: Box::new(response),
        }
    }

    /// Creates an invalid response error.
    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::InvalidResponse { message: message.into() }
    }

    /// Creates a protocol error.
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol { message: message.into() }
    }

    /// Returns `true` if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            DriverError::Timeout { .. }
            | DriverError::ConnectionFailed { .. }
            | DriverError::NotConnected => true,
            DriverError::UpstreamHttp { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }

    /// Returns the HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            DriverError::UnsupportedPlatformType { .. }
            | DriverError::InvalidMetadata { .. }
            | DriverError::InvalidDetails { .. }
            | DriverError::IncompatibleResourceType { .. } => 400,
            DriverError::PlatformInactive { .. } => 409,
            DriverError::NoData { .. } => 404,
            // client closed request
            DriverError::Canceled { .. } => 499,
            DriverError::NotConnected | DriverError::ConnectionFailed { .. } => 503,
            DriverError::Timeout { .. } => 504,
            DriverError::QueryError { .. }
            | DriverError::UpstreamHttp { .. }
            | DriverError::InvalidResponse { .. }
            | DriverError::Protocol { .. } => 502,
        }
    }

    /// Returns a user-friendly error message.
    pub fn user_message(&self) -> String {
        match self {
            DriverError::UnsupportedPlatformType { value } => {
                format!("지원하지 않는 플랫폼 유형: {}", value)
            }
            DriverError::InvalidMetadata { .. } => "플랫폼 연결 정보가 올바르지 않습니다".to_string(),
            DriverError::InvalidDetails { .. } => "리소스 설정이 올바르지 않습니다".to_string(),
            DriverError::IncompatibleResourceType {
                resource_type,
                platform_type,
            } => format!(
                "리소스 유형 {}은(는) {} 플랫폼에서 사용할 수 없습니다",
                resource_type, platform_type
            ),
            DriverError::PlatformInactive { .. } => "비활성화된 플랫폼입니다".to_string(),
            DriverError::Timeout { operation } => format!("응답 시간 초과 ({})", operation),
            DriverError::Canceled { .. } => "요청이 취소되었습니다".to_string(),
            DriverError::ConnectionFailed { .. } => "플랫폼 연결에 실패했습니다".to_string(),
            DriverError::NotConnected => "플랫폼이 연결되어 있지 않습니다".to_string(),
            DriverError::QueryError { message } => format!("쿼리 실행 실패: {}", message),
            DriverError::NoData { address } => format!("데이터가 없습니다: {}", address),
            DriverError::UpstreamHttp { status, .. } => format!("외부 API 오류 응답 (HTTP {})", status),
            DriverError::InvalidResponse { .. } => "잘못된 응답을 받았습니다".to_string(),
            DriverError::Protocol { message } => format!("프로토콜 오류: {}", message),
        }
    }

    /// Adds platform context to the error.
    pub fn with_platform(self, platform: &str) -> Self {
        match self {
            DriverError::ConnectionFailed { message, source } => DriverError::ConnectionFailed {
                message: format!("[{}] {}", platform, message),
                source,
            },
            DriverError::QueryError { message } => DriverError::QueryError {
                message: format!("[{}] {}", platform, message),
            },
            other => other,
        }
    }

    /// Returns the error type for logging.
    pub fn error_type(&self) -> &'static str {
        match self {
            DriverError::UnsupportedPlatformType { .. } => "unsupported_platform_type",
            DriverError::InvalidMetadata { .. } => "invalid_metadata",
            DriverError::InvalidDetails { .. } => "invalid_details",
            DriverError::IncompatibleResourceType { .. } => "incompatible_resource_type",
            DriverError::PlatformInactive { .. } => "platform_inactive",
            DriverError::Timeout { .. } => "timeout",
            DriverError::Canceled { .. } => "canceled",
            DriverError::ConnectionFailed { .. } => "connection_failed",
            DriverError::NotConnected => "not_connected",
            DriverError::QueryError { .. } => "query_error",
            DriverError::NoData { .. } => "no_data",
            DriverError::UpstreamHttp { .. } => "upstream_http_error",
            DriverError::InvalidResponse { .. } => "invalid_response",
            DriverError::Protocol { .. } => "protocol",
        }
    }
}

impl Clone for DriverError {
    fn clone(&self) -> Self {
        match self {
            DriverError::UnsupportedPlatformType { value } => {
                DriverError::UnsupportedPlatformType { value: value.clone() }
            }
            DriverError::InvalidMetadata { message } => {
                DriverError::InvalidMetadata { message: message.clone() }
            }
            DriverError::InvalidDetails { message } => {
                DriverError::InvalidDetails { message: message.clone() }
            }
            DriverError::IncompatibleResourceType {
                resource_type,
                platform_type,
            } => DriverError::IncompatibleResourceType {
                resource_type: resource_type.clone(),
                platform_type: platform_type.clone(),
            },
            DriverError::PlatformInactive { platform_id } => DriverError::PlatformInactive {
                platform_id: *platform_id,
            },
            DriverError::Timeout { operation } => DriverError::Timeout {
                operation: operation.clone(),
            },
            DriverError::Canceled { operation } => DriverError::Canceled {
                operation: operation.clone(),
            },
            // The boxed source is not cloneable; the message carries its text.
            DriverError::ConnectionFailed { message, .. } => DriverError::ConnectionFailed {
                message: message.clone(),
                source: None,
            },
            DriverError::NotConnected => DriverError::NotConnected,
            DriverError::QueryError { message } => DriverError::QueryError {
                message: message.clone(),
            },
            DriverError::NoData { address } => DriverError::NoData {
                address: address.clone(),
            },
            DriverError::UpstreamHttp { status, response } => DriverError::UpstreamHttp {
                status: *status,
                response: response.clone(),
            },
            DriverError::InvalidResponse { message } => DriverError::InvalidResponse {
                message: message.clone(),
            },
            DriverError::Protocol { message } => DriverError::Protocol {
                message: message.clone(),
            },
        }
    }
}

/// Result alias for driver operations.
pub type DriverResult<T> = Result<T, DriverError>;

// =============================================================================
// Tests
// =============================================================================
