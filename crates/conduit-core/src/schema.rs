// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Typed configuration schema.
//!
//! These are the canonical shapes produced by the validator. Every map is a
//! `BTreeMap` and every optional field is omitted when absent, so serializing
//! a value and validating the result again yields byte-identical JSON.
//!
//! # Metadata (per platform type)
//!
//! | Type         | Fields                                                   |
//! |--------------|----------------------------------------------------------|
//! | `REST`       | `base_endpoint`, `auth`, `timeout`                       |
//! | `TimeSeries` | `url`, `token`, `org`, `bucket`, `timeout`               |
//! | `OPCUA`      | `endpoint`, `username?`, `password?`, `timeout`, `reconnect_interval` |
//! | `SDK`        | `endpoint`, `access_key`, `secret_key`, `timeout`        |
//!
//! # Details (per resource type)
//!
//! | Type               | Fields                                              |
//! |--------------------|-----------------------------------------------------|
//! | `rest_endpoint`    | `method`, `path`, `headers`, `query_params`, `body?` |
//! | `timeseries_query` | `bucket`, `measurement`, `field`, `time_range`      |
//! | `opcua_node`       | `node_id`                                           |
//! | `sdk_method`       | `method`, `device?`, driver-specific extras         |

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::{PlatformType, ResourceType};

/// Timeout applied when metadata omits it or sets it to zero.
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

// =============================================================================
// Secret
// =============================================================================

/// A credential that never shows up in `Debug` output or logs.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Secret(String);

impl Secret {
    /// Wraps a credential.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the credential for use on the wire.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

// =============================================================================
// REST
// =============================================================================

/// REST platform metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RestMetadata {
    /// Canonical absolute http(s) URL.
    pub base_endpoint: String,
    /// Authentication scheme.
    pub auth: RestAuth,
    /// Request timeout in seconds.
    pub timeout: u64,
}

impl RestMetadata {
    /// Request timeout as a duration.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }
}

/// REST authentication; each variant carries exactly its own credentials.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RestAuth {
    /// No authentication.
    None,
    /// `X-API-Key` header.
    ApiKey {
        /// The key.
        api_key: Secret,
    },
    /// `Authorization: Bearer` header.
    Bearer {
        /// The token.
        bearer_token: Secret,
    },
    /// `Authorization: Basic` header.
    Basic {
        /// Username and password.
        basic_auth: BasicAuth,
    },
}

impl RestAuth {
    /// The `auth.type` string.
    pub fn kind(&self) -> &'static str {
        match self {
            RestAuth::None => "none",
            RestAuth::ApiKey { .. } => "api_key",
            RestAuth::Bearer { .. } => "bearer",
            RestAuth::Basic { .. } => "basic",
        }
    }

    /// Name of the header this scheme sets, if any.
    pub fn header_name(&self) -> Option<&'static str> {
        match self {
            RestAuth::None => None,
            RestAuth::ApiKey { .. } => Some("X-API-Key"),
            RestAuth::Bearer { .. } | RestAuth::Basic { .. } => Some("Authorization"),
        }
    }
}

/// Basic auth credentials.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BasicAuth {
    /// Username.
    pub username: String,
    /// Password.
    pub password: Secret,
}

/// HTTP verbs a REST resource may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    /// GET
    Get,
    /// POST
    Post,
    /// PUT
    Put,
    /// DELETE
    Delete,
}

impl HttpMethod {
    /// Parses an upper-case verb.
    pub fn from_upper(s: &str) -> Option<Self> {
        match s {
            "GET" => Some(HttpMethod::Get),
            "POST" => Some(HttpMethod::Post),
            "PUT" => Some(HttpMethod::Put),
            "DELETE" => Some(HttpMethod::Delete),
            _ => None,
        }
    }

    /// The verb as sent on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// REST resource details.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RestDetails {
    /// HTTP verb.
    pub method: HttpMethod,
    /// Cleaned absolute path, never `/` alone.
    pub path: String,
    /// Extra request headers.
    pub headers: BTreeMap<String, String>,
    /// Query parameters.
    pub query_params: BTreeMap<String, String>,
    /// Compact JSON payload template.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

// =============================================================================
// Time series
// =============================================================================

/// Time-series platform metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeriesMetadata {
    /// Canonical absolute http(s) URL of the server.
    pub url: String,
    /// API token.
    pub token: Secret,
    /// Organization.
    pub org: String,
    /// Default bucket.
    pub bucket: String,
    /// Request timeout in seconds.
    pub timeout: u64,
}

impl TimeSeriesMetadata {
    /// Request timeout as a duration.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }
}

/// Time-series query details.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeriesDetails {
    /// Bucket to query.
    pub bucket: String,
    /// Measurement filter value.
    pub measurement: String,
    /// Field filter value.
    pub field: String,
    /// Negative duration, e.g. `-1h`.
    pub time_range: String,
}

// =============================================================================
// OPC UA
// =============================================================================

/// OPC UA platform metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpcUaMetadata {
    /// `opc.tcp://` endpoint URL.
    pub endpoint: String,
    /// Username; present together with `password` or not at all.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Password.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<Secret>,
    /// Session timeout in seconds.
    pub timeout: u64,
    /// Reconnect interval in seconds.
    pub reconnect_interval: u64,
}

impl OpcUaMetadata {
    /// Session timeout as a duration.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    /// Reconnect interval as a duration.
    pub fn reconnect_interval(&self) -> Duration {
        Duration::from_secs(self.reconnect_interval)
    }

    /// Username/password pair when both are configured.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (&self.username, &self.password) {
            (Some(user), Some(pass)) => Some((user.as_str(), pass.expose())),
            _ => None,
        }
    }
}

/// OPC UA node details.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpcUaDetails {
    /// Canonical node id string.
    pub node_id: String,
}

// =============================================================================
// SDK
// =============================================================================

/// Vendor SDK platform metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SdkMetadata {
    /// SDK endpoint.
    pub endpoint: String,
    /// Access key.
    pub access_key: String,
    /// Secret key.
    pub secret_key: Secret,
    /// Call timeout in seconds.
    pub timeout: u64,
}

impl SdkMetadata {
    /// Call timeout as a duration.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }
}

/// Vendor SDK call details.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SdkDetails {
    /// SDK method name.
    pub method: String,
    /// Device the call is scoped to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device: Option<String>,
    /// Driver-specific parameters, flattened next to `method`.
    #[serde(flatten)]
    pub params: BTreeMap<String, Value>,
}

// =============================================================================
// Unions
// =============================================================================

/// Metadata of any platform type.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PlatformMetadata {
    /// REST metadata.
    Rest(RestMetadata),
    /// Time-series metadata.
    TimeSeries(TimeSeriesMetadata),
    /// OPC UA metadata.
    OpcUa(OpcUaMetadata),
    /// SDK metadata.
    Sdk(SdkMetadata),
}

impl PlatformMetadata {
    /// Platform type the metadata was validated for.
    pub fn platform_type(&self) -> PlatformType {
        match self {
            PlatformMetadata::Rest(_) => PlatformType::Rest,
            PlatformMetadata::TimeSeries(_) => PlatformType::TimeSeries,
            PlatformMetadata::OpcUa(_) => PlatformType::OpcUa,
            PlatformMetadata::Sdk(_) => PlatformType::Sdk,
        }
    }

    /// Configured timeout.
    pub fn timeout(&self) -> Duration {
        match self {
            PlatformMetadata::Rest(m) => m.timeout(),
            PlatformMetadata::TimeSeries(m) => m.timeout(),
            PlatformMetadata::OpcUa(m) => m.timeout(),
            PlatformMetadata::Sdk(m) => m.timeout(),
        }
    }
}

/// Details of any resource type.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ResourceDetails {
    /// REST endpoint details.
    Rest(RestDetails),
    /// Time-series query details.
    TimeSeries(TimeSeriesDetails),
    /// OPC UA node details.
    OpcUa(OpcUaDetails),
    /// SDK call details.
    Sdk(SdkDetails),
}

impl ResourceDetails {
    /// Resource type the details were validated for.
    pub fn resource_type(&self) -> ResourceType {
        match self {
            ResourceDetails::Rest(_) => ResourceType::RestEndpoint,
            ResourceDetails::TimeSeries(_) => ResourceType::TimeSeriesQuery,
            ResourceDetails::OpcUa(_) => ResourceType::OpcUaNode,
            ResourceDetails::Sdk(_) => ResourceType::SdkMethod,
        }
    }
}
