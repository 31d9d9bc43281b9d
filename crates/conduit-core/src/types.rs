// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Data model shared by every crate.
//!
//! Records here are read-only snapshots supplied by the persistence
//! collaborator through [`PlatformStore`]. Their `metadata` and `details`
//! stay raw strings until the validator turns them into sanitized values.

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

// =============================================================================
// PlatformType
// =============================================================================

/// Closed set of supported platform kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlatformType {
    /// Generic REST API.
    #[serde(rename = "REST")]
    Rest,
    /// InfluxDB-style time-series database.
    #[serde(rename = "TimeSeries", alias = "InfluxDB")]
    TimeSeries,
    /// OPC UA server.
    #[serde(rename = "OPCUA", alias = "OPC_UA")]
    OpcUa,
    /// Vendor SDK.
    #[serde(rename = "SDK")]
    Sdk,
}

impl PlatformType {
    /// All supported platform types.
    pub const ALL: [PlatformType; 4] = [
        PlatformType::Rest,
        PlatformType::TimeSeries,
        PlatformType::OpcUa,
        PlatformType::Sdk,
    ];

    /// Canonical string form.
    pub fn as_str(&self) -> &'static str {
        match self {
            PlatformType::Rest => "REST",
            PlatformType::TimeSeries => "TimeSeries",
            PlatformType::OpcUa => "OPCUA",
            PlatformType::Sdk => "SDK",
        }
    }

    /// The only resource type this platform can serve.
    pub fn resource_type(&self) -> ResourceType {
        match self {
            PlatformType::Rest => ResourceType::RestEndpoint,
            PlatformType::TimeSeries => ResourceType::TimeSeriesQuery,
            PlatformType::OpcUa => ResourceType::OpcUaNode,
            PlatformType::Sdk => ResourceType::SdkMethod,
        }
    }

    /// Returns `true` if a resource of `resource_type` may run on this platform.
    pub fn accepts(&self, resource_type: ResourceType) -> bool {
        self.resource_type() == resource_type
    }

    /// Returns `true` for drivers that hold a session between calls.
    pub fn is_stateful(&self) -> bool {
        matches!(self, PlatformType::OpcUa | PlatformType::Sdk)
    }
}

impl fmt::Display for PlatformType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PlatformType {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "REST" => Ok(PlatformType::Rest),
            "TimeSeries" | "InfluxDB" => Ok(PlatformType::TimeSeries),
            "OPCUA" | "OPC_UA" => Ok(PlatformType::OpcUa),
            "SDK" => Ok(PlatformType::Sdk),
            other => Err(ConfigError::UnsupportedPlatformType {
                value: other.to_string(),
            }),
        }
    }
}

// =============================================================================
// ResourceType
// =============================================================================

/// Closed set of supported resource kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
    /// An HTTP endpoint on a REST platform.
    RestEndpoint,
    /// A query on a time-series platform.
    #[serde(rename = "timeseries_query", alias = "influxdb_query")]
    TimeSeriesQuery,
    /// A node on an OPC UA server.
    #[serde(rename = "opcua_node")]
    OpcUaNode,
    /// A vendor SDK call.
    SdkMethod,
}

impl ResourceType {
    /// Canonical string form.
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceType::RestEndpoint => "rest_endpoint",
            ResourceType::TimeSeriesQuery => "timeseries_query",
            ResourceType::OpcUaNode => "opcua_node",
            ResourceType::SdkMethod => "sdk_method",
        }
    }

    /// The platform type able to serve this resource.
    pub fn platform_type(&self) -> PlatformType {
        match self {
            ResourceType::RestEndpoint => PlatformType::Rest,
            ResourceType::TimeSeriesQuery => PlatformType::TimeSeries,
            ResourceType::OpcUaNode => PlatformType::OpcUa,
            ResourceType::SdkMethod => PlatformType::Sdk,
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceType {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "rest_endpoint" => Ok(ResourceType::RestEndpoint),
            "timeseries_query" | "influxdb_query" => Ok(ResourceType::TimeSeriesQuery),
            "opcua_node" => Ok(ResourceType::OpcUaNode),
            "sdk_method" => Ok(ResourceType::SdkMethod),
            other => Err(ConfigError::UnsupportedResourceType {
                value: other.to_string(),
            }),
        }
    }
}

// =============================================================================
// Records
// =============================================================================

fn default_active() -> bool {
    true
}

/// An external system definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Platform {
    /// Opaque identifier.
    pub id: i64,
    /// Display name.
    pub name: String,
    /// Platform type as stored; parsed on use.
    #[serde(rename = "type")]
    pub platform_type: String,
    /// Raw, untrusted connection metadata (JSON text).
    pub metadata: String,
    /// Disabled platforms are never contacted.
    #[serde(default = "default_active")]
    pub is_active: bool,
}

/// An addressable read operation on a platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    /// Opaque identifier.
    pub id: i64,
    /// Owning platform.
    pub platform_id: i64,
    /// Display name; keys the aggregated fetch result.
    pub name: String,
    /// Resource type as stored; parsed on use.
    #[serde(rename = "type")]
    pub resource_type: String,
    /// Raw, untrusted call details (JSON text).
    pub details: String,
}

/// Association of a device with a platform-specific alias.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceLink {
    /// Device identifier.
    pub device_id: i64,
    /// Platform identifier.
    pub platform_id: i64,
    /// Alias substituted into outbound requests; unique per platform.
    pub alias: String,
}

// =============================================================================
// PlatformStore
// =============================================================================

/// Read-only view of the persistence collaborator.
///
/// The driver layer never writes back through this trait.
#[async_trait]
pub trait PlatformStore: Send + Sync {
    /// Looks up a platform by id.
    async fn platform(&self, id: i64) -> Option<Platform>;

    /// Looks up a resource by id.
    async fn resource(&self, id: i64) -> Option<Resource>;

    /// Lists the resources of a platform in stable (id) order.
    async fn resources_for(&self, platform_id: i64) -> Vec<Resource>;

    /// Looks up the device link for a device on a platform.
    async fn device_link(&self, device_id: i64, platform_id: i64) -> Option<DeviceLink>;
}
