// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Pre-built records for consistent testing.

use conduit_core::types::{DeviceLink, Platform, Resource};
use serde_json::{json, Value};

/// Annotated CSV with two `temp` rows of the `boiler` measurement.
pub const BOILER_CSV: &str = "\
#datatype,string,long,dateTime:RFC3339,double,string,string
#group,false,false,false,false,true,true
#default,_result,,,,,
,result,table,_time,_value,_field,_measurement
,,0,2024-05-01T00:10:00Z,21.5,temp,boiler
,,0,2024-05-01T00:20:00Z,22.5,temp,boiler
";

/// OPC UA endpoint used by the mock transport.
pub const PLC_ENDPOINT: &str = "opc.tcp://plc-1:4840";

// =============================================================================
// Platforms
// =============================================================================

/// Platform records.
pub struct PlatformFixtures;

impl PlatformFixtures {
    fn platform(id: i64, name: &str, platform_type: &str, metadata: Value) -> Platform {
        Platform {
            id,
            name: name.to_string(),
            platform_type: platform_type.to_string(),
            metadata: metadata.to_string(),
            is_active: true,
        }
    }

    /// REST platform without auth.
    pub fn rest(id: i64, base_endpoint: &str) -> Platform {
        Self::platform(
            id,
            "erp",
            "REST",
            json!({ "base_endpoint": base_endpoint, "auth": { "type": "none" }, "timeout": 5 }),
        )
    }

    /// REST platform with an API key.
    pub fn rest_with_api_key(id: i64, base_endpoint: &str, key: &str) -> Platform {
        Self::platform(
            id,
            "erp",
            "REST",
            json!({ "base_endpoint": base_endpoint, "auth": { "type": "api_key", "api_key": key } }),
        )
    }

    /// Time-series platform in the `acme` org.
    pub fn timeseries(id: i64, url: &str) -> Platform {
        Self::platform(
            id,
            "plant-influx",
            "TimeSeries",
            json!({ "url": url, "token": "tok", "org": "acme", "bucket": "plant", "timeout": 5 }),
        )
    }

    /// OPC UA platform on [`PLC_ENDPOINT`].
    pub fn opcua(id: i64) -> Platform {
        Self::platform(
            id,
            "plc-1",
            "OPCUA",
            json!({ "endpoint": PLC_ENDPOINT, "timeout": 5, "reconnect_interval": 1 }),
        )
    }

    /// SDK platform.
    pub fn sdk(id: i64) -> Platform {
        Self::platform(
            id,
            "vendor-sdk",
            "SDK",
            json!({ "endpoint": "sdk://vendor", "access_key": "ak", "secret_key": "sk", "timeout": 5 }),
        )
    }

    /// The same platform, disabled.
    pub fn inactive(mut platform: Platform) -> Platform {
        platform.is_active = false;
        platform
    }
}

// =============================================================================
// Resources
// =============================================================================

/// Resource records.
pub struct ResourceFixtures;

impl ResourceFixtures {
    /// Resource with arbitrary type and details.
    pub fn raw(id: i64, platform_id: i64, name: &str, resource_type: &str, details: Value) -> Resource {
        Resource {
            id,
            platform_id,
            name: name.to_string(),
            resource_type: resource_type.to_string(),
            details: details.to_string(),
        }
    }

    /// `GET path`.
    pub fn rest_get(id: i64, platform_id: i64, name: &str, path: &str) -> Resource {
        Self::raw(id, platform_id, name, "rest_endpoint", json!({ "method": "GET", "path": path }))
    }

    /// `boiler.temp` over the last hour.
    pub fn boiler_temp(id: i64, platform_id: i64) -> Resource {
        Self::raw(
            id,
            platform_id,
            "boiler-temp",
            "timeseries_query",
            json!({ "bucket": "plant", "measurement": "boiler", "field": "temp", "time_range": "-1h" }),
        )
    }

    /// OPC UA node.
    pub fn node(id: i64, platform_id: i64, name: &str, node_id: &str) -> Resource {
        Self::raw(id, platform_id, name, "opcua_node", json!({ "node_id": node_id }))
    }

    /// SDK `read`.
    pub fn sdk_read(id: i64, platform_id: i64, name: &str) -> Resource {
        Self::raw(id, platform_id, name, "sdk_method", json!({ "method": "read" }))
    }
}

// =============================================================================
// Device Links
// =============================================================================

/// Device link records.
pub struct DeviceFixtures;

impl DeviceFixtures {
    /// Links `device_id` to `platform_id` under `alias`.
    pub fn link(device_id: i64, platform_id: i64, alias: &str) -> DeviceLink {
        DeviceLink {
            device_id,
            platform_id,
            alias: alias.to_string(),
        }
    }
}
