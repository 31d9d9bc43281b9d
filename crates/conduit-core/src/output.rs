// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Structured fetch results.
//!
//! Each driver kind produces its own result shape; [`FetchOutput`] unifies
//! them so the orchestrator can aggregate results without knowing the kind.
//! Serialization is untagged, so a REST result renders as
//! `{status_code, status, headers, body}` and a time-series result as a plain
//! array of records.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

// =============================================================================
// FetchOutput
// =============================================================================

/// The result of a single `fetch_data` call.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FetchOutput {
    /// REST response.
    Http(HttpResponse),
    /// Ordered time-series records; may be empty.
    Series(Vec<SeriesRecord>),
    /// OPC UA node reading.
    Node(NodeReading),
    /// Vendor SDK reading.
    Sdk(SdkReading),
}

impl FetchOutput {
    /// Returns the HTTP response if this is a REST result.
    pub fn as_http(&self) -> Option<&HttpResponse> {
        match self {
            FetchOutput::Http(r) => Some(r),
            _ => None,
        }
    }

    /// Returns the series records if this is a time-series result.
    pub fn as_series(&self) -> Option<&[SeriesRecord]> {
        match self {
            FetchOutput::Series(r) => Some(r),
            _ => None,
        }
    }

    /// Returns the node reading if this is an OPC UA result.
    pub fn as_node(&self) -> Option<&NodeReading> {
        match self {
            FetchOutput::Node(r) => Some(r),
            _ => None,
        }
    }

    /// Returns the SDK reading if this is an SDK result.
    pub fn as_sdk(&self) -> Option<&SdkReading> {
        match self {
            FetchOutput::Sdk(r) => Some(r),
            _ => None,
        }
    }

    /// Renders the output as a JSON value.
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

// =============================================================================
// REST
// =============================================================================

/// An HTTP response as seen by the REST driver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpResponse {
    /// Numeric status code.
    pub status_code: u16,
    /// Status line, e.g. `200 OK`.
    pub status: String,
    /// Response headers, lower-cased names.
    pub headers: BTreeMap<String, Vec<String>>,
    /// Decoded JSON body, or the raw text as a JSON string.
    pub body: Value,
}

impl HttpResponse {
    /// Returns `true` for 2xx and 3xx responses.
    pub fn is_success(&self) -> bool {
        (200..400).contains(&self.status_code)
    }

    /// Returns the first value of a header.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .and_then(|values| values.first())
            .map(String::as_str)
    }
}

// =============================================================================
// Time series
// =============================================================================

/// One row of a time-series query result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesRecord {
    /// Timestamp of the point.
    pub time: DateTime<Utc>,
    /// Point value.
    pub value: Value,
    /// Field name.
    pub field: String,
    /// Measurement name.
    pub measurement: String,
}

// =============================================================================
// OPC UA
// =============================================================================

/// Severity bits of an OPC UA status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusSeverity {
    /// `0b00` in the two most significant bits.
    Good,
    /// `0b01`.
    Uncertain,
    /// `0b10` or `0b11`.
    Bad,
}

impl StatusSeverity {
    /// Derives the severity from a raw status code.
    pub fn from_code(code: u32) -> Self {
        if code & 0x8000_0000 != 0 {
            StatusSeverity::Bad
        } else if code & 0x4000_0000 != 0 {
            StatusSeverity::Uncertain
        } else {
            StatusSeverity::Good
        }
    }
}

/// Protocol status attached to a node reading, surfaced verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeStatus {
    /// Raw status code.
    pub code: u32,
    /// Derived severity.
    pub severity: StatusSeverity,
}

impl NodeStatus {
    /// Creates a status from a raw code.
    pub fn from_code(code: u32) -> Self {
        Self {
            code,
            severity: StatusSeverity::from_code(code),
        }
    }

    /// Returns `true` when the severity is good.
    pub fn is_good(&self) -> bool {
        self.severity == StatusSeverity::Good
    }
}

/// Value of a single OPC UA node read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeReading {
    /// Canonical node id that was read.
    pub node_id: String,
    /// The value, `null` when the server returned none.
    pub value: Value,
    /// Per-result status.
    pub status: NodeStatus,
    /// Source timestamp.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_timestamp: Option<DateTime<Utc>>,
    /// Server timestamp.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_timestamp: Option<DateTime<Utc>>,
}

// =============================================================================
// SDK
// =============================================================================

/// A vendor SDK reading for one device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SdkReading {
    /// Device (alias) the reading belongs to.
    pub device: String,
    /// SDK method that produced it.
    pub method: String,
    /// Reported value.
    pub value: Value,
    /// Time the reading was taken.
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_status_severity() {
        assert_eq!(StatusSeverity::from_code(0), StatusSeverity::Good);
        assert_eq!(StatusSeverity::from_code(0x4092_0000), StatusSeverity::Uncertain);
        assert_eq!(StatusSeverity::from_code(0x8034_0000), StatusSeverity::Bad);
        assert!(NodeStatus::from_code(0).is_good());
    }

    #[test]
    fn test_http_output_serializes_flat() {
        let mut headers = BTreeMap::new();
        headers.insert("content-type".to_string(), vec!["application/json".to_string()]);
        let output = FetchOutput::Http(HttpResponse {
            status_code: 200,
            status: "200 OK".to_string(),
            headers,
            body: json!({"ok": true}),
        });

        let value = output.to_value();
        assert_eq!(value["status_code"], 200);
        assert_eq!(value["body"]["ok"], true);
        assert_eq!(output.as_http().and_then(|r| r.header("Content-Type")), Some("application/json"));
    }

    #[test]
    fn test_empty_series_is_array() {
        let output = FetchOutput::Series(Vec::new());
        assert_eq!(output.to_value(), json!([]));
    }
}
