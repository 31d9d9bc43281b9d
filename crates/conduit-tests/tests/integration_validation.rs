// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Validation Integration Tests
//!
//! The sanitizer as every consumer sees it: drivers are built from its output
//! and the canonical text is what gets stored.
//!
//! - `test_scenario_*`: end-to-end scenarios
//! - `test_law_*`: properties that hold for every platform and resource type

use conduit_core::error::ConfigError;
use conduit_core::sanitize::{
    validate, validate_details, validate_metadata, validate_resource_batch, ConfigKind, ResourceDraft,
};
use conduit_core::schema::{HttpMethod, ResourceDetails};
use conduit_core::types::{PlatformType, ResourceType};
use conduit_rest::RestDriver;
use serde_json::json;

// =============================================================================
// Scenarios
// =============================================================================

#[test]
fn test_scenario_a_rest_url_construction() -> anyhow::Result<()> {
    let metadata = validate_metadata("REST", r#"{"base_endpoint":"https://api.example.com","auth":{"type":"none"}}"#)?;
    let details = validate_details("rest_endpoint", r#"{"method":"get","path":"assets"}"#)?;

    let rest = match details.get() {
        ResourceDetails::Rest(d) => d,
        other => anyhow::bail!("expected REST details, got {:?}", other),
    };
    assert_eq!(rest.method, HttpMethod::Get);
    assert_eq!(rest.path, "/assets");
    assert!(details.canonical().contains(r#""method":"GET""#));

    let driver = RestDriver::new("erp", &metadata)?;
    assert_eq!(driver.resource_url(rest).as_str(), "https://api.example.com/assets");
    Ok(())
}

#[test]
fn test_scenario_b_missing_base_endpoint() {
    let err = validate_metadata("REST", r#"{"auth":{"type":"none"}}"#).unwrap_err();
    assert_eq!(err, ConfigError::missing_field("base_endpoint"));
    assert_eq!(err.error_type(), "missing_field");
}

#[test]
fn test_scenario_c_time_range_without_sign() {
    let err = validate_details(
        "timeseries_query",
        r#"{"bucket":"b","measurement":"m","field":"f","time_range":"1h"}"#,
    )
    .unwrap_err();
    assert_eq!(err, ConfigError::InvalidTimeRange { value: "1h".to_string() });
}

// =============================================================================
// Laws
// =============================================================================

#[test]
fn test_law_sanitizing_twice_is_byte_stable() {
    let metadata = [
        (PlatformType::Rest, json!({"base_endpoint": " https://API.example.com/v1/../v2 ", "auth": {"type": "bearer", "bearer_token": " t "}})),
        (PlatformType::TimeSeries, json!({"url": "http://influx:8086", "token": "t", "org": "o", "bucket": "b"})),
        (PlatformType::OpcUa, json!({"endpoint": "opc.tcp://plc:4840", "username": " op ", "password": "pw"})),
        (PlatformType::Sdk, json!({"endpoint": "sdk://v", "access_key": " a ", "secret_key": "s"})),
    ];
    for (platform_type, raw) in metadata {
        let kind = ConfigKind::Metadata(platform_type);
        let first = validate(&raw.to_string(), kind).unwrap();
        let second = validate(&first, kind).unwrap();
        assert_eq!(first, second, "{platform_type}");
    }

    let details = [
        (ResourceType::RestEndpoint, json!({"method": "post", "path": "a/../b", "body": {"x": 1}, "query_params": {" k ": "v"}})),
        (ResourceType::TimeSeriesQuery, json!({"bucket": "b", "measurement": "m", "field": "f", "time_range": " -30m "})),
        (ResourceType::OpcUaNode, json!({"node_id": "ns=2;s=Boiler.Temp"})),
        (ResourceType::SdkMethod, json!({"method": "read", "channel": 3})),
    ];
    for (resource_type, raw) in details {
        let kind = ConfigKind::Details(resource_type);
        let first = validate(&raw.to_string(), kind).unwrap();
        let second = validate(&first, kind).unwrap();
        assert_eq!(first, second, "{resource_type}");
    }
}

#[test]
fn test_law_auth_none_strips_credentials() {
    let raw = json!({
        "base_endpoint": "https://api.example.com",
        "auth": {
            "type": "none",
            "api_key": "stale",
            "bearer_token": "stale",
            "basic_auth": {"username": "u", "password": "p"}
        }
    });
    let canonical = validate(&raw.to_string(), ConfigKind::Metadata(PlatformType::Rest)).unwrap();
    for secret in ["api_key", "bearer_token", "basic_auth", "stale"] {
        assert!(!canonical.contains(secret), "{secret} leaked into {canonical}");
    }
}

#[test]
fn test_law_time_range_grammar() {
    for good in ["-1h", "-15m", "-30s", "-7d", "-2w", "-1y", " -90m "] {
        let raw = json!({"bucket": "b", "measurement": "m", "field": "f", "time_range": good}).to_string();
        let details = validate_details("timeseries_query", &raw).unwrap();
        match details.get() {
            ResourceDetails::TimeSeries(d) => assert_eq!(d.time_range, good.trim()),
            other => panic!("unexpected {:?}", other),
        }
    }
    for bad in ["1h", "-h", "-1", "-1.5h", "-1H", "now", "-1mo"] {
        let raw = json!({"bucket": "b", "measurement": "m", "field": "f", "time_range": bad}).to_string();
        assert!(
            matches!(validate_details("timeseries_query", &raw), Err(ConfigError::InvalidTimeRange { .. })),
            "{bad}"
        );
    }
}

#[test]
fn test_law_paths_stay_under_base() {
    let metadata = validate_metadata("REST", r#"{"base_endpoint":"https://api.example.com/v1/"}"#).unwrap();
    let driver = RestDriver::new("erp", &metadata).unwrap();

    for raw in ["../../admin", "a/../../b", "%2e%2e/%2e%2e/secret", "./x/./y"] {
        let details = validate_details("rest_endpoint", &json!({"method": "GET", "path": raw}).to_string()).unwrap();
        let rest = match details.get() {
            ResourceDetails::Rest(d) => d,
            other => panic!("unexpected {:?}", other),
        };
        assert!(!rest.path.contains(".."), "{raw} -> {}", rest.path);
        let url = driver.resource_url(rest);
        assert!(url.as_str().starts_with("https://api.example.com/v1/"), "{raw} -> {url}");
    }
}

#[test]
fn test_law_type_strings_are_exact() {
    assert!(validate_metadata("rest", "{}").is_err());
    assert!(matches!(
        validate_details("REST_ENDPOINT", "{}"),
        Err(ConfigError::UnsupportedResourceType { .. })
    ));
    assert!(validate_metadata("InfluxDB", r#"{"url":"http://i:8086","token":"t","org":"o","bucket":"b"}"#).is_ok());
}

#[test]
fn test_batch_validation_keeps_good_drafts() {
    let drafts = vec![
        ResourceDraft {
            name: " temp ".to_string(),
            resource_type: "opcua_node".to_string(),
            details: json!({"node_id": "ns=2;i=1001"}),
        },
        ResourceDraft {
            name: "history".to_string(),
            resource_type: "timeseries_query".to_string(),
            details: json!({"bucket": "b", "measurement": "m", "field": "f", "time_range": "yesterday"}),
        },
        ResourceDraft {
            name: "assets".to_string(),
            resource_type: "rest_endpoint".to_string(),
            details: json!(r#"{"method":"GET","path":"assets"}"#),
        },
    ];

    let outcome = validate_resource_batch(&drafts);
    let accepted: Vec<(usize, &str)> = outcome.accepted.iter().map(|a| (a.index, a.name.as_str())).collect();
    assert_eq!(accepted, vec![(0, "temp"), (2, "assets")]);
    assert_eq!(outcome.errors.len(), 1);
    assert_eq!(outcome.errors[0].index, 1);
    assert_eq!(outcome.errors[0].error.error_type(), "invalid_time_range");
}
