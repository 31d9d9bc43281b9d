// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Validation and sanitization of untrusted configuration.
//!
//! Raw metadata and details arrive as JSON text. The functions here parse
//! them into lenient input shapes, enforce required fields, normalize values
//! and seal the result into a [`Sanitized`] value. `Sanitized` can only be
//! built inside this module, so a driver that accepts
//! `&Sanitized<ResourceDetails>` can never see input that skipped validation.
//!
//! ```text
//!  raw JSON ──parse──► Raw* ──normalize──► schema type ──seal──► Sanitized<T>
//!                                                                   │
//!                                              canonical JSON ◄─────┘
//! ```
//!
//! All validators are pure: no I/O, no randomness, and sealing the canonical
//! output again yields the same bytes.

use std::collections::BTreeMap;
use std::fmt;
use std::ops::Deref;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::address::NodeId;
use crate::error::ConfigError;
use crate::schema::{
    BasicAuth, HttpMethod, OpcUaDetails, OpcUaMetadata, PlatformMetadata, ResourceDetails,
    RestAuth, RestDetails, RestMetadata, SdkDetails, SdkMetadata, Secret, TimeSeriesDetails,
    TimeSeriesMetadata, DEFAULT_TIMEOUT_SECS,
};
use crate::types::{PlatformType, ResourceType};

/// Path token replaced by the device alias.
pub const ALIAS_PLACEHOLDER: &str = ":device_alias";

/// Query parameter carrying the alias when the path has no placeholder.
pub const ALIAS_QUERY_PARAM: &str = "device_alias";

/// Override key for the time-series range.
pub const OVERRIDE_TIME_RANGE: &str = "time_range";

/// Override key for the time-series field.
pub const OVERRIDE_FIELD: &str = "field";

/// Override key for the OPC UA node.
pub const OVERRIDE_NODE_ID: &str = "node_id";

/// Negative duration: `-` then digits then one unit.
static TIME_RANGE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^-[0-9]+[smhdwy]$").expect("Failed to compile time range pattern"));

// =============================================================================
// Sanitized
// =============================================================================

/// A value that passed validation, together with its canonical JSON form.
#[derive(Debug, Clone, PartialEq)]
pub struct Sanitized<T> {
    value: T,
    canonical: String,
}

impl<T: Serialize> Sanitized<T> {
    fn seal(kind: &str, value: T) -> Result<Self, ConfigError> {
        let canonical = serde_json::to_string(&value).map_err(|e| ConfigError::Serialization {
            kind: kind.to_string(),
            message: e.to_string(),
        })?;
        Ok(Self { value, canonical })
    }
}

impl<T> Sanitized<T> {
    /// The validated value.
    pub fn get(&self) -> &T {
        &self.value
    }

    /// Canonical JSON text; the only form that may be persisted or forwarded.
    pub fn canonical(&self) -> &str {
        &self.canonical
    }

    /// Unwraps the validated value.
    pub fn into_inner(self) -> T {
        self.value
    }
}

impl<T> Deref for Sanitized<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.value
    }
}

impl<T: Serialize> Serialize for Sanitized<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.value.serialize(serializer)
    }
}

// =============================================================================
// Entry points
// =============================================================================

/// Which schema a document is validated against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigKind {
    /// Platform metadata.
    Metadata(PlatformType),
    /// Resource details.
    Details(ResourceType),
}

impl fmt::Display for ConfigKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigKind::Metadata(t) => write!(f, "{} metadata", t),
            ConfigKind::Details(t) => write!(f, "{} details", t),
        }
    }
}

/// Validates `raw` against `kind` and returns the canonical JSON text.
pub fn validate(raw: &str, kind: ConfigKind) -> Result<String, ConfigError> {
    match kind {
        ConfigKind::Metadata(t) => validate_metadata_for(t, raw).map(|s| s.canonical),
        ConfigKind::Details(t) => validate_details_for(t, raw).map(|s| s.canonical),
    }
}

/// Validates metadata for a platform type given as its stored string.
///
/// This is the single entry point used by create, update and
/// connection-test paths alike.
pub fn validate_metadata(platform_type: &str, raw: &str) -> Result<Sanitized<PlatformMetadata>, ConfigError> {
    let platform_type: PlatformType = platform_type.parse()?;
    validate_metadata_for(platform_type, raw)
}

/// Validates metadata for a known platform type.
pub fn validate_metadata_for(
    platform_type: PlatformType,
    raw: &str,
) -> Result<Sanitized<PlatformMetadata>, ConfigError> {
    let kind = ConfigKind::Metadata(platform_type).to_string();
    let result = match platform_type {
        PlatformType::Rest => rest_metadata(&kind, raw).map(PlatformMetadata::Rest),
        PlatformType::TimeSeries => timeseries_metadata(&kind, raw).map(PlatformMetadata::TimeSeries),
        PlatformType::OpcUa => opcua_metadata(&kind, raw).map(PlatformMetadata::OpcUa),
        PlatformType::Sdk => sdk_metadata(&kind, raw).map(PlatformMetadata::Sdk),
    };
    match result {
        Ok(value) => Sanitized::seal(&kind, value),
        Err(e) => {
            debug!(kind = %kind, error = %e, "Rejected platform metadata");
            Err(e)
        }
    }
}

/// Validates details for a resource type given as its stored string.
pub fn validate_details(resource_type: &str, raw: &str) -> Result<Sanitized<ResourceDetails>, ConfigError> {
    let resource_type: ResourceType = resource_type.parse()?;
    validate_details_for(resource_type, raw)
}

/// Validates details for a known resource type.
pub fn validate_details_for(
    resource_type: ResourceType,
    raw: &str,
) -> Result<Sanitized<ResourceDetails>, ConfigError> {
    let kind = ConfigKind::Details(resource_type).to_string();
    let result = match resource_type {
        ResourceType::RestEndpoint => rest_details(&kind, raw).map(ResourceDetails::Rest),
        ResourceType::TimeSeriesQuery => timeseries_details(&kind, raw).map(ResourceDetails::TimeSeries),
        ResourceType::OpcUaNode => opcua_details(&kind, raw).map(ResourceDetails::OpcUa),
        ResourceType::SdkMethod => sdk_details(&kind, raw).map(ResourceDetails::Sdk),
    };
    match result {
        Ok(value) => Sanitized::seal(&kind, value),
        Err(e) => {
            debug!(kind = %kind, error = %e, "Rejected resource details");
            Err(e)
        }
    }
}

// =============================================================================
// Helpers
// =============================================================================

fn parse<T: DeserializeOwned>(kind: &str, raw: &str) -> Result<T, ConfigError> {
    serde_json::from_str(raw).map_err(|e| ConfigError::malformed(kind, e.to_string()))
}

/// Trims and requires a non-empty value.
fn required(value: Option<String>, field: &str) -> Result<String, ConfigError> {
    match value.map(|v| v.trim().to_string()) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(ConfigError::missing_field(field)),
    }
}

/// Trims and maps empty to `None`.
fn optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Looks up an override, treating blank values as absent.
fn non_blank<'a>(overrides: &'a BTreeMap<String, String>, key: &str) -> Option<&'a str> {
    overrides.get(key).map(|v| v.trim()).filter(|v| !v.is_empty())
}

fn timeout_or_default(timeout: Option<u64>) -> u64 {
    match timeout {
        Some(t) if t > 0 => t,
        _ => DEFAULT_TIMEOUT_SECS,
    }
}

/// Parses an absolute URL with one of `schemes` and re-renders it canonically.
fn canonical_url(field: &str, raw: &str, schemes: &[&str]) -> Result<String, ConfigError> {
    let mut url = Url::parse(raw).map_err(|e| ConfigError::invalid_endpoint(field, raw, e.to_string()))?;

    if !schemes.contains(&url.scheme()) {
        return Err(ConfigError::invalid_endpoint(
            field,
            raw,
            format!("scheme must be one of {}", schemes.join(", ")),
        ));
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(ConfigError::invalid_endpoint(field, raw, "host is empty"));
    }
    if !url.username().is_empty() || url.password().is_some() {
        return Err(ConfigError::invalid_endpoint(
            field,
            raw,
            "credentials must not be embedded in the URL",
        ));
    }
    url.set_fragment(None);
    Ok(url.to_string())
}

fn has_control_chars(s: &str) -> bool {
    s.chars().any(char::is_control)
}

/// Trims keys and values, rejecting empty keys and control characters.
fn clean_map(field: &str, map: BTreeMap<String, String>) -> Result<BTreeMap<String, String>, ConfigError> {
    let mut out = BTreeMap::new();
    for (key, value) in map {
        let key = key.trim();
        let value = value.trim();
        if key.is_empty() {
            return Err(ConfigError::invalid_field(field, "keys must not be empty"));
        }
        if has_control_chars(key) || has_control_chars(value) {
            return Err(ConfigError::invalid_field(
                field,
                format!("'{}' contains control characters", key),
            ));
        }
        out.insert(key.to_string(), value.to_string());
    }
    Ok(out)
}

#[derive(PartialEq)]
enum Dots {
    One,
    Two,
}

fn dot_segment(segment: &str) -> Option<Dots> {
    match segment.to_ascii_lowercase().as_str() {
        "." | "%2e" => Some(Dots::One),
        ".." | ".%2e" | "%2e." | "%2e%2e" => Some(Dots::Two),
        _ => None,
    }
}

/// Normalizes a path to a single leading `/`, collapsing repeated
/// separators and resolving `.`/`..` segments (percent-encoded dots
/// included). The result never climbs above `/`.
pub fn clean_path(raw: &str) -> String {
    let mut stack: Vec<&str> = Vec::new();
    for segment in raw.split('/') {
        if segment.is_empty() {
            continue;
        }
        match dot_segment(segment) {
            Some(Dots::One) => {}
            Some(Dots::Two) => {
                stack.pop();
            }
            None => stack.push(segment),
        }
    }
    format!("/{}", stack.join("/"))
}

/// Returns `true` for negative durations such as `-1h`, `-30m` or `-7d`.
pub fn is_valid_time_range(value: &str) -> bool {
    TIME_RANGE.is_match(value)
}

/// Trims and checks a time range.
pub fn validate_time_range(value: &str) -> Result<String, ConfigError> {
    let trimmed = value.trim();
    if is_valid_time_range(trimmed) {
        Ok(trimmed.to_string())
    } else {
        Err(ConfigError::invalid_time_range(value))
    }
}

/// Percent-encodes an alias for use as one path segment.
fn encode_path_segment(alias: &str) -> String {
    let mut out = String::with_capacity(alias.len());
    for byte in alias.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => out.push(byte as char),
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    out
}

// =============================================================================
// REST
// =============================================================================

#[derive(Deserialize)]
struct RawRestMetadata {
    base_endpoint: Option<String>,
    auth: Option<RawAuth>,
    #[serde(alias = "timeout_seconds")]
    timeout: Option<u64>,
}

#[derive(Deserialize, Default)]
struct RawAuth {
    #[serde(rename = "type")]
    auth_type: Option<String>,
    api_key: Option<String>,
    bearer_token: Option<String>,
    basic_auth: Option<RawBasicAuth>,
}

#[derive(Deserialize)]
struct RawBasicAuth {
    username: Option<String>,
    password: Option<String>,
}

fn rest_metadata(kind: &str, raw: &str) -> Result<RestMetadata, ConfigError> {
    let input: RawRestMetadata = parse(kind, raw)?;
    let base = required(input.base_endpoint, "base_endpoint")?;
    let base_endpoint = canonical_url("base_endpoint", &base, &["http", "https"])?;

    let auth = input.auth.unwrap_or_default();
    let auth_type = optional(auth.auth_type).unwrap_or_else(|| "none".to_string());
    // Only the credentials of the selected scheme survive; leftovers are dropped.
    let auth = match auth_type.as_str() {
        "none" => RestAuth::None,
        "api_key" => RestAuth::ApiKey {
            api_key: Secret::new(required(auth.api_key, "auth.api_key")?),
        },
        "bearer" => RestAuth::Bearer {
            bearer_token: Secret::new(required(auth.bearer_token, "auth.bearer_token")?),
        },
        "basic" => {
            let basic = auth
                .basic_auth
                .ok_or_else(|| ConfigError::missing_field("auth.basic_auth"))?;
            RestAuth::Basic {
                basic_auth: BasicAuth {
                    username: required(basic.username, "auth.basic_auth.username")?,
                    password: Secret::new(required(basic.password, "auth.basic_auth.password")?),
                },
            }
        }
        other => {
            return Err(ConfigError::invalid_field(
                "auth.type",
                format!("'{}' is not one of none, api_key, bearer, basic", other),
            ))
        }
    };

    Ok(RestMetadata {
        base_endpoint,
        auth,
        timeout: timeout_or_default(input.timeout),
    })
}

#[derive(Deserialize)]
struct RawRestDetails {
    method: Option<String>,
    path: Option<String>,
    #[serde(default)]
    headers: Option<BTreeMap<String, String>>,
    #[serde(default)]
    query_params: Option<BTreeMap<String, String>>,
    #[serde(default)]
    body: Option<Value>,
}

fn rest_details(kind: &str, raw: &str) -> Result<RestDetails, ConfigError> {
    let input: RawRestDetails = parse(kind, raw)?;

    let method = required(input.method, "method")?.to_ascii_uppercase();
    let method = HttpMethod::from_upper(&method).ok_or_else(|| {
        ConfigError::invalid_field("method", format!("'{}' is not one of GET, POST, PUT, DELETE", method))
    })?;

    let path = required(input.path, "path")?;
    if path.contains('?') || path.contains('#') {
        return Err(ConfigError::invalid_field(
            "path",
            "must not contain a query or fragment, use query_params",
        ));
    }
    if has_control_chars(&path) {
        return Err(ConfigError::invalid_field("path", "contains control characters"));
    }
    let path = clean_path(&path);
    if path == "/" {
        return Err(ConfigError::invalid_field(
            "path",
            "must address a resource below the base endpoint",
        ));
    }

    let headers = clean_map("headers", input.headers.unwrap_or_default())?;
    let query_params = clean_map("query_params", input.query_params.unwrap_or_default())?;

    let body = match input.body {
        None | Some(Value::Null) => None,
        Some(Value::String(text)) if text.trim().is_empty() => None,
        Some(Value::String(text)) => {
            let parsed: Value = serde_json::from_str(&text)
                .map_err(|e| ConfigError::invalid_field("body", format!("not valid JSON: {}", e)))?;
            Some(parsed.to_string())
        }
        Some(structured) => Some(structured.to_string()),
    };

    Ok(RestDetails {
        method,
        path,
        headers,
        query_params,
        body,
    })
}

// =============================================================================
// Time series
// =============================================================================

#[derive(Deserialize)]
struct RawTimeSeriesMetadata {
    url: Option<String>,
    token: Option<String>,
    org: Option<String>,
    bucket: Option<String>,
    #[serde(alias = "timeout_seconds")]
    timeout: Option<u64>,
}

fn timeseries_metadata(kind: &str, raw: &str) -> Result<TimeSeriesMetadata, ConfigError> {
    let input: RawTimeSeriesMetadata = parse(kind, raw)?;
    let url = required(input.url, "url")?;
    Ok(TimeSeriesMetadata {
        url: canonical_url("url", &url, &["http", "https"])?,
        token: Secret::new(required(input.token, "token")?),
        org: required(input.org, "org")?,
        bucket: required(input.bucket, "bucket")?,
        timeout: timeout_or_default(input.timeout),
    })
}

#[derive(Deserialize)]
struct RawTimeSeriesDetails {
    bucket: Option<String>,
    measurement: Option<String>,
    field: Option<String>,
    time_range: Option<String>,
}

fn timeseries_details(kind: &str, raw: &str) -> Result<TimeSeriesDetails, ConfigError> {
    let input: RawTimeSeriesDetails = parse(kind, raw)?;
    let bucket = required(input.bucket, "bucket")?;
    let measurement = required(input.measurement, "measurement")?;
    let field = required(input.field, "field")?;
    let time_range = required(input.time_range, "time_range")?;
    Ok(TimeSeriesDetails {
        bucket,
        measurement,
        field,
        time_range: validate_time_range(&time_range)?,
    })
}

// =============================================================================
// OPC UA
// =============================================================================

#[derive(Deserialize)]
struct RawOpcUaMetadata {
    endpoint: Option<String>,
    username: Option<String>,
    password: Option<String>,
    #[serde(alias = "timeout_seconds")]
    timeout: Option<u64>,
    reconnect_interval: Option<u64>,
}

fn opcua_metadata(kind: &str, raw: &str) -> Result<OpcUaMetadata, ConfigError> {
    let input: RawOpcUaMetadata = parse(kind, raw)?;
    let endpoint = required(input.endpoint, "endpoint")?;
    let endpoint = canonical_url("endpoint", &endpoint, &["opc.tcp"])?;

    let username = optional(input.username);
    let password = optional(input.password);
    match (&username, &password) {
        (Some(_), None) => return Err(ConfigError::missing_field("password")),
        (None, Some(_)) => return Err(ConfigError::missing_field("username")),
        _ => {}
    }

    let timeout = timeout_or_default(input.timeout);
    let reconnect_interval = match input.reconnect_interval {
        Some(r) if r > 0 => r,
        _ => timeout,
    };

    Ok(OpcUaMetadata {
        endpoint,
        username,
        password: password.map(Secret::new),
        timeout,
        reconnect_interval,
    })
}

#[derive(Deserialize)]
struct RawOpcUaDetails {
    node_id: Option<String>,
}

fn opcua_details(kind: &str, raw: &str) -> Result<OpcUaDetails, ConfigError> {
    let input: RawOpcUaDetails = parse(kind, raw)?;
    let node_id: NodeId = required(input.node_id, "node_id")?.parse()?;
    Ok(OpcUaDetails {
        node_id: node_id.to_string(),
    })
}

// =============================================================================
// SDK
// =============================================================================

#[derive(Deserialize)]
struct RawSdkMetadata {
    endpoint: Option<String>,
    access_key: Option<String>,
    secret_key: Option<String>,
    #[serde(alias = "timeout_seconds")]
    timeout: Option<u64>,
}

fn sdk_metadata(kind: &str, raw: &str) -> Result<SdkMetadata, ConfigError> {
    let input: RawSdkMetadata = parse(kind, raw)?;
    let endpoint = required(input.endpoint, "endpoint")?;
    if has_control_chars(&endpoint) {
        return Err(ConfigError::invalid_endpoint("endpoint", &endpoint, "contains control characters"));
    }
    Ok(SdkMetadata {
        endpoint,
        access_key: required(input.access_key, "access_key")?,
        secret_key: Secret::new(required(input.secret_key, "secret_key")?),
        timeout: timeout_or_default(input.timeout),
    })
}

#[derive(Deserialize)]
struct RawSdkDetails {
    method: Option<String>,
    device: Option<String>,
    #[serde(flatten)]
    params: BTreeMap<String, Value>,
}

fn sdk_details(kind: &str, raw: &str) -> Result<SdkDetails, ConfigError> {
    let input: RawSdkDetails = parse(kind, raw)?;
    Ok(SdkDetails {
        method: optional(input.method).unwrap_or_else(|| "read".to_string()),
        device: optional(input.device),
        params: input.params,
    })
}

// =============================================================================
// Fetch-time adjustments
// =============================================================================

impl Sanitized<ResourceDetails> {
    /// Injects a device alias into the resource address.
    ///
    /// - REST: replaces every `:device_alias` in the path with the encoded
    ///   alias, or adds a `device_alias` query parameter.
    /// - Time series: the alias becomes the measurement.
    /// - SDK: the alias becomes the device.
    /// - OPC UA: unchanged; callers pass an explicit `node_id` override.
    ///
    /// The adjusted details are validated again before being returned.
    pub fn with_alias(&self, alias: &str) -> Result<Self, ConfigError> {
        let alias = alias.trim();
        if alias.is_empty() {
            return Ok(self.clone());
        }

        let adjusted = match &self.value {
            ResourceDetails::Rest(details) => {
                let mut details = details.clone();
                if details.path.contains(ALIAS_PLACEHOLDER) {
                    let encoded = encode_path_segment(alias);
                    let mut segments = Vec::new();
                    for segment in details.path.split('/') {
                        if !segment.contains(ALIAS_PLACEHOLDER) {
                            segments.push(segment.to_string());
                            continue;
                        }
                        let replaced = segment.replace(ALIAS_PLACEHOLDER, &encoded);
                        if dot_segment(&replaced).is_some() {
                            return Err(ConfigError::invalid_field("alias", "must not form a dot segment"));
                        }
                        segments.push(replaced);
                    }
                    details.path = segments.join("/");
                } else {
                    details
                        .query_params
                        .insert(ALIAS_QUERY_PARAM.to_string(), alias.to_string());
                }
                ResourceDetails::Rest(details)
            }
            ResourceDetails::TimeSeries(details) => {
                let mut details = details.clone();
                details.measurement = alias.to_string();
                ResourceDetails::TimeSeries(details)
            }
            ResourceDetails::OpcUa(_) => return Ok(self.clone()),
            ResourceDetails::Sdk(details) => {
                let mut details = details.clone();
                details.device = Some(alias.to_string());
                ResourceDetails::Sdk(details)
            }
        };
        self.revalidate(&adjusted)
    }

    /// Applies caller-supplied query overrides.
    ///
    /// `time_range` and `field` apply to time-series queries, `node_id` to
    /// OPC UA reads; every other key is merged into REST query parameters,
    /// replacing stored values. Keys that do not apply to the resource kind
    /// are ignored, as are blank `time_range`, `field` and `node_id` values.
    pub fn with_overrides(&self, overrides: &BTreeMap<String, String>) -> Result<Self, ConfigError> {
        if overrides.is_empty() {
            return Ok(self.clone());
        }

        let adjusted = match &self.value {
            ResourceDetails::Rest(details) => {
                let mut details = details.clone();
                for (key, value) in overrides {
                    if matches!(key.as_str(), OVERRIDE_TIME_RANGE | OVERRIDE_FIELD | OVERRIDE_NODE_ID) {
                        continue;
                    }
                    details.query_params.insert(key.clone(), value.clone());
                }
                ResourceDetails::Rest(details)
            }
            ResourceDetails::TimeSeries(details) => {
                let mut details = details.clone();
                if let Some(range) = non_blank(overrides, OVERRIDE_TIME_RANGE) {
                    details.time_range = validate_time_range(range)?;
                }
                if let Some(field) = non_blank(overrides, OVERRIDE_FIELD) {
                    details.field = field.to_string();
                }
                ResourceDetails::TimeSeries(details)
            }
            ResourceDetails::OpcUa(details) => {
                let mut details = details.clone();
                if let Some(node) = non_blank(overrides, OVERRIDE_NODE_ID) {
                    details.node_id = node.parse::<NodeId>()?.to_string();
                }
                ResourceDetails::OpcUa(details)
            }
            ResourceDetails::Sdk(_) => return Ok(self.clone()),
        };
        self.revalidate(&adjusted)
    }

    fn revalidate(&self, adjusted: &ResourceDetails) -> Result<Self, ConfigError> {
        let kind = ConfigKind::Details(adjusted.resource_type()).to_string();
        let raw = serde_json::to_string(adjusted).map_err(|e| ConfigError::Serialization {
            kind,
            message: e.to_string(),
        })?;
        validate_details_for(adjusted.resource_type(), &raw)
    }
}

// =============================================================================
// Batch validation
// =============================================================================

/// One resource submitted in a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceDraft {
    /// Resource name.
    pub name: String,
    /// Resource type string.
    #[serde(rename = "type")]
    pub resource_type: String,
    /// Raw details; either JSON text or an inline object.
    pub details: Value,
}

/// A draft that passed validation.
#[derive(Debug, Clone)]
pub struct AcceptedResource {
    /// Position in the submitted batch.
    pub index: usize,
    /// Trimmed name.
    pub name: String,
    /// Parsed resource type.
    pub resource_type: ResourceType,
    /// Sanitized details.
    pub details: Sanitized<ResourceDetails>,
}

/// A draft that failed validation.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchError {
    /// Position in the submitted batch.
    pub index: usize,
    /// The failure.
    pub error: ConfigError,
}

impl fmt::Display for BatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "resource {}: {}", self.index, self.error)
    }
}

/// Outcome of [`validate_resource_batch`].
#[derive(Debug, Clone, Default)]
pub struct BatchOutcome {
    /// Drafts that passed.
    pub accepted: Vec<AcceptedResource>,
    /// Drafts that failed, in submission order.
    pub errors: Vec<BatchError>,
}

/// Validates every draft independently; one bad draft does not reject the rest.
pub fn validate_resource_batch(drafts: &[ResourceDraft]) -> BatchOutcome {
    let mut outcome = BatchOutcome::default();
    for (index, draft) in drafts.iter().enumerate() {
        match validate_draft(draft) {
            Ok((name, resource_type, details)) => outcome.accepted.push(AcceptedResource {
                index,
                name,
                resource_type,
                details,
            }),
            Err(error) => outcome.errors.push(BatchError { index, error }),
        }
    }
    outcome
}

fn validate_draft(
    draft: &ResourceDraft,
) -> Result<(String, ResourceType, Sanitized<ResourceDetails>), ConfigError> {
    let name = required(Some(draft.name.clone()), "name")?;
    let resource_type: ResourceType = draft.resource_type.parse()?;
    let raw = match &draft.details {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    };
    let details = validate_details_for(resource_type, &raw)?;
    Ok((name, resource_type, details))
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rest_meta(raw: &str) -> Result<Sanitized<PlatformMetadata>, ConfigError> {
        validate_metadata_for(PlatformType::Rest, raw)
    }

    fn rest(raw: &str) -> Result<Sanitized<ResourceDetails>, ConfigError> {
        validate_details_for(ResourceType::RestEndpoint, raw)
    }

    fn rest_details_of(s: &Sanitized<ResourceDetails>) -> &RestDetails {
        match s.get() {
            ResourceDetails::Rest(d) => d,
            other => panic!("expected REST details, got {:?}", other),
        }
    }

    #[test]
    fn test_rest_scenario_canonical_form() {
        let meta = rest_meta(r#"{"base_endpoint":"https://api.example.com","auth":{"type":"none"}}"#).unwrap();
        assert_eq!(
            meta.canonical(),
            r#"{"base_endpoint":"https://api.example.com/","auth":{"type":"none"},"timeout":10}"#
        );

        let details = rest(r#"{"method":"get","path":"assets"}"#).unwrap();
        let d = rest_details_of(&details);
        assert_eq!(d.method, HttpMethod::Get);
        assert_eq!(d.path, "/assets");
        assert!(d.headers.is_empty());
        assert!(d.query_params.is_empty());
    }

    #[test]
    fn test_missing_base_endpoint() {
        let err = rest_meta(r#"{"auth":{"type":"none"}}"#).unwrap_err();
        assert_eq!(err, ConfigError::missing_field("base_endpoint"));
    }

    #[test]
    fn test_malformed_json() {
        let err = rest_meta("{not json").unwrap_err();
        assert!(matches!(err, ConfigError::MalformedConfig { .. }));

        let err = rest_meta(r#"{"base_endpoint":"https://x","timeout":"ten"}"#).unwrap_err();
        assert!(matches!(err, ConfigError::MalformedConfig { .. }));
    }

    #[test]
    fn test_invalid_endpoints() {
        for bad in [
            r#"{"base_endpoint":"ftp://files.example.com"}"#,
            r#"{"base_endpoint":"api.example.com"}"#,
            r#"{"base_endpoint":"https://user:pw@api.example.com"}"#,
            r#"{"base_endpoint":"file:///etc/passwd"}"#,
        ] {
            let err = rest_meta(bad).unwrap_err();
            assert!(matches!(err, ConfigError::InvalidEndpoint { .. }), "{bad}: {err:?}");
        }
    }

    #[test]
    fn test_url_canonicalization_strips_fragment() {
        let meta = rest_meta(r#"{"base_endpoint":"  HTTPS://API.Example.com:443/v1/./x/../#frag "}"#).unwrap();
        match meta.get() {
            PlatformMetadata::Rest(m) => assert_eq!(m.base_endpoint, "https://api.example.com/v1/"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_auth_none_discards_leftover_secrets() {
        let meta = rest_meta(
            r#"{"base_endpoint":"https://api.example.com",
                "auth":{"type":"none","api_key":"stale","bearer_token":"old",
                        "basic_auth":{"username":"u","password":"p"}}}"#,
        )
        .unwrap();
        let canonical = meta.canonical();
        assert!(!canonical.contains("api_key"));
        assert!(!canonical.contains("bearer_token"));
        assert!(!canonical.contains("basic_auth"));
    }

    #[test]
    fn test_auth_defaults_to_none() {
        let meta = rest_meta(r#"{"base_endpoint":"https://api.example.com"}"#).unwrap();
        match meta.get() {
            PlatformMetadata::Rest(m) => assert_eq!(m.auth, RestAuth::None),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_auth_requires_scheme_fields() {
        let err = rest_meta(r#"{"base_endpoint":"https://a.io","auth":{"type":"bearer","bearer_token":"  "}}"#)
            .unwrap_err();
        assert_eq!(err, ConfigError::missing_field("auth.bearer_token"));

        let err = rest_meta(r#"{"base_endpoint":"https://a.io","auth":{"type":"basic","basic_auth":{"username":"u"}}}"#)
            .unwrap_err();
        assert_eq!(err, ConfigError::missing_field("auth.basic_auth.password"));

        let err = rest_meta(r#"{"base_endpoint":"https://a.io","auth":{"type":"oauth"}}"#).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidField { .. }));
    }

    #[test]
    fn test_auth_secrets_trimmed_and_others_dropped() {
        let meta = rest_meta(
            r#"{"base_endpoint":"https://a.io","auth":{"type":"api_key","api_key":"  k1  ","bearer_token":"x"}}"#,
        )
        .unwrap();
        assert_eq!(
            meta.canonical(),
            r#"{"base_endpoint":"https://a.io/","auth":{"type":"api_key","api_key":"k1"},"timeout":10}"#
        );
    }

    #[test]
    fn test_timeout_defaults_and_alias() {
        let meta = rest_meta(r#"{"base_endpoint":"https://a.io","timeout":0}"#).unwrap();
        assert!(meta.canonical().ends_with(r#""timeout":10}"#));

        let meta = rest_meta(r#"{"base_endpoint":"https://a.io","timeout_seconds":30}"#).unwrap();
        assert!(meta.canonical().ends_with(r#""timeout":30}"#));
    }

    #[test]
    fn test_metadata_idempotent() {
        let inputs = [
            r#"{"base_endpoint":"https://api.example.com/v2?x=1","auth":{"type":"basic","basic_auth":{"username":" u ","password":" p "}},"timeout":5}"#,
            r#"{"base_endpoint":"http://10.0.0.1:8080","auth":{"type":"bearer","bearer_token":"t"}}"#,
            r#"{"base_endpoint":"https://api.example.com"}"#,
        ];
        for raw in inputs {
            let first = validate(raw, ConfigKind::Metadata(PlatformType::Rest)).unwrap();
            let second = validate(&first, ConfigKind::Metadata(PlatformType::Rest)).unwrap();
            assert_eq!(first, second);
        }
    }

    #[test]
    fn test_path_cleaning_never_escapes_root() {
        for (raw, expected) in [
            ("assets", "/assets"),
            ("///assets//list/", "/assets/list"),
            ("/a/./b/../c", "/a/c"),
            ("../../etc/passwd", "/etc/passwd"),
            ("a/%2e%2e/%2E%2e/admin", "/admin"),
            ("/v1/:device_alias/data", "/v1/:device_alias/data"),
        ] {
            let details = rest(&json!({"method": "GET", "path": raw}).to_string()).unwrap();
            assert_eq!(rest_details_of(&details).path, expected, "input {raw}");
        }
    }

    #[test]
    fn test_path_resolving_to_root_is_rejected() {
        for raw in ["/", "a/..", "../.."] {
            let err = rest(&json!({"method": "GET", "path": raw}).to_string()).unwrap_err();
            assert!(matches!(err, ConfigError::InvalidField { ref field, .. } if field == "path"), "{raw}");
        }
        let err = rest(r#"{"method":"GET","path":"  "}"#).unwrap_err();
        assert_eq!(err, ConfigError::missing_field("path"));
    }

    #[test]
    fn test_path_with_query_rejected() {
        let err = rest(r#"{"method":"GET","path":"/assets?limit=1"}"#).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidField { .. }));
    }

    #[test]
    fn test_method_validation() {
        let details = rest(r#"{"method":" delete ","path":"x"}"#).unwrap();
        assert_eq!(rest_details_of(&details).method, HttpMethod::Delete);

        let err = rest(r#"{"method":"PATCH","path":"x"}"#).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidField { ref field, .. } if field == "method"));
        assert_eq!(rest(r#"{"path":"x"}"#).unwrap_err(), ConfigError::missing_field("method"));
    }

    #[test]
    fn test_headers_and_query_trimmed() {
        let details = rest(
            r#"{"method":"GET","path":"x","headers":{" X-Tenant ":" a "},"query_params":{" limit":"10 "}}"#,
        )
        .unwrap();
        let d = rest_details_of(&details);
        assert_eq!(d.headers.get("X-Tenant").map(String::as_str), Some("a"));
        assert_eq!(d.query_params.get("limit").map(String::as_str), Some("10"));

        let err = rest(r#"{"method":"GET","path":"x","headers":{"  ":"v"}}"#).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidField { ref field, .. } if field == "headers"));

        let err = rest(r#"{"method":"GET","path":"x","headers":{"X-A":"v\r\nInjected: 1"}}"#).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidField { .. }));
    }

    #[test]
    fn test_body_must_be_json() {
        let details = rest(r#"{"method":"POST","path":"x","body":"{ \"a\" : 1 }"}"#).unwrap();
        assert_eq!(rest_details_of(&details).body.as_deref(), Some(r#"{"a":1}"#));

        let details = rest(r#"{"method":"POST","path":"x","body":{"b":[1,2]}}"#).unwrap();
        assert_eq!(rest_details_of(&details).body.as_deref(), Some(r#"{"b":[1,2]}"#));

        let err = rest(r#"{"method":"POST","path":"x","body":"not json"}"#).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidField { ref field, .. } if field == "body"));
    }

    #[test]
    fn test_details_round_trip_is_byte_stable() {
        let raw = r#"{"method":"post","path":"//a/../b/","headers":{"Z":"1","A":"2"},"query_params":{"q":"x"},"body":"[1, 2]"}"#;
        let first = validate(raw, ConfigKind::Details(ResourceType::RestEndpoint)).unwrap();
        let second = validate(&first, ConfigKind::Details(ResourceType::RestEndpoint)).unwrap();
        assert_eq!(first, second);
        assert_eq!(
            first,
            r#"{"method":"POST","path":"/b","headers":{"A":"2","Z":"1"},"query_params":{"q":"x"},"body":"[1,2]"}"#
        );
    }

    #[test]
    fn test_time_range_grammar() {
        for ok in ["-1h", "-30m", "-7d", "-2w", "-1y", "-45s", "-100d"] {
            assert!(is_valid_time_range(ok), "{ok}");
        }
        for bad in ["1h", "-h", "-1", "-1x", "--1h", "-1h30m", "now", "-1 h", ""] {
            assert!(!is_valid_time_range(bad), "{bad}");
        }
    }

    #[test]
    fn test_timeseries_details() {
        let err = validate_details_for(
            ResourceType::TimeSeriesQuery,
            r#"{"bucket":"b","measurement":"m","field":"f","time_range":"1h"}"#,
        )
        .unwrap_err();
        assert_eq!(err, ConfigError::invalid_time_range("1h"));

        let ok = validate_details_for(
            ResourceType::TimeSeriesQuery,
            r#"{"bucket":" b ","measurement":"m","field":"f","time_range":"  -15m "}"#,
        )
        .unwrap();
        assert_eq!(
            ok.canonical(),
            r#"{"bucket":"b","measurement":"m","field":"f","time_range":"-15m"}"#
        );

        let err = validate_details_for(
            ResourceType::TimeSeriesQuery,
            r#"{"bucket":"b","measurement":"","field":"f","time_range":"-1h"}"#,
        )
        .unwrap_err();
        assert_eq!(err, ConfigError::missing_field("measurement"));
    }

    #[test]
    fn test_timeseries_metadata() {
        let meta = validate_metadata("InfluxDB", r#"{"url":"http://influx:8086","token":" t ","org":"o","bucket":"b"}"#)
            .unwrap();
        assert_eq!(
            meta.canonical(),
            r#"{"url":"http://influx:8086/","token":"t","org":"o","bucket":"b","timeout":10}"#
        );

        let err = validate_metadata("TimeSeries", r#"{"url":"http://influx:8086","org":"o","bucket":"b"}"#)
            .unwrap_err();
        assert_eq!(err, ConfigError::missing_field("token"));
    }

    #[test]
    fn test_opcua_metadata() {
        let meta = validate_metadata(
            "OPCUA",
            r#"{"endpoint":"opc.tcp://plc-01:4840","username":"op","password":"pw","timeout":5}"#,
        )
        .unwrap();
        match meta.get() {
            PlatformMetadata::OpcUa(m) => {
                assert_eq!(m.endpoint, "opc.tcp://plc-01:4840");
                assert_eq!(m.reconnect_interval, 5);
                assert_eq!(m.credentials(), Some(("op", "pw")));
            }
            other => panic!("unexpected {:?}", other),
        }

        let anonymous = validate_metadata("OPCUA", r#"{"endpoint":"opc.tcp://plc-01:4840","username":" "}"#).unwrap();
        assert_eq!(
            anonymous.canonical(),
            r#"{"endpoint":"opc.tcp://plc-01:4840","timeout":10,"reconnect_interval":10}"#
        );

        let err = validate_metadata("OPCUA", r#"{"endpoint":"opc.tcp://plc-01:4840","username":"op"}"#).unwrap_err();
        assert_eq!(err, ConfigError::missing_field("password"));

        let err = validate_metadata("OPCUA", r#"{"endpoint":"http://plc-01:4840"}"#).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEndpoint { .. }));
    }

    #[test]
    fn test_opcua_details_canonical_node_id() {
        let details = validate_details("opcua_node", r#"{"node_id":" ns=0;i=2258 "}"#).unwrap();
        assert_eq!(details.canonical(), r#"{"node_id":"i=2258"}"#);

        let err = validate_details("opcua_node", r#"{"node_id":"Temperature"}"#).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidField { ref field, .. } if field == "node_id"));
    }

    #[test]
    fn test_sdk_validation() {
        let meta = validate_metadata("SDK", r#"{"endpoint":"vendor://gw","access_key":"a","secret_key":"s"}"#).unwrap();
        assert_eq!(meta.get().platform_type(), PlatformType::Sdk);

        let err = validate_metadata("SDK", r#"{"endpoint":"vendor://gw","access_key":"a"}"#).unwrap_err();
        assert_eq!(err, ConfigError::missing_field("secret_key"));

        let details = validate_details("sdk_method", r#"{"channel":3}"#).unwrap();
        assert_eq!(details.canonical(), r#"{"method":"read","channel":3}"#);
        let again = validate(details.canonical(), ConfigKind::Details(ResourceType::SdkMethod)).unwrap();
        assert_eq!(again, details.canonical());

        let err = validate_details("sdk_method", r#"[1,2]"#).unwrap_err();
        assert!(matches!(err, ConfigError::MalformedConfig { .. }));
    }

    #[test]
    fn test_unsupported_type_strings() {
        assert_eq!(
            validate_metadata("MQTT", "{}").unwrap_err(),
            ConfigError::UnsupportedPlatformType { value: "MQTT".into() }
        );
        assert_eq!(
            validate_details("modbus_register", "{}").unwrap_err(),
            ConfigError::UnsupportedResourceType { value: "modbus_register".into() }
        );
    }

    #[test]
    fn test_alias_replaces_placeholder_segment() {
        let details = rest(r#"{"method":"GET","path":"/devices/:device_alias/telemetry"}"#).unwrap();
        let aliased = details.with_alias("pump 7/a").unwrap();
        let d = rest_details_of(&aliased);
        assert_eq!(d.path, "/devices/pump%207%2Fa/telemetry");
        assert!(!d.query_params.contains_key(ALIAS_QUERY_PARAM));

        let err = details.with_alias("..").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidField { ref field, .. } if field == "alias"));
    }

    #[test]
    fn test_alias_replaces_embedded_placeholder() {
        let details = rest(r#"{"method":"GET","path":"/assets/:device_alias.json"}"#).unwrap();
        let aliased = details.with_alias("pump7").unwrap();
        let d = rest_details_of(&aliased);
        assert_eq!(d.path, "/assets/pump7.json");
        assert!(!d.query_params.contains_key(ALIAS_QUERY_PARAM));

        let prefixed = rest(r#"{"method":"GET","path":"/v1/dev-:device_alias/:device_alias"}"#).unwrap();
        let aliased = prefixed.with_alias("a b").unwrap();
        assert_eq!(rest_details_of(&aliased).path, "/v1/dev-a%20b/a%20b");

        let dotted = rest(r#"{"method":"GET","path":"/x/:device_alias./y"}"#).unwrap();
        let err = dotted.with_alias(".").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidField { ref field, .. } if field == "alias"));
    }

    #[test]
    fn test_alias_falls_back_to_query_param() {
        let details = rest(r#"{"method":"GET","path":"/telemetry"}"#).unwrap();
        let aliased = details.with_alias("pump-7").unwrap();
        let d = rest_details_of(&aliased);
        assert_eq!(d.path, "/telemetry");
        assert_eq!(d.query_params.get(ALIAS_QUERY_PARAM).map(String::as_str), Some("pump-7"));
    }

    #[test]
    fn test_alias_overrides_measurement_and_device() {
        let ts = validate_details(
            "timeseries_query",
            r#"{"bucket":"b","measurement":"m","field":"f","time_range":"-1h"}"#,
        )
        .unwrap();
        match ts.with_alias("boiler_3").unwrap().get() {
            ResourceDetails::TimeSeries(d) => assert_eq!(d.measurement, "boiler_3"),
            other => panic!("unexpected {:?}", other),
        }

        let sdk = validate_details("sdk_method", r#"{"method":"status"}"#).unwrap();
        match sdk.with_alias("dev-9").unwrap().get() {
            ResourceDetails::Sdk(d) => assert_eq!(d.device.as_deref(), Some("dev-9")),
            other => panic!("unexpected {:?}", other),
        }

        let node = validate_details("opcua_node", r#"{"node_id":"ns=2;i=5"}"#).unwrap();
        assert_eq!(node.with_alias("ignored").unwrap(), node);
    }

    #[test]
    fn test_overrides() {
        let mut overrides = BTreeMap::new();
        overrides.insert("time_range".to_string(), "-6h".to_string());
        overrides.insert("field".to_string(), " pressure ".to_string());
        overrides.insert("limit".to_string(), "50".to_string());

        let ts = validate_details(
            "timeseries_query",
            r#"{"bucket":"b","measurement":"m","field":"f","time_range":"-1h"}"#,
        )
        .unwrap();
        assert_eq!(
            ts.with_overrides(&overrides).unwrap().canonical(),
            r#"{"bucket":"b","measurement":"m","field":"pressure","time_range":"-6h"}"#
        );

        let details = rest(r#"{"method":"GET","path":"x","query_params":{"limit":"10","page":"1"}}"#).unwrap();
        let merged = details.with_overrides(&overrides).unwrap();
        let d = rest_details_of(&merged);
        assert_eq!(d.query_params.get("limit").map(String::as_str), Some("50"));
        assert_eq!(d.query_params.get("page").map(String::as_str), Some("1"));
        assert!(!d.query_params.contains_key("time_range"));
        assert!(!d.query_params.contains_key("field"));

        overrides.insert("time_range".to_string(), "1h".to_string());
        assert_eq!(ts.with_overrides(&overrides).unwrap_err(), ConfigError::invalid_time_range("1h"));
    }

    #[test]
    fn test_blank_overrides_are_ignored() {
        let mut overrides = BTreeMap::new();
        overrides.insert("time_range".to_string(), "".to_string());
        overrides.insert("field".to_string(), "  ".to_string());
        overrides.insert("node_id".to_string(), " ".to_string());

        let ts = validate_details(
            "timeseries_query",
            r#"{"bucket":"b","measurement":"m","field":"f","time_range":"-1h"}"#,
        )
        .unwrap();
        assert_eq!(ts.with_overrides(&overrides).unwrap(), ts);

        let node = validate_details("opcua_node", r#"{"node_id":"ns=2;i=5"}"#).unwrap();
        assert_eq!(node.with_overrides(&overrides).unwrap(), node);
    }

    #[test]
    fn test_node_id_override() {
        let node = validate_details("opcua_node", r#"{"node_id":"ns=2;i=5"}"#).unwrap();
        let mut overrides = BTreeMap::new();

        overrides.insert("node_id".to_string(), " ns=3;s=Line.Speed ".to_string());
        match node.with_overrides(&overrides).unwrap().get() {
            ResourceDetails::OpcUa(d) => assert_eq!(d.node_id, "ns=3;s=Line.Speed"),
            other => panic!("unexpected {:?}", other),
        }

        overrides.insert("node_id".to_string(), "ns=x;i=1".to_string());
        let err = node.with_overrides(&overrides).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidField { ref field, .. } if field == "node_id"));
    }

    #[test]
    fn test_batch_validation_collects_per_index_errors() {
        let drafts = vec![
            ResourceDraft {
                name: "assets".into(),
                resource_type: "rest_endpoint".into(),
                details: json!({"method": "get", "path": "assets"}),
            },
            ResourceDraft {
                name: "temps".into(),
                resource_type: "timeseries_query".into(),
                details: json!(r#"{"bucket":"b","measurement":"m","field":"f","time_range":"1h"}"#),
            },
            ResourceDraft {
                name: " ".into(),
                resource_type: "opcua_node".into(),
                details: json!({"node_id": "i=85"}),
            },
        ];

        let outcome = validate_resource_batch(&drafts);
        assert_eq!(outcome.accepted.len(), 1);
        assert_eq!(outcome.accepted[0].index, 0);
        assert_eq!(outcome.errors.len(), 2);
        assert_eq!(outcome.errors[0].index, 1);
        assert_eq!(outcome.errors[0].error, ConfigError::invalid_time_range("1h"));
        assert_eq!(outcome.errors[1].to_string(), "resource 2: Missing required field: name");
    }
}
