// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Result shapes returned by the engine.
//!
//! ```text
//! FetchEnvelope
//! ├── device_id, platform_id, alias
//! └── data: FetchReport
//!     ├── "assets"    → FetchOutput           (success)
//!     └── "telemetry" → ResourceFailure       (error, error_type, response?)
//! ```

use std::collections::BTreeMap;

use conduit_core::error::{ConfigError, DriverError};
use conduit_core::output::{FetchOutput, HttpResponse};
use serde::Serialize;

// =============================================================================
// Per-resource outcome
// =============================================================================

/// A per-resource failure recorded in a [`FetchReport`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResourceFailure {
    /// Human-readable message.
    pub error: String,
    /// Stable snake_case error tag.
    pub error_type: String,
    /// Upstream response, when the failure was a non-success HTTP status.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<HttpResponse>,
}

impl From<&DriverError> for ResourceFailure {
    fn from(error: &DriverError) -> Self {
        let response = match error {
            DriverError::UpstreamHttp { response, .. } => Some(response.as_ref().clone()),
            _ => None,
        };
        Self {
            error: error.to_string(),
            error_type: error.error_type().to_string(),
            response,
        }
    }
}

impl From<&ConfigError> for ResourceFailure {
    fn from(error: &ConfigError) -> Self {
        Self {
            error: error.to_string(),
            error_type: error.error_type().to_string(),
            response: None,
        }
    }
}

/// Outcome of one resource in an orchestrated fetch.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ResourceOutcome {
    /// The fetch succeeded.
    Data(FetchOutput),
    /// The resource was rejected or its fetch failed.
    Failed(ResourceFailure),
}

impl ResourceOutcome {
    /// Returns `true` for a successful fetch.
    pub fn is_success(&self) -> bool {
        matches!(self, ResourceOutcome::Data(_))
    }

    /// The output of a successful fetch.
    pub fn data(&self) -> Option<&FetchOutput> {
        match self {
            ResourceOutcome::Data(output) => Some(output),
            ResourceOutcome::Failed(_) => None,
        }
    }

    /// The failure of an unsuccessful fetch.
    pub fn failure(&self) -> Option<&ResourceFailure> {
        match self {
            ResourceOutcome::Data(_) => None,
            ResourceOutcome::Failed(failure) => Some(failure),
        }
    }
}

// =============================================================================
// FetchReport
// =============================================================================

/// Aggregated per-resource results keyed by resource name.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct FetchReport {
    outcomes: BTreeMap<String, ResourceOutcome>,
}

impl FetchReport {
    /// Creates an empty report.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a successful fetch.
    pub fn record_success(&mut self, resource: &str, output: FetchOutput) {
        self.outcomes
            .insert(resource.to_string(), ResourceOutcome::Data(output));
    }

    /// Records a failure.
    pub fn record_failure(&mut self, resource: &str, failure: ResourceFailure) {
        self.outcomes
            .insert(resource.to_string(), ResourceOutcome::Failed(failure));
    }

    /// Outcome for one resource.
    pub fn get(&self, resource: &str) -> Option<&ResourceOutcome> {
        self.outcomes.get(resource)
    }

    /// Iterates outcomes in resource-name order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &ResourceOutcome)> {
        self.outcomes.iter()
    }

    /// Number of recorded resources.
    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    /// Returns `true` if nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    /// Number of successful fetches.
    pub fn success_count(&self) -> usize {
        self.outcomes.values().filter(|o| o.is_success()).count()
    }

    /// Number of failures.
    pub fn failure_count(&self) -> usize {
        self.len() - self.success_count()
    }

    /// Returns `true` when at least one resource was recorded and none succeeded.
    pub fn all_failed(&self) -> bool {
        !self.is_empty() && self.success_count() == 0
    }
}

// =============================================================================
// Envelopes
// =============================================================================

/// Result of an orchestrated fetch for one device on one platform.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FetchEnvelope {
    /// Device the fetch ran for.
    pub device_id: i64,
    /// Platform that was contacted.
    pub platform_id: i64,
    /// Alias injected into every resource address.
    pub alias: String,
    /// Per-resource results.
    pub data: FetchReport,
}

/// Result of a single resource test.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResourceTestEnvelope {
    /// Resource identifier.
    pub resource_id: i64,
    /// Resource name.
    pub name: String,
    /// Canonical resource type.
    #[serde(rename = "type")]
    pub resource_type: String,
    /// Owning platform.
    pub platform_id: i64,
    /// Canonical platform type.
    pub platform_type: String,
    /// What the probe returned.
    pub result: FetchOutput,
}

/// Result of a successful connection test.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConnectionReport {
    /// Canonical platform type.
    pub platform_type: String,
    /// Time the check took.
    pub latency_ms: u64,
}
