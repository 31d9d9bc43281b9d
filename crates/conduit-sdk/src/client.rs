// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Vendor SDK client seam.
//!
//! Vendor SDKs expose no network primitive at this layer, so the driver talks
//! to an [`SdkClient`]. [`SimulatedClient`] stands in until a vendor binding
//! is plugged in; its latencies come from a [`SimulationProfile`].

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use conduit_core::error::{DriverError, DriverResult};
use conduit_core::schema::SdkMetadata;
use serde_json::Value;
use tracing::debug;

/// A vendor SDK session.
#[async_trait]
pub trait SdkClient: Send + Sync {
    /// Performs SDK session setup.
    async fn open(&mut self) -> DriverResult<()>;

    /// Invokes `method` scoped to `device`.
    async fn call(&self, device: &str, method: &str, params: &BTreeMap<String, Value>) -> DriverResult<Value>;

    /// Tears the session down. A no-op when not open.
    async fn close(&mut self) -> DriverResult<()>;

    /// Returns `true` while the session is open.
    fn is_open(&self) -> bool;
}

// =============================================================================
// SimulationProfile
// =============================================================================

/// Timing and output of the simulated SDK.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationProfile {
    /// Session setup latency.
    pub connect_delay: Duration,
    /// Per-call latency.
    pub fetch_delay: Duration,
    /// Value every call reports.
    pub value: f64,
}

impl Default for SimulationProfile {
    fn default() -> Self {
        Self {
            connect_delay: Duration::from_secs(1),
            fetch_delay: Duration::from_millis(500),
            value: 42.0,
        }
    }
}

impl SimulationProfile {
    /// A profile without latency, for tests and dry runs.
    pub fn instant() -> Self {
        Self {
            connect_delay: Duration::ZERO,
            fetch_delay: Duration::ZERO,
            ..Self::default()
        }
    }
}

// =============================================================================
// SimulatedClient
// =============================================================================

/// SDK client that simulates session setup and reads.
#[derive(Debug)]
pub struct SimulatedClient {
    endpoint: String,
    profile: SimulationProfile,
    open: bool,
}

impl SimulatedClient {
    /// Creates a client for the configured endpoint.
    pub fn new(metadata: &SdkMetadata, profile: SimulationProfile) -> Self {
        Self {
            endpoint: metadata.endpoint.clone(),
            profile,
            open: false,
        }
    }
}

#[async_trait]
impl SdkClient for SimulatedClient {
    async fn open(&mut self) -> DriverResult<()> {
        tokio::time::sleep(self.profile.connect_delay).await;
        self.open = true;
        debug!(endpoint = %self.endpoint, "Simulated SDK session opened");
        Ok(())
    }

    async fn call(&self, device: &str, method: &str, _params: &BTreeMap<String, Value>) -> DriverResult<Value> {
        if !self.open {
            return Err(DriverError::NotConnected);
        }
        tokio::time::sleep(self.profile.fetch_delay).await;
        debug!(endpoint = %self.endpoint, device, method, "Simulated SDK call");
        Ok(Value::from(self.profile.value))
    }

    async fn close(&mut self) -> DriverResult<()> {
        self.open = false;
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.open
    }
}
