// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! OPC UA platform driver.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │                OpcUaDriver                  │
//! │            (PlatformDriver impl)            │
//! └─────────────────────────────────────────────┘
//!                       │
//!                       ▼
//! ┌─────────────────────────────────────────────┐
//! │          Box<dyn OpcUaTransport>            │
//! │   RealOpcUaTransport | UnavailableTransport │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! The driver is stateful: `connect` opens a session that every
//! `fetch_data` call reuses. When the session drops between calls, the next
//! read waits `reconnect_interval` and reconnects once before giving up.

use std::fmt;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use conduit_core::address::NodeId;
use conduit_core::context::FetchContext;
use conduit_core::driver::{ensure_details_kind, DriverFactory, PlatformDriver};
use conduit_core::error::{DriverError, DriverResult};
use conduit_core::output::FetchOutput;
use conduit_core::sanitize::Sanitized;
use conduit_core::schema::{OpcUaMetadata, PlatformMetadata, ResourceDetails};
use conduit_core::types::PlatformType;
use tracing::{debug, info, warn};

use crate::transport::{default_builder, OpcUaTransport, ReadResult, SessionConfig, TransportBuilder};

// =============================================================================
// OpcUaDriver
// =============================================================================

/// Driver for OPC UA servers.
pub struct OpcUaDriver {
    name: String,
    reconnect_interval: Duration,
    transport: Box<dyn OpcUaTransport>,
    /// Set once `connect` succeeded; enables automatic reconnects.
    session_opened: bool,
}

impl OpcUaDriver {
    /// Creates a driver with the default transport.
    pub fn new(name: impl Into<String>, metadata: &Sanitized<PlatformMetadata>) -> DriverResult<Self> {
        Self::with_transport_builder(name, metadata, &default_builder())
    }

    /// Creates a driver whose transport is produced by `builder`.
    pub fn with_transport_builder(
        name: impl Into<String>,
        metadata: &Sanitized<PlatformMetadata>,
        builder: &TransportBuilder,
    ) -> DriverResult<Self> {
        let metadata = opcua_metadata(metadata)?;
        let transport = builder(SessionConfig::from_metadata(metadata));
        Ok(Self::from_parts(name, metadata, transport))
    }

    /// Creates a driver around an existing transport.
    pub fn from_parts(name: impl Into<String>, metadata: &OpcUaMetadata, transport: Box<dyn OpcUaTransport>) -> Self {
        Self {
            name: name.into(),
            reconnect_interval: metadata.reconnect_interval(),
            transport,
            session_opened: false,
        }
    }

    /// Endpoint of the underlying transport.
    pub fn endpoint(&self) -> &str {
        self.transport.endpoint()
    }

    async fn reconnect(&mut self, ctx: &FetchContext) -> DriverResult<()> {
        warn!(
            driver = %self.name,
            endpoint = %self.transport.endpoint(),
            interval_ms = self.reconnect_interval.as_millis() as u64,
            "OPC UA session lost, reconnecting"
        );
        let interval = self.reconnect_interval;
        ctx.run("reconnect", async {
            tokio::time::sleep(interval).await;
            Ok(())
        })
        .await?;
        ctx.run("reconnect", self.transport.connect()).await
    }

    async fn read(&mut self, ctx: &FetchContext, node_id: &NodeId) -> DriverResult<Vec<ReadResult>> {
        if !self.transport.is_connected() {
            if !self.session_opened {
                return Err(DriverError::NotConnected);
            }
            self.reconnect(ctx).await?;
        }

        let nodes = std::slice::from_ref(node_id);
        match ctx.run("fetch", self.transport.read_values(nodes)).await {
            Err(DriverError::ConnectionFailed { message, .. }) if self.session_opened => {
                debug!(driver = %self.name, reason = %message, "Read failed on a dropped session");
                self.reconnect(ctx).await?;
                ctx.run("fetch", self.transport.read_values(nodes)).await
            }
            other => other,
        }
    }
}

impl fmt::Debug for OpcUaDriver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpcUaDriver")
            .field("name", &self.name)
            .field("endpoint", &self.transport.endpoint())
            .field("state", &self.transport.state())
            .finish()
    }
}

fn opcua_metadata(metadata: &Sanitized<PlatformMetadata>) -> DriverResult<&OpcUaMetadata> {
    match metadata.get() {
        PlatformMetadata::OpcUa(m) => Ok(m),
        other => Err(DriverError::invalid_metadata(format!(
            "expected OPCUA metadata, got {}",
            other.platform_type()
        ))),
    }
}

#[async_trait]
impl PlatformDriver for OpcUaDriver {
    fn name(&self) -> &str {
        &self.name
    }

    fn platform_type(&self) -> PlatformType {
        PlatformType::OpcUa
    }

    fn is_connected(&self) -> bool {
        self.transport.is_connected()
    }

    async fn connect(&mut self, ctx: &FetchContext) -> DriverResult<()> {
        let start = Instant::now();
        ctx.run("connect", self.transport.connect()).await?;
        self.session_opened = true;
        info!(
            driver = %self.name,
            endpoint = %self.transport.endpoint(),
            latency_ms = start.elapsed().as_millis() as u64,
            "OPC UA session opened"
        );
        Ok(())
    }

    async fn fetch_data(
        &mut self,
        ctx: &FetchContext,
        details: &Sanitized<ResourceDetails>,
    ) -> DriverResult<FetchOutput> {
        ensure_details_kind(PlatformType::OpcUa, details)?;
        let raw = match details.get() {
            ResourceDetails::OpcUa(d) => &d.node_id,
            _ => return Err(DriverError::invalid_details("expected OPC UA details")),
        };
        let node_id: NodeId = raw
            .parse()
            .map_err(|e| DriverError::invalid_details(format!("node_id: {}", e)))?;

        let start = Instant::now();
        let result = self
            .read(ctx, &node_id)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| DriverError::no_data(node_id.to_string()))?;

        let reading = result.into_reading();
        debug!(
            driver = %self.name,
            node_id = %reading.node_id,
            status = reading.status.code,
            latency_ms = start.elapsed().as_millis() as u64,
            "Read OPC UA node"
        );
        Ok(FetchOutput::Node(reading))
    }

    async fn disconnect(&mut self, ctx: &FetchContext) -> DriverResult<()> {
        self.session_opened = false;
        ctx.run("disconnect", self.transport.disconnect()).await
    }

    async fn validate_config(&mut self, ctx: &FetchContext) -> DriverResult<()> {
        self.connect(ctx).await?;
        self.disconnect(ctx).await
    }
}

// =============================================================================
// Factory
// =============================================================================

/// Factory for [`OpcUaDriver`].
#[derive(Clone)]
pub struct OpcUaDriverFactory {
    builder: TransportBuilder,
}

impl OpcUaDriverFactory {
    /// Factory using the default transport.
    pub fn new() -> Self {
        Self {
            builder: default_builder(),
        }
    }

    /// Factory using a custom transport, e.g. a simulator.
    pub fn with_transport_builder(builder: TransportBuilder) -> Self {
        Self { builder }
    }
}

impl Default for OpcUaDriverFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for OpcUaDriverFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpcUaDriverFactory").finish_non_exhaustive()
    }
}

impl DriverFactory for OpcUaDriverFactory {
    fn platform_type(&self) -> PlatformType {
        PlatformType::OpcUa
    }

    fn create(
        &self,
        name: &str,
        metadata: &Sanitized<PlatformMetadata>,
    ) -> DriverResult<Box<dyn PlatformDriver>> {
        Ok(Box::new(OpcUaDriver::with_transport_builder(
            name,
            metadata,
            &self.builder,
        )?))
    }
}
