// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Mock implementations for testing.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use conduit_core::address::NodeId;
use conduit_core::error::{DriverError, DriverResult};
use conduit_core::types::{DeviceLink, Platform, PlatformStore, Resource};
use conduit_opcua::{OpcUaDriverFactory, OpcUaTransport, ReadResult, SessionConfig, TransportBuilder, TransportState};

// =============================================================================
// MemoryStore
// =============================================================================

/// In-memory [`PlatformStore`] built up fluently.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    platforms: Vec<Platform>,
    resources: Vec<Resource>,
    devices: Vec<DeviceLink>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a platform.
    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platforms.push(platform);
        self
    }

    /// Adds a resource.
    pub fn with_resource(mut self, resource: Resource) -> Self {
        self.resources.push(resource);
        self
    }

    /// Adds a device link.
    pub fn with_device(mut self, link: DeviceLink) -> Self {
        self.devices.push(link);
        self
    }

    /// Wraps the store for the engine.
    pub fn shared(self) -> Arc<dyn PlatformStore> {
        Arc::new(self)
    }
}

#[async_trait]
impl PlatformStore for MemoryStore {
    async fn platform(&self, id: i64) -> Option<Platform> {
        self.platforms.iter().find(|p| p.id == id).cloned()
    }

    async fn resource(&self, id: i64) -> Option<Resource> {
        self.resources.iter().find(|r| r.id == id).cloned()
    }

    async fn resources_for(&self, platform_id: i64) -> Vec<Resource> {
        let mut resources: Vec<Resource> = self
            .resources
            .iter()
            .filter(|r| r.platform_id == platform_id)
            .cloned()
            .collect();
        resources.sort_by_key(|r| r.id);
        resources
    }

    async fn device_link(&self, device_id: i64, platform_id: i64) -> Option<DeviceLink> {
        self.devices
            .iter()
            .find(|d| d.device_id == device_id && d.platform_id == platform_id)
            .cloned()
    }
}

// =============================================================================
// MockOpcUaServer
// =============================================================================

/// Shared state behind every [`MockOpcUaTransport`] built from one server.
#[derive(Debug, Default)]
pub struct MockOpcUaServer {
    /// `connect` calls.
    pub connects: AtomicU32,
    /// `disconnect` calls that closed an open session.
    pub disconnects: AtomicU32,
    /// `read_values` calls.
    pub reads: AtomicU32,
    connected: AtomicBool,
    refuse_connect: AtomicBool,
    read_delay_ms: AtomicU64,
    values: Mutex<HashMap<String, ReadResult>>,
}

impl MockOpcUaServer {
    /// Creates a server with no nodes.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Serves `result` for `node`.
    pub fn set(&self, node: &str, result: ReadResult) {
        if let Ok(mut values) = self.values.lock() {
            values.insert(node.to_string(), result);
        }
    }

    /// Makes `connect` fail.
    pub fn refuse_connections(&self) {
        self.refuse_connect.store(true, Ordering::SeqCst);
    }

    /// Delays every read.
    pub fn slow_reads(&self, delay: Duration) {
        self.read_delay_ms.store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    /// Returns `true` while a session is open.
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Factory whose drivers talk to this server.
    pub fn factory(self: &Arc<Self>) -> OpcUaDriverFactory {
        let server = self.clone();
        let builder: TransportBuilder = Arc::new(move |config: SessionConfig| -> Box<dyn OpcUaTransport> {
            Box::new(MockOpcUaTransport {
                config,
                server: server.clone(),
            })
        });
        OpcUaDriverFactory::with_transport_builder(builder)
    }
}

/// Transport backed by a [`MockOpcUaServer`].
#[derive(Debug)]
pub struct MockOpcUaTransport {
    config: SessionConfig,
    server: Arc<MockOpcUaServer>,
}

#[async_trait]
impl OpcUaTransport for MockOpcUaTransport {
    async fn connect(&mut self) -> DriverResult<()> {
        self.server.connects.fetch_add(1, Ordering::SeqCst);
        if self.server.refuse_connect.load(Ordering::SeqCst) {
            return Err(DriverError::connection_failed("connection refused"));
        }
        self.server.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn disconnect(&mut self) -> DriverResult<()> {
        if self.server.connected.swap(false, Ordering::SeqCst) {
            self.server.disconnects.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }

    fn state(&self) -> TransportState {
        if self.server.is_connected() {
            TransportState::Connected
        } else {
            TransportState::Disconnected
        }
    }

    async fn read_values(&self, node_ids: &[NodeId]) -> DriverResult<Vec<ReadResult>> {
        self.server.reads.fetch_add(1, Ordering::SeqCst);
        let delay = self.server.read_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        let values = self
            .server
            .values
            .lock()
            .map_err(|_| DriverError::protocol("mock state poisoned"))?;
        Ok(node_ids
            .iter()
            .map(|id| {
                values
                    .get(&id.to_string())
                    .cloned()
                    .unwrap_or_else(|| ReadResult::failure(id.clone(), 0x8034_0000))
            })
            .collect())
    }

    fn endpoint(&self) -> &str {
        &self.config.endpoint
    }
}
