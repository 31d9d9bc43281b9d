// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! OPC UA transport abstraction layer.
//!
//! The driver talks to a session through [`OpcUaTransport`], so the session
//! lifecycle and status handling can be exercised without a server. The
//! `real-transport` feature provides an implementation on top of the `opcua`
//! crate; without it, [`UnavailableTransport`] is used.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::{DateTime, Utc};
use conduit_core::address::NodeId;
use conduit_core::error::{DriverError, DriverResult};
use conduit_core::output::{NodeReading, NodeStatus};
use conduit_core::schema::{OpcUaMetadata, Secret};
use serde_json::{Number, Value};

/// Status code reported when the server returns a result without a value.
pub const BAD_NO_DATA: u32 = 0x809B_0000;

// =============================================================================
// TransportState
// =============================================================================

/// Connection state of the transport layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransportState {
    /// No session.
    #[default]
    Disconnected,
    /// Session being established.
    Connecting,
    /// Session open.
    Connected,
    /// The last connection attempt failed or the session dropped.
    Failed,
}

impl TransportState {
    /// Returns `true` if a session is open.
    #[inline]
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }
}

impl fmt::Display for TransportState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected => write!(f, "Disconnected"),
            Self::Connecting => write!(f, "Connecting"),
            Self::Connected => write!(f, "Connected"),
            Self::Failed => write!(f, "Failed"),
        }
    }
}

// =============================================================================
// SessionConfig
// =============================================================================

/// Session parameters derived from platform metadata.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// `opc.tcp://` endpoint.
    pub endpoint: String,
    /// Username and password when configured.
    pub credentials: Option<(String, Secret)>,
    /// Session timeout.
    pub session_timeout: Duration,
    /// Client application name presented to the server.
    pub application_name: String,
}

impl SessionConfig {
    /// Derives session parameters from validated metadata.
    pub fn from_metadata(metadata: &OpcUaMetadata) -> Self {
        Self {
            endpoint: metadata.endpoint.clone(),
            credentials: metadata
                .credentials()
                .map(|(user, pass)| (user.to_string(), Secret::new(pass))),
            session_timeout: metadata.timeout(),
            application_name: "conduit".to_string(),
        }
    }
}

// =============================================================================
// OpcUaValue
// =============================================================================

/// Value of a node as seen by the transport layer.
#[derive(Debug, Clone, PartialEq)]
pub enum OpcUaValue {
    /// Boolean value.
    Boolean(bool),
    /// Any signed integer type.
    Int(i64),
    /// Any unsigned integer type.
    UInt(u64),
    /// 32-bit float.
    Float(f32),
    /// 64-bit double.
    Double(f64),
    /// String value.
    String(String),
    /// Date/time value.
    DateTime(DateTime<Utc>),
    /// GUID value.
    Guid(uuid::Uuid),
    /// Byte string.
    ByteString(Vec<u8>),
    /// Array of values.
    Array(Vec<OpcUaValue>),
    /// Null value.
    Null,
}

impl OpcUaValue {
    /// Converts to JSON. Non-finite floats become `null`, byte strings base64.
    pub fn to_json(&self) -> Value {
        match self {
            Self::Boolean(v) => Value::Bool(*v),
            Self::Int(v) => Value::from(*v),
            Self::UInt(v) => Value::from(*v),
            Self::Float(v) => Number::from_f64(f64::from(*v)).map_or(Value::Null, Value::Number),
            Self::Double(v) => Number::from_f64(*v).map_or(Value::Null, Value::Number),
            Self::String(v) => Value::String(v.clone()),
            Self::DateTime(v) => Value::String(v.to_rfc3339()),
            Self::Guid(v) => Value::String(v.to_string()),
            Self::ByteString(v) => Value::String(BASE64.encode(v)),
            Self::Array(values) => Value::Array(values.iter().map(Self::to_json).collect()),
            Self::Null => Value::Null,
        }
    }
}

// =============================================================================
// ReadResult
// =============================================================================

/// Result of a node read.
#[derive(Debug, Clone)]
pub struct ReadResult {
    /// Node that was read.
    pub node_id: NodeId,
    /// Value, if the server returned one.
    pub value: Option<OpcUaValue>,
    /// Raw status code.
    pub status_code: u32,
    /// Source timestamp.
    pub source_timestamp: Option<DateTime<Utc>>,
    /// Server timestamp.
    pub server_timestamp: Option<DateTime<Utc>>,
}

impl ReadResult {
    /// A good result carrying `value`.
    pub fn success(node_id: NodeId, value: OpcUaValue) -> Self {
        Self {
            node_id,
            value: Some(value),
            status_code: 0,
            source_timestamp: None,
            server_timestamp: Some(Utc::now()),
        }
    }

    /// A result without value.
    pub fn failure(node_id: NodeId, status_code: u32) -> Self {
        Self {
            node_id,
            value: None,
            status_code,
            source_timestamp: None,
            server_timestamp: Some(Utc::now()),
        }
    }

    /// Converts into the driver output shape, status passed through as is.
    pub fn into_reading(self) -> NodeReading {
        NodeReading {
            node_id: self.node_id.to_string(),
            value: self.value.map(|v| v.to_json()).unwrap_or(Value::Null),
            status: NodeStatus::from_code(self.status_code),
            source_timestamp: self.source_timestamp,
            server_timestamp: self.server_timestamp,
        }
    }
}

// =============================================================================
// OpcUaTransport Trait
// =============================================================================

/// Abstract OPC UA session.
///
/// Calls on one transport are serialized by the driver; implementations do
/// not need to support concurrent use of one session.
#[async_trait]
pub trait OpcUaTransport: Send + Sync {
    /// Opens a session.
    async fn connect(&mut self) -> DriverResult<()>;

    /// Closes the session. A no-op when not connected.
    async fn disconnect(&mut self) -> DriverResult<()>;

    /// Current state.
    fn state(&self) -> TransportState;

    /// Returns `true` if a session is open.
    fn is_connected(&self) -> bool {
        self.state().is_connected()
    }

    /// Reads the value attribute of each node. An empty vector means the
    /// server returned no results.
    async fn read_values(&self, node_ids: &[NodeId]) -> DriverResult<Vec<ReadResult>>;

    /// Endpoint this transport talks to.
    fn endpoint(&self) -> &str;
}

/// Builds a transport for a session.
pub type TransportBuilder = Arc<dyn Fn(SessionConfig) -> Box<dyn OpcUaTransport> + Send + Sync>;

/// Default transport builder: the `opcua` stack when compiled in.
#[cfg(feature = "real-transport")]
pub fn default_builder() -> TransportBuilder {
    Arc::new(|config: SessionConfig| -> Box<dyn OpcUaTransport> {
        Box::new(crate::real_transport::RealOpcUaTransport::new(config))
    })
}

/// Default transport builder: the `opcua` stack when compiled in.
#[cfg(not(feature = "real-transport"))]
pub fn default_builder() -> TransportBuilder {
    Arc::new(|config: SessionConfig| -> Box<dyn OpcUaTransport> {
        Box::new(UnavailableTransport::new(config))
    })
}

// =============================================================================
// UnavailableTransport
// =============================================================================

/// Transport used when no OPC UA stack is compiled in.
#[derive(Debug)]
pub struct UnavailableTransport {
    config: SessionConfig,
}

impl UnavailableTransport {
    /// Creates the transport.
    pub fn new(config: SessionConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl OpcUaTransport for UnavailableTransport {
    async fn connect(&mut self) -> DriverResult<()> {
        Err(DriverError::connection_failed(format!(
            "cannot reach {}: built without the real-transport feature",
            self.config.endpoint
        )))
    }

    async fn disconnect(&mut self) -> DriverResult<()> {
        Ok(())
    }

    fn state(&self) -> TransportState {
        TransportState::Disconnected
    }

    async fn read_values(&self, _node_ids: &[NodeId]) -> DriverResult<Vec<ReadResult>> {
        Err(DriverError::NotConnected)
    }

    fn endpoint(&self) -> &str {
        &self.config.endpoint
    }
}
