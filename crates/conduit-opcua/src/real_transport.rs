// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! OPC UA transport on top of the `opcua` crate.
//!
//! The `opcua` client API is synchronous. Every call runs on the blocking
//! pool so that the driver's context can abandon a call that outlives its
//! deadline; the abandoned call finishes in the background.
//!
//! Sessions use security policy `None` and either anonymous or
//! username/password identity.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use conduit_core::address::{NodeId, NodeIdentifier};
use conduit_core::error::{DriverError, DriverResult};
use opcua::client::prelude::{AttributeService, ClientBuilder, IdentityToken, SecurityPolicy, Session};
use opcua::sync::RwLock as OpcUaRwLock;
use opcua::types::{
    AttributeId, ByteString, DataValue, Guid, MessageSecurityMode, QualifiedName, ReadValueId,
    StatusCode, TimestampsToReturn, UAString, Variant,
};
use tracing::{debug, info, warn};

use crate::transport::{OpcUaTransport, OpcUaValue, ReadResult, SessionConfig, TransportState, BAD_NO_DATA};

type SharedSession = Arc<OpcUaRwLock<Session>>;

// =============================================================================
// RealOpcUaTransport
// =============================================================================

/// Transport backed by a real OPC UA session.
pub struct RealOpcUaTransport {
    config: SessionConfig,
    state: TransportState,
    session: Option<SharedSession>,
}

impl RealOpcUaTransport {
    /// Creates a disconnected transport.
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            state: TransportState::Disconnected,
            session: None,
        }
    }
}

fn join_error(operation: &str, error: tokio::task::JoinError) -> DriverError {
    DriverError::protocol(format!("{} task failed: {}", operation, error))
}

/// Status codes that mean the session is gone rather than the read failed.
fn is_session_loss(status: StatusCode) -> bool {
    [
        StatusCode::BadSessionClosed,
        StatusCode::BadSessionIdInvalid,
        StatusCode::BadConnectionClosed,
        StatusCode::BadCommunicationError,
        StatusCode::BadNotConnected,
        StatusCode::BadSecureChannelClosed,
    ]
    .contains(&status)
}

fn open_session(config: &SessionConfig) -> DriverResult<SharedSession> {
    let mut client = ClientBuilder::new()
        .application_name(config.application_name.as_str())
        .application_uri(format!("urn:{}", config.application_name).as_str())
        .pki_dir(std::env::temp_dir().join("conduit-pki"))
        .create_sample_keypair(true)
        .trust_server_certs(true)
        // Reconnects are driven by the driver, not the client.
        .session_retry_limit(0)
        .session_timeout(u32::try_from(config.session_timeout.as_millis()).unwrap_or(u32::MAX))
        .client()
        .ok_or_else(|| DriverError::connection_failed("failed to build OPC UA client"))?;

    let endpoints = client
        .get_server_endpoints_from_url(config.endpoint.as_str())
        .map_err(|status| {
            DriverError::connection_failed(format!(
                "endpoint discovery at {} failed: {:?}",
                config.endpoint, status
            ))
        })?;

    let endpoint = endpoints
        .into_iter()
        .find(|e| {
            e.security_policy_uri.as_ref() == SecurityPolicy::None.to_uri()
                && e.security_mode == MessageSecurityMode::None
        })
        .ok_or_else(|| {
            DriverError::connection_failed(format!(
                "{} offers no endpoint without security",
                config.endpoint
            ))
        })?;

    let identity = match &config.credentials {
        Some((user, pass)) => IdentityToken::UserName(user.clone(), pass.expose().to_string()),
        None => IdentityToken::Anonymous,
    };

    client.connect_to_endpoint(endpoint, identity).map_err(|status| {
        DriverError::connection_failed(format!("session with {} refused: {:?}", config.endpoint, status))
    })
}

// =============================================================================
// Conversions
// =============================================================================

fn to_opcua_node_id(node_id: &NodeId) -> opcua::types::NodeId {
    let ns = node_id.namespace_index;
    match &node_id.identifier {
        NodeIdentifier::Numeric(v) => opcua::types::NodeId::new(ns, *v),
        NodeIdentifier::String(v) => opcua::types::NodeId::new(ns, v.clone()),
        NodeIdentifier::Guid(v) => opcua::types::NodeId::new(ns, Guid::from(*v)),
        NodeIdentifier::Opaque(v) => opcua::types::NodeId::new(ns, ByteString::from(v.as_slice())),
    }
}

fn to_utc(t: &opcua::types::DateTime) -> Option<DateTime<Utc>> {
    let c = t.as_chrono();
    DateTime::from_timestamp(c.timestamp(), c.timestamp_subsec_nanos())
}

fn from_variant(variant: &Variant) -> OpcUaValue {
    match variant {
        Variant::Empty => OpcUaValue::Null,
        Variant::Boolean(v) => OpcUaValue::Boolean(*v),
        Variant::SByte(v) => OpcUaValue::Int(i64::from(*v)),
        Variant::Int16(v) => OpcUaValue::Int(i64::from(*v)),
        Variant::Int32(v) => OpcUaValue::Int(i64::from(*v)),
        Variant::Int64(v) => OpcUaValue::Int(*v),
        Variant::Byte(v) => OpcUaValue::UInt(u64::from(*v)),
        Variant::UInt16(v) => OpcUaValue::UInt(u64::from(*v)),
        Variant::UInt32(v) => OpcUaValue::UInt(u64::from(*v)),
        Variant::UInt64(v) => OpcUaValue::UInt(*v),
        Variant::Float(v) => OpcUaValue::Float(*v),
        Variant::Double(v) => OpcUaValue::Double(*v),
        Variant::String(v) => OpcUaValue::String(v.as_ref().to_string()),
        Variant::DateTime(v) => to_utc(v).map_or(OpcUaValue::Null, OpcUaValue::DateTime),
        Variant::Guid(v) => OpcUaValue::Guid(uuid::Uuid::from_bytes(*v.as_bytes())),
        Variant::ByteString(v) => OpcUaValue::ByteString(v.value.clone().unwrap_or_default()),
        Variant::LocalizedText(v) => OpcUaValue::String(v.text.as_ref().to_string()),
        Variant::StatusCode(v) => OpcUaValue::UInt(u64::from(v.bits())),
        Variant::Array(arr) => OpcUaValue::Array(arr.values.iter().map(from_variant).collect()),
        other => OpcUaValue::String(format!("{:?}", other)),
    }
}

fn from_data_value(node_id: NodeId, data_value: &DataValue) -> ReadResult {
    let value = data_value.value.as_ref().map(from_variant);
    let status_code = match (data_value.status, &value) {
        (Some(status), _) => status.bits(),
        (None, Some(_)) => 0,
        (None, None) => BAD_NO_DATA,
    };
    ReadResult {
        node_id,
        value,
        status_code,
        source_timestamp: data_value.source_timestamp.as_ref().and_then(to_utc),
        server_timestamp: data_value.server_timestamp.as_ref().and_then(to_utc),
    }
}

// =============================================================================
// OpcUaTransport impl
// =============================================================================

#[async_trait]
impl OpcUaTransport for RealOpcUaTransport {
    async fn connect(&mut self) -> DriverResult<()> {
        if self.session.is_some() {
            self.disconnect().await?;
        }

        self.state = TransportState::Connecting;
        info!(endpoint = %self.config.endpoint, "Connecting to OPC UA server");

        let config = self.config.clone();
        let result = tokio::task::spawn_blocking(move || open_session(&config))
            .await
            .map_err(|e| join_error("connect", e))
            .and_then(|r| r);

        match result {
            Ok(session) => {
                self.session = Some(session);
                self.state = TransportState::Connected;
                info!(endpoint = %self.config.endpoint, "Connected to OPC UA server");
                Ok(())
            }
            Err(e) => {
                self.state = TransportState::Failed;
                warn!(endpoint = %self.config.endpoint, error = %e, "OPC UA connection failed");
                Err(e)
            }
        }
    }

    async fn disconnect(&mut self) -> DriverResult<()> {
        if let Some(session) = self.session.take() {
            debug!(endpoint = %self.config.endpoint, "Closing OPC UA session");
            tokio::task::spawn_blocking(move || session.read().disconnect())
                .await
                .map_err(|e| join_error("disconnect", e))?;
        }
        self.state = TransportState::Disconnected;
        Ok(())
    }

    fn state(&self) -> TransportState {
        match (&self.session, self.state) {
            (Some(session), TransportState::Connected) if !session.read().is_connected() => TransportState::Failed,
            (_, state) => state,
        }
    }

    async fn read_values(&self, node_ids: &[NodeId]) -> DriverResult<Vec<ReadResult>> {
        let session = self.session.clone().ok_or(DriverError::NotConnected)?;
        let requests: Vec<ReadValueId> = node_ids
            .iter()
            .map(|node_id| ReadValueId {
                node_id: to_opcua_node_id(node_id),
                attribute_id: AttributeId::Value as u32,
                index_range: UAString::null(),
                data_encoding: QualifiedName::null(),
            })
            .collect();

        let values = tokio::task::spawn_blocking(move || {
            session.read().read(&requests, TimestampsToReturn::Both, 0.0)
        })
        .await
        .map_err(|e| join_error("read", e))?
        .map_err(|status| {
            if is_session_loss(status) {
                DriverError::connection_failed(format!("session lost: {:?}", status))
            } else {
                DriverError::protocol(format!("read service failed: {:?}", status))
            }
        })?;

        Ok(values
            .iter()
            .zip(node_ids.iter().cloned())
            .map(|(data_value, node_id)| from_data_value(node_id, data_value))
            .collect())
    }

    fn endpoint(&self) -> &str {
        &self.config.endpoint
    }
}
