// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! OPC UA node addressing.
//!
//! Node identifiers live in the core crate because the validator must check
//! `node_id` syntax without pulling in a protocol stack.
//!
//! # Supported Formats
//!
//! - `ns=2;i=1001` (numeric)
//! - `ns=2;s=Boiler.Temperature` (string)
//! - `ns=2;g=550e8400-e29b-41d4-a716-446655440000` (GUID)
//! - `ns=2;b=SGVsbG8=` (opaque, base64)
//! - `i=2258`, `s=Name` (namespace 0)
//!
//! ```
//! use conduit_core::address::{NodeId, NodeIdentifier};
//!
//! let node: NodeId = "ns=2;s=Boiler.Temperature".parse().unwrap();
//! assert_eq!(node.namespace_index, 2);
//! assert_eq!(node.identifier, NodeIdentifier::String("Boiler.Temperature".into()));
//! assert_eq!(node.to_string(), "ns=2;s=Boiler.Temperature");
//! ```

use std::fmt;
use std::str::FromStr;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ConfigError;

/// An OPC UA node identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId {
    /// The namespace index.
    pub namespace_index: u16,

    /// The identifier.
    pub identifier: NodeIdentifier,
}

/// OPC UA node identifier kinds.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum NodeIdentifier {
    /// Numeric identifier.
    Numeric(u32),

    /// String identifier.
    String(String),

    /// GUID identifier.
    Guid(Uuid),

    /// Opaque (byte string) identifier.
    Opaque(Vec<u8>),
}

impl NodeId {
    /// Creates a numeric node ID.
    pub fn numeric(namespace_index: u16, value: u32) -> Self {
        Self {
            namespace_index,
            identifier: NodeIdentifier::Numeric(value),
        }
    }

    /// Creates a string node ID.
    pub fn string(namespace_index: u16, value: impl Into<String>) -> Self {
        Self {
            namespace_index,
            identifier: NodeIdentifier::String(value.into()),
        }
    }

    /// Creates a GUID node ID.
    pub fn guid(namespace_index: u16, value: Uuid) -> Self {
        Self {
            namespace_index,
            identifier: NodeIdentifier::Guid(value),
        }
    }

    /// Creates an opaque node ID.
    pub fn opaque(namespace_index: u16, value: Vec<u8>) -> Self {
        Self {
            namespace_index,
            identifier: NodeIdentifier::Opaque(value),
        }
    }

    fn invalid(raw: &str, message: impl Into<String>) -> ConfigError {
        ConfigError::invalid_field("node_id", format!("'{}': {}", raw, message.into()))
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.namespace_index != 0 {
            write!(f, "ns={};", self.namespace_index)?;
        }
        match &self.identifier {
            NodeIdentifier::Numeric(v) => write!(f, "i={}", v),
            NodeIdentifier::String(v) => write!(f, "s={}", v),
            NodeIdentifier::Guid(v) => write!(f, "g={}", v),
            NodeIdentifier::Opaque(v) => write!(f, "b={}", BASE64.encode(v)),
        }
    }
}

impl FromStr for NodeId {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ConfigError::missing_field("node_id"));
        }

        let (namespace_index, identifier_part) = match s.strip_prefix("ns=") {
            Some(rest) => {
                let (ns_str, ident) = rest
                    .split_once(';')
                    .ok_or_else(|| Self::invalid(s, "missing identifier after namespace"))?;
                let ns: u16 = ns_str
                    .parse()
                    .map_err(|_| Self::invalid(s, "invalid namespace index"))?;
                (ns, ident)
            }
            None => (0, s),
        };

        let identifier = if let Some(id) = identifier_part.strip_prefix("i=") {
            let value: u32 = id
                .parse()
                .map_err(|_| Self::invalid(s, "invalid numeric identifier"))?;
            NodeIdentifier::Numeric(value)
        } else if let Some(id) = identifier_part.strip_prefix("s=") {
            if id.is_empty() {
                return Err(Self::invalid(s, "empty string identifier"));
            }
            NodeIdentifier::String(id.to_string())
        } else if let Some(id) = identifier_part.strip_prefix("g=") {
            let uuid = Uuid::parse_str(id).map_err(|e| Self::invalid(s, format!("invalid GUID: {}", e)))?;
            NodeIdentifier::Guid(uuid)
        } else if let Some(id) = identifier_part.strip_prefix("b=") {
            let bytes = BASE64
                .decode(id)
                .map_err(|e| Self::invalid(s, format!("invalid base64: {}", e)))?;
            NodeIdentifier::Opaque(bytes)
        } else {
            return Err(Self::invalid(s, "unknown identifier type, expected i=, s=, g= or b="));
        };

        Ok(Self {
            namespace_index,
            identifier,
        })
    }
}
