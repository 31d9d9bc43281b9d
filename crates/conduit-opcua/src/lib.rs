// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # conduit-opcua
//!
//! OPC UA platform driver for conduit.
//!
//! Reads the value attribute of one node per fetch over a session opened in
//! `connect`. Per-result status codes are returned with the value, so
//! callers can tell an unreadable node from a failed call.
//!
//! ## Features
//!
//! - `real-transport`: link the `opcua` client stack. Without it every
//!   connection attempt fails with `ConnectionFailed`; custom transports can
//!   still be plugged in through [`OpcUaDriverFactory::with_transport_builder`].

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod driver;
pub mod transport;

#[cfg(feature = "real-transport")]
pub mod real_transport;

pub use driver::{OpcUaDriver, OpcUaDriverFactory};
pub use transport::{
    OpcUaTransport, OpcUaValue, ReadResult, SessionConfig, TransportBuilder, TransportState,
};
