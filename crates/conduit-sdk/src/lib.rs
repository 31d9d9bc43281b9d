// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # conduit-sdk
//!
//! Generic vendor SDK driver for conduit.
//!
//! Vendor SDKs are reached through the [`SdkClient`] trait. Until a vendor
//! binding is registered the driver uses [`SimulatedClient`], which mimics
//! session setup and per-device reads with the latencies of a
//! [`SimulationProfile`].
//!
//! | Operation         | Behavior                                      |
//! |-------------------|-----------------------------------------------|
//! | `connect`         | SDK session setup, honors cancellation        |
//! | `fetch_data`      | one call scoped to the device alias           |
//! | `disconnect`      | closes the session, idempotent                |
//! | `validate_config` | connect + disconnect                          |

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod client;
pub mod driver;

pub use client::{SdkClient, SimulatedClient, SimulationProfile};
pub use driver::{SdkDriver, SdkDriverFactory};
