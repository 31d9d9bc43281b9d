// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # conduit-engine
//!
//! Driver factory and fetch orchestration.
//!
//! - **Factory**: [`get_driver`] and [`default_registry`] map a platform type
//!   to its driver
//! - **Orchestrator**: [`Engine::fetch`] runs one connect → fetch* →
//!   disconnect cycle with partial-failure semantics
//! - **Probes**: [`Engine::test_connection`], [`Engine::test_resource`] and
//!   the store-free [`test_connection`]
//!
//! ## Example
//!
//! ```rust,ignore
//! use conduit_engine::{Engine, FetchRequest};
//!
//! let engine = Engine::new(store);
//! let envelope = engine
//!     .fetch(&FetchContext::new(), &FetchRequest::new(1, 42).with_override("time_range", "-15m"))
//!     .await?;
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod error;
pub mod factory;
pub mod orchestrator;
pub mod report;

pub use error::{EngineError, EngineResult};
pub use factory::{check_compatibility, default_registry, get_driver};
pub use orchestrator::{
    orchestrate, test_connection, Engine, EngineOptions, FetchPlan, FetchRequest, DEFAULT_CLEANUP_GRACE,
};
pub use report::{
    ConnectionReport, FetchEnvelope, FetchReport, ResourceFailure, ResourceOutcome, ResourceTestEnvelope,
};
