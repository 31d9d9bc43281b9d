// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # conduit-timeseries
//!
//! Time-series platform driver for conduit.
//!
//! Resources are Flux queries over one bucket, measurement and field within a
//! relative time range. Results are decoded from annotated CSV into
//! `SeriesRecord`s:
//!
//! ```text
//! TimeSeriesDetails ─► flux::build_query ─► POST /api/v2/query
//!                                               │
//!                    Vec<SeriesRecord> ◄─ annotated::parse_records
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod annotated;
pub mod driver;
pub mod flux;

pub use driver::{TimeSeriesDriver, TimeSeriesDriverFactory};
