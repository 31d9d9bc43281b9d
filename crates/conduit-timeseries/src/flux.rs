// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Flux query construction.
//!
//! Every user-supplied value is placed inside a string literal and escaped,
//! so a measurement such as `m") |> drop(...)` stays a literal. The time
//! range is interpolated bare and must already satisfy the negative
//! duration grammar.

use conduit_core::schema::TimeSeriesDetails;
use serde::Serialize;

/// Annotations requested from the server so values can be typed.
pub const ANNOTATIONS: [&str; 3] = ["datatype", "group", "default"];

/// Escapes a value for use inside a Flux string literal.
pub fn escape_string(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '$' => out.push_str("\\$"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out
}

/// Builds the query for one resource.
pub fn build_query(details: &TimeSeriesDetails) -> String {
    format!(
        "from(bucket: \"{}\")\n  |> range(start: {})\n  |> filter(fn: (r) => r._measurement == \"{}\")\n  |> filter(fn: (r) => r._field == \"{}\")",
        escape_string(&details.bucket),
        details.time_range,
        escape_string(&details.measurement),
        escape_string(&details.field),
    )
}

/// Body of `POST /api/v2/query`.
#[derive(Debug, Clone, Serialize)]
pub struct QueryRequest<'a> {
    /// Flux source.
    pub query: &'a str,
    /// Always `flux`.
    #[serde(rename = "type")]
    pub kind: &'static str,
    /// Output dialect.
    pub dialect: Dialect,
}

/// CSV output dialect.
#[derive(Debug, Clone, Serialize)]
pub struct Dialect {
    /// Emit a header row per table.
    pub header: bool,
    /// Annotation rows to emit.
    pub annotations: Vec<&'static str>,
    /// Timestamp format.
    #[serde(rename = "dateTimeFormat")]
    pub date_time_format: &'static str,
}

impl<'a> QueryRequest<'a> {
    /// Wraps a Flux query with the annotated CSV dialect.
    pub fn new(query: &'a str) -> Self {
        Self {
            query,
            kind: "flux",
            dialect: Dialect {
                header: true,
                annotations: ANNOTATIONS.to_vec(),
                date_time_format: "RFC3339",
            },
        }
    }
}
