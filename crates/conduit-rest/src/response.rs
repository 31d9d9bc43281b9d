// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Response decoding.

use std::collections::BTreeMap;

use conduit_core::output::HttpResponse;
use reqwest::header::{HeaderMap, CONTENT_TYPE};
use reqwest::StatusCode;
use serde_json::Value;

/// Renders `200 OK` style status lines.
pub fn status_line(status: StatusCode) -> String {
    match status.canonical_reason() {
        Some(reason) => format!("{} {}", status.as_u16(), reason),
        None => status.as_u16().to_string(),
    }
}

/// Collects headers as `name -> [values]` in name order.
pub fn collect_headers(headers: &HeaderMap) -> BTreeMap<String, Vec<String>> {
    let mut out: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (name, value) in headers {
        out.entry(name.as_str().to_string())
            .or_default()
            .push(String::from_utf8_lossy(value.as_bytes()).into_owned());
    }
    out
}

/// Decodes a body as JSON when the content type says so and it parses;
/// otherwise returns the text.
pub fn decode_body(headers: &HeaderMap, bytes: &[u8]) -> Value {
    let is_json = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|ct| ct.to_ascii_lowercase().contains("application/json"))
        .unwrap_or(false);

    if is_json {
        if let Ok(value) = serde_json::from_slice::<Value>(bytes) {
            return value;
        }
    }
    Value::String(String::from_utf8_lossy(bytes).into_owned())
}

/// Assembles the structured response.
pub fn into_http_response(status: StatusCode, headers: &HeaderMap, bytes: &[u8]) -> HttpResponse {
    HttpResponse {
        status_code: status.as_u16(),
        status: status_line(status),
        headers: collect_headers(headers),
        body: decode_body(headers, bytes),
    }
}
