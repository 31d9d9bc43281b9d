// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Outbound request construction.
//!
//! URL and header building are pure functions so they can be checked without
//! a server. Header precedence, lowest first:
//!
//! ```text
//! defaults (Accept, Content-Type) ─► auth header ─► custom headers
//! ```

use std::collections::BTreeMap;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use conduit_core::error::{DriverError, DriverResult};
use conduit_core::schema::{RestAuth, RestDetails};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use tracing::warn;
use url::Url;

const JSON: &str = "application/json";

/// Joins a cleaned resource path onto the base endpoint and appends query
/// parameters.
///
/// The base path is kept as a prefix, so `/v1/` + `/assets` yields
/// `/v1/assets`; a resource path can never replace the base path.
pub fn build_url(base: &Url, path: &str, query: &BTreeMap<String, String>) -> Url {
    let mut url = base.clone();
    let joined = format!("{}{}", base.path().trim_end_matches('/'), path);
    url.set_path(&joined);

    if !query.is_empty() {
        let mut pairs = url.query_pairs_mut();
        for (key, value) in query {
            pairs.append_pair(key, value);
        }
    }
    url
}

/// Header carrying the credentials of `auth`, if any.
pub fn auth_header(auth: &RestAuth) -> DriverResult<Option<(HeaderName, HeaderValue)>> {
    let header = match auth {
        RestAuth::None => return Ok(None),
        RestAuth::ApiKey { api_key } => (HeaderName::from_static("x-api-key"), api_key.expose().to_string()),
        RestAuth::Bearer { bearer_token } => (AUTHORIZATION, format!("Bearer {}", bearer_token.expose())),
        RestAuth::Basic { basic_auth } => {
            let pair = format!("{}:{}", basic_auth.username, basic_auth.password.expose());
            (AUTHORIZATION, format!("Basic {}", BASE64.encode(pair)))
        }
    };

    let mut value = HeaderValue::from_str(&header.1)
        .map_err(|_| DriverError::invalid_metadata("credentials are not a valid header value"))?;
    value.set_sensitive(true);
    Ok(Some((header.0, value)))
}

/// Builds the full header set for a resource request.
pub fn build_headers(auth: &RestAuth, details: &RestDetails) -> DriverResult<HeaderMap> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static(JSON));
    if details.body.is_some() {
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(JSON));
    }

    let auth = auth_header(auth)?;
    if let Some((name, value)) = &auth {
        headers.insert(name.clone(), value.clone());
    }

    for (key, value) in &details.headers {
        let name = HeaderName::from_bytes(key.as_bytes())
            .map_err(|_| DriverError::invalid_details(format!("invalid header name '{}'", key)))?;
        let value = HeaderValue::from_str(value)
            .map_err(|_| DriverError::invalid_details(format!("invalid value for header '{}'", key)))?;
        if matches!(&auth, Some((auth_name, _)) if *auth_name == name) {
            warn!(header = %name, "Custom header overrides the authentication header");
        }
        headers.insert(name, value);
    }

    Ok(headers)
}

/// Header names only, for logging.
pub fn header_names(headers: &HeaderMap) -> Vec<String> {
    headers.keys().map(|k| k.as_str().to_string()).collect()
}
