// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! REST driver implementation.
//!
//! The driver is stateless: `connect` and `disconnect` only flip a flag.
//! Every `fetch_data` call builds one request from sanitized details:
//!
//! ```text
//! RestDetails ─► build_url(base, path, query) ─► build_headers(auth, headers)
//!             ─► send (bounded by metadata timeout and ctx) ─► HttpResponse
//! ```
//!
//! Responses with status >= 400 are returned as
//! `DriverError::UpstreamHttp`, which carries the decoded response.

use std::time::Instant;

use async_trait::async_trait;
use conduit_core::context::FetchContext;
use conduit_core::driver::{ensure_details_kind, DriverFactory, PlatformDriver};
use conduit_core::error::{DriverError, DriverResult};
use conduit_core::output::{FetchOutput, HttpResponse};
use conduit_core::sanitize::Sanitized;
use conduit_core::schema::{HttpMethod, PlatformMetadata, ResourceDetails, RestDetails, RestMetadata};
use conduit_core::types::PlatformType;
use reqwest::header::HeaderMap;
use reqwest::redirect::Policy;
use reqwest::{Client, Method};
use tracing::{debug, info, warn};
use url::Url;

use crate::request::{auth_header, build_headers, build_url, header_names};
use crate::response::into_http_response;

// =============================================================================
// RestDriver
// =============================================================================

/// Driver for generic REST APIs.
pub struct RestDriver {
    name: String,
    metadata: RestMetadata,
    base: Url,
    client: Client,
    connected: bool,
}

impl RestDriver {
    /// Creates a driver from sanitized metadata.
    ///
    /// # Errors
    ///
    /// Returns `DriverError::InvalidMetadata` if the metadata is not REST
    /// metadata or the HTTP client cannot be built.
    pub fn new(name: impl Into<String>, metadata: &Sanitized<PlatformMetadata>) -> DriverResult<Self> {
        let metadata = match metadata.get() {
            PlatformMetadata::Rest(m) => m.clone(),
            other => {
                return Err(DriverError::invalid_metadata(format!(
                    "expected REST metadata, got {}",
                    other.platform_type()
                )))
            }
        };

        let base = Url::parse(&metadata.base_endpoint)
            .map_err(|e| DriverError::invalid_metadata(format!("base_endpoint: {}", e)))?;

        // Redirects are surfaced to the caller, never followed.
        let client = Client::builder()
            .timeout(metadata.timeout())
            .redirect(Policy::none())
            .build()
            .map_err(|e| DriverError::invalid_metadata(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            name: name.into(),
            metadata,
            base,
            client,
            connected: false,
        })
    }

    /// The canonical base endpoint.
    pub fn base_endpoint(&self) -> &Url {
        &self.base
    }

    /// URL a resource request would be sent to.
    pub fn resource_url(&self, details: &RestDetails) -> Url {
        build_url(&self.base, &details.path, &details.query_params)
    }

    fn method(method: HttpMethod) -> Method {
        match method {
            HttpMethod::Get => Method::GET,
            HttpMethod::Post => Method::POST,
            HttpMethod::Put => Method::PUT,
            HttpMethod::Delete => Method::DELETE,
        }
    }

    async fn execute(
        &self,
        ctx: &FetchContext,
        operation: &str,
        method: Method,
        url: Url,
        headers: HeaderMap,
        body: Option<String>,
    ) -> DriverResult<HttpResponse> {
        debug!(
            driver = %self.name,
            method = %method,
            url = %url,
            headers = ?header_names(&headers),
            "Sending REST request"
        );

        let start = Instant::now();
        let mut request = self.client.request(method.clone(), url.clone()).headers(headers);
        if let Some(body) = body {
            request = request.body(body);
        }

        let response = ctx
            .run(operation, async {
                let response = request.send().await.map_err(|e| map_reqwest_error(operation, e))?;
                let status = response.status();
                let headers = response.headers().clone();
                let bytes = response
                    .bytes()
                    .await
                    .map_err(|e| map_reqwest_error(operation, e))?;
                Ok(into_http_response(status, &headers, &bytes))
            })
            .await?;

        let latency_ms = start.elapsed().as_millis() as u64;
        if response.is_success() {
            info!(
                driver = %self.name,
                method = %method,
                url = %url,
                status = response.status_code,
                latency_ms,
                "REST request completed"
            );
            Ok(response)
        } else {
            warn!(
                driver = %self.name,
                method = %method,
                url = %url,
                status = response.status_code,
                latency_ms,
                "REST request returned failure status"
            );
            Err(DriverError::upstream(response))
        }
    }
}

fn map_reqwest_error(operation: &str, error: reqwest::Error) -> DriverError {
    if error.is_timeout() {
        DriverError::timeout(operation)
    } else if error.is_builder() {
        DriverError::invalid_details(error.to_string())
    } else if error.is_decode() || error.is_body() {
        DriverError::invalid_response(error.to_string())
    } else {
        DriverError::connection_failed_with(format!("{} request failed", operation), error)
    }
}

#[async_trait]
impl PlatformDriver for RestDriver {
    fn name(&self) -> &str {
        &self.name
    }

    fn platform_type(&self) -> PlatformType {
        PlatformType::Rest
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    async fn connect(&mut self, ctx: &FetchContext) -> DriverResult<()> {
        ctx.check("connect")?;
        self.connected = true;
        Ok(())
    }

    async fn fetch_data(
        &mut self,
        ctx: &FetchContext,
        details: &Sanitized<ResourceDetails>,
    ) -> DriverResult<FetchOutput> {
        ensure_details_kind(PlatformType::Rest, details)?;
        let details = match details.get() {
            ResourceDetails::Rest(d) => d,
            _ => return Err(DriverError::invalid_details("expected REST details")),
        };

        let url = self.resource_url(details);
        let headers = build_headers(&self.metadata.auth, details)?;
        let response = self
            .execute(
                ctx,
                "fetch",
                Self::method(details.method),
                url,
                headers,
                details.body.clone(),
            )
            .await?;
        Ok(FetchOutput::Http(response))
    }

    async fn disconnect(&mut self, _ctx: &FetchContext) -> DriverResult<()> {
        self.connected = false;
        Ok(())
    }

    async fn validate_config(&mut self, ctx: &FetchContext) -> DriverResult<()> {
        let mut headers = HeaderMap::new();
        if let Some((name, value)) = auth_header(&self.metadata.auth)? {
            headers.insert(name, value);
        }
        self.execute(ctx, "validate_config", Method::HEAD, self.base.clone(), headers, None)
            .await
            .map(|_| ())
    }
}

// =============================================================================
// Factory
// =============================================================================

/// Factory for [`RestDriver`].
#[derive(Debug, Default, Clone, Copy)]
pub struct RestDriverFactory;

impl DriverFactory for RestDriverFactory {
    fn platform_type(&self) -> PlatformType {
        PlatformType::Rest
    }

    fn create(
        &self,
        name: &str,
        metadata: &Sanitized<PlatformMetadata>,
    ) -> DriverResult<Box<dyn PlatformDriver>> {
        Ok(Box::new(RestDriver::new(name, metadata)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use conduit_core::sanitize::{validate_details, validate_metadata};

    #[test]
    fn test_scenario_url() {
        let metadata =
            validate_metadata("REST", r#"{"base_endpoint":"https://api.example.com","auth":{"type":"none"}}"#)
                .unwrap();
        let details = validate_details("rest_endpoint", r#"{"method":"get","path":"assets"}"#).unwrap();

        let driver = RestDriver::new("erp", &metadata).unwrap();
        let url = match details.get() {
            ResourceDetails::Rest(d) => driver.resource_url(d),
            _ => unreachable!(),
        };
        assert_eq!(url.as_str(), "https://api.example.com/assets");
    }

    #[test]
    fn test_new_rejects_other_metadata() {
        let metadata = validate_metadata("OPCUA", r#"{"endpoint":"opc.tcp://plc:4840"}"#).unwrap();
        let err = RestDriver::new("x", &metadata).err().unwrap();
        assert!(matches!(err, DriverError::InvalidMetadata { .. }));
    }

    #[tokio::test]
    async fn test_disconnect_is_idempotent() {
        let metadata = validate_metadata("REST", r#"{"base_endpoint":"https://api.example.com"}"#).unwrap();
        let mut driver = RestDriver::new("erp", &metadata).unwrap();
        let ctx = FetchContext::new();

        driver.connect(&ctx).await.unwrap();
        assert!(driver.is_connected());
        driver.disconnect(&ctx).await.unwrap();
        driver.disconnect(&ctx).await.unwrap();
        assert!(!driver.is_connected());
    }

    #[tokio::test]
    async fn test_connect_with_expired_context() {
        let metadata = validate_metadata("REST", r#"{"base_endpoint":"https://api.example.com"}"#).unwrap();
        let mut driver = RestDriver::new("erp", &metadata).unwrap();
        let ctx = FetchContext::with_deadline_in(std::time::Duration::ZERO);

        let err = driver.connect(&ctx).await.unwrap_err();
        assert!(matches!(err, DriverError::Timeout { .. }));
        assert!(!driver.is_connected());
    }
}
