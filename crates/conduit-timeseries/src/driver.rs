// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Time-series driver over the InfluxDB v2 HTTP API.
//!
//! | Operation         | Request                                  |
//! |-------------------|------------------------------------------|
//! | `validate_config` | `GET {url}/health`, requires `"pass"`    |
//! | `fetch_data`      | `POST {url}/api/v2/query?org={org}`      |

use std::time::Instant;

use async_trait::async_trait;
use conduit_core::context::FetchContext;
use conduit_core::driver::{ensure_details_kind, DriverFactory, PlatformDriver};
use conduit_core::error::{DriverError, DriverResult};
use conduit_core::output::FetchOutput;
use conduit_core::sanitize::Sanitized;
use conduit_core::schema::{PlatformMetadata, ResourceDetails, TimeSeriesDetails, TimeSeriesMetadata};
use conduit_core::types::PlatformType;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use tracing::{debug, info, warn};
use url::Url;

use crate::annotated::parse_records;
use crate::flux::{build_query, QueryRequest};

/// Body of `GET /health`.
#[derive(Debug, Deserialize)]
struct Health {
    status: String,
    #[serde(default)]
    message: Option<String>,
}

/// Error body returned by the query endpoint.
#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    code: Option<String>,
    message: String,
}

// =============================================================================
// TimeSeriesDriver
// =============================================================================

/// Driver for InfluxDB v2 compatible servers.
pub struct TimeSeriesDriver {
    name: String,
    metadata: TimeSeriesMetadata,
    base: Url,
    client: Client,
    connected: bool,
}

impl TimeSeriesDriver {
    /// Creates a driver from sanitized metadata.
    pub fn new(name: impl Into<String>, metadata: &Sanitized<PlatformMetadata>) -> DriverResult<Self> {
        let metadata = match metadata.get() {
            PlatformMetadata::TimeSeries(m) => m.clone(),
            other => {
                return Err(DriverError::invalid_metadata(format!(
                    "expected TimeSeries metadata, got {}",
                    other.platform_type()
                )))
            }
        };

        let base = Url::parse(&metadata.url)
            .map_err(|e| DriverError::invalid_metadata(format!("url: {}", e)))?;

        let mut headers = HeaderMap::new();
        let mut token = HeaderValue::from_str(&format!("Token {}", metadata.token.expose()))
            .map_err(|_| DriverError::invalid_metadata("token is not a valid header value"))?;
        token.set_sensitive(true);
        headers.insert(AUTHORIZATION, token);

        let client = Client::builder()
            .timeout(metadata.timeout())
            .default_headers(headers)
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

    /// Organization queries run under.
    pub fn org(&self) -> &str {
        &self.metadata.org
    }

    fn endpoint(&self, path: &str) -> Url {
        let mut url = self.base.clone();
        let joined = format!("{}{}", self.base.path().trim_end_matches('/'), path);
        url.set_path(&joined);
        url
    }

    /// URL of the query endpoint including the `org` parameter.
    pub fn query_url(&self) -> Url {
        let mut url = self.endpoint("/api/v2/query");
        url.query_pairs_mut().append_pair("org", &self.metadata.org);
        url
    }

    async fn query(&self, ctx: &FetchContext, details: &TimeSeriesDetails) -> DriverResult<String> {
        let flux = build_query(details);
        let url = self.query_url();
        debug!(
            driver = %self.name,
            bucket = %details.bucket,
            measurement = %details.measurement,
            field = %details.field,
            time_range = %details.time_range,
            "Running Flux query"
        );

        let request = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/csv")
            .json(&QueryRequest::new(&flux));

        ctx.run("fetch", async {
            let response = request.send().await.map_err(|e| map_reqwest_error("fetch", e))?;
            let status = response.status();
            if !status.is_success() {
                return Err(query_failure(status, response).await);
            }
            response
                .text()
                .await
                .map_err(|e| DriverError::invalid_response(e.to_string()))
        })
        .await
    }
}

async fn query_failure(status: StatusCode, response: Response) -> DriverError {
    let body = response.text().await.unwrap_or_default();
    let message = match serde_json::from_str::<ApiError>(&body) {
        Ok(ApiError { code: Some(code), message }) => format!("{} ({}): {}", status.as_u16(), code, message),
        Ok(ApiError { code: None, message }) => format!("{}: {}", status.as_u16(), message),
        Err(_) if body.trim().is_empty() => status.to_string(),
        Err(_) => format!("{}: {}", status.as_u16(), body.trim()),
    };
    DriverError::query(message)
}

fn map_reqwest_error(operation: &str, error: reqwest::Error) -> DriverError {
    if error.is_timeout() {
        DriverError::timeout(operation)
    } else if error.is_decode() || error.is_body() {
        DriverError::invalid_response(error.to_string())
    } else {
        DriverError::connection_failed_with(format!("{} request failed", operation), error)
    }
}

#[async_trait]
impl PlatformDriver for TimeSeriesDriver {
    fn name(&self) -> &str {
        &self.name
    }

    fn platform_type(&self) -> PlatformType {
        PlatformType::TimeSeries
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
        ensure_details_kind(PlatformType::TimeSeries, details)?;
        let details = match details.get() {
            ResourceDetails::TimeSeries(d) => d,
            _ => return Err(DriverError::invalid_details("expected time-series details")),
        };

        let start = Instant::now();
        let body = self.query(ctx, details).await?;
        let records = parse_records(&body)?;

        info!(
            driver = %self.name,
            measurement = %details.measurement,
            records = records.len(),
            latency_ms = start.elapsed().as_millis() as u64,
            "Flux query completed"
        );
        Ok(FetchOutput::Series(records))
    }

    async fn disconnect(&mut self, _ctx: &FetchContext) -> DriverResult<()> {
        self.connected = false;
        Ok(())
    }

    async fn validate_config(&mut self, ctx: &FetchContext) -> DriverResult<()> {
        let request = self.client.get(self.endpoint("/health"));
        let health = ctx
            .run("validate_config", async {
                let response = request
                    .send()
                    .await
                    .map_err(|e| map_reqwest_error("validate_config", e))?;
                let status = response.status();
                let body = response
                    .text()
                    .await
                    .map_err(|e| DriverError::invalid_response(e.to_string()))?;
                serde_json::from_str::<Health>(&body).map_err(|_| {
                    DriverError::connection_failed(format!("health check returned {}", status))
                })
            })
            .await?;

        if health.status == "pass" {
            debug!(driver = %self.name, "Health check passed");
            Ok(())
        } else {
            let message = health.message.unwrap_or_else(|| health.status.clone());
            warn!(driver = %self.name, status = %health.status, "Health check failed");
            Err(DriverError::connection_failed(format!("health check failed: {}", message)))
        }
    }
}

// =============================================================================
// Factory
// =============================================================================

/// Factory for [`TimeSeriesDriver`].
#[derive(Debug, Default, Clone, Copy)]
pub struct TimeSeriesDriverFactory;

impl DriverFactory for TimeSeriesDriverFactory {
    fn platform_type(&self) -> PlatformType {
        PlatformType::TimeSeries
    }

    fn create(
        &self,
        name: &str,
        metadata: &Sanitized<PlatformMetadata>,
    ) -> DriverResult<Box<dyn PlatformDriver>> {
        Ok(Box::new(TimeSeriesDriver::new(name, metadata)?))
    }
}
