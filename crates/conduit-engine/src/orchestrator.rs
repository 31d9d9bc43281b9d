// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Fetch orchestration.
//!
//! One orchestrated fetch is one connect → fetch* → disconnect cycle
//! spanning all resources of one platform for one device.
//!
//! ```text
//!   resources ──prepare──► incompatible / invalid ──► report (failure)
//!        │
//!        ▼
//!   connect(ctx) ──► fetch_data(ctx, details)  × N  ──► report
//!        │                                              │
//!        └──────────────► disconnect (exactly once) ◄───┘
//! ```
//!
//! - Resources run in ascending id order.
//! - A per-resource failure never aborts its siblings.
//! - The request fails only when every resource failed.
//! - Disconnect runs on a detached context when the request context is done,
//!   and its errors are logged, never returned.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use conduit_core::context::FetchContext;
use conduit_core::driver::{DriverRegistry, PlatformDriver};
use conduit_core::error::DriverError;
use conduit_core::sanitize::{validate_details_for, validate_metadata, validate_metadata_for, Sanitized};
use conduit_core::schema::{PlatformMetadata, ResourceDetails};
use conduit_core::types::{Platform, PlatformStore, PlatformType, Resource, ResourceType};
use tracing::{debug, info, warn};

use crate::error::{EngineError, EngineResult};
use crate::factory::{check_compatibility, default_registry};
use crate::report::{ConnectionReport, FetchEnvelope, FetchReport, ResourceFailure, ResourceTestEnvelope};

/// Grace period granted to `disconnect` after the request context ended.
pub const DEFAULT_CLEANUP_GRACE: Duration = Duration::from_secs(5);

// =============================================================================
// Options
// =============================================================================

/// Engine tuning.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineOptions {
    /// Upper bound for one whole request; `None` leaves it to the caller.
    pub fetch_timeout: Option<Duration>,
    /// Deadline for cleanup after the request context ended.
    pub cleanup_grace: Duration,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            fetch_timeout: None,
            cleanup_grace: DEFAULT_CLEANUP_GRACE,
        }
    }
}

impl EngineOptions {
    fn bound(&self, ctx: &FetchContext) -> FetchContext {
        match self.fetch_timeout {
            Some(timeout) => ctx.with_timeout(timeout),
            None => ctx.clone(),
        }
    }
}

/// Caller input for an orchestrated fetch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchRequest {
    /// Platform to contact.
    pub platform_id: i64,
    /// Device whose alias is injected.
    pub device_id: i64,
    /// Query-level overrides (`time_range`, `field`, `node_id`, REST query params).
    pub overrides: BTreeMap<String, String>,
}

impl FetchRequest {
    /// Creates a request without overrides.
    pub fn new(platform_id: i64, device_id: i64) -> Self {
        Self {
            platform_id,
            device_id,
            overrides: BTreeMap::new(),
        }
    }

    /// Adds one override.
    pub fn with_override(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.overrides.insert(key.into(), value.into());
        self
    }
}

/// Everything [`orchestrate`] needs besides the driver.
#[derive(Debug, Clone, Copy)]
pub struct FetchPlan<'a> {
    /// Platform identifier, for reporting.
    pub platform_id: i64,
    /// Platform type the driver serves.
    pub platform_type: PlatformType,
    /// Device alias.
    pub alias: &'a str,
    /// Query-level overrides.
    pub overrides: &'a BTreeMap<String, String>,
    /// Resources of the platform.
    pub resources: &'a [Resource],
}

// =============================================================================
// Orchestration
// =============================================================================

/// Validates, checks compatibility and adjusts the details of one resource.
fn prepare(plan: &FetchPlan<'_>, resource: &Resource) -> Result<Sanitized<ResourceDetails>, ResourceFailure> {
    let resource_type: ResourceType = resource
        .resource_type
        .parse()
        .map_err(|e| ResourceFailure::from(&e))?;
    check_compatibility(plan.platform_type, resource_type).map_err(|e| ResourceFailure::from(&e))?;

    validate_details_for(resource_type, &resource.details)
        .and_then(|d| d.with_overrides(plan.overrides))
        .and_then(|d| d.with_alias(plan.alias))
        .map_err(|e| ResourceFailure::from(&e))
}

/// Best-effort disconnect; failures are logged only.
async fn cleanup(driver: &mut dyn PlatformDriver, ctx: &FetchContext, grace: Duration) {
    let cleanup_ctx = if ctx.check("disconnect").is_err() {
        debug!(driver = %driver.name(), "Request context ended, disconnecting on a detached context");
        ctx.detached_cleanup(grace)
    } else {
        ctx.with_timeout(grace)
    };
    if let Err(e) = driver.disconnect(&cleanup_ctx).await {
        warn!(driver = %driver.name(), error = %e, "Disconnect failed");
    }
}

/// Runs one orchestrated fetch with an already-built driver.
///
/// # Errors
///
/// - `EngineError::NoCompatibleResources` when the platform has no resources
/// - `EngineError::Driver` when `connect` fails
/// - `EngineError::AllResourcesFailed` when no resource succeeded
pub async fn orchestrate(
    ctx: &FetchContext,
    driver: &mut dyn PlatformDriver,
    plan: FetchPlan<'_>,
    cleanup_grace: Duration,
) -> EngineResult<FetchReport> {
    let mut report = FetchReport::new();
    let mut ordered: Vec<&Resource> = plan.resources.iter().collect();
    ordered.sort_by_key(|r| r.id);

    let mut prepared = Vec::with_capacity(ordered.len());
    for resource in ordered {
        match prepare(&plan, resource) {
            Ok(details) => prepared.push((resource, details)),
            Err(failure) => {
                warn!(
                    platform = plan.platform_id,
                    resource = %resource.name,
                    error = %failure.error,
                    "Resource skipped"
                );
                report.record_failure(&resource.name, failure);
            }
        }
    }

    if prepared.is_empty() {
        return Err(if report.is_empty() {
            EngineError::NoCompatibleResources {
                platform_id: plan.platform_id,
            }
        } else {
            EngineError::AllResourcesFailed {
                report: Box::new(report),
            }
        });
    }

    if let Err(e) = driver.connect(ctx).await {
        warn!(platform = plan.platform_id, driver = %driver.name(), error = %e, "Connect failed");
        cleanup(driver, ctx, cleanup_grace).await;
        return Err(EngineError::Driver(e.with_platform(driver.name())));
    }

    for (resource, details) in &prepared {
        let start = Instant::now();
        match driver.fetch_data(ctx, details).await {
            Ok(output) => {
                debug!(
                    platform = plan.platform_id,
                    resource = %resource.name,
                    latency_ms = start.elapsed().as_millis() as u64,
                    "Resource fetched"
                );
                report.record_success(&resource.name, output);
            }
            Err(e) => {
                warn!(
                    platform = plan.platform_id,
                    resource = %resource.name,
                    error_type = e.error_type(),
                    error = %e,
                    "Resource fetch failed"
                );
                report.record_failure(&resource.name, ResourceFailure::from(&e));
            }
        }
    }

    cleanup(driver, ctx, cleanup_grace).await;

    if report.all_failed() {
        return Err(EngineError::AllResourcesFailed {
            report: Box::new(report),
        });
    }
    Ok(report)
}

// =============================================================================
// Connection test
// =============================================================================

/// Checks that a platform described by raw metadata is reachable.
///
/// Validation goes through the same entry point as every other path.
pub async fn test_connection(
    registry: &DriverRegistry,
    platform_type: &str,
    raw_metadata: &str,
    ctx: &FetchContext,
) -> EngineResult<ConnectionReport> {
    test_connection_with_grace(registry, platform_type, raw_metadata, ctx, DEFAULT_CLEANUP_GRACE).await
}

async fn test_connection_with_grace(
    registry: &DriverRegistry,
    platform_type: &str,
    raw_metadata: &str,
    ctx: &FetchContext,
    grace: Duration,
) -> EngineResult<ConnectionReport> {
    let metadata = validate_metadata(platform_type, raw_metadata)?;
    let kind = metadata.platform_type();
    let mut driver = registry.create_for(kind, "connection-test", &metadata)?;

    let start = Instant::now();
    let result = driver.validate_config(ctx).await;
    cleanup(driver.as_mut(), ctx, grace).await;
    result?;

    let latency_ms = start.elapsed().as_millis() as u64;
    info!(platform_type = %kind, latency_ms, "Connection test passed");
    Ok(ConnectionReport {
        platform_type: kind.as_str().to_string(),
        latency_ms,
    })
}

// =============================================================================
// Engine
// =============================================================================

/// Store-backed entry point for fetches and tests.
pub struct Engine {
    store: Arc<dyn PlatformStore>,
    registry: Arc<DriverRegistry>,
    options: EngineOptions,
}

impl Engine {
    /// Creates an engine with every built-in driver.
    pub fn new(store: Arc<dyn PlatformStore>) -> Self {
        Self::with_registry(store, Arc::new(default_registry()))
    }

    /// Creates an engine with a custom registry.
    pub fn with_registry(store: Arc<dyn PlatformStore>, registry: Arc<DriverRegistry>) -> Self {
        Self {
            store,
            registry,
            options: EngineOptions::default(),
        }
    }

    /// Replaces the engine options.
    pub fn with_options(mut self, options: EngineOptions) -> Self {
        self.options = options;
        self
    }

    /// The driver registry.
    pub fn registry(&self) -> &DriverRegistry {
        &self.registry
    }

    /// The engine options.
    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    async fn load_platform(&self, platform_id: i64) -> EngineResult<(Platform, Sanitized<PlatformMetadata>)> {
        let platform = self
            .store
            .platform(platform_id)
            .await
            .ok_or_else(|| EngineError::not_found("platform", platform_id))?;
        if !platform.is_active {
            return Err(DriverError::PlatformInactive { platform_id }.into());
        }
        let platform_type: PlatformType = platform.platform_type.parse()?;
        let metadata = validate_metadata_for(platform_type, &platform.metadata)?;
        Ok((platform, metadata))
    }

    /// Fetches every resource of a platform for one device.
    pub async fn fetch(&self, ctx: &FetchContext, request: &FetchRequest) -> EngineResult<FetchEnvelope> {
        let ctx = self.options.bound(ctx);
        let link = self
            .store
            .device_link(request.device_id, request.platform_id)
            .await
            .ok_or_else(|| {
                EngineError::not_found(
                    "device link",
                    format!("{}@{}", request.device_id, request.platform_id),
                )
            })?;
        let (platform, metadata) = self.load_platform(request.platform_id).await?;
        let platform_type = metadata.platform_type();
        let resources = self.store.resources_for(platform.id).await;

        info!(
            platform = platform.id,
            device = request.device_id,
            resources = resources.len(),
            "Starting orchestrated fetch"
        );

        let mut driver = self.registry.create_for(platform_type, &platform.name, &metadata)?;
        let plan = FetchPlan {
            platform_id: platform.id,
            platform_type,
            alias: &link.alias,
            overrides: &request.overrides,
            resources: &resources,
        };
        let report = orchestrate(&ctx, driver.as_mut(), plan, self.options.cleanup_grace).await?;

        info!(
            platform = platform.id,
            device = request.device_id,
            succeeded = report.success_count(),
            failed = report.failure_count(),
            "Orchestrated fetch finished"
        );
        Ok(FetchEnvelope {
            device_id: request.device_id,
            platform_id: platform.id,
            alias: link.alias,
            data: report,
        })
    }

    /// Checks that a stored platform is reachable.
    pub async fn test_connection(&self, ctx: &FetchContext, platform_id: i64) -> EngineResult<ConnectionReport> {
        let ctx = self.options.bound(ctx);
        let platform = self
            .store
            .platform(platform_id)
            .await
            .ok_or_else(|| EngineError::not_found("platform", platform_id))?;
        if !platform.is_active {
            return Err(DriverError::PlatformInactive { platform_id }.into());
        }
        test_connection_with_grace(
            &self.registry,
            &platform.platform_type,
            &platform.metadata,
            &ctx,
            self.options.cleanup_grace,
        )
        .await
    }

    /// Probes one resource without a device alias.
    pub async fn test_resource(&self, ctx: &FetchContext, resource_id: i64) -> EngineResult<ResourceTestEnvelope> {
        let ctx = self.options.bound(ctx);
        let resource = self
            .store
            .resource(resource_id)
            .await
            .ok_or_else(|| EngineError::not_found("resource", resource_id))?;
        let (platform, metadata) = self.load_platform(resource.platform_id).await?;
        let platform_type = metadata.platform_type();

        let resource_type: ResourceType = resource.resource_type.parse()?;
        check_compatibility(platform_type, resource_type)?;
        let details = validate_details_for(resource_type, &resource.details)?;

        let mut driver = self.registry.create_for(platform_type, &platform.name, &metadata)?;
        let result = match driver.connect(&ctx).await {
            Ok(()) => driver.test_resource(&ctx, &details).await,
            Err(e) => Err(e),
        };
        cleanup(driver.as_mut(), &ctx, self.options.cleanup_grace).await;
        let result = result?;

        info!(resource = resource.id, platform = platform.id, "Resource test passed");
        Ok(ResourceTestEnvelope {
            resource_id: resource.id,
            name: resource.name,
            resource_type: resource_type.as_str().to_string(),
            platform_id: platform.id,
            platform_type: platform_type.as_str().to_string(),
            result,
        })
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("registry", &self.registry)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Utc;
    use conduit_core::driver::ensure_details_kind;
    use conduit_core::error::DriverResult;
    use conduit_core::output::{FetchOutput, SdkReading};
    use serde_json::json;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Default)]
    struct Calls {
        connects: AtomicU32,
        fetches: AtomicU32,
        disconnects: AtomicU32,
    }

    /// SDK-typed driver whose behavior is driven by the `method` of each call.
    struct ScriptedDriver {
        calls: Arc<Calls>,
        connected: bool,
        fail_connect: bool,
    }

    #[async_trait]
    impl PlatformDriver for ScriptedDriver {
        fn name(&self) -> &str {
            "scripted"
        }

        fn platform_type(&self) -> PlatformType {
            PlatformType::Sdk
        }

        fn is_connected(&self) -> bool {
            self.connected
        }

        async fn connect(&mut self, ctx: &FetchContext) -> DriverResult<()> {
            ctx.check("connect")?;
            self.calls.connects.fetch_add(1, Ordering::SeqCst);
            if self.fail_connect {
                return Err(DriverError::connection_failed("refused"));
            }
            self.connected = true;
            Ok(())
        }

        async fn fetch_data(
            &mut self,
            ctx: &FetchContext,
            details: &Sanitized<ResourceDetails>,
        ) -> DriverResult<FetchOutput> {
            ensure_details_kind(PlatformType::Sdk, details)?;
            ctx.check("fetch")?;
            self.calls.fetches.fetch_add(1, Ordering::SeqCst);
            let ResourceDetails::Sdk(d) = details.get() else {
                unreachable!()
            };
            match d.method.as_str() {
                "fail" => Err(DriverError::query("scripted failure")),
                "hang" => {
                    ctx.run("fetch", async {
                        tokio::time::sleep(Duration::from_secs(30)).await;
                        Ok(FetchOutput::Series(Vec::new()))
                    })
                    .await
                }
                method => Ok(FetchOutput::Sdk(SdkReading {
                    device: d.device.clone().unwrap_or_default(),
                    method: method.to_string(),
                    value: json!(1),
                    timestamp: Utc::now(),
                })),
            }
        }

        async fn disconnect(&mut self, _ctx: &FetchContext) -> DriverResult<()> {
            self.calls.disconnects.fetch_add(1, Ordering::SeqCst);
            self.connected = false;
            Ok(())
        }

        async fn validate_config(&mut self, ctx: &FetchContext) -> DriverResult<()> {
            self.connect(ctx).await
        }
    }

    fn resource(id: i64, name: &str, resource_type: &str, details: &str) -> Resource {
        Resource {
            id,
            platform_id: 1,
            name: name.to_string(),
            resource_type: resource_type.to_string(),
            details: details.to_string(),
        }
    }

    fn driver(calls: &Arc<Calls>) -> ScriptedDriver {
        ScriptedDriver {
            calls: calls.clone(),
            connected: false,
            fail_connect: false,
        }
    }

    async fn run(driver: &mut ScriptedDriver, ctx: &FetchContext, resources: &[Resource]) -> EngineResult<FetchReport> {
        let overrides = BTreeMap::new();
        let plan = FetchPlan {
            platform_id: 1,
            platform_type: PlatformType::Sdk,
            alias: "dev-1",
            overrides: &overrides,
            resources,
        };
        orchestrate(ctx, driver, plan, Duration::from_millis(200)).await
    }

    #[tokio::test]
    async fn test_incompatible_resource_is_reported_and_sibling_succeeds() {
        let calls = Arc::new(Calls::default());
        let resources = [
            resource(2, "power", "sdk_method", r#"{"method":"read_power"}"#),
            resource(1, "assets", "rest_endpoint", r#"{"method":"GET","path":"/a"}"#),
        ];
        let report = run(&mut driver(&calls), &FetchContext::new(), &resources).await.unwrap();

        let failure = report.get("assets").and_then(|o| o.failure()).unwrap();
        assert_eq!(failure.error_type, "incompatible_resource_type");
        let reading = report.get("power").and_then(|o| o.data()).and_then(|d| d.as_sdk()).unwrap();
        assert_eq!(reading.device, "dev-1");
        assert_eq!(calls.connects.load(Ordering::SeqCst), 1);
        assert_eq!(calls.fetches.load(Ordering::SeqCst), 1);
        assert_eq!(calls.disconnects.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_partial_failure_keeps_siblings() {
        let calls = Arc::new(Calls::default());
        let resources = [
            resource(1, "bad", "sdk_method", r#"{"method":"fail"}"#),
            resource(2, "good", "sdk_method", r#"{"method":"read"}"#),
            resource(3, "broken", "sdk_method", "{not json"),
        ];
        let report = run(&mut driver(&calls), &FetchContext::new(), &resources).await.unwrap();

        assert_eq!(report.success_count(), 1);
        assert_eq!(report.get("bad").and_then(|o| o.failure()).unwrap().error_type, "query_error");
        assert_eq!(report.get("broken").and_then(|o| o.failure()).unwrap().error_type, "malformed_config");
        assert_eq!(calls.disconnects.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_all_failed_is_an_error_with_report() {
        let calls = Arc::new(Calls::default());
        let resources = [resource(1, "bad", "sdk_method", r#"{"method":"fail"}"#)];
        let err = run(&mut driver(&calls), &FetchContext::new(), &resources).await.unwrap_err();

        assert_eq!(err.report().map(FetchReport::len), Some(1));
        assert_eq!(calls.disconnects.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_nothing_prepared_skips_connect() {
        let calls = Arc::new(Calls::default());
        let resources = [resource(1, "a", "opcua_node", r#"{"node_id":"i=1"}"#)];
        let err = run(&mut driver(&calls), &FetchContext::new(), &resources).await.unwrap_err();
        assert!(matches!(err, EngineError::AllResourcesFailed { .. }));
        assert_eq!(calls.connects.load(Ordering::SeqCst), 0);

        let err = run(&mut driver(&calls), &FetchContext::new(), &[]).await.unwrap_err();
        assert!(matches!(err, EngineError::NoCompatibleResources { platform_id: 1 }));
    }

    #[tokio::test]
    async fn test_connect_failure_still_disconnects() {
        let calls = Arc::new(Calls::default());
        let mut driver = driver(&calls);
        driver.fail_connect = true;
        let resources = [resource(1, "a", "sdk_method", "{}")];

        let err = run(&mut driver, &FetchContext::new(), &resources).await.unwrap_err();
        assert!(matches!(err, EngineError::Driver(DriverError::ConnectionFailed { .. })));
        assert_eq!(calls.fetches.load(Ordering::SeqCst), 0);
        assert_eq!(calls.disconnects.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cancellation_propagates_and_cleanup_runs() {
        let calls = Arc::new(Calls::default());
        let resources = [
            resource(1, "slow", "sdk_method", r#"{"method":"hang"}"#),
            resource(2, "after", "sdk_method", r#"{"method":"read"}"#),
        ];
        let ctx = FetchContext::new();
        let canceller = ctx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            canceller.cancel();
        });

        let err = run(&mut driver(&calls), &ctx, &resources).await.unwrap_err();
        let report = err.report().unwrap();
        assert_eq!(report.get("slow").and_then(|o| o.failure()).unwrap().error_type, "canceled");
        assert_eq!(calls.disconnects.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_alias_replaces_stored_device() {
        let calls = Arc::new(Calls::default());
        let resources = [resource(1, "r", "sdk_method", r#"{"method":"read","device":"stored"}"#)];
        let report = run(&mut driver(&calls), &FetchContext::new(), &resources).await.unwrap();
        let reading = report.get("r").and_then(|o| o.data()).and_then(|d| d.as_sdk()).unwrap();
        assert_eq!(reading.device, "dev-1");
    }

    #[test]
    fn test_oversized_fetch_timeout_leaves_context_unbounded() {
        let options = EngineOptions {
            fetch_timeout: Some(Duration::from_secs(u64::MAX)),
            ..EngineOptions::default()
        };
        assert_eq!(options.bound(&FetchContext::new()).deadline(), None);

        let ctx = FetchContext::with_deadline_in(Duration::from_secs(5));
        assert_eq!(options.bound(&ctx).deadline(), ctx.deadline());
    }
}
