// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Lifecycle Integration Tests
//!
//! Deadline, cancellation and disconnect behavior shared by every driver.
//!
//! - `test_expired_*`: a context past its deadline never reaches the network
//! - `test_disconnect_*`: disconnect is idempotent
//! - `test_cancel_*`: cancellation still releases the session

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use conduit_core::address::NodeId;
use conduit_core::context::{CancelToken, FetchContext};
use conduit_core::driver::{DriverFactory, PlatformDriver};
use conduit_core::error::DriverError;
use conduit_core::sanitize::{validate_details, validate_metadata};
use conduit_core::types::Platform;
use conduit_engine::{default_registry, Engine, EngineError, EngineOptions, FetchRequest};
use conduit_opcua::{OpcUaValue, ReadResult};
use conduit_rest::RestDriver;
use conduit_sdk::{SdkDriver, SimulationProfile};
use conduit_tests::prelude::*;
use conduit_timeseries::TimeSeriesDriver;
use mockito::{Matcher, Mock, Server, ServerGuard};

fn expired() -> FetchContext {
    FetchContext::with_deadline_in(Duration::ZERO)
}

fn metadata_of(platform: &Platform) -> conduit_core::Sanitized<conduit_core::PlatformMetadata> {
    validate_metadata(&platform.platform_type, &platform.metadata).unwrap()
}

fn drivers(base: &str, plc: &Arc<MockOpcUaServer>) -> Vec<Box<dyn PlatformDriver>> {
    let rest = metadata_of(&PlatformFixtures::rest(1, base));
    let series = metadata_of(&PlatformFixtures::timeseries(2, base));
    let opcua = metadata_of(&PlatformFixtures::opcua(3));
    let sdk = metadata_of(&PlatformFixtures::sdk(4));
    vec![
        Box::new(RestDriver::new("erp", &rest).unwrap()),
        Box::new(TimeSeriesDriver::new("tsdb", &series).unwrap()),
        plc.factory().create("plc-1", &opcua).unwrap(),
        Box::new(SdkDriver::new("vendor", &sdk, SimulationProfile::instant()).unwrap()),
    ]
}

/// One mock per method that must never be hit.
async fn untouched(server: &mut ServerGuard) -> Vec<Mock> {
    let mut mocks = Vec::new();
    for method in ["GET", "HEAD", "POST"] {
        mocks.push(server.mock(method, Matcher::Any).expect(0).create_async().await);
    }
    mocks
}

// =============================================================================
// Scenario E
// =============================================================================

#[tokio::test]
async fn test_expired_connect_times_out_for_every_driver() {
    let mut server = Server::new_async().await;
    let guards = untouched(&mut server).await;
    let plc = MockOpcUaServer::new();

    for mut driver in drivers(&server.url(), &plc) {
        let err = driver.connect(&expired()).await.unwrap_err();
        assert!(matches!(err, DriverError::Timeout { .. }), "{}: {err:?}", driver.name());
        assert!(!driver.is_connected(), "{}", driver.name());
    }

    assert_eq!(plc.connects.load(Ordering::SeqCst), 0);
    for guard in guards {
        guard.assert_async().await;
    }
}

#[tokio::test]
async fn test_expired_fetch_and_probe_make_no_request() {
    let mut server = Server::new_async().await;
    let guards = untouched(&mut server).await;
    let metadata = metadata_of(&PlatformFixtures::rest(1, &server.url()));
    let mut driver = RestDriver::new("erp", &metadata).unwrap();
    let details = validate_details("rest_endpoint", r#"{"method":"GET","path":"/assets"}"#).unwrap();

    driver.connect(&FetchContext::new()).await.unwrap();
    let err = driver.fetch_data(&expired(), &details).await.unwrap_err();
    assert_eq!(err.error_type(), "timeout");
    let err = driver.validate_config(&expired()).await.unwrap_err();
    assert_eq!(err.error_type(), "timeout");

    for guard in guards {
        guard.assert_async().await;
    }
}

#[tokio::test]
async fn test_canceled_context_wins_over_deadline() {
    let metadata = metadata_of(&PlatformFixtures::timeseries(2, "http://127.0.0.1:8086"));
    let mut driver = TimeSeriesDriver::new("tsdb", &metadata).unwrap();

    let ctx = FetchContext::with_cancel(CancelToken::new()).with_timeout(Duration::ZERO);
    ctx.cancel();
    let err = driver.connect(&ctx).await.unwrap_err();
    assert!(matches!(err, DriverError::Canceled { .. }));
}

// =============================================================================
// Scenario F
// =============================================================================

#[tokio::test]
async fn test_disconnect_twice_is_a_noop_for_every_driver() {
    let plc = MockOpcUaServer::new();
    let ctx = FetchContext::new();

    for mut driver in drivers("http://127.0.0.1:8086", &plc) {
        driver.connect(&ctx).await.unwrap();
        assert!(driver.is_connected(), "{}", driver.name());

        driver.disconnect(&ctx).await.unwrap();
        driver.disconnect(&ctx).await.unwrap();
        assert!(!driver.is_connected(), "{}", driver.name());
    }

    assert_eq!(plc.disconnects.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_disconnect_before_connect_is_a_noop() {
    let plc = MockOpcUaServer::new();
    let ctx = FetchContext::new();

    for mut driver in drivers("http://127.0.0.1:8086", &plc) {
        driver.disconnect(&ctx).await.unwrap();
        assert!(!driver.is_connected(), "{}", driver.name());
    }
    assert_eq!(plc.disconnects.load(Ordering::SeqCst), 0);
}

// =============================================================================
// Cancellation through the engine
// =============================================================================

fn slow_plc_engine(plc: &Arc<MockOpcUaServer>, options: EngineOptions) -> Engine {
    plc.set(
        "ns=2;s=Boiler.Temp",
        ReadResult::success(NodeId::string(2, "Boiler.Temp"), OpcUaValue::Double(71.5)),
    );
    plc.slow_reads(Duration::from_secs(30));

    let store = MemoryStore::new()
        .with_platform(PlatformFixtures::opcua(3))
        .with_resource(ResourceFixtures::node(30, 3, "temp", "ns=2;s=Boiler.Temp"))
        .with_device(DeviceFixtures::link(9, 3, "line-1"));
    Engine::with_registry(store.shared(), Arc::new(default_registry().with(Arc::new(plc.factory()))))
        .with_options(options)
}

#[tokio::test]
async fn test_cancel_mid_fetch_still_disconnects() {
    let plc = MockOpcUaServer::new();
    let engine = slow_plc_engine(&plc, EngineOptions::default());

    let token = CancelToken::new();
    let ctx = FetchContext::with_cancel(token.clone());
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        token.cancel();
    });

    let result = tokio::time::timeout(Duration::from_secs(5), engine.fetch(&ctx, &FetchRequest::new(3, 9)))
        .await
        .expect("fetch must return promptly after cancellation");

    let err = result.unwrap_err();
    let report = err.report().expect("per-resource report");
    assert_eq!(report.get("temp").and_then(|o| o.failure()).unwrap().error_type, "canceled");

    assert_eq!(plc.disconnects.load(Ordering::SeqCst), 1);
    assert!(!plc.is_connected());
}

#[tokio::test]
async fn test_fetch_timeout_bounds_the_whole_request() {
    let plc = MockOpcUaServer::new();
    let engine = slow_plc_engine(
        &plc,
        EngineOptions {
            fetch_timeout: Some(Duration::from_millis(100)),
            cleanup_grace: Duration::from_secs(1),
        },
    );

    let err = tokio::time::timeout(
        Duration::from_secs(5),
        engine.fetch(&FetchContext::new(), &FetchRequest::new(3, 9)),
    )
    .await
    .expect("deadline must end the request")
    .unwrap_err();

    assert!(matches!(err, EngineError::AllResourcesFailed { .. }));
    assert_eq!(
        err.report().and_then(|r| r.get("temp")).and_then(|o| o.failure()).map(|f| f.error_type.as_str()),
        Some("timeout")
    );
    assert_eq!(plc.disconnects.load(Ordering::SeqCst), 1);
}
