// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

use std::collections::BTreeMap;
use std::time::Duration;

use conduit_core::context::FetchContext;
use conduit_core::driver::PlatformDriver;
use conduit_core::error::DriverError;
use conduit_core::sanitize::{validate_details, validate_metadata};
use conduit_timeseries::TimeSeriesDriver;
use mockito::{Matcher, Server};
use serde_json::json;
use tokio::net::TcpListener;

const CSV: &str = "\
#datatype,string,long,dateTime:RFC3339,double,string,string
#group,false,false,false,false,true,true
#default,_result,,,,,
,result,table,_time,_value,_field,_measurement
,,0,2024-05-01T00:10:00Z,21.5,temp,boiler
,,0,2024-05-01T00:20:00Z,22.5,temp,boiler
";

fn driver_for(url: &str) -> TimeSeriesDriver {
    let raw = json!({
        "url": url,
        "token": "tok",
        "org": "acme",
        "bucket": "plant",
        "timeout": 5
    })
    .to_string();
    let metadata = validate_metadata("TimeSeries", &raw).unwrap();
    TimeSeriesDriver::new("tsdb", &metadata).unwrap()
}

fn details() -> conduit_core::Sanitized<conduit_core::ResourceDetails> {
    validate_details(
        "timeseries_query",
        r#"{"bucket":"plant","measurement":"boiler","field":"temp","time_range":"-1h"}"#,
    )
    .unwrap()
}

fn org_acme() -> Matcher {
    Matcher::UrlEncoded("org".into(), "acme".into())
}

#[tokio::test]
async fn test_fetch_parses_records() {
    let mut server = Server::new_async().await;
    let query = server
        .mock("POST", "/api/v2/query")
        .match_query(org_acme())
        .match_header("authorization", "Token tok")
        .match_header("accept", "application/csv")
        .match_body(Matcher::AllOf(vec![
            Matcher::PartialJson(json!({
                "type": "flux",
                "dialect": {"annotations": ["datatype", "group", "default"]}
            })),
            Matcher::Regex(r#"from\(bucket: \\"plant\\"\)"#.into()),
            Matcher::Regex(r"range\(start: -1h\)".into()),
        ]))
        .with_status(200)
        .with_body(CSV)
        .expect(1)
        .create_async()
        .await;

    let mut driver = driver_for(&server.url());
    let ctx = FetchContext::new();
    driver.connect(&ctx).await.unwrap();
    let output = driver.fetch_data(&ctx, &details()).await.unwrap();
    driver.disconnect(&ctx).await.unwrap();

    let records = output.as_series().unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].value, json!(21.5));
    assert_eq!(records[1].measurement, "boiler");
    query.assert_async().await;
}

#[tokio::test]
async fn test_overrides_reach_the_query() {
    let mut server = Server::new_async().await;
    let query = server
        .mock("POST", "/api/v2/query")
        .match_query(org_acme())
        .match_body(Matcher::AllOf(vec![
            Matcher::Regex(r"range\(start: -15m\)".into()),
            Matcher::Regex(r#"r\._measurement == \\"kiln-2\\""#.into()),
            Matcher::Regex(r#"r\._field == \\"pressure\\""#.into()),
        ]))
        .with_status(200)
        .with_body("")
        .expect(1)
        .create_async()
        .await;

    let mut overrides = BTreeMap::new();
    overrides.insert("time_range".to_string(), "-15m".to_string());
    overrides.insert("field".to_string(), "pressure".to_string());
    let adjusted = details().with_alias("kiln-2").unwrap().with_overrides(&overrides).unwrap();

    let mut driver = driver_for(&server.url());
    let output = driver.fetch_data(&FetchContext::new(), &adjusted).await.unwrap();
    assert!(output.as_series().unwrap().is_empty());
    query.assert_async().await;
}

#[tokio::test]
async fn test_query_error_status() {
    let mut server = Server::new_async().await;
    let _query = server
        .mock("POST", "/api/v2/query")
        .match_query(Matcher::Any)
        .with_status(400)
        .with_header("content-type", "application/json")
        .with_body(json!({"code": "invalid", "message": "compilation failed"}).to_string())
        .create_async()
        .await;

    let mut driver = driver_for(&server.url());
    let err = driver.fetch_data(&FetchContext::new(), &details()).await.unwrap_err();
    match err {
        DriverError::QueryError { message } => {
            assert!(message.contains("compilation failed"));
            assert!(message.contains("400"));
        }
        other => panic!("expected query error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_health_pass() {
    let mut server = Server::new_async().await;
    let _health = server
        .mock("GET", "/health")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({"name": "influxdb", "status": "pass", "message": "ready"}).to_string())
        .create_async()
        .await;

    let mut driver = driver_for(&server.url());
    driver.validate_config(&FetchContext::new()).await.unwrap();
}

#[tokio::test]
async fn test_health_fail() {
    let mut server = Server::new_async().await;
    let _health = server
        .mock("GET", "/health")
        .with_status(503)
        .with_header("content-type", "application/json")
        .with_body(json!({"name": "influxdb", "status": "fail", "message": "not ready"}).to_string())
        .create_async()
        .await;

    let mut driver = driver_for(&server.url());
    let err = driver.validate_config(&FetchContext::new()).await.unwrap_err();
    match err {
        DriverError::ConnectionFailed { message, .. } => assert!(message.contains("not ready")),
        other => panic!("expected connection failure, got {:?}", other),
    }
}

#[tokio::test]
async fn test_slow_query_times_out() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });

    let mut driver = driver_for(&format!("http://{addr}"));
    let ctx = FetchContext::with_deadline_in(Duration::from_millis(100));
    let err = driver.fetch_data(&ctx, &details()).await.unwrap_err();
    assert!(matches!(err, DriverError::Timeout { .. }));
}
