//! Scenario: HTTP outcomes map into the accrual taxonomy.
//!
//! # Invariants under test
//!
//! 1. 200 with a full body resolves to `Resolved` with the accrual converted
//!    to cents.
//! 2. 200 without an `accrual` field resolves with zero cents.
//! 3. 204 and 404 both map to `NotFound`.
//! 4. 429 with `Retry-After` maps to `RateLimited` with the advised delay.
//! 5. 429 without `Retry-After` falls back to the configured default.
//! 6. 5xx and undecodable bodies map to `Transient`, never a panic or error.
//!
//! All tests run against an in-process mock server; no real authority needed.

use std::time::Duration;

use httpmock::prelude::*;
use loy_accrual::{AccrualApi, AccrualOutcome, HttpAccrualClient};
use loy_schemas::{Cents, OrderStatus};

const DEFAULT_BACKOFF: Duration = Duration::from_secs(60);

fn client_for(server: &MockServer) -> HttpAccrualClient {
    HttpAccrualClient::new(server.base_url(), DEFAULT_BACKOFF)
}

#[tokio::test]
async fn processed_order_resolves_with_cents() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(GET).path("/api/orders/79927398713");
        then.status(200).json_body(serde_json::json!({
            "order": "79927398713",
            "status": "PROCESSED",
            "accrual": 729.98,
        }));
    });

    let out = client_for(&server).check("79927398713").await;
    mock.assert();
    assert_eq!(
        out,
        AccrualOutcome::Resolved {
            status: OrderStatus::Processed,
            accrual: Cents::new(72998),
        }
    );
}

#[tokio::test]
async fn in_progress_order_resolves_with_zero_accrual() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/api/orders/79927398713");
        then.status(200).json_body(serde_json::json!({
            "order": "79927398713",
            "status": "PROCESSING",
        }));
    });

    let out = client_for(&server).check("79927398713").await;
    assert_eq!(
        out,
        AccrualOutcome::Resolved {
            status: OrderStatus::Processing,
            accrual: Cents::ZERO,
        }
    );
}

#[tokio::test]
async fn missing_order_is_not_found() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/api/orders/204204204204");
        then.status(204);
    });
    server.mock(|when, then| {
        when.method(GET).path("/api/orders/404404404404");
        then.status(404);
    });

    let c = client_for(&server);
    assert_eq!(c.check("204204204204").await, AccrualOutcome::NotFound);
    assert_eq!(c.check("404404404404").await, AccrualOutcome::NotFound);
}

#[tokio::test]
async fn rate_limit_carries_advised_delay() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/api/orders/79927398713");
        then.status(429).header("Retry-After", "3");
    });

    let out = client_for(&server).check("79927398713").await;
    assert_eq!(
        out,
        AccrualOutcome::RateLimited {
            retry_after: Duration::from_secs(3)
        }
    );
}

#[tokio::test]
async fn rate_limit_without_header_uses_default_backoff() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/api/orders/79927398713");
        then.status(429);
    });

    let out = client_for(&server).check("79927398713").await;
    assert_eq!(
        out,
        AccrualOutcome::RateLimited {
            retry_after: DEFAULT_BACKOFF
        }
    );
}

#[tokio::test]
async fn server_error_is_transient() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/api/orders/79927398713");
        then.status(500);
    });

    match client_for(&server).check("79927398713").await {
        AccrualOutcome::Transient(msg) => assert!(msg.contains("500"), "got: {msg}"),
        other => panic!("expected Transient, got {other:?}"),
    }
}

#[tokio::test]
async fn malformed_body_is_transient_not_a_crash() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/api/orders/79927398713");
        then.status(200)
            .header("content-type", "application/json")
            .body("{not json");
    });

    match client_for(&server).check("79927398713").await {
        AccrualOutcome::Transient(_) => {}
        other => panic!("expected Transient, got {other:?}"),
    }
}

#[tokio::test]
async fn unknown_authority_status_is_transient() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/api/orders/79927398713");
        then.status(200).json_body(serde_json::json!({
            "order": "79927398713",
            "status": "EXPLODED",
        }));
    });

    match client_for(&server).check("79927398713").await {
        AccrualOutcome::Transient(msg) => assert!(msg.contains("EXPLODED"), "got: {msg}"),
        other => panic!("expected Transient, got {other:?}"),
    }
}
