//! Failure injection tests: dead, slow and failing routes.

use std::time::Duration;

use axum::http::StatusCode;
use interop_mediator::error::TRANSACTION_ID_HEADER;
use interop_mediator::model::{RouteResult, TransactionStatus};

mod common;

use common::{
    channel, config, dead_port, http_client, start_backend, start_backend_with, start_mediator, transaction_id,
    CLIENT_ID, PASSWORD,
};

#[tokio::test]
async fn test_unreachable_primary_is_bad_gateway() {
    let b = start_backend("B").await;
    let mut down = b.primary_route();
    down.name = "down".into();
    down.port = dead_port().await;
    let mediator = start_mediator(config(vec![channel("c", "^/c$", vec![down, b.route()])])).await;

    let res = http_client()
        .get(mediator.url("/c"))
        .basic_auth(CLIENT_ID, Some(PASSWORD))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_GATEWAY);
    assert!(res.headers().contains_key(TRANSACTION_ID_HEADER));
    let id = transaction_id(&res);

    // The mirror still runs when the primary fails.
    let tx = mediator.wait_for_transaction(id, |tx| tx.routes.len() == 1).await;
    assert_eq!(tx.status, TransactionStatus::Failed);
    assert!(tx.response.is_none());
    assert!(tx.error.is_some());
    assert_eq!(b.calls(), 1);
}

#[tokio::test]
async fn test_slow_primary_times_out() {
    let slow = start_backend_with("slow", StatusCode::OK, Duration::from_secs(3)).await;
    let mut route = slow.primary_route();
    route.timeout_ms = Some(200);
    let mediator = start_mediator(config(vec![channel("c", "^/c$", vec![route])])).await;

    let res = http_client()
        .get(mediator.url("/c"))
        .basic_auth(CLIENT_ID, Some(PASSWORD))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::GATEWAY_TIMEOUT);
    assert_eq!(res.text().await.unwrap(), "Upstream request timed out");
}

#[tokio::test]
async fn test_backend_error_status_is_relayed() {
    let a = start_backend_with("A", StatusCode::SERVICE_UNAVAILABLE, Duration::ZERO).await;
    let mediator = start_mediator(config(vec![channel("c", "^/c$", vec![a.primary_route()])])).await;

    let res = http_client()
        .get(mediator.url("/c"))
        .basic_auth(CLIENT_ID, Some(PASSWORD))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
    let id = transaction_id(&res);
    assert_eq!(res.text().await.unwrap(), "A");

    let tx = mediator.wait_for_transaction(id, |tx| tx.response.is_some()).await;
    assert_eq!(tx.status, TransactionStatus::Failed);
}

#[tokio::test]
async fn test_client_error_status_completes() {
    let a = start_backend_with("A", StatusCode::BAD_REQUEST, Duration::ZERO).await;
    let mediator = start_mediator(config(vec![channel("c", "^/c$", vec![a.primary_route()])])).await;

    let res = http_client()
        .post(mediator.url("/c"))
        .basic_auth(CLIENT_ID, Some(PASSWORD))
        .body("bad")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let id = transaction_id(&res);

    let tx = mediator.wait_for_transaction(id, |tx| tx.response.is_some()).await;
    assert_eq!(tx.status, TransactionStatus::Completed);
}

#[tokio::test]
async fn test_failing_secondaries_are_recorded_not_surfaced() {
    let a = start_backend("A").await;
    let erroring = start_backend_with("erroring", StatusCode::INTERNAL_SERVER_ERROR, Duration::ZERO).await;
    let mut down = a.route();
    down.name = "down".into();
    down.port = dead_port().await;
    let mediator = start_mediator(config(vec![channel(
        "c",
        "^/c$",
        vec![a.primary_route(), erroring.route(), down],
    )]))
    .await;

    let res = http_client()
        .get(mediator.url("/c"))
        .basic_auth(CLIENT_ID, Some(PASSWORD))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let id = transaction_id(&res);
    assert_eq!(res.text().await.unwrap(), "A");

    let tx = mediator.wait_for_transaction(id, |tx| tx.routes.len() == 2).await;
    assert_eq!(tx.status, TransactionStatus::CompletedWithErrors);

    let erroring_outcome = tx.routes.iter().find(|r| r.name == "erroring").unwrap();
    assert!(matches!(&erroring_outcome.result, RouteResult::Response(r) if r.status == 500));
    let down_outcome = tx.routes.iter().find(|r| r.name == "down").unwrap();
    assert!(matches!(down_outcome.result, RouteResult::Failure { .. }));
}

#[tokio::test]
async fn test_slow_secondary_does_not_delay_response() {
    let a = start_backend("A").await;
    let slow = start_backend_with("slow", StatusCode::OK, Duration::from_millis(1500)).await;
    let mediator = start_mediator(config(vec![channel("c", "^/c$", vec![a.primary_route(), slow.route()])])).await;

    let started = std::time::Instant::now();
    let res = http_client()
        .get(mediator.url("/c"))
        .basic_auth(CLIENT_ID, Some(PASSWORD))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert!(started.elapsed() < Duration::from_millis(1000), "response waited on the secondary");
    let id = transaction_id(&res);

    let tx = mediator.wait_for_transaction(id, |tx| tx.routes.len() == 1).await;
    assert_eq!(tx.routes[0].name, "slow");
    assert_eq!(tx.status, TransactionStatus::Successful);
}
