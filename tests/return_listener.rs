//! Tests for the pages the payment gateway sends the customer back to.

use axum::{body::Body, http::Request, http::StatusCode};
use tokio::sync::mpsc;
use tower::ServiceExt;

use pzstore::handlers::{self, ReturnEvent, ReturnOutcome, ReturnState};

mod common;
use common::*;

async fn hit(uri: &str) -> (StatusCode, Option<ReturnEvent>) {
    let (tx, mut rx) = mpsc::channel(4);
    let app = handlers::router(ReturnState::new(tx));

    let response = app
        .oneshot(Request::builder().method("GET").uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();

    (response.status(), rx.try_recv().ok())
}

#[tokio::test]
async fn test_health() {
    let (status, event) = hit("/health").await;

    assert_eq!(status, StatusCode::OK);
    assert!(event.is_none());
}

#[tokio::test]
async fn test_launcher_approval_is_forwarded() {
    let (status, event) = hit(
        "/dashboard/obrigado-launcher?collection_id=1&collection_status=approved&payment_id=pay-1\
         &status=approved&userId=user-1&productId=p-launcher",
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let event = event.expect("event forwarded");
    assert_eq!(event.outcome, ReturnOutcome::Approved);
    assert_eq!(event.kind, Some(CheckoutKind::Launcher));
    assert_eq!(event.query.session().unwrap().payment_id, "pay-1");
    assert_eq!(event.query.status(), Some(PaymentStatus::Approved));
}

#[tokio::test]
async fn test_pending_script_return_is_forwarded() {
    let (status, event) =
        hit("/dashboard/pendente?payment_id=pay-3&status=in_process&userId=user-1&productId=p-script").await;

    assert_eq!(status, StatusCode::OK);
    let event = event.unwrap();
    assert_eq!(event.outcome, ReturnOutcome::Pending);
    assert_eq!(event.kind, Some(CheckoutKind::Script));
    assert_eq!(event.query.status(), Some(PaymentStatus::Pending));
}

#[tokio::test]
async fn test_renewal_return_carries_license() {
    let (_, event) = hit("/dashboard/obrigado-renovacao?userId=user-1&licenseId=lic-1&status=approved").await;

    let event = event.unwrap();
    assert_eq!(event.kind, Some(CheckoutKind::Renewal));
    assert_eq!(event.query.license_id(), Some("lic-1"));
}

#[tokio::test]
async fn test_error_page_has_no_kind() {
    let (status, event) = hit("/dashboard/erro").await;

    assert_eq!(status, StatusCode::OK);
    let event = event.unwrap();
    assert_eq!(event.outcome, ReturnOutcome::Failed);
    assert_eq!(event.kind, None);
    assert_eq!(event.query, PaymentQuery::default());
}

#[tokio::test]
async fn test_no_waiting_checkout_is_internal_error() {
    let (tx, rx) = mpsc::channel(1);
    drop(rx);
    let app = handlers::router(ReturnState::new(tx));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/dashboard/obrigado?payment_id=pay-1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_listener_serves_over_tcp() {
    let (tx, mut rx) = mpsc::channel(4);
    let listener = handlers::serve("127.0.0.1:0", tx).await.unwrap();

    let url = format!(
        "{}/dashboard/obrigado?payment_id=pay-9&userId=user-1&productId=p-script&status=approved",
        listener.base_url()
    );
    let response = reqwest::get(&url).await.unwrap();

    assert!(response.status().is_success());
    let event = rx.recv().await.unwrap();
    assert_eq!(event.kind, Some(CheckoutKind::Script));
    assert_eq!(event.query.payment_id.as_deref(), Some("pay-9"));
}
