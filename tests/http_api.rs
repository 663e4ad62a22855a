//! REST API through the full router

mod common;

use std::sync::Arc;
use std::time::Instant;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use fleet_reservations::application::InitiatePayment;
use fleet_reservations::domain::payment::{PaymentStatus, PaymentType};
use fleet_reservations::domain::repositories::ReservationStore;
use fleet_reservations::interfaces::http::{create_api_router, AppState};

use common::{days, Harness};

fn router(h: &Harness) -> Router {
    create_api_router(
        AppState {
            reservations: h.reservations.clone(),
            payments: h.payments.clone(),
            callbacks: h.callbacks.clone(),
            db: None,
            lock_backend: "local",
            metrics: None,
            started_at: Arc::new(Instant::now()),
        },
        &[],
    )
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_text(response: axum::response::Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn create_request(h: &Harness, start_day: i64, end_day: i64) -> Request<Body> {
    let body = json!({
        "asset_id": h.asset.id,
        "requester_id": h.requester.id,
        "start_at": days(start_day),
        "end_at": days(end_day),
        "amount": 40000
    });
    Request::builder()
        .method("POST")
        .uri("/api/v1/reservations")
        .header(header::CONTENT_TYPE, "application/json")
        .header("x-tenant-id", h.tenant_id.to_string())
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn create_then_conflict() {
    let h = Harness::in_memory().await;
    let app = router(&h);

    let response = app.clone().oneshot(create_request(&h, 1, 5)).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["status"], "CONFIRMED");

    let response = app.oneshot(create_request(&h, 3, 4)).await.unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = body_json(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Vehicle is not available for these dates");
}

#[tokio::test]
async fn tenant_header_is_required() {
    let h = Harness::in_memory().await;
    let request = Request::builder()
        .uri("/api/v1/reservations")
        .body(Body::empty())
        .unwrap();
    let response = router(&h).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unknown_reservation_is_not_found() {
    let h = Harness::in_memory().await;
    let request = Request::builder()
        .uri(format!("/api/v1/reservations/{}", uuid::Uuid::new_v4()))
        .header("x-tenant-id", h.tenant_id.to_string())
        .body(Body::empty())
        .unwrap();
    let response = router(&h).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn provider_callback_is_acknowledged_with_ok() {
    let h = Harness::in_memory().await;
    let reservation = h
        .reservations
        .create(h.create_cmd(days(2), days(4)))
        .await
        .unwrap();
    let initiated = h
        .payments
        .initiate(InitiatePayment {
            tenant_id: h.tenant_id,
            reservation_id: reservation.id,
            payment_type: PaymentType::FullPayment,
            amount: None,
            description: None,
            email: None,
        })
        .await
        .unwrap();

    let (data, signature) = h.signed_callback(&initiated.reference, "1", Some(reservation.amount));
    let query = form_urlencoded::Serializer::new(String::new())
        .append_pair("data", &data)
        .append_pair("ss1", &signature)
        .finish();
    let app = router(&h);

    for _ in 0..2 {
        let request = Request::builder()
            .uri(format!("/api/v1/payments/callback?{query}"))
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "OK");
    }

    let payment = h
        .store
        .find_payment_by_reference(&initiated.reference)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(payment.status, PaymentStatus::Succeeded);
    assert_eq!(h.metrics.callbacks(), vec!["succeeded", "duplicate"]);

    // Form-encoded POST with a forged signature
    let forged = form_urlencoded::Serializer::new(String::new())
        .append_pair("data", &data)
        .append_pair("ss1", "not-a-signature")
        .finish();
    let request = Request::builder()
        .method("POST")
        .uri("/api/v1/payments/callback")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(forged))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn health_reports_memory_store() {
    let h = Harness::in_memory().await;
    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let response = router(&h).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["lock_store"], "local");
}
