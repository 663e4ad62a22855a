//! Payment initiation and provider callback reconciliation

mod common;

use std::sync::atomic::Ordering;

use chrono::Duration;
use fleet_reservations::application::{CallbackAck, InitiatePayment};
use fleet_reservations::domain::payment::{encode_payload, Payment, PaymentStatus, PaymentType};
use fleet_reservations::domain::repositories::ReservationStore;
use fleet_reservations::domain::reservation::{Reservation, ReservationStatus};
use fleet_reservations::shared::errors::DomainError;

use common::{base_time, days, Harness};

async fn reservation_with_order(h: &Harness) -> (Reservation, String) {
    let reservation = h
        .reservations
        .create(h.create_cmd(days(3), days(5)))
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
            email: Some("driver@example.com".into()),
        })
        .await
        .unwrap();
    (reservation, initiated.reference)
}

async fn payment(h: &Harness, reference: &str) -> Payment {
    h.store
        .find_payment_by_reference(reference)
        .await
        .unwrap()
        .expect("payment stored")
}

#[tokio::test]
async fn initiation_builds_the_order_reference() {
    let h = Harness::in_memory().await;
    let (reservation, reference) = reservation_with_order(&h).await;

    let expected = format!(
        "ORD-{}-{}",
        base_time().timestamp_millis(),
        &reservation.id.to_string()[..8]
    );
    assert_eq!(reference, expected);

    let stored = payment(&h, &reference).await;
    assert_eq!(stored.status, PaymentStatus::Pending);
    assert_eq!(stored.amount, reservation.amount);

    let orders = h.gateway.orders.lock().unwrap().clone();
    assert_eq!(orders.len(), 1);
    assert!(!orders[0].hold);
}

#[tokio::test]
async fn failed_order_creation_fails_the_payment() {
    let h = Harness::in_memory().await;
    let reservation = h
        .reservations
        .create(h.create_cmd(days(3), days(5)))
        .await
        .unwrap();
    h.gateway.fail_orders.store(true, Ordering::SeqCst);

    let err = h
        .payments
        .initiate(InitiatePayment {
            tenant_id: h.tenant_id,
            reservation_id: reservation.id,
            payment_type: PaymentType::Deposit,
            amount: None,
            description: None,
            email: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Gateway(_)));

    let reference = format!(
        "ORD-{}-{}",
        base_time().timestamp_millis(),
        &reservation.id.to_string()[..8]
    );
    assert_eq!(payment(&h, &reference).await.status, PaymentStatus::Failed);
}

async fn matching_callback_settles_once(h: Harness) {
    let (reservation, reference) = reservation_with_order(&h).await;
    let (data, signature) = h.signed_callback(&reference, "1", Some(reservation.amount));

    let ack = h.callbacks.handle_callback(&data, &signature).await.unwrap();
    assert_eq!(ack, CallbackAck::Succeeded);

    let settled = payment(&h, &reference).await;
    assert_eq!(settled.status, PaymentStatus::Succeeded);
    let confirmed = h.reservations.get(h.tenant_id, reservation.id).await.unwrap();
    assert_eq!(confirmed.status, ReservationStatus::Confirmed);

    let replay = h.callbacks.handle_callback(&data, &signature).await.unwrap();
    assert_eq!(replay, CallbackAck::Duplicate);
    assert_eq!(payment(&h, &reference).await.updated_at, settled.updated_at);
    assert_eq!(h.metrics.callbacks(), vec!["succeeded", "duplicate"]);
    assert_eq!(h.audit.actions().last().map(String::as_str), Some("payment.succeeded"));
}

#[tokio::test]
async fn matching_callback_settles_once_in_memory() {
    matching_callback_settles_once(Harness::in_memory().await).await;
}

#[tokio::test]
async fn matching_callback_settles_once_sqlite() {
    matching_callback_settles_once(Harness::sqlite().await).await;
}

#[tokio::test]
async fn forged_signature_touches_nothing() {
    let h = Harness::in_memory().await;
    let (_, reference) = reservation_with_order(&h).await;
    let (data, _) = h.signed_callback(&reference, "1", None);
    let lookups = h.store.lookups();

    let err = h
        .callbacks
        .handle_callback(&data, "0123456789abcdef0123456789abcdef")
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::InvalidSignature));
    assert_eq!(h.store.lookups(), lookups);
    assert_eq!(payment(&h, &reference).await.status, PaymentStatus::Pending);
    assert_eq!(h.metrics.callbacks(), vec!["invalid_signature"]);
}

#[tokio::test]
async fn amount_outside_tolerance_is_rejected() {
    let h = Harness::in_memory().await;
    let (reservation, reference) = reservation_with_order(&h).await;

    // Tolerance is one minor unit
    let (data, signature) = h.signed_callback(&reference, "1", Some(reservation.amount + 1));
    assert_eq!(
        h.callbacks.handle_callback(&data, &signature).await.unwrap(),
        CallbackAck::Succeeded
    );

    let h = Harness::in_memory().await;
    let (reservation, reference) = reservation_with_order(&h).await;
    let (data, signature) = h.signed_callback(&reference, "1", Some(reservation.amount - 500));
    let err = h.callbacks.handle_callback(&data, &signature).await.unwrap_err();
    assert!(matches!(
        err,
        DomainError::AmountMismatch { expected, actual, .. }
            if expected == reservation.amount && actual == reservation.amount - 500
    ));
    assert_eq!(payment(&h, &reference).await.status, PaymentStatus::Pending);
}

#[tokio::test]
async fn not_executed_fails_the_payment() {
    let h = Harness::in_memory().await;
    let (reservation, reference) = reservation_with_order(&h).await;
    let (data, signature) = h.signed_callback(&reference, "0", None);

    let ack = h.callbacks.handle_callback(&data, &signature).await.unwrap();
    assert_eq!(ack, CallbackAck::Failed);
    assert_eq!(payment(&h, &reference).await.status, PaymentStatus::Failed);

    let unchanged = h.reservations.get(h.tenant_id, reservation.id).await.unwrap();
    assert_eq!(unchanged.status, ReservationStatus::Confirmed);

    // A late success cannot resurrect a failed payment
    let (data, signature) = h.signed_callback(&reference, "1", Some(reservation.amount));
    assert_eq!(
        h.callbacks.handle_callback(&data, &signature).await.unwrap(),
        CallbackAck::Duplicate
    );
    assert_eq!(payment(&h, &reference).await.status, PaymentStatus::Failed);
}

#[tokio::test]
async fn intermediate_and_unknown_statuses() {
    let h = Harness::in_memory().await;
    let (_, reference) = reservation_with_order(&h).await;

    let (data, signature) = h.signed_callback(&reference, "2", None);
    assert_eq!(
        h.callbacks.handle_callback(&data, &signature).await.unwrap(),
        CallbackAck::Pending
    );

    let (data, signature) = h.signed_callback(&reference, "7", None);
    let err = h.callbacks.handle_callback(&data, &signature).await.unwrap_err();
    assert!(matches!(err, DomainError::UnrecognizedStatus { ref status, .. } if status == "7"));
    assert_eq!(payment(&h, &reference).await.status, PaymentStatus::Pending);
}

#[tokio::test]
async fn unknown_reference_and_malformed_payloads() {
    let h = Harness::in_memory().await;

    let (data, signature) = h.signed_callback("ORD-1", "1", Some(100));
    let err = h.callbacks.handle_callback(&data, &signature).await.unwrap_err();
    assert!(matches!(err, DomainError::UnknownTransaction(ref r) if r == "ORD-1"));

    let data = encode_payload(&[("status", "1")]);
    let signature = fleet_reservations::domain::payment::CallbackSigner::new(common::SIGN_PASSWORD)
        .sign(&data);
    let err = h.callbacks.handle_callback(&data, &signature).await.unwrap_err();
    assert!(matches!(err, DomainError::MalformedCallback(_)));
}

#[tokio::test]
async fn payer_cancellation_only_fails_pending_payments() {
    let h = Harness::in_memory().await;
    let (reservation, reference) = reservation_with_order(&h).await;
    let (data, signature) = h.signed_callback(&reference, "1", Some(reservation.amount));
    h.callbacks.handle_callback(&data, &signature).await.unwrap();

    let after = h.payments.mark_cancelled(&reference).await.unwrap();
    assert_eq!(after.status, PaymentStatus::Succeeded);

    let err = h.payments.mark_cancelled("ORD-missing").await.unwrap_err();
    assert!(matches!(err, DomainError::UnknownTransaction(_)));
}

#[tokio::test]
async fn second_successful_payment_is_refused() {
    let h = Harness::in_memory().await;
    let (reservation, reference) = reservation_with_order(&h).await;
    let (data, signature) = h.signed_callback(&reference, "1", Some(reservation.amount));
    h.callbacks.handle_callback(&data, &signature).await.unwrap();

    h.clock.set(base_time() + Duration::minutes(5));
    let err = h
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
        .unwrap_err();
    assert!(matches!(err, DomainError::PreconditionFailed(_)));
}
