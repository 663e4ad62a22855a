//! Reservation lifecycle against both store implementations

mod common;

use std::sync::Arc;

use chrono::Duration;
use fleet_reservations::application::{
    CancelReservation, CheckinReservation, CheckoutReservation, RescheduleReservation,
};
use fleet_reservations::domain::payment::{PaymentMethod, PaymentStatus, PaymentType};
use fleet_reservations::domain::repositories::ReservationStore;
use fleet_reservations::domain::reservation::{DamageReport, DocumentKind, ReservationStatus};
use fleet_reservations::domain::{Asset, AssetStatus, Requester, RequesterStatus};
use fleet_reservations::shared::errors::DomainError;

use common::{base_time, days, Harness};

async fn concurrent_overlapping_creates_admit_one(h: Harness) {
    let h = Arc::new(h);
    let mut tasks = Vec::new();
    for _ in 0..8 {
        let h = h.clone();
        tasks.push(tokio::spawn(async move {
            h.reservations.create(h.create_cmd(days(1), days(5))).await
        }));
    }

    let mut confirmed = 0;
    for task in tasks {
        match task.await.expect("task completes") {
            Ok(r) => {
                assert_eq!(r.status, ReservationStatus::Confirmed);
                confirmed += 1;
            }
            Err(DomainError::SlotUnavailable(_)) | Err(DomainError::ResourceContended(_)) => {}
            Err(other) => panic!("unexpected error: {other}"),
        }
    }
    assert_eq!(confirmed, 1);
    assert_eq!(h.asset_now().await.status, AssetStatus::Reserved);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_overlapping_creates_admit_one_in_memory() {
    concurrent_overlapping_creates_admit_one(Harness::in_memory().await).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_overlapping_creates_admit_one_sqlite() {
    concurrent_overlapping_creates_admit_one(Harness::sqlite().await).await;
}

async fn overlapping_request_is_rejected(h: Harness) {
    let r1 = h
        .reservations
        .create(h.create_cmd(days(1), days(5)))
        .await
        .expect("first reservation is confirmed");
    assert_eq!(h.asset_now().await.status, AssetStatus::Reserved);

    let before = h.asset_now().await;
    let err = h
        .reservations
        .create(h.create_cmd(days(3), days(4)))
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::SlotUnavailable(id) if id == r1.asset_id));

    let after = h.asset_now().await;
    assert_eq!(after.status, before.status);
    assert_eq!(after.updated_at, before.updated_at);
}

#[tokio::test]
async fn overlapping_request_is_rejected_in_memory() {
    overlapping_request_is_rejected(Harness::in_memory().await).await;
}

#[tokio::test]
async fn overlapping_request_is_rejected_sqlite() {
    overlapping_request_is_rejected(Harness::sqlite().await).await;
}

async fn cancelled_window_can_be_rebooked(h: Harness) {
    let r1 = h
        .reservations
        .create(h.create_cmd(days(2), days(4)))
        .await
        .unwrap();
    let outcome = h
        .reservations
        .cancel(CancelReservation {
            tenant_id: h.tenant_id,
            reservation_id: r1.id,
            reason: Some("plans changed".into()),
            actor_id: None,
        })
        .await
        .unwrap();
    assert_eq!(outcome.reservation.status, ReservationStatus::Cancelled);
    assert_eq!(outcome.cancellation_fee, 0);
    assert_eq!(h.asset_now().await.status, AssetStatus::Available);

    let r2 = h
        .reservations
        .create(h.create_cmd(days(2), days(4)))
        .await
        .expect("cancelled window is free again");
    assert_ne!(r1.id, r2.id);
    assert_eq!(h.asset_now().await.status, AssetStatus::Reserved);
}

#[tokio::test]
async fn cancelled_window_can_be_rebooked_in_memory() {
    cancelled_window_can_be_rebooked(Harness::in_memory().await).await;
}

#[tokio::test]
async fn cancelled_window_can_be_rebooked_sqlite() {
    cancelled_window_can_be_rebooked(Harness::sqlite().await).await;
}

#[tokio::test]
async fn empty_window_is_rejected_before_locking() {
    let h = Harness::in_memory().await;
    let err = h
        .reservations
        .create(h.create_cmd(days(1), days(1)))
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::PreconditionFailed(_)));
    assert_eq!(h.metrics.created.load(std::sync::atomic::Ordering::SeqCst), 0);
    assert_eq!(h.store.begins(), 0);
    assert!(h.local_locks.is_empty());
}

#[tokio::test]
async fn late_cancellation_pays_the_fee() {
    let h = Harness::in_memory().await;
    let r = h
        .reservations
        .create(h.create_cmd(base_time() + Duration::hours(10), days(2)))
        .await
        .unwrap();

    let outcome = h
        .reservations
        .cancel(CancelReservation {
            tenant_id: h.tenant_id,
            reservation_id: r.id,
            reason: None,
            actor_id: None,
        })
        .await
        .unwrap();
    // 20% of 40000
    assert_eq!(outcome.cancellation_fee, 8_000);
    assert_eq!(outcome.reservation.cancellation_fee, Some(8_000));

    let again = h
        .reservations
        .cancel(CancelReservation {
            tenant_id: h.tenant_id,
            reservation_id: r.id,
            reason: None,
            actor_id: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(again, DomainError::InvalidTransition { .. }));
}

async fn checkout_and_checkin_without_damage(h: Harness) {
    let r = h
        .reservations
        .create(h.create_cmd(base_time() + Duration::hours(1), days(3)))
        .await
        .unwrap();

    let out = h
        .reservations
        .checkout(CheckoutReservation {
            tenant_id: h.tenant_id,
            reservation_id: r.id,
            odometer: 12_000,
            fuel_level: 90,
            payment_method: PaymentMethod::Card,
            guarantee_reference: Some("HOLD-42".into()),
            notes: Some("spare key handed over".into()),
            actor_id: None,
        })
        .await
        .unwrap();
    assert_eq!(out.status, ReservationStatus::CheckedOut);
    assert_eq!(h.asset_now().await.status, AssetStatus::Rented);
    assert_eq!(h.asset_now().await.odometer, 12_000);

    let guarantee = h
        .store
        .find_guarantee(h.tenant_id, r.id)
        .await
        .unwrap()
        .expect("guarantee recorded at check-out");
    assert_eq!(guarantee.transaction_ref, "HOLD-42");
    assert_eq!(guarantee.payment_type, PaymentType::Deposit);
    assert_eq!(guarantee.status, PaymentStatus::Pending);

    let back = h
        .reservations
        .checkin(CheckinReservation {
            tenant_id: h.tenant_id,
            reservation_id: r.id,
            odometer: 12_450,
            fuel_level: 70,
            damage_reports: Vec::new(),
            notes: None,
            actor_id: None,
        })
        .await
        .unwrap();
    assert_eq!(back.status, ReservationStatus::CheckedIn);
    assert_eq!(h.asset_now().await.status, AssetStatus::Available);
    assert_eq!(h.gateway.released(), vec!["HOLD-42".to_string()]);

    let stored = h.reservations.get(h.tenant_id, r.id).await.unwrap();
    assert!(stored.document_key(DocumentKind::Contract).is_some());
    assert!(stored.document_key(DocumentKind::CheckoutReport).is_some());
    assert!(stored.document_key(DocumentKind::CheckinReport).is_some());
    assert_eq!(h.documents.keys().len(), 3);

    assert_eq!(
        h.audit.actions(),
        vec!["reservation.create", "reservation.checkout", "reservation.checkin"]
    );
}

#[tokio::test]
async fn checkout_and_checkin_without_damage_in_memory() {
    checkout_and_checkin_without_damage(Harness::in_memory().await).await;
}

#[tokio::test]
async fn checkout_and_checkin_without_damage_sqlite() {
    checkout_and_checkin_without_damage(Harness::sqlite().await).await;
}

#[tokio::test]
async fn damage_keeps_the_guarantee() {
    let h = Harness::in_memory().await;
    let r = h
        .reservations
        .create(h.create_cmd(base_time() + Duration::hours(1), days(3)))
        .await
        .unwrap();
    h.reservations
        .checkout(CheckoutReservation {
            tenant_id: h.tenant_id,
            reservation_id: r.id,
            odometer: 100,
            fuel_level: 100,
            payment_method: PaymentMethod::Cash,
            guarantee_reference: None,
            notes: None,
            actor_id: None,
        })
        .await
        .unwrap();

    let back = h
        .reservations
        .checkin(CheckinReservation {
            tenant_id: h.tenant_id,
            reservation_id: r.id,
            odometer: 300,
            fuel_level: 40,
            damage_reports: vec![DamageReport {
                description: "scratch".into(),
                location: Some("rear bumper".into()),
                severity: Some("minor".into()),
            }],
            notes: None,
            actor_id: None,
        })
        .await
        .unwrap();
    assert_eq!(back.checkin.as_ref().map(|c| c.damage_reports.len()), Some(1));
    assert!(h.gateway.released().is_empty());
}

#[tokio::test]
async fn checkout_before_start_date_is_refused() {
    let h = Harness::in_memory().await;
    let r = h
        .reservations
        .create(h.create_cmd(days(2), days(4)))
        .await
        .unwrap();
    let err = h
        .reservations
        .checkout(CheckoutReservation {
            tenant_id: h.tenant_id,
            reservation_id: r.id,
            odometer: 10,
            fuel_level: 50,
            payment_method: PaymentMethod::Card,
            guarantee_reference: None,
            notes: None,
            actor_id: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::PreconditionFailed(_)));

    let unchanged = h.reservations.get(h.tenant_id, r.id).await.unwrap();
    assert_eq!(unchanged.status, ReservationStatus::Confirmed);
    assert!(h.store.find_guarantee(h.tenant_id, r.id).await.unwrap().is_none());
}

#[tokio::test]
async fn reschedule_ignores_its_own_window() {
    let h = Harness::in_memory().await;
    let r = h
        .reservations
        .create(h.create_cmd(days(2), days(4)))
        .await
        .unwrap();
    let other = h
        .reservations
        .create(h.create_cmd(days(10), days(12)))
        .await
        .unwrap();

    let moved = h
        .reservations
        .reschedule(RescheduleReservation {
            tenant_id: h.tenant_id,
            reservation_id: r.id,
            start_at: days(3),
            end_at: days(6),
            amount: Some(55_000),
            actor_id: None,
        })
        .await
        .unwrap();
    assert_eq!(moved.start_at, days(3));
    assert_eq!(moved.amount, 55_000);

    let err = h
        .reservations
        .reschedule(RescheduleReservation {
            tenant_id: h.tenant_id,
            reservation_id: r.id,
            start_at: days(9),
            end_at: days(11),
            amount: None,
            actor_id: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::SlotUnavailable(_)));
    assert_ne!(other.id, r.id);
}

#[tokio::test]
async fn other_tenants_cannot_see_reservations() {
    let h = Harness::in_memory().await;
    let r = h
        .reservations
        .create(h.create_cmd(days(2), days(4)))
        .await
        .unwrap();
    let err = h
        .reservations
        .get(uuid::Uuid::new_v4(), r.id)
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::NotFound { .. }));
}

fn checkout_cmd(h: &Harness, reservation_id: uuid::Uuid, odometer: i64) -> CheckoutReservation {
    CheckoutReservation {
        tenant_id: h.tenant_id,
        reservation_id,
        odometer,
        fuel_level: 80,
        payment_method: PaymentMethod::Card,
        guarantee_reference: None,
        notes: None,
        actor_id: None,
    }
}

fn checkin_cmd(h: &Harness, reservation_id: uuid::Uuid, odometer: i64) -> CheckinReservation {
    CheckinReservation {
        tenant_id: h.tenant_id,
        reservation_id,
        odometer,
        fuel_level: 60,
        damage_reports: Vec::new(),
        notes: None,
        actor_id: None,
    }
}

#[tokio::test]
async fn checkout_below_recorded_odometer_is_refused() {
    let h = Harness::in_memory().await;
    let mut asset = h.asset_now().await;
    asset.odometer = 20_000;
    h.store.save_asset(&asset).await.unwrap();

    let r = h
        .reservations
        .create(h.create_cmd(base_time() + Duration::hours(1), days(3)))
        .await
        .unwrap();
    let err = h
        .reservations
        .checkout(checkout_cmd(&h, r.id, 19_999))
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::PreconditionFailed(_)));

    let unchanged = h.reservations.get(h.tenant_id, r.id).await.unwrap();
    assert_eq!(unchanged.status, ReservationStatus::Confirmed);
    assert!(unchanged.checkout.is_none());
    assert_eq!(h.asset_now().await.odometer, 20_000);
    assert_eq!(h.asset_now().await.status, AssetStatus::Reserved);
}

#[tokio::test]
async fn checkin_below_checkout_odometer_is_refused() {
    let h = Harness::sqlite().await;
    let r = h
        .reservations
        .create(h.create_cmd(base_time() + Duration::hours(1), days(3)))
        .await
        .unwrap();
    h.reservations
        .checkout(checkout_cmd(&h, r.id, 5_000))
        .await
        .unwrap();

    let err = h
        .reservations
        .checkin(checkin_cmd(&h, r.id, 4_999))
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::PreconditionFailed(_)));

    let unchanged = h.reservations.get(h.tenant_id, r.id).await.unwrap();
    assert_eq!(unchanged.status, ReservationStatus::CheckedOut);
    assert!(unchanged.checkin.is_none());
    assert_eq!(h.asset_now().await.status, AssetStatus::Rented);
}

#[tokio::test]
async fn inactive_requester_cannot_book() {
    let h = Harness::in_memory().await;
    let mut requester = h.requester.clone();
    requester.status = RequesterStatus::Inactive;
    h.store.save_requester(&requester).await.unwrap();

    let err = h
        .reservations
        .create(h.create_cmd(days(1), days(3)))
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::PreconditionFailed(_)));
    assert_eq!(h.store.begins(), 0);
    assert_eq!(h.asset_now().await.status, AssetStatus::Available);
}

#[tokio::test]
async fn licence_expiring_before_the_end_blocks_booking() {
    let h = Harness::in_memory().await;
    let mut requester = h.requester.clone();
    requester.licence_expires_on = Some(days(2).date_naive());
    h.store.save_requester(&requester).await.unwrap();

    let err = h
        .reservations
        .create(h.create_cmd(days(1), days(3)))
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::PreconditionFailed(_)));

    // a window ending before the expiry is still bookable
    h.reservations
        .create(h.create_cmd(days(1), days(1) + Duration::hours(8)))
        .await
        .expect("licence covers the window");
}

#[tokio::test]
async fn out_of_service_asset_cannot_be_booked() {
    let h = Harness::sqlite().await;
    let mut asset = h.asset_now().await;
    asset.status = AssetStatus::OutOfService;
    h.store.save_asset(&asset).await.unwrap();

    let err = h
        .reservations
        .create(h.create_cmd(days(1), days(3)))
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::PreconditionFailed(_)));
    assert_eq!(h.store.begins(), 0);
    assert_eq!(h.asset_now().await.status, AssetStatus::OutOfService);
}

#[tokio::test]
async fn assets_and_requesters_of_other_tenants_are_not_found() {
    let h = Harness::in_memory().await;
    let other_tenant = uuid::Uuid::new_v4();
    let foreign_asset = Asset::new(other_tenant, "ZZ-999-ZZ", "van");
    let foreign_requester = Requester::new(other_tenant, "Sam Elsewhere");
    h.store.save_asset(&foreign_asset).await.unwrap();
    h.store.save_requester(&foreign_requester).await.unwrap();

    let mut cmd = h.create_cmd(days(1), days(3));
    cmd.asset_id = foreign_asset.id;
    let err = h.reservations.create(cmd).await.unwrap_err();
    assert!(matches!(err, DomainError::NotFound { .. }));

    let mut cmd = h.create_cmd(days(1), days(3));
    cmd.requester_id = foreign_requester.id;
    let err = h.reservations.create(cmd).await.unwrap_err();
    assert!(matches!(err, DomainError::NotFound { .. }));

    assert_eq!(h.store.begins(), 0);
    let foreign_now = h
        .store
        .find_asset(other_tenant, foreign_asset.id)
        .await
        .unwrap()
        .expect("foreign asset still exists");
    assert_eq!(foreign_now.status, AssetStatus::Available);
}
