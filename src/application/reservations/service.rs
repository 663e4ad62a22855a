//! Reservation orchestrator
//!
//! Every mutating operation follows the same shape: validate the input,
//! (for operations that claim a window) take the per-asset lock, run one
//! store transaction that re-reads state and writes the reservation together
//! with its asset, release the lock, then dispatch side effects.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::{info, warn};
use uuid::Uuid;

use super::commands::{
    CancelReservation, CancellationOutcome, CheckinReservation, CheckoutReservation,
    CreateReservation, RescheduleReservation,
};
use crate::application::events::{CancellationEvent, CheckinEvent, Event, ReservationEvent};
use crate::application::locking::{asset_lock_key, LockManager};
use crate::application::ports::AuditEntry;
use crate::application::side_effects::{SideEffect, SideEffectDispatcher};
use crate::domain::asset::Asset;
use crate::domain::payment::{Payment, PaymentStatus, PaymentType};
use crate::domain::repositories::{
    finish_transaction, ReservationFilter, ReservationStore, StoreTransaction,
};
use crate::domain::reservation::{
    CancellationReason, CheckinRecord, CheckoutRecord, DocumentKind, NewReservation, Reservation,
    ReservationStatus, TimeWindow,
};
use crate::shared::clock::SharedClock;
use crate::shared::errors::{DomainError, DomainResult};
use crate::shared::pagination::{PaginatedResult, PaginationParams};

/// Business settings of the orchestrator
#[derive(Debug, Clone)]
pub struct ReservationSettings {
    pub lock_ttl: Duration,
    pub cancellation_fee_percent: Decimal,
    /// Cancellations with fewer hours left before start pay the fee
    pub cancellation_window_hours: i64,
    /// Guarantee used when a reservation does not specify one, minor units
    pub standard_guarantee: i64,
    pub currency: String,
}

impl Default for ReservationSettings {
    fn default() -> Self {
        Self {
            lock_ttl: Duration::from_secs(15),
            cancellation_fee_percent: Decimal::from(20),
            cancellation_window_hours: 24,
            standard_guarantee: 30_000,
            currency: "EUR".to_string(),
        }
    }
}

pub struct ReservationService {
    store: Arc<dyn ReservationStore>,
    locks: LockManager,
    effects: Arc<SideEffectDispatcher>,
    clock: SharedClock,
    settings: ReservationSettings,
}

impl ReservationService {
    pub fn new(
        store: Arc<dyn ReservationStore>,
        locks: LockManager,
        effects: Arc<SideEffectDispatcher>,
        clock: SharedClock,
        settings: ReservationSettings,
    ) -> Self {
        Self {
            store,
            locks,
            effects,
            clock,
            settings,
        }
    }

    pub fn settings(&self) -> &ReservationSettings {
        &self.settings
    }

    // ── Reads ──────────────────────────────────────────────────

    pub async fn get(&self, tenant_id: Uuid, id: Uuid) -> DomainResult<Reservation> {
        self.store
            .find_reservation(tenant_id, id)
            .await?
            .ok_or_else(|| DomainError::not_found("Reservation", id))
    }

    pub async fn list(
        &self,
        tenant_id: Uuid,
        filter: ReservationFilter,
        page: PaginationParams,
    ) -> DomainResult<PaginatedResult<Reservation>> {
        self.store.list_reservations(tenant_id, &filter, page).await
    }

    // ── Create ─────────────────────────────────────────────────

    pub async fn create(&self, cmd: CreateReservation) -> DomainResult<Reservation> {
        let window = TimeWindow::new(cmd.start_at, cmd.end_at)?;
        let guarantee_amount = cmd.guarantee_amount.unwrap_or(self.settings.standard_guarantee);
        if cmd.amount < 0 || guarantee_amount < 0 {
            return Err(DomainError::PreconditionFailed(
                "amounts must not be negative".into(),
            ));
        }

        self.check_requester(cmd.tenant_id, cmd.requester_id, window.end).await?;
        let asset = self
            .store
            .find_asset(cmd.tenant_id, cmd.asset_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Asset", cmd.asset_id))?;
        ensure_in_service(&asset)?;

        let key = asset_lock_key(asset.id);
        let lease = self
            .locks
            .acquire(&key, self.settings.lock_ttl)
            .await
            .ok_or(DomainError::ResourceContended(asset.id))?;

        let now = self.clock.now();
        let new = NewReservation {
            tenant_id: cmd.tenant_id,
            asset_id: cmd.asset_id,
            requester_id: cmd.requester_id,
            window,
            amount: cmd.amount,
            guarantee_amount,
            notes: cmd.notes.clone(),
            created_by: cmd.actor_id,
        };
        let result = async {
            let mut tx = self.store.begin().await?;
            let staged = create_in_tx(tx.as_mut(), new, now).await;
            finish_transaction(tx, staged).await
        }
        .await;
        self.locks.release(lease).await;

        let (reservation, asset) = result.map_err(|e| contended_on(e, cmd.asset_id))?;
        info!(
            reservation_id = %reservation.id,
            tenant_id = %reservation.tenant_id,
            asset_id = %reservation.asset_id,
            start = %reservation.start_at,
            end = %reservation.end_at,
            "Reservation confirmed"
        );

        self.effects
            .dispatch(vec![
                SideEffect::StoreDocument {
                    kind: DocumentKind::Contract,
                    reservation: Box::new(reservation.clone()),
                    asset: Some(Box::new(asset)),
                },
                SideEffect::Notify(Event::ReservationConfirmed(ReservationEvent::from(&reservation))),
                SideEffect::ReservationCreated {
                    tenant_id: reservation.tenant_id,
                },
                audit("reservation.create", cmd.actor_id, None, &reservation, now),
            ])
            .await;

        Ok(reservation)
    }

    // ── Checkout ───────────────────────────────────────────────

    pub async fn checkout(&self, cmd: CheckoutReservation) -> DomainResult<Reservation> {
        validate_readings(cmd.odometer, cmd.fuel_level)?;
        let now = self.clock.now();

        let mut tx = self.store.begin().await?;
        let staged = checkout_in_tx(tx.as_mut(), &cmd, &self.settings.currency, now).await;
        let (before, reservation, asset) = finish_transaction(tx, staged).await?;

        info!(
            reservation_id = %reservation.id,
            asset_id = %reservation.asset_id,
            odometer = cmd.odometer,
            "Reservation checked out"
        );

        self.effects
            .dispatch(vec![
                SideEffect::StoreDocument {
                    kind: DocumentKind::CheckoutReport,
                    reservation: Box::new(reservation.clone()),
                    asset: Some(Box::new(asset)),
                },
                SideEffect::Notify(Event::ReservationCheckedOut(ReservationEvent::from(&reservation))),
                SideEffect::Transition {
                    from: before.status,
                    to: reservation.status,
                },
                audit("reservation.checkout", cmd.actor_id, Some(&before), &reservation, now),
            ])
            .await;

        Ok(reservation)
    }

    // ── Checkin ────────────────────────────────────────────────

    pub async fn checkin(&self, cmd: CheckinReservation) -> DomainResult<Reservation> {
        validate_readings(cmd.odometer, cmd.fuel_level)?;
        let now = self.clock.now();

        let mut tx = self.store.begin().await?;
        let staged = checkin_in_tx(tx.as_mut(), &cmd, now).await;
        let (before, reservation, asset) = finish_transaction(tx, staged).await?;

        let damage_reported = !cmd.damage_reports.is_empty();
        info!(
            reservation_id = %reservation.id,
            asset_id = %reservation.asset_id,
            odometer = cmd.odometer,
            damage_reported,
            "Reservation checked in"
        );

        let mut effects = vec![SideEffect::StoreDocument {
            kind: DocumentKind::CheckinReport,
            reservation: Box::new(reservation.clone()),
            asset: Some(Box::new(asset)),
        }];

        if !damage_reported {
            match self.store.find_guarantee(reservation.tenant_id, reservation.id).await {
                Ok(Some(guarantee)) if guarantee.status != PaymentStatus::Failed => {
                    effects.push(SideEffect::ReleaseGuarantee {
                        reference: guarantee.transaction_ref,
                    });
                }
                Ok(_) => {}
                Err(error) => {
                    warn!(reservation_id = %reservation.id, %error, "Guarantee lookup failed, not released");
                }
            }
        }

        effects.extend([
            SideEffect::Notify(Event::ReservationCheckedIn(CheckinEvent {
                reservation: ReservationEvent::from(&reservation),
                damage_reported,
            })),
            SideEffect::Transition {
                from: before.status,
                to: reservation.status,
            },
            audit("reservation.checkin", cmd.actor_id, Some(&before), &reservation, now),
        ]);
        self.effects.dispatch(effects).await;

        Ok(reservation)
    }

    // ── Cancel ─────────────────────────────────────────────────

    pub async fn cancel(&self, cmd: CancelReservation) -> DomainResult<CancellationOutcome> {
        let now = self.clock.now();

        let mut tx = self.store.begin().await?;
        let staged = cancel_in_tx(tx.as_mut(), &cmd, &self.settings, now).await;
        let (before, reservation, fee) = finish_transaction(tx, staged).await?;

        info!(
            reservation_id = %reservation.id,
            asset_id = %reservation.asset_id,
            cancellation_fee = fee,
            "Reservation cancelled"
        );

        self.effects
            .dispatch(vec![
                SideEffect::Notify(Event::ReservationCancelled(CancellationEvent {
                    reservation: ReservationEvent::from(&reservation),
                    cancellation_fee: fee,
                    reason: cmd.reason.clone(),
                })),
                SideEffect::Transition {
                    from: before.status,
                    to: reservation.status,
                },
                audit("reservation.cancel", cmd.actor_id, Some(&before), &reservation, now),
            ])
            .await;

        Ok(CancellationOutcome {
            reservation,
            cancellation_fee: fee,
        })
    }

    // ── Reschedule ─────────────────────────────────────────────

    pub async fn reschedule(&self, cmd: RescheduleReservation) -> DomainResult<Reservation> {
        let window = TimeWindow::new(cmd.start_at, cmd.end_at)?;
        if cmd.amount.is_some_and(|amount| amount < 0) {
            return Err(DomainError::PreconditionFailed(
                "amounts must not be negative".into(),
            ));
        }

        let current = self.get(cmd.tenant_id, cmd.reservation_id).await?;
        ensure_reschedulable(&current)?;
        self.check_requester(cmd.tenant_id, current.requester_id, window.end).await?;

        let key = asset_lock_key(current.asset_id);
        let lease = self
            .locks
            .acquire(&key, self.settings.lock_ttl)
            .await
            .ok_or(DomainError::ResourceContended(current.asset_id))?;

        let now = self.clock.now();
        let result = async {
            let mut tx = self.store.begin().await?;
            let staged = reschedule_in_tx(tx.as_mut(), &cmd, window, now).await;
            finish_transaction(tx, staged).await
        }
        .await;
        self.locks.release(lease).await;

        let (before, reservation) = result.map_err(|e| contended_on(e, current.asset_id))?;
        info!(
            reservation_id = %reservation.id,
            start = %reservation.start_at,
            end = %reservation.end_at,
            "Reservation rescheduled"
        );

        self.effects
            .dispatch(vec![
                SideEffect::Notify(Event::ReservationRescheduled(ReservationEvent::from(&reservation))),
                audit("reservation.reschedule", cmd.actor_id, Some(&before), &reservation, now),
            ])
            .await;

        Ok(reservation)
    }

    // ── Helpers ────────────────────────────────────────────────

    async fn check_requester(
        &self,
        tenant_id: Uuid,
        requester_id: Uuid,
        until: DateTime<Utc>,
    ) -> DomainResult<()> {
        let requester = self
            .store
            .find_requester(tenant_id, requester_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Requester", requester_id))?;

        if !requester.is_active() {
            return Err(DomainError::PreconditionFailed(format!(
                "requester {} is {}",
                requester.id, requester.status
            )));
        }
        if !requester.licence_valid_through(until) {
            return Err(DomainError::PreconditionFailed(format!(
                "licence of requester {} expires before the reservation ends",
                requester.id
            )));
        }
        Ok(())
    }
}

/// A writer that lost a database-level race for the asset's window reports
/// the same error as one that lost the lock.
fn contended_on(error: DomainError, asset_id: Uuid) -> DomainError {
    match error {
        DomainError::TransactionConflict(detail) => {
            warn!(asset_id = %asset_id, error = %detail, "Window claim lost to a concurrent writer");
            DomainError::ResourceContended(asset_id)
        }
        other => other,
    }
}

fn ensure_in_service(asset: &Asset) -> DomainResult<()> {
    if asset.is_out_of_service() {
        return Err(DomainError::PreconditionFailed(format!(
            "asset {} is out of service",
            asset.label
        )));
    }
    Ok(())
}

fn ensure_reschedulable(reservation: &Reservation) -> DomainResult<()> {
    if reservation.status != ReservationStatus::Confirmed {
        return Err(DomainError::PreconditionFailed(format!(
            "only CONFIRMED reservations can be rescheduled, this one is {}",
            reservation.status
        )));
    }
    Ok(())
}

fn validate_readings(odometer: i64, fuel_level: i32) -> DomainResult<()> {
    if odometer < 0 {
        return Err(DomainError::Validation("odometer must not be negative".into()));
    }
    if !(0..=100).contains(&fuel_level) {
        return Err(DomainError::Validation(
            "fuel level must be between 0 and 100".into(),
        ));
    }
    Ok(())
}

fn audit(
    action: &str,
    actor_id: Option<Uuid>,
    before: Option<&Reservation>,
    after: &Reservation,
    at: DateTime<Utc>,
) -> SideEffect {
    SideEffect::Audit(Box::new(AuditEntry {
        tenant_id: after.tenant_id,
        actor_id,
        action: action.to_string(),
        entity: "reservation".to_string(),
        entity_id: after.id,
        before: before.and_then(|r| serde_json::to_value(r).ok()),
        after: serde_json::to_value(after).ok(),
        at,
    }))
}

// ── Transaction bodies ─────────────────────────────────────────

async fn load_reservation(
    tx: &mut dyn StoreTransaction,
    tenant_id: Uuid,
    id: Uuid,
) -> DomainResult<Reservation> {
    tx.find_reservation(tenant_id, id)
        .await?
        .ok_or_else(|| DomainError::not_found("Reservation", id))
}

async fn load_asset(tx: &mut dyn StoreTransaction, tenant_id: Uuid, id: Uuid) -> DomainResult<Asset> {
    tx.find_asset(tenant_id, id)
        .await?
        .ok_or_else(|| DomainError::not_found("Asset", id))
}

/// Recompute the asset status from its reservations and persist it.
async fn sync_asset(
    tx: &mut dyn StoreTransaction,
    asset: &mut Asset,
    now: DateTime<Utc>,
) -> DomainResult<()> {
    let statuses = tx.active_reservation_statuses(asset.tenant_id, asset.id).await?;
    asset.apply_occupancy(statuses, now);
    asset.updated_at = now;
    tx.update_asset(asset).await
}

async fn create_in_tx(
    tx: &mut dyn StoreTransaction,
    new: NewReservation,
    now: DateTime<Utc>,
) -> DomainResult<(Reservation, Asset)> {
    let mut asset = load_asset(tx, new.tenant_id, new.asset_id).await?;
    ensure_in_service(&asset)?;

    if tx
        .has_overlap(new.tenant_id, new.asset_id, &new.window, None)
        .await?
    {
        return Err(DomainError::SlotUnavailable(new.asset_id));
    }

    let reservation = Reservation::new(new, now);
    tx.insert_reservation(&reservation).await?;
    sync_asset(tx, &mut asset, now).await?;
    Ok((reservation, asset))
}

async fn checkout_in_tx(
    tx: &mut dyn StoreTransaction,
    cmd: &CheckoutReservation,
    currency: &str,
    now: DateTime<Utc>,
) -> DomainResult<(Reservation, Reservation, Asset)> {
    let mut reservation = load_reservation(tx, cmd.tenant_id, cmd.reservation_id).await?;
    let before = reservation.clone();
    reservation.transition_to(ReservationStatus::CheckedOut, now)?;

    if now.date_naive() < reservation.start_at.date_naive() {
        return Err(DomainError::PreconditionFailed(format!(
            "cannot check out before the start date {}",
            reservation.start_at.date_naive()
        )));
    }

    let mut asset = load_asset(tx, cmd.tenant_id, reservation.asset_id).await?;
    ensure_in_service(&asset)?;
    if cmd.odometer < asset.odometer {
        return Err(DomainError::PreconditionFailed(format!(
            "odometer {} is below the recorded {}",
            cmd.odometer, asset.odometer
        )));
    }

    let reference = cmd
        .guarantee_reference
        .clone()
        .filter(|r| !r.trim().is_empty())
        .unwrap_or_else(|| format!("GUA-{}", Uuid::new_v4()));
    let guarantee = Payment::pending(
        reservation.tenant_id,
        reservation.id,
        reference,
        reservation.guarantee_amount,
        currency,
        PaymentType::Deposit,
        Some(cmd.payment_method),
        now,
    )
    .with_description("Vehicle guarantee");
    tx.insert_payment(&guarantee).await?;

    reservation.checkout = Some(CheckoutRecord {
        odometer: cmd.odometer,
        fuel_level: cmd.fuel_level,
        payment_method: cmd.payment_method,
        at: now,
    });
    if let Some(notes) = cmd.notes.as_deref().filter(|n| !n.is_empty()) {
        reservation.append_note(&format!("Checkout: {notes}"));
    }
    tx.update_reservation(&reservation).await?;

    asset.odometer = cmd.odometer;
    sync_asset(tx, &mut asset, now).await?;
    Ok((before, reservation, asset))
}

async fn checkin_in_tx(
    tx: &mut dyn StoreTransaction,
    cmd: &CheckinReservation,
    now: DateTime<Utc>,
) -> DomainResult<(Reservation, Reservation, Asset)> {
    let mut reservation = load_reservation(tx, cmd.tenant_id, cmd.reservation_id).await?;
    let before = reservation.clone();
    reservation.transition_to(ReservationStatus::CheckedIn, now)?;

    if let Some(checkout) = &reservation.checkout {
        if cmd.odometer < checkout.odometer {
            return Err(DomainError::PreconditionFailed(format!(
                "odometer {} is below the check-out reading {}",
                cmd.odometer, checkout.odometer
            )));
        }
    }

    reservation.checkin = Some(CheckinRecord {
        odometer: cmd.odometer,
        fuel_level: cmd.fuel_level,
        damage_reports: cmd.damage_reports.clone(),
        at: now,
    });
    if let Some(notes) = cmd.notes.as_deref().filter(|n| !n.is_empty()) {
        reservation.append_note(&format!("Checkin: {notes}"));
    }
    tx.update_reservation(&reservation).await?;

    let mut asset = load_asset(tx, cmd.tenant_id, reservation.asset_id).await?;
    asset.odometer = asset.odometer.max(cmd.odometer);
    sync_asset(tx, &mut asset, now).await?;
    Ok((before, reservation, asset))
}

async fn cancel_in_tx(
    tx: &mut dyn StoreTransaction,
    cmd: &CancelReservation,
    settings: &ReservationSettings,
    now: DateTime<Utc>,
) -> DomainResult<(Reservation, Reservation, i64)> {
    let mut reservation = load_reservation(tx, cmd.tenant_id, cmd.reservation_id).await?;
    let before = reservation.clone();
    reservation.transition_to(ReservationStatus::Cancelled, now)?;

    let fee = reservation.late_cancellation_fee(
        now,
        settings.cancellation_window_hours,
        settings.cancellation_fee_percent,
    );
    reservation.cancellation_fee = Some(fee);
    reservation.cancellation_reason = Some(CancellationReason::CustomerRequest);
    if let Some(reason) = cmd.reason.as_deref().filter(|r| !r.is_empty()) {
        reservation.append_note(&format!("Cancellation reason: {reason}"));
    }
    tx.update_reservation(&reservation).await?;

    let mut asset = load_asset(tx, cmd.tenant_id, reservation.asset_id).await?;
    sync_asset(tx, &mut asset, now).await?;
    Ok((before, reservation, fee))
}

async fn reschedule_in_tx(
    tx: &mut dyn StoreTransaction,
    cmd: &RescheduleReservation,
    window: TimeWindow,
    now: DateTime<Utc>,
) -> DomainResult<(Reservation, Reservation)> {
    let mut reservation = load_reservation(tx, cmd.tenant_id, cmd.reservation_id).await?;
    ensure_reschedulable(&reservation)?;
    let before = reservation.clone();

    if tx
        .has_overlap(cmd.tenant_id, reservation.asset_id, &window, Some(reservation.id))
        .await?
    {
        return Err(DomainError::SlotUnavailable(reservation.asset_id));
    }

    reservation.start_at = window.start;
    reservation.end_at = window.end;
    if let Some(amount) = cmd.amount {
        reservation.amount = amount;
    }
    reservation.updated_at = now;
    tx.update_reservation(&reservation).await?;
    Ok((before, reservation))
}
