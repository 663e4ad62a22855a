//! Payment provider callback processing
//!
//! Providers deliver callbacks at least once. The stored payment status is the
//! idempotency gate: once `succeeded` or `failed`, later callbacks for the same
//! reference are acknowledged without writes.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::application::events::{Event, PaymentEvent};
use crate::application::ports::AuditEntry;
use crate::application::side_effects::{SideEffect, SideEffectDispatcher};
use crate::domain::payment::{
    decode_payload, CallbackPayload, CallbackSigner, Payment, PaymentStatus, ProviderStatus,
};
use crate::domain::repositories::{finish_transaction, ReservationStore, StoreTransaction};
use crate::domain::reservation::ReservationStatus;
use crate::shared::clock::SharedClock;
use crate::shared::errors::{DomainError, DomainResult};

/// Body the provider expects on every handled callback
pub const ACK_BODY: &str = "OK";

/// How a callback was handled. Every variant is acknowledged with [`ACK_BODY`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackAck {
    /// Payment moved to `succeeded`
    Succeeded,
    /// Payment moved to `failed`
    Failed,
    /// Payment already terminal, nothing written
    Duplicate,
    /// Intermediate provider status, nothing written
    Pending,
}

impl CallbackAck {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::Duplicate => "duplicate",
            Self::Pending => "pending",
        }
    }
}

pub struct CallbackProcessor {
    store: Arc<dyn ReservationStore>,
    signer: CallbackSigner,
    effects: Arc<SideEffectDispatcher>,
    clock: SharedClock,
    /// Accepted difference between reported and stored amount, minor units
    amount_tolerance: i64,
}

impl CallbackProcessor {
    pub fn new(
        store: Arc<dyn ReservationStore>,
        signer: CallbackSigner,
        effects: Arc<SideEffectDispatcher>,
        clock: SharedClock,
        amount_tolerance: i64,
    ) -> Self {
        Self {
            store,
            signer,
            effects,
            clock,
            amount_tolerance,
        }
    }

    /// Verify, decode and apply one callback.
    pub async fn handle_callback(&self, data: &str, signature: &str) -> DomainResult<CallbackAck> {
        let result = self.process(data, signature).await;
        let outcome = match &result {
            Ok(ack) => ack.as_str(),
            Err(DomainError::InvalidSignature) => "invalid_signature",
            Err(DomainError::MalformedCallback(_)) => "malformed",
            Err(DomainError::UnknownTransaction(_)) => "unknown_transaction",
            Err(DomainError::AmountMismatch { .. }) => "amount_mismatch",
            Err(DomainError::UnrecognizedStatus { .. }) => "unrecognized_status",
            Err(_) => "error",
        };
        self.effects
            .dispatch(vec![SideEffect::CallbackOutcome(outcome)])
            .await;
        result
    }

    async fn process(&self, data: &str, signature: &str) -> DomainResult<CallbackAck> {
        if let Err(e) = self.signer.verify(data, signature) {
            warn!("Payment callback rejected: invalid signature");
            return Err(e);
        }

        let payload = decode_payload(data)?;
        info!(
            reference = %payload.order_id,
            status = payload.status.code(),
            "Payment callback received"
        );

        let payment = self
            .store
            .find_payment_by_reference(&payload.order_id)
            .await?
            .ok_or_else(|| DomainError::UnknownTransaction(payload.order_id.clone()))?;

        if payment.is_terminal() {
            info!(
                reference = %payment.transaction_ref,
                status = %payment.status,
                "Payment already settled, acknowledging replay"
            );
            return Ok(CallbackAck::Duplicate);
        }

        match &payload.status {
            ProviderStatus::Succeeded => {
                self.check_amount(&payment, &payload)?;
                self.settle(&payment.transaction_ref, PaymentStatus::Succeeded).await
            }
            ProviderStatus::NotExecuted => {
                self.settle(&payment.transaction_ref, PaymentStatus::Failed).await
            }
            ProviderStatus::Accepted | ProviderStatus::AdditionalInfo => {
                debug!(reference = %payment.transaction_ref, "Intermediate payment status");
                Ok(CallbackAck::Pending)
            }
            ProviderStatus::Unrecognized(code) => Err(DomainError::UnrecognizedStatus {
                reference: payment.transaction_ref.clone(),
                status: code.clone(),
            }),
        }
    }

    fn check_amount(&self, payment: &Payment, payload: &CallbackPayload) -> DomainResult<()> {
        // Callbacks without an amount are not checked
        let Some(reported) = payload.amount else {
            return Ok(());
        };
        if (reported - payment.amount).abs() > self.amount_tolerance {
            warn!(
                reference = %payment.transaction_ref,
                expected = payment.amount,
                actual = reported,
                "Payment amount mismatch"
            );
            return Err(DomainError::AmountMismatch {
                reference: payment.transaction_ref.clone(),
                expected: payment.amount,
                actual: reported,
            });
        }
        Ok(())
    }

    async fn settle(&self, reference: &str, status: PaymentStatus) -> DomainResult<CallbackAck> {
        let now = self.clock.now();
        let mut tx = self.store.begin().await?;
        let staged = settle_in_tx(tx.as_mut(), reference, status, now).await;
        let settled = finish_transaction(tx, staged).await?;

        let Some((before, payment)) = settled else {
            // Another delivery settled it between the gate and the transaction
            return Ok(CallbackAck::Duplicate);
        };

        info!(
            reference = %payment.transaction_ref,
            reservation_id = %payment.reservation_id,
            status = %payment.status,
            "Payment settled"
        );

        let event = PaymentEvent {
            tenant_id: payment.tenant_id,
            reservation_id: payment.reservation_id,
            transaction_ref: payment.transaction_ref.clone(),
            amount: payment.amount,
            currency: payment.currency.clone(),
        };
        let (event, ack) = match status {
            PaymentStatus::Succeeded => (Event::PaymentSucceeded(event), CallbackAck::Succeeded),
            _ => (Event::PaymentFailed(event), CallbackAck::Failed),
        };

        self.effects
            .dispatch(vec![
                SideEffect::Notify(event),
                SideEffect::Audit(Box::new(AuditEntry {
                    tenant_id: payment.tenant_id,
                    actor_id: None,
                    action: format!("payment.{}", payment.status),
                    entity: "payment".to_string(),
                    entity_id: payment.id,
                    before: serde_json::to_value(&before).ok(),
                    after: serde_json::to_value(&payment).ok(),
                    at: now,
                })),
            ])
            .await;

        Ok(ack)
    }
}

/// Re-read under the transaction so concurrent deliveries write once.
async fn settle_in_tx(
    tx: &mut dyn StoreTransaction,
    reference: &str,
    status: PaymentStatus,
    now: DateTime<Utc>,
) -> DomainResult<Option<(Payment, Payment)>> {
    let mut payment = tx
        .find_payment_by_reference(reference)
        .await?
        .ok_or_else(|| DomainError::UnknownTransaction(reference.to_string()))?;
    if payment.is_terminal() {
        return Ok(None);
    }

    let before = payment.clone();
    payment.settle(status, now);
    tx.update_payment(&payment).await?;

    if status == PaymentStatus::Succeeded && payment.confirms_reservation() {
        confirm_reservation(tx, &payment).await?;
    }
    Ok(Some((before, payment)))
}

/// A successful deposit or full payment leaves the reservation `CONFIRMED`.
/// Reservations that already moved on are never regressed.
async fn confirm_reservation(tx: &mut dyn StoreTransaction, payment: &Payment) -> DomainResult<()> {
    let Some(reservation) = tx
        .find_reservation(payment.tenant_id, payment.reservation_id)
        .await?
    else {
        warn!(
            reference = %payment.transaction_ref,
            reservation_id = %payment.reservation_id,
            "Paid reservation not found"
        );
        return Ok(());
    };

    match reservation.status {
        ReservationStatus::Confirmed => {
            debug!(reservation_id = %reservation.id, "Reservation already confirmed");
        }
        other => {
            info!(
                reservation_id = %reservation.id,
                status = %other,
                reference = %payment.transaction_ref,
                "Reservation past confirmation, status left unchanged"
            );
        }
    }
    Ok(())
}
