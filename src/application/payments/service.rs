//! Payment initiation and provider redirects

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::application::ports::{GatewayOrder, PaymentGateway};
use crate::domain::payment::{Payment, PaymentMethod, PaymentType};
use crate::domain::repositories::ReservationStore;
use crate::shared::clock::SharedClock;
use crate::shared::errors::{DomainError, DomainResult};

#[derive(Debug, Clone)]
pub struct InitiatePayment {
    pub tenant_id: Uuid,
    pub reservation_id: Uuid,
    pub payment_type: PaymentType,
    /// Defaults to the guarantee for deposits, the reservation amount otherwise
    pub amount: Option<i64>,
    pub description: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PaymentInitiated {
    pub reference: String,
    pub payment_url: String,
    pub payment: Payment,
}

pub struct PaymentService {
    store: Arc<dyn ReservationStore>,
    gateway: Arc<dyn PaymentGateway>,
    clock: SharedClock,
    currency: String,
}

impl PaymentService {
    pub fn new(
        store: Arc<dyn ReservationStore>,
        gateway: Arc<dyn PaymentGateway>,
        clock: SharedClock,
        currency: impl Into<String>,
    ) -> Self {
        Self {
            store,
            gateway,
            clock,
            currency: currency.into(),
        }
    }

    /// Create a pending payment and the matching provider order.
    pub async fn initiate(&self, cmd: InitiatePayment) -> DomainResult<PaymentInitiated> {
        let reservation = self
            .store
            .find_reservation(cmd.tenant_id, cmd.reservation_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Reservation", cmd.reservation_id))?;

        if reservation.status.is_terminal() {
            return Err(DomainError::PreconditionFailed(format!(
                "reservation is {}",
                reservation.status
            )));
        }
        if self
            .store
            .has_succeeded_payment(reservation.id, cmd.payment_type)
            .await?
        {
            return Err(DomainError::PreconditionFailed(format!(
                "a successful {} payment already exists for this reservation",
                cmd.payment_type
            )));
        }

        let amount = cmd.amount.unwrap_or(match cmd.payment_type {
            PaymentType::Deposit => reservation.guarantee_amount,
            PaymentType::FullPayment => reservation.amount,
        });
        if amount <= 0 {
            return Err(DomainError::Validation("amount must be positive".into()));
        }

        let now = self.clock.now();
        let id = reservation.id.to_string();
        let reference = format!("ORD-{}-{}", now.timestamp_millis(), &id[..8]);
        let description = cmd
            .description
            .clone()
            .unwrap_or_else(|| format!("Reservation {}", &id[..8]));

        let payment = Payment::pending(
            reservation.tenant_id,
            reservation.id,
            reference.clone(),
            amount,
            self.currency.clone(),
            cmd.payment_type,
            Some(PaymentMethod::Online),
            now,
        )
        .with_description(description.clone());
        self.store.insert_payment(&payment).await?;

        let order = GatewayOrder {
            reference: reference.clone(),
            amount,
            currency: self.currency.clone(),
            description,
            email: cmd.email.clone(),
            hold: cmd.payment_type == PaymentType::Deposit,
        };
        let created = match self.gateway.create_order(&order).await {
            Ok(created) => created,
            Err(error) => {
                warn!(reference = %reference, %error, "Provider order creation failed");
                if let Err(mark_error) = self.store.mark_payment_failed(&reference).await {
                    warn!(reference = %reference, error = %mark_error, "Could not fail orphaned payment");
                }
                return Err(error);
            }
        };

        info!(
            reference = %reference,
            reservation_id = %reservation.id,
            amount,
            payment_type = %cmd.payment_type,
            "Payment initiated"
        );

        Ok(PaymentInitiated {
            reference,
            payment_url: created.payment_url,
            payment,
        })
    }

    /// The payer abandoned the provider page: a pending payment becomes
    /// `failed`. Settled payments are left alone.
    pub async fn mark_cancelled(&self, reference: &str) -> DomainResult<Payment> {
        let changed = self.store.mark_payment_failed(reference).await?;
        let payment = self
            .store
            .find_payment_by_reference(reference)
            .await?
            .ok_or_else(|| DomainError::UnknownTransaction(reference.to_string()))?;
        if changed {
            info!(reference = %reference, "Payment cancelled by payer");
        }
        Ok(payment)
    }

    /// Provider-side status of an order, for the payer's return redirect.
    pub async fn provider_status(&self, reference: &str) -> DomainResult<String> {
        if self.store.find_payment_by_reference(reference).await?.is_none() {
            return Err(DomainError::UnknownTransaction(reference.to_string()));
        }
        self.gateway.get_status(reference).await
    }
}
