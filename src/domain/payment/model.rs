//! Payment record entity

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::shared::errors::DomainError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Succeeded,
    Failed,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        }
    }

    /// `succeeded` and `failed` are never overwritten by later callbacks.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PaymentType {
    /// Guarantee held against the vehicle
    Deposit,
    FullPayment,
}

impl PaymentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Deposit => "deposit",
            Self::FullPayment => "full-payment",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    #[default]
    Card,
    Cash,
    Transfer,
    Online,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Card => "card",
            Self::Cash => "cash",
            Self::Transfer => "transfer",
            Self::Online => "online",
        }
    }
}

macro_rules! stored_enum {
    ($ty:ident, $what:literal, [$($variant:ident),+ $(,)?]) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = DomainError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                [$(Self::$variant),+]
                    .into_iter()
                    .find(|v| v.as_str() == s)
                    .ok_or_else(|| DomainError::Storage(format!(concat!("unknown ", $what, " '{}'"), s)))
            }
        }
    };
}

stored_enum!(PaymentStatus, "payment status", [Pending, Succeeded, Failed]);
stored_enum!(PaymentType, "payment type", [Deposit, FullPayment]);
stored_enum!(PaymentMethod, "payment method", [Card, Cash, Transfer, Online]);

/// A payment attempt against a reservation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub reservation_id: Uuid,
    /// Provider transaction reference, the idempotency key for callbacks
    pub transaction_ref: String,
    /// Minor currency units
    pub amount: i64,
    pub currency: String,
    pub status: PaymentStatus,
    pub payment_type: PaymentType,
    pub method: Option<PaymentMethod>,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Payment {
    #[allow(clippy::too_many_arguments)]
    pub fn pending(
        tenant_id: Uuid,
        reservation_id: Uuid,
        transaction_ref: impl Into<String>,
        amount: i64,
        currency: impl Into<String>,
        payment_type: PaymentType,
        method: Option<PaymentMethod>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            tenant_id,
            reservation_id,
            transaction_ref: transaction_ref.into(),
            amount,
            currency: currency.into(),
            status: PaymentStatus::Pending,
            payment_type,
            method,
            description: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Whether a successful payment of this type confirms the reservation.
    pub fn confirms_reservation(&self) -> bool {
        matches!(
            self.payment_type,
            PaymentType::Deposit | PaymentType::FullPayment
        )
    }

    pub fn settle(&mut self, status: PaymentStatus, now: DateTime<Utc>) {
        self.status = status;
        self.updated_at = now;
    }
}
