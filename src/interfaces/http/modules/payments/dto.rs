//! Payment DTOs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::application::PaymentInitiated;
use crate::domain::payment::{Payment, PaymentType};

/// Provider callback fields, as query string (GET) or form body (POST)
#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct CallbackParams {
    /// Base64 (URL-safe alphabet) encoded, URL-encoded key/value payload
    pub data: String,
    /// Hex HMAC-MD5 of `data`
    pub ss1: String,
    /// Provider RSA signature, not checked
    pub ss2: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct InitiatePaymentRequest {
    pub reservation_id: Uuid,
    /// `deposit` or `full-payment`
    #[schema(value_type = String, example = "full-payment")]
    pub payment_type: PaymentType,
    /// Minor units; defaults to the guarantee or the reservation amount
    #[validate(range(min = 1))]
    pub amount: Option<i64>,
    #[validate(length(max = 255))]
    pub description: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
}

/// `orderid` query parameter of the provider redirects
#[derive(Debug, Deserialize, IntoParams)]
pub struct OrderQuery {
    pub orderid: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PaymentDto {
    pub id: Uuid,
    pub reservation_id: Uuid,
    pub transaction_ref: String,
    pub amount: i64,
    pub currency: String,
    pub status: String,
    pub payment_type: String,
    pub method: Option<String>,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Payment> for PaymentDto {
    fn from(p: Payment) -> Self {
        Self {
            id: p.id,
            reservation_id: p.reservation_id,
            transaction_ref: p.transaction_ref,
            amount: p.amount,
            currency: p.currency,
            status: p.status.as_str().to_string(),
            payment_type: p.payment_type.as_str().to_string(),
            method: p.method.map(|m| m.as_str().to_string()),
            description: p.description,
            created_at: p.created_at,
            updated_at: p.updated_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PaymentInitiatedDto {
    pub reference: String,
    /// Where to send the payer
    pub payment_url: String,
    pub payment: PaymentDto,
}

impl From<PaymentInitiated> for PaymentInitiatedDto {
    fn from(p: PaymentInitiated) -> Self {
        Self {
            reference: p.reference,
            payment_url: p.payment_url,
            payment: p.payment.into(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProviderStatusDto {
    pub reference: String,
    /// Provider status code
    pub status: String,
}
