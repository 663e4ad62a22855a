//! Typed inputs and outputs of the reservation operations

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::domain::payment::PaymentMethod;
use crate::domain::reservation::{DamageReport, Reservation};

#[derive(Debug, Clone)]
pub struct CreateReservation {
    pub tenant_id: Uuid,
    pub asset_id: Uuid,
    pub requester_id: Uuid,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    /// Minor currency units
    pub amount: i64,
    /// Defaults to the configured standard guarantee
    pub guarantee_amount: Option<i64>,
    pub notes: Option<String>,
    pub actor_id: Option<Uuid>,
}

#[derive(Debug, Clone)]
pub struct CheckoutReservation {
    pub tenant_id: Uuid,
    pub reservation_id: Uuid,
    pub odometer: i64,
    /// Percent, 0..=100
    pub fuel_level: i32,
    pub payment_method: PaymentMethod,
    /// Provider reference of the guarantee hold, generated when absent
    pub guarantee_reference: Option<String>,
    pub notes: Option<String>,
    pub actor_id: Option<Uuid>,
}

#[derive(Debug, Clone)]
pub struct CheckinReservation {
    pub tenant_id: Uuid,
    pub reservation_id: Uuid,
    pub odometer: i64,
    pub fuel_level: i32,
    pub damage_reports: Vec<DamageReport>,
    pub notes: Option<String>,
    pub actor_id: Option<Uuid>,
}

#[derive(Debug, Clone)]
pub struct CancelReservation {
    pub tenant_id: Uuid,
    pub reservation_id: Uuid,
    pub reason: Option<String>,
    pub actor_id: Option<Uuid>,
}

#[derive(Debug, Clone)]
pub struct RescheduleReservation {
    pub tenant_id: Uuid,
    pub reservation_id: Uuid,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub amount: Option<i64>,
    pub actor_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CancellationOutcome {
    pub reservation: Reservation,
    /// Late-cancellation fee in minor units, zero outside the fee window
    pub cancellation_fee: i64,
}
