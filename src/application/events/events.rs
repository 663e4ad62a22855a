//! Reservation lifecycle events
//!
//! Published after commit for notification fan-out (e-mail/SMS workers,
//! dashboards).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::reservation::{Reservation, ReservationStatus};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum Event {
    ReservationConfirmed(ReservationEvent),
    ReservationCheckedOut(ReservationEvent),
    ReservationCheckedIn(CheckinEvent),
    ReservationCancelled(CancellationEvent),
    ReservationRescheduled(ReservationEvent),
    PaymentSucceeded(PaymentEvent),
    PaymentFailed(PaymentEvent),
}

impl Event {
    pub fn event_type(&self) -> &'static str {
        match self {
            Event::ReservationConfirmed(_) => "reservation_confirmed",
            Event::ReservationCheckedOut(_) => "reservation_checked_out",
            Event::ReservationCheckedIn(_) => "reservation_checked_in",
            Event::ReservationCancelled(_) => "reservation_cancelled",
            Event::ReservationRescheduled(_) => "reservation_rescheduled",
            Event::PaymentSucceeded(_) => "payment_succeeded",
            Event::PaymentFailed(_) => "payment_failed",
        }
    }

    pub fn tenant_id(&self) -> Uuid {
        match self {
            Event::ReservationConfirmed(e)
            | Event::ReservationCheckedOut(e)
            | Event::ReservationRescheduled(e) => e.tenant_id,
            Event::ReservationCheckedIn(e) => e.reservation.tenant_id,
            Event::ReservationCancelled(e) => e.reservation.tenant_id,
            Event::PaymentSucceeded(e) | Event::PaymentFailed(e) => e.tenant_id,
        }
    }

    pub fn reservation_id(&self) -> Uuid {
        match self {
            Event::ReservationConfirmed(e)
            | Event::ReservationCheckedOut(e)
            | Event::ReservationRescheduled(e) => e.reservation_id,
            Event::ReservationCheckedIn(e) => e.reservation.reservation_id,
            Event::ReservationCancelled(e) => e.reservation.reservation_id,
            Event::PaymentSucceeded(e) | Event::PaymentFailed(e) => e.reservation_id,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReservationEvent {
    pub tenant_id: Uuid,
    pub reservation_id: Uuid,
    pub asset_id: Uuid,
    pub requester_id: Uuid,
    pub status: ReservationStatus,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
}

impl From<&Reservation> for ReservationEvent {
    fn from(r: &Reservation) -> Self {
        Self {
            tenant_id: r.tenant_id,
            reservation_id: r.id,
            asset_id: r.asset_id,
            requester_id: r.requester_id,
            status: r.status,
            start_at: r.start_at,
            end_at: r.end_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckinEvent {
    #[serde(flatten)]
    pub reservation: ReservationEvent,
    pub damage_reported: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancellationEvent {
    #[serde(flatten)]
    pub reservation: ReservationEvent,
    pub cancellation_fee: i64,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentEvent {
    pub tenant_id: Uuid,
    pub reservation_id: Uuid,
    pub transaction_ref: String,
    pub amount: i64,
    pub currency: String,
}

/// Event with envelope metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventMessage {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub event: Event,
}

impl EventMessage {
    pub fn new(event: Event) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            event,
        }
    }
}
