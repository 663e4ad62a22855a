//! Reservation domain entity

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::overlap::TimeWindow;
use super::state_machine::{validate_transition, ReservationStatus};
use crate::domain::payment::PaymentMethod;
use crate::shared::errors::{DomainError, DomainResult};

/// Why a reservation was cancelled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CancellationReason {
    #[default]
    CustomerRequest,
    Operator,
    PaymentFailed,
}

impl CancellationReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CustomerRequest => "CUSTOMER_REQUEST",
            Self::Operator => "OPERATOR",
            Self::PaymentFailed => "PAYMENT_FAILED",
        }
    }
}

impl fmt::Display for CancellationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CancellationReason {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CUSTOMER_REQUEST" => Ok(Self::CustomerRequest),
            "OPERATOR" => Ok(Self::Operator),
            "PAYMENT_FAILED" => Ok(Self::PaymentFailed),
            other => Err(DomainError::Validation(format!(
                "unknown cancellation reason '{other}'"
            ))),
        }
    }
}

/// A damage noted at check-in
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DamageReport {
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<String>,
}

/// Vehicle hand-over data recorded at check-out
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutRecord {
    pub odometer: i64,
    /// Fuel level in percent
    pub fuel_level: i32,
    pub payment_method: PaymentMethod,
    pub at: DateTime<Utc>,
}

/// Vehicle return data recorded at check-in
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckinRecord {
    pub odometer: i64,
    pub fuel_level: i32,
    pub damage_reports: Vec<DamageReport>,
    pub at: DateTime<Utc>,
}

/// Storage keys of generated documents
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservationDocuments {
    pub contract_key: Option<String>,
    pub checkout_report_key: Option<String>,
    pub checkin_report_key: Option<String>,
}

/// Kinds of document attached to a reservation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Contract,
    CheckoutReport,
    CheckinReport,
}

impl DocumentKind {
    pub fn file_stem(&self) -> &'static str {
        match self {
            Self::Contract => "contract",
            Self::CheckoutReport => "checkout-report",
            Self::CheckinReport => "checkin-report",
        }
    }
}

/// Time-bounded claim on an asset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    pub id: Uuid,
    /// Isolation boundary, never changes after creation
    pub tenant_id: Uuid,
    pub asset_id: Uuid,
    pub requester_id: Uuid,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    /// Amount in minor currency units
    pub amount: i64,
    /// Guarantee (deposit) taken at check-out, in minor currency units
    pub guarantee_amount: i64,
    pub status: ReservationStatus,
    pub cancellation_reason: Option<CancellationReason>,
    /// Late-cancellation fee computed at cancel time, not charged by this service
    pub cancellation_fee: Option<i64>,
    pub notes: Option<String>,
    pub checkout: Option<CheckoutRecord>,
    pub checkin: Option<CheckinRecord>,
    pub documents: ReservationDocuments,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for [`Reservation::new`]
#[derive(Debug, Clone)]
pub struct NewReservation {
    pub tenant_id: Uuid,
    pub asset_id: Uuid,
    pub requester_id: Uuid,
    pub window: TimeWindow,
    pub amount: i64,
    pub guarantee_amount: i64,
    pub notes: Option<String>,
    pub created_by: Option<Uuid>,
}

impl Reservation {
    pub fn new(input: NewReservation, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            tenant_id: input.tenant_id,
            asset_id: input.asset_id,
            requester_id: input.requester_id,
            start_at: input.window.start,
            end_at: input.window.end,
            amount: input.amount,
            guarantee_amount: input.guarantee_amount,
            status: ReservationStatus::Confirmed,
            cancellation_reason: None,
            cancellation_fee: None,
            notes: input.notes,
            checkout: None,
            checkin: None,
            documents: ReservationDocuments::default(),
            created_by: input.created_by,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn window(&self) -> TimeWindow {
        TimeWindow {
            start: self.start_at,
            end: self.end_at,
        }
    }

    /// Move to `next` through the state machine.
    pub fn transition_to(&mut self, next: ReservationStatus, now: DateTime<Utc>) -> DomainResult<()> {
        validate_transition(self.status, next)?;
        self.status = next;
        self.updated_at = now;
        Ok(())
    }

    pub fn append_note(&mut self, line: &str) {
        self.notes = Some(match self.notes.take() {
            Some(existing) if !existing.is_empty() => format!("{existing}\n{line}"),
            _ => line.to_string(),
        });
    }

    pub fn document_key(&self, kind: DocumentKind) -> Option<&str> {
        match kind {
            DocumentKind::Contract => self.documents.contract_key.as_deref(),
            DocumentKind::CheckoutReport => self.documents.checkout_report_key.as_deref(),
            DocumentKind::CheckinReport => self.documents.checkin_report_key.as_deref(),
        }
    }

    pub fn set_document_key(&mut self, kind: DocumentKind, key: String) {
        let slot = match kind {
            DocumentKind::Contract => &mut self.documents.contract_key,
            DocumentKind::CheckoutReport => &mut self.documents.checkout_report_key,
            DocumentKind::CheckinReport => &mut self.documents.checkin_report_key,
        };
        *slot = Some(key);
    }

    /// Fee owed when cancelling at `now`: `amount * percent / 100` when fewer
    /// than `window_hours` remain before the start, otherwise zero.
    pub fn late_cancellation_fee(&self, now: DateTime<Utc>, window_hours: i64, percent: Decimal) -> i64 {
        let remaining = self.start_at - now;
        if remaining >= chrono::Duration::hours(window_hours) {
            return 0;
        }
        (Decimal::from(self.amount) * percent / Decimal::ONE_HUNDRED)
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
            .to_i64()
            .unwrap_or(0)
    }
}

#[cfg(test)]
impl Reservation {
    /// Confirmed reservation on `asset_id` for tests.
    pub(crate) fn sample(asset_id: Uuid, window: TimeWindow) -> Self {
        Reservation::new(
            NewReservation {
                tenant_id: Uuid::new_v4(),
                asset_id,
                requester_id: Uuid::new_v4(),
                window,
                amount: 40_000,
                guarantee_amount: 30_000,
                notes: None,
                created_by: None,
            },
            window.start - chrono::Duration::days(7),
        )
    }
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn sample() -> Reservation {
        let start = Utc.with_ymd_and_hms(2026, 6, 10, 9, 0, 0).unwrap();
        let window = TimeWindow::new(start, start + Duration::days(4)).unwrap();
        Reservation::sample(Uuid::new_v4(), window)
    }

    #[test]
    fn new_reservation_is_confirmed() {
        let r = sample();
        assert_eq!(r.status, ReservationStatus::Confirmed);
        assert!(r.checkout.is_none());
        assert_eq!(r.window().duration(), Duration::days(4));
    }

    #[test]
    fn transition_goes_through_state_machine() {
        let mut r = sample();
        let now = r.start_at;
        r.transition_to(ReservationStatus::CheckedOut, now).unwrap();
        assert_eq!(r.updated_at, now);

        let err = r.transition_to(ReservationStatus::Cancelled, now).unwrap_err();
        assert!(matches!(err, DomainError::InvalidTransition { .. }));
        assert_eq!(r.status, ReservationStatus::CheckedOut);
    }

    #[test]
    fn notes_are_appended_line_by_line() {
        let mut r = sample();
        r.append_note("Cancellation reason: flight cancelled");
        assert_eq!(r.notes.as_deref(), Some("Cancellation reason: flight cancelled"));

        r.notes = Some("VIP".into());
        r.append_note("Cancellation reason: plans changed");
        assert_eq!(r.notes.as_deref(), Some("VIP\nCancellation reason: plans changed"));
    }

    #[test]
    fn late_cancellation_fee_applies_inside_window() {
        let r = sample();
        let pct = Decimal::from(20);
        let early = r.start_at - Duration::hours(48);
        let late = r.start_at - Duration::hours(3);
        let boundary = r.start_at - Duration::hours(24);

        assert_eq!(r.late_cancellation_fee(early, 24, pct), 0);
        assert_eq!(r.late_cancellation_fee(boundary, 24, pct), 0);
        assert_eq!(r.late_cancellation_fee(late, 24, pct), 8_000);
        assert_eq!(r.late_cancellation_fee(r.start_at + Duration::hours(1), 24, pct), 8_000);
    }

    #[test]
    fn fee_rounds_half_away_from_zero() {
        let mut r = sample();
        r.amount = 12_345;
        let fee = r.late_cancellation_fee(r.start_at, 24, Decimal::from(10));
        assert_eq!(fee, 1_235);
    }

    #[test]
    fn document_keys_by_kind() {
        let mut r = sample();
        r.set_document_key(DocumentKind::CheckinReport, "k/checkin.txt".into());
        assert_eq!(r.document_key(DocumentKind::CheckinReport), Some("k/checkin.txt"));
        assert_eq!(r.document_key(DocumentKind::Contract), None);
    }
}
