//! Reservation DTOs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::application::CancellationOutcome;
use crate::domain::payment::PaymentMethod;
use crate::domain::reservation::{
    CheckinRecord, CheckoutRecord, DamageReport, Reservation, ReservationStatus,
};

/// Request to book a vehicle for a window
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateReservationRequest {
    pub asset_id: Uuid,
    pub requester_id: Uuid,
    /// Start of the window (RFC 3339)
    pub start_at: DateTime<Utc>,
    /// End of the window, strictly after `start_at`
    pub end_at: DateTime<Utc>,
    /// Price in minor currency units
    #[validate(range(min = 0))]
    pub amount: i64,
    /// Guarantee in minor units; the configured standard guarantee when omitted
    #[validate(range(min = 0))]
    pub guarantee_amount: Option<i64>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

/// Vehicle hand-over
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CheckoutRequest {
    #[validate(range(min = 0))]
    pub odometer: i64,
    /// Percent
    #[validate(range(min = 0, max = 100))]
    pub fuel_level: i32,
    /// How the guarantee is paid: `card`, `cash`, `transfer` or `online`
    #[schema(value_type = String, example = "card")]
    pub payment_method: PaymentMethod,
    /// Provider reference of the guarantee hold
    #[validate(length(min = 1, max = 128))]
    pub guarantee_reference: Option<String>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct DamageReportDto {
    #[validate(length(min = 1, max = 1000))]
    pub description: String,
    pub location: Option<String>,
    pub severity: Option<String>,
}

impl From<DamageReportDto> for DamageReport {
    fn from(d: DamageReportDto) -> Self {
        Self {
            description: d.description,
            location: d.location,
            severity: d.severity,
        }
    }
}

impl From<DamageReport> for DamageReportDto {
    fn from(d: DamageReport) -> Self {
        Self {
            description: d.description,
            location: d.location,
            severity: d.severity,
        }
    }
}

/// Vehicle return
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CheckinRequest {
    #[validate(range(min = 0))]
    pub odometer: i64,
    #[validate(range(min = 0, max = 100))]
    pub fuel_level: i32,
    #[serde(default)]
    #[validate(nested)]
    pub damage_reports: Vec<DamageReportDto>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct CancelRequest {
    #[validate(length(max = 500))]
    pub reason: Option<String>,
}

/// Move a confirmed reservation to a new window
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RescheduleRequest {
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    /// New price; unchanged when omitted
    #[validate(range(min = 0))]
    pub amount: Option<i64>,
}

/// Filters and paging for the reservation list
#[derive(Debug, Deserialize, IntoParams)]
pub struct ListReservationsQuery {
    pub asset_id: Option<Uuid>,
    pub requester_id: Option<Uuid>,
    /// `CONFIRMED`, `CHECKED_OUT`, `CHECKED_IN`, `CANCELLED` or `NO_SHOW`
    #[param(value_type = Option<String>)]
    pub status: Option<ReservationStatus>,
    /// 1-based page number
    pub page: Option<u32>,
    /// Items per page (1-100)
    pub limit: Option<u32>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CheckoutDto {
    pub odometer: i64,
    pub fuel_level: i32,
    pub payment_method: String,
    pub at: DateTime<Utc>,
}

impl From<CheckoutRecord> for CheckoutDto {
    fn from(c: CheckoutRecord) -> Self {
        Self {
            odometer: c.odometer,
            fuel_level: c.fuel_level,
            payment_method: c.payment_method.as_str().to_string(),
            at: c.at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CheckinDto {
    pub odometer: i64,
    pub fuel_level: i32,
    pub damage_reports: Vec<DamageReportDto>,
    pub at: DateTime<Utc>,
}

impl From<CheckinRecord> for CheckinDto {
    fn from(c: CheckinRecord) -> Self {
        Self {
            odometer: c.odometer,
            fuel_level: c.fuel_level,
            damage_reports: c.damage_reports.into_iter().map(Into::into).collect(),
            at: c.at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DocumentsDto {
    pub contract_key: Option<String>,
    pub checkout_report_key: Option<String>,
    pub checkin_report_key: Option<String>,
}

/// Reservation details in API responses
#[derive(Debug, Serialize, ToSchema)]
pub struct ReservationDto {
    pub id: Uuid,
    pub asset_id: Uuid,
    pub requester_id: Uuid,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub amount: i64,
    pub guarantee_amount: i64,
    pub status: String,
    pub cancellation_reason: Option<String>,
    pub cancellation_fee: Option<i64>,
    pub notes: Option<String>,
    pub checkout: Option<CheckoutDto>,
    pub checkin: Option<CheckinDto>,
    pub documents: DocumentsDto,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Reservation> for ReservationDto {
    fn from(r: Reservation) -> Self {
        Self {
            id: r.id,
            asset_id: r.asset_id,
            requester_id: r.requester_id,
            start_at: r.start_at,
            end_at: r.end_at,
            amount: r.amount,
            guarantee_amount: r.guarantee_amount,
            status: r.status.as_str().to_string(),
            cancellation_reason: r.cancellation_reason.map(|c| c.as_str().to_string()),
            cancellation_fee: r.cancellation_fee,
            notes: r.notes,
            checkout: r.checkout.map(Into::into),
            checkin: r.checkin.map(Into::into),
            documents: DocumentsDto {
                contract_key: r.documents.contract_key,
                checkout_report_key: r.documents.checkout_report_key,
                checkin_report_key: r.documents.checkin_report_key,
            },
            created_by: r.created_by,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CancellationDto {
    pub reservation: ReservationDto,
    /// Late-cancellation fee in minor units; not charged automatically
    pub cancellation_fee: i64,
}

impl From<CancellationOutcome> for CancellationDto {
    fn from(outcome: CancellationOutcome) -> Self {
        Self {
            reservation: outcome.reservation.into(),
            cancellation_fee: outcome.cancellation_fee,
        }
    }
}
