//! Conversions between SeaORM models and domain entities
//!
//! Enum columns are stored as strings. A value that does not parse back is a
//! storage error, never a silent default.

use sea_orm::ActiveValue::Set;

use crate::domain::asset::{Asset, AssetStatus};
use crate::domain::payment::Payment;
use crate::domain::requester::Requester;
use crate::domain::reservation::{
    CheckinRecord, CheckoutRecord, DamageReport, Reservation, ReservationDocuments,
};
use crate::infrastructure::database::entities::{asset, payment, requester, reservation};
use crate::shared::errors::{DomainError, DomainResult};

// ── Reservation ────────────────────────────────────────────────

pub fn reservation_from_model(m: reservation::Model) -> DomainResult<Reservation> {
    let checkout = match (
        m.checkout_odometer,
        m.checkout_fuel_level,
        m.checkout_payment_method.as_deref(),
        m.checked_out_at,
    ) {
        (Some(odometer), Some(fuel_level), Some(method), Some(at)) => Some(CheckoutRecord {
            odometer,
            fuel_level,
            payment_method: method.parse()?,
            at,
        }),
        _ => None,
    };

    let checkin = match (m.checkin_odometer, m.checkin_fuel_level, m.checked_in_at) {
        (Some(odometer), Some(fuel_level), Some(at)) => {
            let damage_reports: Vec<DamageReport> = match m.checkin_damage_reports.as_deref() {
                Some(json) if !json.is_empty() => serde_json::from_str(json).map_err(|e| {
                    DomainError::Storage(format!("invalid damage reports for {}: {e}", m.id))
                })?,
                _ => Vec::new(),
            };
            Some(CheckinRecord {
                odometer,
                fuel_level,
                damage_reports,
                at,
            })
        }
        _ => None,
    };

    let cancellation_reason = m
        .cancellation_reason
        .as_deref()
        .map(str::parse)
        .transpose()
        .map_err(|e: DomainError| DomainError::Storage(e.to_string()))?;

    Ok(Reservation {
        id: m.id,
        tenant_id: m.tenant_id,
        asset_id: m.asset_id,
        requester_id: m.requester_id,
        start_at: m.start_at,
        end_at: m.end_at,
        amount: m.amount,
        guarantee_amount: m.guarantee_amount,
        status: m.status.parse()?,
        cancellation_reason,
        cancellation_fee: m.cancellation_fee,
        notes: m.notes,
        checkout,
        checkin,
        documents: ReservationDocuments {
            contract_key: m.contract_key,
            checkout_report_key: m.checkout_report_key,
            checkin_report_key: m.checkin_report_key,
        },
        created_by: m.created_by,
        created_at: m.created_at,
        updated_at: m.updated_at,
    })
}

pub fn reservation_to_active(r: &Reservation) -> DomainResult<reservation::ActiveModel> {
    let damage_reports = match &r.checkin {
        Some(checkin) => Some(
            serde_json::to_string(&checkin.damage_reports)
                .map_err(|e| DomainError::Storage(e.to_string()))?,
        ),
        None => None,
    };

    Ok(reservation::ActiveModel {
        id: Set(r.id),
        tenant_id: Set(r.tenant_id),
        asset_id: Set(r.asset_id),
        requester_id: Set(r.requester_id),
        start_at: Set(r.start_at),
        end_at: Set(r.end_at),
        amount: Set(r.amount),
        guarantee_amount: Set(r.guarantee_amount),
        status: Set(r.status.as_str().to_string()),
        cancellation_reason: Set(r.cancellation_reason.map(|c| c.as_str().to_string())),
        cancellation_fee: Set(r.cancellation_fee),
        notes: Set(r.notes.clone()),
        checkout_odometer: Set(r.checkout.as_ref().map(|c| c.odometer)),
        checkout_fuel_level: Set(r.checkout.as_ref().map(|c| c.fuel_level)),
        checkout_payment_method: Set(r
            .checkout
            .as_ref()
            .map(|c| c.payment_method.as_str().to_string())),
        checked_out_at: Set(r.checkout.as_ref().map(|c| c.at)),
        checkin_odometer: Set(r.checkin.as_ref().map(|c| c.odometer)),
        checkin_fuel_level: Set(r.checkin.as_ref().map(|c| c.fuel_level)),
        checkin_damage_reports: Set(damage_reports),
        checked_in_at: Set(r.checkin.as_ref().map(|c| c.at)),
        contract_key: Set(r.documents.contract_key.clone()),
        checkout_report_key: Set(r.documents.checkout_report_key.clone()),
        checkin_report_key: Set(r.documents.checkin_report_key.clone()),
        created_by: Set(r.created_by),
        created_at: Set(r.created_at),
        updated_at: Set(r.updated_at),
    })
}

// ── Asset ──────────────────────────────────────────────────────

pub fn asset_from_model(m: asset::Model) -> DomainResult<Asset> {
    Ok(Asset {
        id: m.id,
        tenant_id: m.tenant_id,
        label: m.label,
        category: m.category,
        status: m.status.parse::<AssetStatus>()?,
        odometer: m.odometer,
        created_at: m.created_at,
        updated_at: m.updated_at,
    })
}

pub fn asset_to_active(a: &Asset) -> asset::ActiveModel {
    asset::ActiveModel {
        id: Set(a.id),
        tenant_id: Set(a.tenant_id),
        label: Set(a.label.clone()),
        category: Set(a.category.clone()),
        status: Set(a.status.as_str().to_string()),
        odometer: Set(a.odometer),
        created_at: Set(a.created_at),
        updated_at: Set(a.updated_at),
    }
}

// ── Requester ──────────────────────────────────────────────────

pub fn requester_from_model(m: requester::Model) -> DomainResult<Requester> {
    Ok(Requester {
        id: m.id,
        tenant_id: m.tenant_id,
        name: m.name,
        email: m.email,
        status: m.status.parse()?,
        licence_expires_on: m.licence_expires_on,
        created_at: m.created_at,
    })
}

pub fn requester_to_active(r: &Requester) -> requester::ActiveModel {
    requester::ActiveModel {
        id: Set(r.id),
        tenant_id: Set(r.tenant_id),
        name: Set(r.name.clone()),
        email: Set(r.email.clone()),
        status: Set(r.status.as_str().to_string()),
        licence_expires_on: Set(r.licence_expires_on),
        created_at: Set(r.created_at),
    }
}

// ── Payment ────────────────────────────────────────────────────

pub fn payment_from_model(m: payment::Model) -> DomainResult<Payment> {
    Ok(Payment {
        id: m.id,
        tenant_id: m.tenant_id,
        reservation_id: m.reservation_id,
        transaction_ref: m.transaction_ref,
        amount: m.amount,
        currency: m.currency,
        status: m.status.parse()?,
        payment_type: m.payment_type.parse()?,
        method: m.method.as_deref().map(str::parse).transpose()?,
        description: m.description,
        created_at: m.created_at,
        updated_at: m.updated_at,
    })
}

pub fn payment_to_active(p: &Payment) -> payment::ActiveModel {
    payment::ActiveModel {
        id: Set(p.id),
        tenant_id: Set(p.tenant_id),
        reservation_id: Set(p.reservation_id),
        transaction_ref: Set(p.transaction_ref.clone()),
        amount: Set(p.amount),
        currency: Set(p.currency.clone()),
        status: Set(p.status.as_str().to_string()),
        payment_type: Set(p.payment_type.as_str().to_string()),
        method: Set(p.method.map(|m| m.as_str().to_string())),
        description: Set(p.description.clone()),
        created_at: Set(p.created_at),
        updated_at: Set(p.updated_at),
    }
}
