//! Persistence ports for the domain layer
//!
//! Contains:
//! - `ReservationStore`: non-transactional reads, seeding and document keys
//! - `StoreTransaction`: the atomic unit every lifecycle change runs in
//! - `ReservationFilter`: list criteria

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::asset::Asset;
use crate::domain::payment::{Payment, PaymentType};
use crate::domain::requester::Requester;
use crate::domain::reservation::{DocumentKind, Reservation, ReservationStatus, TimeWindow};
use crate::shared::errors::DomainResult;
use crate::shared::pagination::{PaginatedResult, PaginationParams};

/// Optional criteria for listing reservations of a tenant
#[derive(Debug, Clone, Default)]
pub struct ReservationFilter {
    pub asset_id: Option<Uuid>,
    pub requester_id: Option<Uuid>,
    pub status: Option<ReservationStatus>,
}

impl ReservationFilter {
    pub fn matches(&self, reservation: &Reservation) -> bool {
        self.asset_id.map_or(true, |id| reservation.asset_id == id)
            && self.requester_id.map_or(true, |id| reservation.requester_id == id)
            && self.status.map_or(true, |s| reservation.status == s)
    }
}

#[async_trait]
pub trait ReservationStore: Send + Sync {
    /// Open a transaction. Reads inside it see its own staged writes.
    async fn begin(&self) -> DomainResult<Box<dyn StoreTransaction>>;

    async fn find_reservation(&self, tenant_id: Uuid, id: Uuid) -> DomainResult<Option<Reservation>>;

    async fn list_reservations(
        &self,
        tenant_id: Uuid,
        filter: &ReservationFilter,
        page: PaginationParams,
    ) -> DomainResult<PaginatedResult<Reservation>>;

    async fn find_asset(&self, tenant_id: Uuid, id: Uuid) -> DomainResult<Option<Asset>>;

    async fn find_requester(&self, tenant_id: Uuid, id: Uuid) -> DomainResult<Option<Requester>>;

    /// Global lookup: callbacks carry no tenant.
    async fn find_payment_by_reference(&self, reference: &str) -> DomainResult<Option<Payment>>;

    /// The deposit taken at check-out, if any.
    async fn find_guarantee(&self, tenant_id: Uuid, reservation_id: Uuid) -> DomainResult<Option<Payment>>;

    async fn has_succeeded_payment(
        &self,
        reservation_id: Uuid,
        payment_type: PaymentType,
    ) -> DomainResult<bool>;

    async fn insert_payment(&self, payment: &Payment) -> DomainResult<()>;

    /// Move a pending payment to `failed`. Returns whether a row changed.
    async fn mark_payment_failed(&self, reference: &str) -> DomainResult<bool>;

    async fn set_document_key(
        &self,
        tenant_id: Uuid,
        reservation_id: Uuid,
        kind: DocumentKind,
        key: &str,
    ) -> DomainResult<()>;

    /// Insert or replace an asset (seeding and fleet management)
    async fn save_asset(&self, asset: &Asset) -> DomainResult<()>;

    async fn save_requester(&self, requester: &Requester) -> DomainResult<()>;
}

/// One atomic unit of work. Dropping without commit discards all writes.
#[async_trait]
pub trait StoreTransaction: Send {
    async fn find_reservation(&mut self, tenant_id: Uuid, id: Uuid) -> DomainResult<Option<Reservation>>;

    async fn find_asset(&mut self, tenant_id: Uuid, id: Uuid) -> DomainResult<Option<Asset>>;

    async fn find_payment_by_reference(&mut self, reference: &str) -> DomainResult<Option<Payment>>;

    /// Whether a `CONFIRMED` or `CHECKED_OUT` reservation of `asset_id`
    /// overlaps `window`, optionally ignoring `exclude`.
    async fn has_overlap(
        &mut self,
        tenant_id: Uuid,
        asset_id: Uuid,
        window: &TimeWindow,
        exclude: Option<Uuid>,
    ) -> DomainResult<bool>;

    /// Statuses of the asset's reservations that still occupy it.
    async fn active_reservation_statuses(
        &mut self,
        tenant_id: Uuid,
        asset_id: Uuid,
    ) -> DomainResult<Vec<ReservationStatus>>;

    async fn insert_reservation(&mut self, reservation: &Reservation) -> DomainResult<()>;

    async fn update_reservation(&mut self, reservation: &Reservation) -> DomainResult<()>;

    async fn update_asset(&mut self, asset: &Asset) -> DomainResult<()>;

    async fn insert_payment(&mut self, payment: &Payment) -> DomainResult<()>;

    async fn update_payment(&mut self, payment: &Payment) -> DomainResult<()>;

    async fn commit(self: Box<Self>) -> DomainResult<()>;

    async fn rollback(self: Box<Self>) -> DomainResult<()>;
}

/// Commit on `Ok`, roll back on `Err`. The original error wins over a
/// rollback failure.
pub async fn finish_transaction<T>(
    tx: Box<dyn StoreTransaction>,
    result: DomainResult<T>,
) -> DomainResult<T> {
    match result {
        Ok(value) => {
            tx.commit().await?;
            Ok(value)
        }
        Err(error) => {
            if let Err(rollback_error) = tx.rollback().await {
                tracing::warn!(%rollback_error, "Transaction rollback failed");
            }
            Err(error)
        }
    }
}
