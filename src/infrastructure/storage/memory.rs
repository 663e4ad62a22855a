//! In-memory reservation store for development and testing
//!
//! Transactions take an owned guard over the whole state and work on a copy.
//! Commit swaps the copy in, drop discards it, so concurrent transactions are
//! fully serialized.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use crate::domain::asset::Asset;
use crate::domain::payment::{Payment, PaymentStatus, PaymentType};
use crate::domain::repositories::{ReservationFilter, ReservationStore, StoreTransaction};
use crate::domain::requester::Requester;
use crate::domain::reservation::{
    blocks_window, DocumentKind, Reservation, ReservationStatus, TimeWindow,
};
use crate::shared::errors::{DomainError, DomainResult};
use crate::shared::pagination::{PaginatedResult, PaginationParams};

#[derive(Debug, Clone, Default)]
struct MemoryState {
    reservations: HashMap<Uuid, Reservation>,
    assets: HashMap<Uuid, Asset>,
    requesters: HashMap<Uuid, Requester>,
    /// Keyed by transaction reference
    payments: HashMap<String, Payment>,
}

impl MemoryState {
    fn reservation(&self, tenant_id: Uuid, id: Uuid) -> Option<Reservation> {
        self.reservations
            .get(&id)
            .filter(|r| r.tenant_id == tenant_id)
            .cloned()
    }

    fn asset(&self, tenant_id: Uuid, id: Uuid) -> Option<Asset> {
        self.assets
            .get(&id)
            .filter(|a| a.tenant_id == tenant_id)
            .cloned()
    }

    fn insert_payment(&mut self, payment: &Payment) -> DomainResult<()> {
        if self.payments.contains_key(&payment.transaction_ref) {
            return Err(DomainError::PreconditionFailed(format!(
                "payment reference {} already exists",
                payment.transaction_ref
            )));
        }
        self.payments
            .insert(payment.transaction_ref.clone(), payment.clone());
        Ok(())
    }
}

/// In-memory [`ReservationStore`]
#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored reservations across all tenants
    pub async fn reservation_count(&self) -> usize {
        self.state.lock().await.reservations.len()
    }
}

#[async_trait]
impl ReservationStore for InMemoryStore {
    async fn begin(&self) -> DomainResult<Box<dyn StoreTransaction>> {
        let guard = self.state.clone().lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(InMemoryTransaction { guard, working }))
    }

    async fn find_reservation(&self, tenant_id: Uuid, id: Uuid) -> DomainResult<Option<Reservation>> {
        Ok(self.state.lock().await.reservation(tenant_id, id))
    }

    async fn list_reservations(
        &self,
        tenant_id: Uuid,
        filter: &ReservationFilter,
        page: PaginationParams,
    ) -> DomainResult<PaginatedResult<Reservation>> {
        let state = self.state.lock().await;
        let mut matching: Vec<Reservation> = state
            .reservations
            .values()
            .filter(|r| r.tenant_id == tenant_id && filter.matches(r))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.start_at.cmp(&a.start_at));

        let total = matching.len() as u64;
        let items = matching
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.limit as usize)
            .collect();
        Ok(PaginatedResult::new(items, total, page))
    }

    async fn find_asset(&self, tenant_id: Uuid, id: Uuid) -> DomainResult<Option<Asset>> {
        Ok(self.state.lock().await.asset(tenant_id, id))
    }

    async fn find_requester(&self, tenant_id: Uuid, id: Uuid) -> DomainResult<Option<Requester>> {
        Ok(self
            .state
            .lock()
            .await
            .requesters
            .get(&id)
            .filter(|r| r.tenant_id == tenant_id)
            .cloned())
    }

    async fn find_payment_by_reference(&self, reference: &str) -> DomainResult<Option<Payment>> {
        Ok(self.state.lock().await.payments.get(reference).cloned())
    }

    async fn find_guarantee(&self, tenant_id: Uuid, reservation_id: Uuid) -> DomainResult<Option<Payment>> {
        Ok(self
            .state
            .lock()
            .await
            .payments
            .values()
            .filter(|p| {
                p.tenant_id == tenant_id
                    && p.reservation_id == reservation_id
                    && p.payment_type == PaymentType::Deposit
            })
            .max_by_key(|p| p.created_at)
            .cloned())
    }

    async fn has_succeeded_payment(
        &self,
        reservation_id: Uuid,
        payment_type: PaymentType,
    ) -> DomainResult<bool> {
        Ok(self.state.lock().await.payments.values().any(|p| {
            p.reservation_id == reservation_id
                && p.payment_type == payment_type
                && p.status == PaymentStatus::Succeeded
        }))
    }

    async fn insert_payment(&self, payment: &Payment) -> DomainResult<()> {
        self.state.lock().await.insert_payment(payment)
    }

    async fn mark_payment_failed(&self, reference: &str) -> DomainResult<bool> {
        let mut state = self.state.lock().await;
        match state.payments.get_mut(reference) {
            Some(payment) if payment.status == PaymentStatus::Pending => {
                payment.status = PaymentStatus::Failed;
                payment.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn set_document_key(
        &self,
        tenant_id: Uuid,
        reservation_id: Uuid,
        kind: DocumentKind,
        key: &str,
    ) -> DomainResult<()> {
        let mut state = self.state.lock().await;
        let reservation = state
            .reservations
            .get_mut(&reservation_id)
            .filter(|r| r.tenant_id == tenant_id)
            .ok_or_else(|| DomainError::not_found("Reservation", reservation_id))?;
        reservation.set_document_key(kind, key.to_string());
        Ok(())
    }

    async fn save_asset(&self, asset: &Asset) -> DomainResult<()> {
        self.state.lock().await.assets.insert(asset.id, asset.clone());
        Ok(())
    }

    async fn save_requester(&self, requester: &Requester) -> DomainResult<()> {
        self.state
            .lock()
            .await
            .requesters
            .insert(requester.id, requester.clone());
        Ok(())
    }
}

/// Open transaction over [`InMemoryStore`]
pub struct InMemoryTransaction {
    guard: OwnedMutexGuard<MemoryState>,
    working: MemoryState,
}

#[async_trait]
impl StoreTransaction for InMemoryTransaction {
    async fn find_reservation(&mut self, tenant_id: Uuid, id: Uuid) -> DomainResult<Option<Reservation>> {
        Ok(self.working.reservation(tenant_id, id))
    }

    async fn find_asset(&mut self, tenant_id: Uuid, id: Uuid) -> DomainResult<Option<Asset>> {
        Ok(self.working.asset(tenant_id, id))
    }

    async fn find_payment_by_reference(&mut self, reference: &str) -> DomainResult<Option<Payment>> {
        Ok(self.working.payments.get(reference).cloned())
    }

    async fn has_overlap(
        &mut self,
        tenant_id: Uuid,
        asset_id: Uuid,
        window: &TimeWindow,
        exclude: Option<Uuid>,
    ) -> DomainResult<bool> {
        Ok(self
            .working
            .reservations
            .values()
            .any(|r| r.tenant_id == tenant_id && blocks_window(r, asset_id, window, exclude)))
    }

    async fn active_reservation_statuses(
        &mut self,
        tenant_id: Uuid,
        asset_id: Uuid,
    ) -> DomainResult<Vec<ReservationStatus>> {
        Ok(self
            .working
            .reservations
            .values()
            .filter(|r| r.tenant_id == tenant_id && r.asset_id == asset_id)
            .map(|r| r.status)
            .filter(ReservationStatus::occupies_asset)
            .collect())
    }

    async fn insert_reservation(&mut self, reservation: &Reservation) -> DomainResult<()> {
        if self.working.reservations.contains_key(&reservation.id) {
            return Err(DomainError::Storage(format!(
                "reservation {} already exists",
                reservation.id
            )));
        }
        self.working
            .reservations
            .insert(reservation.id, reservation.clone());
        Ok(())
    }

    async fn update_reservation(&mut self, reservation: &Reservation) -> DomainResult<()> {
        match self.working.reservations.get_mut(&reservation.id) {
            Some(stored) if stored.tenant_id == reservation.tenant_id => {
                *stored = reservation.clone();
                Ok(())
            }
            _ => Err(DomainError::not_found("Reservation", reservation.id)),
        }
    }

    async fn update_asset(&mut self, asset: &Asset) -> DomainResult<()> {
        match self.working.assets.get_mut(&asset.id) {
            Some(stored) if stored.tenant_id == asset.tenant_id => {
                *stored = asset.clone();
                Ok(())
            }
            _ => Err(DomainError::not_found("Asset", asset.id)),
        }
    }

    async fn insert_payment(&mut self, payment: &Payment) -> DomainResult<()> {
        self.working.insert_payment(payment)
    }

    async fn update_payment(&mut self, payment: &Payment) -> DomainResult<()> {
        match self.working.payments.get_mut(&payment.transaction_ref) {
            Some(stored) => {
                *stored = payment.clone();
                Ok(())
            }
            None => Err(DomainError::UnknownTransaction(payment.transaction_ref.clone())),
        }
    }

    async fn commit(self: Box<Self>) -> DomainResult<()> {
        let InMemoryTransaction { mut guard, working } = *self;
        *guard = working;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> DomainResult<()> {
        Ok(())
    }
}
