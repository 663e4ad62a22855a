//! SeaORM implementation of ReservationStore
//!
//! On PostgreSQL every transaction runs SERIALIZABLE. On SQLite every
//! transaction takes the database write lock before its first read, so
//! concurrent writers queue on the busy timeout instead of failing the
//! read-to-write upgrade.

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    AccessMode, ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection,
    DatabaseTransaction, DbBackend, EntityTrait, IsolationLevel, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, TransactionTrait,
};
use tracing::debug;
use uuid::Uuid;

use super::mapping::{
    asset_from_model, asset_to_active, payment_from_model, payment_to_active,
    requester_from_model, requester_to_active, reservation_from_model, reservation_to_active,
};
use crate::domain::asset::Asset;
use crate::domain::payment::{Payment, PaymentStatus, PaymentType};
use crate::domain::repositories::{ReservationFilter, ReservationStore, StoreTransaction};
use crate::domain::requester::Requester;
use crate::domain::reservation::{DocumentKind, Reservation, ReservationStatus, TimeWindow};
use crate::infrastructure::database::entities::{asset, payment, requester, reservation};
use crate::shared::errors::{DomainError, DomainResult};
use crate::shared::pagination::{PaginatedResult, PaginationParams};

const OCCUPYING: [ReservationStatus; 2] = [ReservationStatus::Confirmed, ReservationStatus::CheckedOut];

/// No-op write: equivalent to `BEGIN IMMEDIATE` on a deferred transaction.
const SQLITE_WRITE_LOCK: &str = "UPDATE assets SET odometer = odometer WHERE 0 = 1";

fn occupying_names() -> Vec<&'static str> {
    OCCUPYING.iter().map(ReservationStatus::as_str).collect()
}

#[derive(Clone)]
pub struct SeaOrmReservationStore {
    db: DatabaseConnection,
}

impl SeaOrmReservationStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }
}

// ── Shared queries (connection or transaction) ─────────────────

async fn find_reservation_on<C: ConnectionTrait>(
    conn: &C,
    tenant_id: Uuid,
    id: Uuid,
) -> DomainResult<Option<Reservation>> {
    reservation::Entity::find_by_id(id)
        .filter(reservation::Column::TenantId.eq(tenant_id))
        .one(conn)
        .await?
        .map(reservation_from_model)
        .transpose()
}

async fn find_asset_on<C: ConnectionTrait>(
    conn: &C,
    tenant_id: Uuid,
    id: Uuid,
) -> DomainResult<Option<Asset>> {
    asset::Entity::find_by_id(id)
        .filter(asset::Column::TenantId.eq(tenant_id))
        .one(conn)
        .await?
        .map(asset_from_model)
        .transpose()
}

async fn find_payment_on<C: ConnectionTrait>(conn: &C, reference: &str) -> DomainResult<Option<Payment>> {
    payment::Entity::find()
        .filter(payment::Column::TransactionRef.eq(reference))
        .one(conn)
        .await?
        .map(payment_from_model)
        .transpose()
}

/// Insert a payment, reporting a duplicate reference as a precondition failure.
async fn insert_payment_on<C: ConnectionTrait>(conn: &C, p: &Payment) -> DomainResult<()> {
    if find_payment_on(conn, &p.transaction_ref).await?.is_some() {
        return Err(DomainError::PreconditionFailed(format!(
            "payment reference {} already exists",
            p.transaction_ref
        )));
    }
    payment_to_active(p).insert(conn).await?;
    Ok(())
}

#[async_trait]
impl ReservationStore for SeaOrmReservationStore {
    async fn begin(&self) -> DomainResult<Box<dyn StoreTransaction>> {
        let txn = match self.db.get_database_backend() {
            DbBackend::Postgres => {
                self.db
                    .begin_with_config(Some(IsolationLevel::Serializable), Some(AccessMode::ReadWrite))
                    .await?
            }
            DbBackend::Sqlite => {
                let txn = self.db.begin().await?;
                txn.execute_unprepared(SQLITE_WRITE_LOCK).await?;
                txn
            }
            _ => self.db.begin().await?,
        };
        Ok(Box::new(SeaOrmTransaction { txn }))
    }

    async fn find_reservation(&self, tenant_id: Uuid, id: Uuid) -> DomainResult<Option<Reservation>> {
        find_reservation_on(&self.db, tenant_id, id).await
    }

    async fn list_reservations(
        &self,
        tenant_id: Uuid,
        filter: &ReservationFilter,
        page: PaginationParams,
    ) -> DomainResult<PaginatedResult<Reservation>> {
        let mut query =
            reservation::Entity::find().filter(reservation::Column::TenantId.eq(tenant_id));
        if let Some(asset_id) = filter.asset_id {
            query = query.filter(reservation::Column::AssetId.eq(asset_id));
        }
        if let Some(requester_id) = filter.requester_id {
            query = query.filter(reservation::Column::RequesterId.eq(requester_id));
        }
        if let Some(status) = filter.status {
            query = query.filter(reservation::Column::Status.eq(status.as_str()));
        }

        let total = query.clone().count(&self.db).await?;
        let items = query
            .order_by_desc(reservation::Column::StartAt)
            .offset(page.offset())
            .limit(u64::from(page.limit))
            .all(&self.db)
            .await?
            .into_iter()
            .map(reservation_from_model)
            .collect::<DomainResult<Vec<_>>>()?;

        Ok(PaginatedResult::new(items, total, page))
    }

    async fn find_asset(&self, tenant_id: Uuid, id: Uuid) -> DomainResult<Option<Asset>> {
        find_asset_on(&self.db, tenant_id, id).await
    }

    async fn find_requester(&self, tenant_id: Uuid, id: Uuid) -> DomainResult<Option<Requester>> {
        requester::Entity::find_by_id(id)
            .filter(requester::Column::TenantId.eq(tenant_id))
            .one(&self.db)
            .await?
            .map(requester_from_model)
            .transpose()
    }

    async fn find_payment_by_reference(&self, reference: &str) -> DomainResult<Option<Payment>> {
        find_payment_on(&self.db, reference).await
    }

    async fn find_guarantee(&self, tenant_id: Uuid, reservation_id: Uuid) -> DomainResult<Option<Payment>> {
        payment::Entity::find()
            .filter(payment::Column::TenantId.eq(tenant_id))
            .filter(payment::Column::ReservationId.eq(reservation_id))
            .filter(payment::Column::PaymentType.eq(PaymentType::Deposit.as_str()))
            .order_by_desc(payment::Column::CreatedAt)
            .one(&self.db)
            .await?
            .map(payment_from_model)
            .transpose()
    }

    async fn has_succeeded_payment(
        &self,
        reservation_id: Uuid,
        payment_type: PaymentType,
    ) -> DomainResult<bool> {
        let count = payment::Entity::find()
            .filter(payment::Column::ReservationId.eq(reservation_id))
            .filter(payment::Column::PaymentType.eq(payment_type.as_str()))
            .filter(payment::Column::Status.eq(PaymentStatus::Succeeded.as_str()))
            .count(&self.db)
            .await?;
        Ok(count > 0)
    }

    async fn insert_payment(&self, payment: &Payment) -> DomainResult<()> {
        debug!(reference = %payment.transaction_ref, "Inserting payment");
        insert_payment_on(&self.db, payment).await
    }

    async fn mark_payment_failed(&self, reference: &str) -> DomainResult<bool> {
        let result = payment::Entity::update_many()
            .col_expr(payment::Column::Status, Expr::value(PaymentStatus::Failed.as_str()))
            .col_expr(payment::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(payment::Column::TransactionRef.eq(reference))
            .filter(payment::Column::Status.eq(PaymentStatus::Pending.as_str()))
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected > 0)
    }

    async fn set_document_key(
        &self,
        tenant_id: Uuid,
        reservation_id: Uuid,
        kind: DocumentKind,
        key: &str,
    ) -> DomainResult<()> {
        let column = match kind {
            DocumentKind::Contract => reservation::Column::ContractKey,
            DocumentKind::CheckoutReport => reservation::Column::CheckoutReportKey,
            DocumentKind::CheckinReport => reservation::Column::CheckinReportKey,
        };
        let result = reservation::Entity::update_many()
            .col_expr(column, Expr::value(key))
            .filter(reservation::Column::Id.eq(reservation_id))
            .filter(reservation::Column::TenantId.eq(tenant_id))
            .exec(&self.db)
            .await?;
        if result.rows_affected == 0 {
            return Err(DomainError::not_found("Reservation", reservation_id));
        }
        Ok(())
    }

    async fn save_asset(&self, a: &Asset) -> DomainResult<()> {
        let exists = asset::Entity::find_by_id(a.id).one(&self.db).await?.is_some();
        let model = asset_to_active(a);
        if exists {
            model.update(&self.db).await?;
        } else {
            model.insert(&self.db).await?;
        }
        Ok(())
    }

    async fn save_requester(&self, r: &Requester) -> DomainResult<()> {
        let exists = requester::Entity::find_by_id(r.id).one(&self.db).await?.is_some();
        let model = requester_to_active(r);
        if exists {
            model.update(&self.db).await?;
        } else {
            model.insert(&self.db).await?;
        }
        Ok(())
    }
}

// ── Transaction ────────────────────────────────────────────────

/// Open database transaction. Dropped without commit, SeaORM rolls it back.
pub struct SeaOrmTransaction {
    txn: DatabaseTransaction,
}

#[async_trait]
impl StoreTransaction for SeaOrmTransaction {
    async fn find_reservation(&mut self, tenant_id: Uuid, id: Uuid) -> DomainResult<Option<Reservation>> {
        find_reservation_on(&self.txn, tenant_id, id).await
    }

    async fn find_asset(&mut self, tenant_id: Uuid, id: Uuid) -> DomainResult<Option<Asset>> {
        find_asset_on(&self.txn, tenant_id, id).await
    }

    async fn find_payment_by_reference(&mut self, reference: &str) -> DomainResult<Option<Payment>> {
        find_payment_on(&self.txn, reference).await
    }

    async fn has_overlap(
        &mut self,
        tenant_id: Uuid,
        asset_id: Uuid,
        window: &TimeWindow,
        exclude: Option<Uuid>,
    ) -> DomainResult<bool> {
        let mut query = reservation::Entity::find()
            .filter(reservation::Column::TenantId.eq(tenant_id))
            .filter(reservation::Column::AssetId.eq(asset_id))
            .filter(reservation::Column::Status.is_in(occupying_names()))
            .filter(reservation::Column::StartAt.lte(window.end))
            .filter(reservation::Column::EndAt.gte(window.start));
        if let Some(id) = exclude {
            query = query.filter(reservation::Column::Id.ne(id));
        }
        Ok(query.count(&self.txn).await? > 0)
    }

    async fn active_reservation_statuses(
        &mut self,
        tenant_id: Uuid,
        asset_id: Uuid,
    ) -> DomainResult<Vec<ReservationStatus>> {
        let names: Vec<String> = reservation::Entity::find()
            .select_only()
            .column(reservation::Column::Status)
            .filter(reservation::Column::TenantId.eq(tenant_id))
            .filter(reservation::Column::AssetId.eq(asset_id))
            .filter(reservation::Column::Status.is_in(occupying_names()))
            .into_tuple()
            .all(&self.txn)
            .await?;
        names.iter().map(|name| name.parse()).collect()
    }

    async fn insert_reservation(&mut self, r: &Reservation) -> DomainResult<()> {
        reservation_to_active(r)?.insert(&self.txn).await?;
        Ok(())
    }

    async fn update_reservation(&mut self, r: &Reservation) -> DomainResult<()> {
        reservation_to_active(r)?.update(&self.txn).await?;
        Ok(())
    }

    async fn update_asset(&mut self, a: &Asset) -> DomainResult<()> {
        asset_to_active(a).update(&self.txn).await?;
        Ok(())
    }

    async fn insert_payment(&mut self, p: &Payment) -> DomainResult<()> {
        insert_payment_on(&self.txn, p).await
    }

    async fn update_payment(&mut self, p: &Payment) -> DomainResult<()> {
        payment_to_active(p).update(&self.txn).await?;
        Ok(())
    }

    async fn commit(self: Box<Self>) -> DomainResult<()> {
        self.txn.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> DomainResult<()> {
        self.txn.rollback().await?;
        Ok(())
    }
}
