//! Shared harness for the integration tests: recording fakes for every
//! outbound port and a builder wiring the services over a chosen store.

#![allow(dead_code)]

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use uuid::Uuid;

use fleet_reservations::application::ports::{
    AuditEntry, AuditLog, GatewayOrder, GatewayOrderCreated, MetricsSink, PaymentGateway,
    SinkError,
};
use fleet_reservations::application::{
    create_event_bus, CallbackProcessor, Collaborators, CreateReservation, LocalLockStore,
    LockManager, PaymentService, ReservationService, ReservationSettings, SharedEventBus,
    SideEffectDispatcher,
};
use fleet_reservations::domain::payment::{encode_payload, CallbackSigner, Payment, PaymentType};
use fleet_reservations::domain::repositories::{ReservationFilter, ReservationStore, StoreTransaction};
use fleet_reservations::domain::reservation::{DocumentKind, Reservation, ReservationStatus};
use fleet_reservations::domain::{Asset, Requester};
use fleet_reservations::infrastructure::{
    init_database, run_migrations, DatabaseConfig, InMemoryObjectStorage, InMemoryStore,
    PlainTextRenderer, SeaOrmReservationStore,
};
use fleet_reservations::shared::clock::FixedClock;
use fleet_reservations::shared::errors::DomainResult;
use fleet_reservations::shared::pagination::{PaginatedResult, PaginationParams};

pub const SIGN_PASSWORD: &str = "test-sign-password";

/// 2026-06-01 09:00 UTC
pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 6, 1, 9, 0, 0).unwrap()
}

pub fn days(n: i64) -> DateTime<Utc> {
    base_time() + Duration::days(n)
}

// ── Fakes ──────────────────────────────────────────────────────

#[derive(Default)]
pub struct FakeGateway {
    pub orders: Mutex<Vec<GatewayOrder>>,
    pub released: Mutex<Vec<String>>,
    pub fail_orders: std::sync::atomic::AtomicBool,
}

impl FakeGateway {
    pub fn released(&self) -> Vec<String> {
        self.released.lock().unwrap().clone()
    }
}

#[async_trait]
impl PaymentGateway for FakeGateway {
    async fn create_order(&self, order: &GatewayOrder) -> DomainResult<GatewayOrderCreated> {
        if self.fail_orders.load(Ordering::SeqCst) {
            return Err(fleet_reservations::shared::errors::DomainError::Gateway(
                "provider down".into(),
            ));
        }
        self.orders.lock().unwrap().push(order.clone());
        Ok(GatewayOrderCreated {
            reference: order.reference.clone(),
            status: "0".to_string(),
            payment_url: format!("https://pay.example/{}", order.reference),
        })
    }

    async fn get_status(&self, _reference: &str) -> DomainResult<String> {
        Ok("2".to_string())
    }

    async fn capture(&self, _reference: &str, _amount: i64, _final_capture: bool) -> DomainResult<()> {
        Ok(())
    }

    async fn release(&self, reference: &str) -> DomainResult<()> {
        self.released.lock().unwrap().push(reference.to_string());
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingMetrics {
    pub created: AtomicUsize,
    pub transitions: Mutex<Vec<(ReservationStatus, ReservationStatus)>>,
    pub callbacks: Mutex<Vec<&'static str>>,
}

impl RecordingMetrics {
    pub fn callbacks(&self) -> Vec<&'static str> {
        self.callbacks.lock().unwrap().clone()
    }
}

impl MetricsSink for RecordingMetrics {
    fn reservation_created(&self, _tenant_id: Uuid) {
        self.created.fetch_add(1, Ordering::SeqCst);
    }

    fn reservation_transition(&self, from: ReservationStatus, to: ReservationStatus) {
        self.transitions.lock().unwrap().push((from, to));
    }

    fn payment_callback(&self, outcome: &'static str) {
        self.callbacks.lock().unwrap().push(outcome);
    }
}

#[derive(Default)]
pub struct RecordingAudit {
    pub entries: Mutex<Vec<AuditEntry>>,
}

impl RecordingAudit {
    pub fn actions(&self) -> Vec<String> {
        self.entries.lock().unwrap().iter().map(|e| e.action.clone()).collect()
    }
}

#[async_trait]
impl AuditLog for RecordingAudit {
    async fn record(&self, entry: AuditEntry) -> Result<(), SinkError> {
        self.entries.lock().unwrap().push(entry);
        Ok(())
    }
}

/// Delegating store that counts transactions and payment lookups.
pub struct CountingStore {
    inner: Arc<dyn ReservationStore>,
    pub begins: AtomicUsize,
    pub payment_lookups: AtomicUsize,
}

impl CountingStore {
    pub fn new(inner: Arc<dyn ReservationStore>) -> Self {
        Self {
            inner,
            begins: AtomicUsize::new(0),
            payment_lookups: AtomicUsize::new(0),
        }
    }

    pub fn begins(&self) -> usize {
        self.begins.load(Ordering::SeqCst)
    }

    pub fn lookups(&self) -> usize {
        self.payment_lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ReservationStore for CountingStore {
    async fn begin(&self) -> DomainResult<Box<dyn StoreTransaction>> {
        self.begins.fetch_add(1, Ordering::SeqCst);
        self.inner.begin().await
    }

    async fn find_reservation(&self, tenant_id: Uuid, id: Uuid) -> DomainResult<Option<Reservation>> {
        self.inner.find_reservation(tenant_id, id).await
    }

    async fn list_reservations(
        &self,
        tenant_id: Uuid,
        filter: &ReservationFilter,
        page: PaginationParams,
    ) -> DomainResult<PaginatedResult<Reservation>> {
        self.inner.list_reservations(tenant_id, filter, page).await
    }

    async fn find_asset(&self, tenant_id: Uuid, id: Uuid) -> DomainResult<Option<Asset>> {
        self.inner.find_asset(tenant_id, id).await
    }

    async fn find_requester(&self, tenant_id: Uuid, id: Uuid) -> DomainResult<Option<Requester>> {
        self.inner.find_requester(tenant_id, id).await
    }

    async fn find_payment_by_reference(&self, reference: &str) -> DomainResult<Option<Payment>> {
        self.payment_lookups.fetch_add(1, Ordering::SeqCst);
        self.inner.find_payment_by_reference(reference).await
    }

    async fn find_guarantee(&self, tenant_id: Uuid, reservation_id: Uuid) -> DomainResult<Option<Payment>> {
        self.inner.find_guarantee(tenant_id, reservation_id).await
    }

    async fn has_succeeded_payment(
        &self,
        reservation_id: Uuid,
        payment_type: PaymentType,
    ) -> DomainResult<bool> {
        self.inner.has_succeeded_payment(reservation_id, payment_type).await
    }

    async fn insert_payment(&self, payment: &Payment) -> DomainResult<()> {
        self.inner.insert_payment(payment).await
    }

    async fn mark_payment_failed(&self, reference: &str) -> DomainResult<bool> {
        self.inner.mark_payment_failed(reference).await
    }

    async fn set_document_key(
        &self,
        tenant_id: Uuid,
        reservation_id: Uuid,
        kind: DocumentKind,
        key: &str,
    ) -> DomainResult<()> {
        self.inner
            .set_document_key(tenant_id, reservation_id, kind, key)
            .await
    }

    async fn save_asset(&self, asset: &Asset) -> DomainResult<()> {
        self.inner.save_asset(asset).await
    }

    async fn save_requester(&self, requester: &Requester) -> DomainResult<()> {
        self.inner.save_requester(requester).await
    }
}

// ── Harness ────────────────────────────────────────────────────

pub struct Harness {
    pub store: Arc<CountingStore>,
    pub clock: FixedClock,
    pub gateway: Arc<FakeGateway>,
    pub metrics: Arc<RecordingMetrics>,
    pub audit: Arc<RecordingAudit>,
    pub documents: Arc<InMemoryObjectStorage>,
    pub event_bus: SharedEventBus,
    pub effects: Arc<SideEffectDispatcher>,
    pub local_locks: Arc<LocalLockStore>,
    pub reservations: Arc<ReservationService>,
    pub payments: Arc<PaymentService>,
    pub callbacks: Arc<CallbackProcessor>,
    pub tenant_id: Uuid,
    pub asset: Asset,
    pub requester: Requester,
}

impl Harness {
    pub async fn in_memory() -> Self {
        Self::build(Arc::new(InMemoryStore::new())).await
    }

    pub async fn sqlite() -> Self {
        let db = init_database(&DatabaseConfig::in_memory())
            .await
            .expect("sqlite connects");
        run_migrations(&db).await.expect("migrations apply");
        Self::build(Arc::new(SeaOrmReservationStore::new(db))).await
    }

    /// SQLite database file with a full connection pool, as a deployed
    /// instance would open it.
    pub async fn sqlite_file(path: &Path) -> Self {
        let config = DatabaseConfig::sqlite(&path.to_string_lossy());
        let db = init_database(&config).await.expect("sqlite file opens");
        run_migrations(&db).await.expect("migrations apply");
        Self::build(Arc::new(SeaOrmReservationStore::new(db))).await
    }

    pub async fn build(inner: Arc<dyn ReservationStore>) -> Self {
        let store = Arc::new(CountingStore::new(inner));
        let dyn_store: Arc<dyn ReservationStore> = store.clone();
        let clock = FixedClock::new(base_time());
        let gateway = Arc::new(FakeGateway::default());
        let metrics = Arc::new(RecordingMetrics::default());
        let audit = Arc::new(RecordingAudit::default());
        let documents = Arc::new(InMemoryObjectStorage::new());
        let event_bus = create_event_bus();

        let effects = Arc::new(SideEffectDispatcher::new(
            dyn_store.clone(),
            Collaborators {
                renderer: Arc::new(PlainTextRenderer::new("EUR")),
                storage: documents.clone(),
                notifier: event_bus.clone(),
                metrics: metrics.clone(),
                audit: audit.clone(),
                gateway: gateway.clone(),
            },
        ));

        let local_locks = Arc::new(LocalLockStore::new());
        let locks = LockManager::local_only(local_locks.clone());
        let shared_clock: fleet_reservations::shared::clock::SharedClock = Arc::new(clock.clone());
        let reservations = Arc::new(ReservationService::new(
            dyn_store.clone(),
            locks,
            effects.clone(),
            shared_clock.clone(),
            ReservationSettings::default(),
        ));
        let payments = Arc::new(PaymentService::new(
            dyn_store.clone(),
            gateway.clone(),
            shared_clock.clone(),
            "EUR",
        ));
        let callbacks = Arc::new(CallbackProcessor::new(
            dyn_store.clone(),
            CallbackSigner::new(SIGN_PASSWORD),
            effects.clone(),
            shared_clock,
            1,
        ));

        let tenant_id = Uuid::new_v4();
        let asset = Asset::new(tenant_id, "AB-123-CD", "compact");
        let requester = Requester::new(tenant_id, "Jo Driver");
        store.save_asset(&asset).await.expect("asset saved");
        store.save_requester(&requester).await.expect("requester saved");

        Self {
            store,
            clock,
            gateway,
            metrics,
            audit,
            documents,
            event_bus,
            effects,
            local_locks,
            reservations,
            payments,
            callbacks,
            tenant_id,
            asset,
            requester,
        }
    }

    /// Another orchestrator over the same store with a lock table of its
    /// own, like a second process without a shared lock store.
    pub fn sibling_service(&self) -> Arc<ReservationService> {
        let store: Arc<dyn ReservationStore> = self.store.clone();
        Arc::new(ReservationService::new(
            store,
            LockManager::local_only(Arc::new(LocalLockStore::new())),
            self.effects.clone(),
            Arc::new(self.clock.clone()),
            ReservationSettings::default(),
        ))
    }

    pub fn create_cmd(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> CreateReservation {
        CreateReservation {
            tenant_id: self.tenant_id,
            asset_id: self.asset.id,
            requester_id: self.requester.id,
            start_at: start,
            end_at: end,
            amount: 40_000,
            guarantee_amount: None,
            notes: None,
            actor_id: None,
        }
    }

    pub async fn asset_now(&self) -> Asset {
        self.store
            .find_asset(self.tenant_id, self.asset.id)
            .await
            .expect("asset lookup")
            .expect("asset exists")
    }

    /// A signed callback for `reference` with the given provider status.
    pub fn signed_callback(&self, reference: &str, status: &str, amount: Option<i64>) -> (String, String) {
        let amount = amount.map(|a| a.to_string());
        let mut pairs = vec![("orderid", reference), ("status", status)];
        if let Some(amount) = amount.as_deref() {
            pairs.push(("amount", amount));
            pairs.push(("currency", "EUR"));
        }
        let data = encode_payload(&pairs);
        let signature = CallbackSigner::new(SIGN_PASSWORD).sign(&data);
        (data, signature)
    }
}
