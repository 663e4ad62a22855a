//! Server runtime
//!
//! [`ServerHandle`] owns the full lifecycle: store selection and migrations,
//! lock store, collaborators, services, the REST API, the local-lock purge
//! task and graceful shutdown.

use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use sea_orm::DatabaseConnection;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::application::{
    create_event_bus, CallbackProcessor, Collaborators, EventSubscriber, LocalLockStore,
    LockManager, LockStore, PaymentService, ReservationService, SharedEventBus,
    SideEffectDispatcher,
};
use crate::application::ports::{ObjectStorage, PaymentGateway};
use crate::config::{AppConfig, LoggingConfig};
use crate::domain::payment::CallbackSigner;
use crate::domain::repositories::ReservationStore;
use crate::infrastructure::{
    init_database, run_migrations, HttpPaymentGateway, InMemoryObjectStorage, InMemoryStore,
    LocalFileStorage, PlainTextRenderer, PrometheusMetricsSink, RedisLockStore,
    SeaOrmReservationStore, TracingAuditLog,
};
use crate::interfaces::http::{create_api_router, AppState};
use crate::shared::clock::{SharedClock, SystemClock};
use crate::shared::shutdown::{ShutdownCoordinator, ShutdownSignal};

/// `database.url` value selecting the in-memory store
pub const MEMORY_STORE_URL: &str = "memory";

/// Initialise the global tracing subscriber. `RUST_LOG` wins over the
/// configured level. Later calls are no-ops.
pub fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    let result = if logging.json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .try_init()
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).try_init()
    };
    if result.is_err() {
        debug!("Tracing subscriber already installed");
    }
}

/// The global recorder can only be installed once per process.
fn prometheus_handle() -> Option<PrometheusHandle> {
    static HANDLE: OnceLock<Option<PrometheusHandle>> = OnceLock::new();
    HANDLE
        .get_or_init(|| match PrometheusBuilder::new().install_recorder() {
            Ok(handle) => {
                info!("Prometheus metrics recorder installed");
                Some(handle)
            }
            Err(e) => {
                warn!(error = %e, "Prometheus recorder not installed, /metrics disabled");
                None
            }
        })
        .clone()
}

// ── Options ────────────────────────────────────────────────────────

pub struct ServerOptions {
    pub config: AppConfig,
    /// Run database migrations on startup
    pub auto_migrate: bool,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            config: AppConfig::default(),
            auto_migrate: true,
        }
    }
}

// ── Wiring ─────────────────────────────────────────────────────────

/// Services built from configuration, shared by the HTTP layer and tasks
pub struct Services {
    pub store: Arc<dyn ReservationStore>,
    pub db: Option<DatabaseConnection>,
    pub locks: LockManager,
    pub lock_backend: &'static str,
    pub event_bus: SharedEventBus,
    pub reservations: Arc<ReservationService>,
    pub payments: Arc<PaymentService>,
    pub callbacks: Arc<CallbackProcessor>,
}

impl Services {
    pub async fn build(config: &AppConfig, auto_migrate: bool) -> Result<Self, Box<dyn std::error::Error>> {
        let (store, db): (Arc<dyn ReservationStore>, Option<DatabaseConnection>) =
            if config.database.url == MEMORY_STORE_URL {
                warn!("Using the in-memory store, data is lost on restart");
                (Arc::new(InMemoryStore::new()), None)
            } else {
                let db = init_database(&config.database.connection()).await?;
                if auto_migrate && config.database.run_migrations {
                    run_migrations(&db).await?;
                }
                (Arc::new(SeaOrmReservationStore::new(db.clone())), Some(db))
            };

        let local = Arc::new(LocalLockStore::new());
        let shared: Option<Arc<dyn LockStore>> = match &config.redis.url {
            Some(url) => match RedisLockStore::connect(url).await {
                Ok(redis) => Some(Arc::new(
                    redis.with_command_timeout(Duration::from_millis(config.redis.command_timeout_ms)),
                )),
                Err(e) => {
                    // Locks stay process-local: safe for a single instance only
                    warn!(error = %e, "Redis unreachable at startup, using local locks");
                    None
                }
            },
            None => None,
        };
        let lock_backend = shared.as_ref().map_or("local", |s| s.backend());
        let settings = config.reservations.settings();
        let locks = LockManager::new(shared, local).with_default_ttl(settings.lock_ttl);

        let event_bus = create_event_bus();
        let gateway: Arc<dyn PaymentGateway> =
            Arc::new(HttpPaymentGateway::new(config.payments.gateway())?);
        let storage: Arc<dyn ObjectStorage> = match &config.documents.directory {
            Some(dir) => {
                info!(directory = %dir.display(), "Storing documents on disk");
                Arc::new(LocalFileStorage::new(dir))
            }
            None => Arc::new(InMemoryObjectStorage::new()),
        };

        let effects = Arc::new(SideEffectDispatcher::new(
            store.clone(),
            Collaborators {
                renderer: Arc::new(PlainTextRenderer::new(settings.currency.clone())),
                storage,
                notifier: event_bus.clone(),
                metrics: Arc::new(PrometheusMetricsSink::new()),
                audit: Arc::new(TracingAuditLog::new()),
                gateway: gateway.clone(),
            },
        ));

        if config.payments.sign_password.is_empty() {
            warn!("payments.sign_password is empty, every callback will be rejected");
        }

        let clock: SharedClock = Arc::new(SystemClock);
        let currency = settings.currency.clone();
        let reservations = Arc::new(ReservationService::new(
            store.clone(),
            locks.clone(),
            effects.clone(),
            clock.clone(),
            settings,
        ));
        let payments = Arc::new(PaymentService::new(
            store.clone(),
            gateway,
            clock.clone(),
            currency,
        ));
        let callbacks = Arc::new(CallbackProcessor::new(
            store.clone(),
            CallbackSigner::new(&config.payments.sign_password),
            effects,
            clock,
            config.payments.amount_tolerance,
        ));

        Ok(Self {
            store,
            db,
            locks,
            lock_backend,
            event_bus,
            reservations,
            payments,
            callbacks,
        })
    }
}

/// Drop expired local locks until shutdown.
pub fn spawn_lock_purge(
    local: Arc<LocalLockStore>,
    interval: Duration,
    shutdown: ShutdownSignal,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        let stopped = shutdown.notified();
        tokio::pin!(stopped);
        loop {
            tokio::select! {
                _ = &mut stopped => break,
                _ = ticker.tick() => {
                    let purged = local.purge_expired();
                    if purged > 0 {
                        debug!(purged, "Expired local locks purged");
                    }
                }
            }
        }
        debug!("Lock purge task stopped");
    })
}

/// Write every lifecycle event to the `notifications` log target until
/// shutdown. Returns how many events it delivered.
pub fn spawn_notification_log(mut events: EventSubscriber, shutdown: ShutdownSignal) -> JoinHandle<u64> {
    tokio::spawn(async move {
        let mut delivered = 0u64;
        let stopped = shutdown.notified();
        tokio::pin!(stopped);
        loop {
            tokio::select! {
                // drain what is already queued before honouring shutdown
                biased;
                msg = events.recv() => {
                    let Some(msg) = msg else { break };
                    info!(
                        target: "notifications",
                        event_id = %msg.id,
                        event = msg.event.event_type(),
                        tenant_id = %msg.event.tenant_id(),
                        reservation_id = %msg.event.reservation_id(),
                        "Lifecycle notification"
                    );
                    delivered += 1;
                }
                _ = &mut stopped => break,
            }
        }
        debug!(delivered, missed = events.missed(), "Notification log stopped");
        delivered
    })
}

// ── ServerHandle ───────────────────────────────────────────────────

/// Handle to a running server
pub struct ServerHandle {
    pub event_bus: SharedEventBus,
    pub store: Arc<dyn ReservationStore>,
    pub config: AppConfig,
    pub local_addr: std::net::SocketAddr,

    db: Option<DatabaseConnection>,
    shutdown: ShutdownCoordinator,
    api_task: JoinHandle<()>,
    purge_task: JoinHandle<()>,
    notification_task: JoinHandle<u64>,
}

impl ServerHandle {
    pub async fn start(opts: ServerOptions) -> Result<Self, Box<dyn std::error::Error>> {
        let config = opts.config;
        info!("Starting fleet reservation service");

        let metrics = prometheus_handle();
        let services = Services::build(&config, opts.auto_migrate).await?;

        let shutdown = ShutdownCoordinator::default();
        let signal = shutdown.signal();

        let purge_task = spawn_lock_purge(
            services.locks.local_store().clone(),
            Duration::from_secs(config.server.lock_purge_interval_secs.max(1)),
            signal.clone(),
        );

        let notification_task =
            spawn_notification_log(services.event_bus.subscribe(), signal.clone());

        let state = AppState {
            reservations: services.reservations.clone(),
            payments: services.payments.clone(),
            callbacks: services.callbacks.clone(),
            db: services.db.clone(),
            lock_backend: services.lock_backend,
            metrics,
            started_at: Arc::new(Instant::now()),
        };
        let router = create_api_router(state, &config.server.cors_origins);

        let listener = tokio::net::TcpListener::bind(config.server.address()).await?;
        let local_addr = listener.local_addr()?;
        info!(address = %local_addr, lock_store = services.lock_backend, "REST API listening");
        info!("Swagger UI available at http://{}/swagger-ui/", local_addr);

        let api_shutdown = signal.clone();
        let api_task = tokio::spawn(async move {
            let server = axum::serve(listener, router).with_graceful_shutdown(async move {
                api_shutdown.notified().await;
                info!("REST API received shutdown signal");
            });
            if let Err(e) = server.await {
                error!(error = %e, "REST API server error");
            }
        });

        Ok(Self {
            event_bus: services.event_bus,
            store: services.store,
            config,
            local_addr,
            db: services.db,
            shutdown,
            api_task,
            purge_task,
            notification_task,
        })
    }

    pub fn shutdown_signal(&self) -> ShutdownSignal {
        self.shutdown.signal()
    }

    /// Trigger shutdown on SIGTERM / SIGINT.
    pub fn install_signal_handler(&self) {
        self.shutdown.start_signal_listener();
    }

    pub fn trigger_shutdown(&self) {
        self.shutdown.signal().trigger();
    }

    /// Wait for shutdown to be triggered, then for every task to stop.
    pub async fn wait(self) {
        let Self {
            db,
            shutdown,
            api_task,
            purge_task,
            notification_task,
            ..
        } = self;

        let finished = shutdown
            .shutdown_with_cleanup(|| async move {
                if let Err(e) = api_task.await {
                    error!(error = %e, "REST API task panicked");
                }
                let _ = purge_task.await;
                match notification_task.await {
                    Ok(delivered) => debug!(delivered, "Notification log drained"),
                    Err(e) => error!(error = %e, "Notification task panicked"),
                }
                if let Some(db) = db {
                    match db.close().await {
                        Ok(()) => info!("Database connection closed"),
                        Err(e) => warn!(error = %e, "Error closing database connection"),
                    }
                }
            })
            .await;

        if finished {
            info!("Shutdown complete");
        }
    }

    pub async fn shutdown(self) {
        self.trigger_shutdown();
        self.wait().await;
    }

    pub fn is_running(&self) -> bool {
        !self.api_task.is_finished()
    }
}
