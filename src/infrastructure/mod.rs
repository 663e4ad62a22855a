//! Infrastructure layer - external concerns

pub mod cache;
pub mod database;
pub mod documents;
pub mod observability;
pub mod payments;
pub mod storage;

pub use cache::RedisLockStore;
pub use database::{init_database, run_migrations, DatabaseConfig, SeaOrmReservationStore};
pub use documents::{InMemoryObjectStorage, LocalFileStorage, PlainTextRenderer};
pub use observability::{PrometheusMetricsSink, TracingAuditLog};
pub use payments::{HttpGatewayConfig, HttpPaymentGateway};
pub use storage::InMemoryStore;
