//! # Fleet Reservations
//!
//! Multi-tenant vehicle reservation engine: conflict-free booking of assets
//! over time windows, the reservation lifecycle from request to check-in,
//! and reconciliation of asynchronous payment provider callbacks.
//!
//! ## Architecture
//!
//! - **domain**: entities, state machine, overlap rules, fee policy, callback
//!   verification and the persistence ports
//! - **application**: reservation and payment use cases, per-asset locking,
//!   events and post-commit side effects
//! - **infrastructure**: SeaORM and in-memory stores, Redis lock store,
//!   payment gateway client, document rendering and storage, observability
//! - **interfaces**: REST API with OpenAPI documentation
//! - **server**: runtime wiring and graceful shutdown

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod interfaces;
pub mod server;
pub mod shared;

pub use config::{default_config_path, AppConfig};

pub use infrastructure::{init_database, run_migrations, DatabaseConfig, InMemoryStore, SeaOrmReservationStore};

pub use interfaces::http::{create_api_router, AppState};

pub use application::{create_event_bus, Event, EventBus, SharedEventBus};
pub use server::{ServerHandle, ServerOptions};
