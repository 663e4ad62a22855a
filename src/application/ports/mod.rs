//! Application ports (hexagonal architecture boundaries)
//!
//! Persistence ports live in `domain::repositories`. Everything the engine
//! calls out to after commit is defined here.

pub mod outbound;

pub use outbound::{
    AuditEntry, AuditLog, DocumentRenderer, GatewayOrder, GatewayOrderCreated, MetricsSink,
    Notifier, ObjectStorage, PaymentGateway, RenderedDocument, SinkError,
};
