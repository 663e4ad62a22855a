//! Outbound ports: collaborators the engine talks to after commit
//!
//! None of these take part in the reservation transaction. Failures surface as
//! [`SinkError`] and are logged by the dispatcher, except for the payment
//! gateway whose errors map to [`DomainError::Gateway`] when a caller waits on
//! it synchronously (payment initiation).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::application::events::Event;
use crate::domain::asset::Asset;
use crate::domain::reservation::{DocumentKind, Reservation, ReservationStatus};
use crate::shared::errors::DomainResult;

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("render failed: {0}")]
    Render(String),

    #[error("object storage failed: {0}")]
    Storage(String),

    #[error("notification failed: {0}")]
    Notify(String),

    #[error("audit write failed: {0}")]
    Audit(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Output of a [`DocumentRenderer`]
#[derive(Debug, Clone)]
pub struct RenderedDocument {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

#[async_trait]
pub trait DocumentRenderer: Send + Sync {
    async fn render(
        &self,
        kind: DocumentKind,
        reservation: &Reservation,
        asset: Option<&Asset>,
    ) -> Result<RenderedDocument, SinkError>;
}

#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Store `bytes` under `key`, returning the key actually used.
    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<String, SinkError>;
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, event: Event) -> Result<(), SinkError>;
}

pub trait MetricsSink: Send + Sync {
    fn reservation_created(&self, tenant_id: Uuid);

    fn reservation_transition(&self, from: ReservationStatus, to: ReservationStatus);

    fn payment_callback(&self, outcome: &'static str);
}

/// Audit trail entry with before/after snapshots
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub tenant_id: Uuid,
    pub actor_id: Option<Uuid>,
    pub action: String,
    pub entity: String,
    pub entity_id: Uuid,
    pub before: Option<serde_json::Value>,
    pub after: Option<serde_json::Value>,
    pub at: DateTime<Utc>,
}

#[async_trait]
pub trait AuditLog: Send + Sync {
    async fn record(&self, entry: AuditEntry) -> Result<(), SinkError>;
}

// ── Payment gateway ────────────────────────────────────────────

/// Order submitted to the payment provider
#[derive(Debug, Clone, Serialize)]
pub struct GatewayOrder {
    pub reference: String,
    /// Minor currency units
    pub amount: i64,
    pub currency: String,
    pub description: String,
    pub email: Option<String>,
    /// Hold the amount instead of charging it immediately
    pub hold: bool,
}

/// Provider answer to [`PaymentGateway::create_order`]
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GatewayOrderCreated {
    pub reference: String,
    pub status: String,
    pub payment_url: String,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_order(&self, order: &GatewayOrder) -> DomainResult<GatewayOrderCreated>;

    /// Provider-side status code of an order
    async fn get_status(&self, reference: &str) -> DomainResult<String>;

    /// Capture a held amount; `final_capture` closes the hold.
    async fn capture(&self, reference: &str, amount: i64, final_capture: bool) -> DomainResult<()>;

    /// Release a held amount back to the payer.
    async fn release(&self, reference: &str) -> DomainResult<()>;
}
