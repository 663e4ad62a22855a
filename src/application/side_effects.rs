//! Post-commit side effects
//!
//! Every lifecycle operation returns the list of effects it wants after its
//! transaction committed. The dispatcher runs them in order. A failing effect
//! is logged and the rest still run; nothing is reported to the caller.

use std::sync::Arc;

use tracing::{debug, warn};
use uuid::Uuid;

use super::events::Event;
use super::ports::{
    AuditEntry, AuditLog, DocumentRenderer, MetricsSink, Notifier, ObjectStorage, PaymentGateway,
};
use crate::domain::asset::Asset;
use crate::domain::repositories::ReservationStore;
use crate::domain::reservation::{DocumentKind, Reservation, ReservationStatus};

#[derive(Debug, Clone)]
pub enum SideEffect {
    /// Render a document, store it and record its key on the reservation
    StoreDocument {
        kind: DocumentKind,
        reservation: Box<Reservation>,
        asset: Option<Box<Asset>>,
    },
    Notify(Event),
    ReservationCreated { tenant_id: Uuid },
    Transition {
        from: ReservationStatus,
        to: ReservationStatus,
    },
    CallbackOutcome(&'static str),
    Audit(Box<AuditEntry>),
    /// Hand a held guarantee back to the payer
    ReleaseGuarantee { reference: String },
}

impl SideEffect {
    pub fn name(&self) -> &'static str {
        match self {
            Self::StoreDocument { .. } => "store_document",
            Self::Notify(_) => "notify",
            Self::ReservationCreated { .. } => "metric_created",
            Self::Transition { .. } => "metric_transition",
            Self::CallbackOutcome(_) => "metric_callback",
            Self::Audit(_) => "audit",
            Self::ReleaseGuarantee { .. } => "release_guarantee",
        }
    }
}

/// The collaborators side effects are delivered to
#[derive(Clone)]
pub struct Collaborators {
    pub renderer: Arc<dyn DocumentRenderer>,
    pub storage: Arc<dyn ObjectStorage>,
    pub notifier: Arc<dyn Notifier>,
    pub metrics: Arc<dyn MetricsSink>,
    pub audit: Arc<dyn AuditLog>,
    pub gateway: Arc<dyn PaymentGateway>,
}

pub struct SideEffectDispatcher {
    store: Arc<dyn ReservationStore>,
    collaborators: Collaborators,
}

impl SideEffectDispatcher {
    pub fn new(store: Arc<dyn ReservationStore>, collaborators: Collaborators) -> Self {
        Self {
            store,
            collaborators,
        }
    }

    pub fn gateway(&self) -> &Arc<dyn PaymentGateway> {
        &self.collaborators.gateway
    }

    /// Run all effects. Awaited inline so callers observe them once the
    /// operation returns.
    pub async fn dispatch(&self, effects: Vec<SideEffect>) {
        for effect in effects {
            let name = effect.name();
            if let Err(error) = self.run(effect).await {
                warn!(effect = name, %error, "Side effect failed");
            } else {
                debug!(effect = name, "Side effect delivered");
            }
        }
    }

    async fn run(&self, effect: SideEffect) -> Result<(), String> {
        let c = &self.collaborators;
        match effect {
            SideEffect::StoreDocument {
                kind,
                reservation,
                asset,
            } => {
                let document = c
                    .renderer
                    .render(kind, &reservation, asset.as_deref())
                    .await
                    .map_err(|e| e.to_string())?;
                let key = format!(
                    "{}/reservations/{}/{}",
                    reservation.tenant_id, reservation.id, document.file_name
                );
                let stored_key = c
                    .storage
                    .put(&key, document.bytes, &document.content_type)
                    .await
                    .map_err(|e| e.to_string())?;
                self.store
                    .set_document_key(reservation.tenant_id, reservation.id, kind, &stored_key)
                    .await
                    .map_err(|e| e.to_string())
            }
            SideEffect::Notify(event) => c.notifier.notify(event).await.map_err(|e| e.to_string()),
            SideEffect::ReservationCreated { tenant_id } => {
                c.metrics.reservation_created(tenant_id);
                Ok(())
            }
            SideEffect::Transition { from, to } => {
                c.metrics.reservation_transition(from, to);
                Ok(())
            }
            SideEffect::CallbackOutcome(outcome) => {
                c.metrics.payment_callback(outcome);
                Ok(())
            }
            SideEffect::Audit(entry) => c.audit.record(*entry).await.map_err(|e| e.to_string()),
            SideEffect::ReleaseGuarantee { reference } => {
                c.gateway.release(&reference).await.map_err(|e| e.to_string())
            }
        }
    }
}
