//! In-process fan-out of lifecycle events
//!
//! The orchestrators publish through the [`Notifier`] port after commit;
//! subscribers either see every tenant (the notification worker) or a
//! single tenant. A subscriber that falls behind skips what it missed and
//! keeps a running count of it.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::broadcast;
use tracing::{debug, warn};
use uuid::Uuid;

use super::events::{Event, EventMessage};
use crate::application::ports::{Notifier, SinkError};

const DEFAULT_CAPACITY: usize = 1024;

#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<EventMessage>,
    subscribers: Arc<AtomicUsize>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            subscribers: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Broadcast `event`, returning how many subscribers were reached.
    pub fn publish(&self, event: Event) -> usize {
        let event_type = event.event_type();
        let tenant_id = event.tenant_id();
        let reservation_id = event.reservation_id();
        let reached = self.sender.send(EventMessage::new(event)).unwrap_or(0);
        debug!(event_type, %tenant_id, %reservation_id, reached, "Event published");
        reached
    }

    /// Every event, whatever the tenant.
    pub fn subscribe(&self) -> EventSubscriber {
        self.attach(None)
    }

    /// Only events of `tenant_id`.
    pub fn subscribe_tenant(&self, tenant_id: Uuid) -> EventSubscriber {
        self.attach(Some(tenant_id))
    }

    fn attach(&self, tenant: Option<Uuid>) -> EventSubscriber {
        let count = self.subscribers.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(subscribers = count, tenant_id = ?tenant, "Event subscriber attached");
        EventSubscriber {
            receiver: self.sender.subscribe(),
            tenant,
            missed: 0,
            subscribers: self.subscribers.clone(),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.load(Ordering::SeqCst)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Notifier for EventBus {
    async fn notify(&self, event: Event) -> Result<(), SinkError> {
        self.publish(event);
        Ok(())
    }
}

pub struct EventSubscriber {
    receiver: broadcast::Receiver<EventMessage>,
    tenant: Option<Uuid>,
    missed: u64,
    subscribers: Arc<AtomicUsize>,
}

impl EventSubscriber {
    /// Next event in scope, or `None` once the bus is gone.
    pub async fn recv(&mut self) -> Option<EventMessage> {
        loop {
            match self.receiver.recv().await {
                Ok(msg) if self.in_scope(&msg) => return Some(msg),
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(count)) => {
                    self.missed += count;
                    warn!(missed = count, total_missed = self.missed, "Event subscriber lagged");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Events dropped because this subscriber fell behind.
    pub fn missed(&self) -> u64 {
        self.missed
    }

    fn in_scope(&self, msg: &EventMessage) -> bool {
        self.tenant.map_or(true, |tenant| msg.event.tenant_id() == tenant)
    }
}

impl Drop for EventSubscriber {
    fn drop(&mut self) {
        self.subscribers.fetch_sub(1, Ordering::SeqCst);
    }
}

pub type SharedEventBus = Arc<EventBus>;

pub fn create_event_bus() -> SharedEventBus {
    Arc::new(EventBus::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::events::events::PaymentEvent;
    use std::time::Duration;

    fn payment_event(tenant_id: Uuid, reference: &str) -> Event {
        Event::PaymentSucceeded(PaymentEvent {
            tenant_id,
            reservation_id: Uuid::new_v4(),
            transaction_ref: reference.to_string(),
            amount: 30_000,
            currency: "EUR".to_string(),
        })
    }

    async fn next(subscriber: &mut EventSubscriber) -> EventMessage {
        tokio::time::timeout(Duration::from_millis(100), subscriber.recv())
            .await
            .expect("Timeout")
            .expect("No message")
    }

    #[tokio::test]
    async fn notify_reaches_subscribers() {
        let bus = EventBus::new();
        let mut subscriber = bus.subscribe();

        bus.notify(payment_event(Uuid::new_v4(), "ORD-1")).await.unwrap();

        assert_eq!(next(&mut subscriber).await.event.event_type(), "payment_succeeded");
    }

    #[tokio::test]
    async fn tenant_subscription_skips_other_tenants() {
        let bus = EventBus::new();
        let tenant = Uuid::new_v4();
        let mut scoped = bus.subscribe_tenant(tenant);

        bus.publish(payment_event(Uuid::new_v4(), "ORD-OTHER"));
        bus.publish(payment_event(tenant, "ORD-MINE"));

        let msg = next(&mut scoped).await;
        assert_eq!(msg.event.tenant_id(), tenant);
        match msg.event {
            Event::PaymentSucceeded(p) => assert_eq!(p.transaction_ref, "ORD-MINE"),
            other => panic!("unexpected event {}", other.event_type()),
        }
    }

    #[tokio::test]
    async fn lagging_subscriber_counts_what_it_missed() {
        let bus = EventBus::with_capacity(2);
        let mut subscriber = bus.subscribe();
        let tenant = Uuid::new_v4();
        for i in 0..5 {
            bus.publish(payment_event(tenant, &format!("ORD-{i}")));
        }

        next(&mut subscriber).await;
        assert_eq!(subscriber.missed(), 3);
    }

    #[test]
    fn publishing_without_subscribers_reaches_nobody() {
        let bus = EventBus::new();
        assert_eq!(bus.publish(payment_event(Uuid::new_v4(), "ORD-1")), 0);
    }

    #[test]
    fn subscriber_count_tracks_drops() {
        let bus = EventBus::new();
        let sub1 = bus.subscribe();
        let _sub2 = bus.subscribe_tenant(Uuid::new_v4());
        assert_eq!(bus.subscriber_count(), 2);

        drop(sub1);
        assert_eq!(bus.subscriber_count(), 1);
    }

    #[test]
    fn message_serializes_with_type_tag() {
        let json = serde_json::to_value(EventMessage::new(payment_event(Uuid::new_v4(), "ORD-1")))
            .unwrap();
        assert_eq!(json["type"], "PaymentSucceeded");
        assert_eq!(json["data"]["transaction_ref"], "ORD-1");
    }
}
