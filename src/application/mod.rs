//! Application layer: reservation and payment use cases, locking, events
//! and the post-commit side-effect dispatcher

pub mod events;
pub mod locking;
pub mod payments;
pub mod ports;
pub mod reservations;
pub mod side_effects;

// Re-export key types for convenience
pub use events::{create_event_bus, Event, EventBus, EventSubscriber, SharedEventBus};
pub use locking::{LocalLockStore, LockManager, LockStore, LockStoreError};
pub use payments::{
    CallbackAck, CallbackProcessor, InitiatePayment, PaymentInitiated, PaymentService, ACK_BODY,
};
pub use reservations::{
    CancelReservation, CancellationOutcome, CheckinReservation, CheckoutReservation,
    CreateReservation, RescheduleReservation, ReservationService, ReservationSettings,
};
pub use side_effects::{Collaborators, SideEffect, SideEffectDispatcher};
