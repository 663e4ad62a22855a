//! Reservation aggregate
//!
//! The entity, its status lifecycle and the booking-window overlap rule.

pub mod model;
pub mod overlap;
pub mod state_machine;

pub use model::{
    CancellationReason, CheckinRecord, CheckoutRecord, DamageReport, DocumentKind, NewReservation,
    Reservation, ReservationDocuments,
};
pub use overlap::{blocks_window, TimeWindow};
pub use state_machine::{validate_transition, AllowedTransitions, ReservationStatus};
