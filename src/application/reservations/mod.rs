//! Reservation lifecycle use cases

pub mod commands;
pub mod service;

pub use commands::{
    CancelReservation, CancellationOutcome, CheckinReservation, CheckoutReservation,
    CreateReservation, RescheduleReservation,
};
pub use service::{ReservationService, ReservationSettings};
