pub mod asset;
pub mod payment;
pub mod repositories;
pub mod requester;
pub mod reservation;

// Re-export commonly used types
pub use asset::{Asset, AssetStatus};
pub use payment::{Payment, PaymentMethod, PaymentStatus, PaymentType};
pub use repositories::{finish_transaction, ReservationFilter, ReservationStore, StoreTransaction};
pub use requester::{Requester, RequesterStatus};
pub use reservation::{
    validate_transition, CancellationReason, Reservation, ReservationStatus, TimeWindow,
};

pub use crate::shared::errors::{DomainError, DomainResult};
