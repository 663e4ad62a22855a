//! Database entities module

pub mod asset;
pub mod payment;
pub mod requester;
pub mod reservation;

pub use asset::Entity as Asset;
pub use payment::Entity as Payment;
pub use requester::Entity as Requester;
pub use reservation::Entity as Reservation;
