//! Database repository implementations

pub mod mapping;
pub mod reservation_store;

pub use reservation_store::{SeaOrmReservationStore, SeaOrmTransaction};
