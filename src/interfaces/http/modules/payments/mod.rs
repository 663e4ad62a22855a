//! Payment initiation, provider callbacks and redirects

pub mod dto;
pub mod handlers;

pub use handlers::*;
