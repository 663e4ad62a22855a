//! Requester domain

pub mod model;

pub use model::{Requester, RequesterStatus};
