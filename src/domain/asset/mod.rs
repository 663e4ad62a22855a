//! Asset (vehicle) domain

pub mod model;

pub use model::{Asset, AssetStatus};
