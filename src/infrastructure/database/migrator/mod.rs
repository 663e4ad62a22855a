//! Database migrations module

pub use sea_orm_migration::prelude::*;

mod m20260101_000001_create_assets;
mod m20260101_000002_create_requesters;
mod m20260101_000003_create_reservations;
mod m20260101_000004_create_payments;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260101_000001_create_assets::Migration),
            Box::new(m20260101_000002_create_requesters::Migration),
            Box::new(m20260101_000003_create_reservations::Migration),
            Box::new(m20260101_000004_create_payments::Migration),
        ]
    }
}
