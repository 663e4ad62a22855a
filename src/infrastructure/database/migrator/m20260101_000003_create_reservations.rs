//! Create reservations table
//!
//! The `(tenant_id, asset_id, status)` index backs the overlap query that
//! runs inside every booking transaction.

use sea_orm_migration::prelude::*;

use super::m20260101_000001_create_assets::Assets;
use super::m20260101_000002_create_requesters::Requesters;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Reservations::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Reservations::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Reservations::TenantId).uuid().not_null())
                    .col(ColumnDef::new(Reservations::AssetId).uuid().not_null())
                    .col(ColumnDef::new(Reservations::RequesterId).uuid().not_null())
                    .col(
                        ColumnDef::new(Reservations::StartAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Reservations::EndAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Reservations::Amount).big_integer().not_null())
                    .col(
                        ColumnDef::new(Reservations::GuaranteeAmount)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Reservations::Status)
                            .string()
                            .not_null()
                            .default("CONFIRMED"),
                    )
                    .col(ColumnDef::new(Reservations::CancellationReason).string())
                    .col(ColumnDef::new(Reservations::CancellationFee).big_integer())
                    .col(ColumnDef::new(Reservations::Notes).text())
                    .col(ColumnDef::new(Reservations::CheckoutOdometer).big_integer())
                    .col(ColumnDef::new(Reservations::CheckoutFuelLevel).integer())
                    .col(ColumnDef::new(Reservations::CheckoutPaymentMethod).string())
                    .col(ColumnDef::new(Reservations::CheckedOutAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(Reservations::CheckinOdometer).big_integer())
                    .col(ColumnDef::new(Reservations::CheckinFuelLevel).integer())
                    .col(ColumnDef::new(Reservations::CheckinDamageReports).text())
                    .col(ColumnDef::new(Reservations::CheckedInAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(Reservations::ContractKey).string())
                    .col(ColumnDef::new(Reservations::CheckoutReportKey).string())
                    .col(ColumnDef::new(Reservations::CheckinReportKey).string())
                    .col(ColumnDef::new(Reservations::CreatedBy).uuid())
                    .col(
                        ColumnDef::new(Reservations::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Reservations::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_reservations_asset")
                            .from(Reservations::Table, Reservations::AssetId)
                            .to(Assets::Table, Assets::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_reservations_requester")
                            .from(Reservations::Table, Reservations::RequesterId)
                            .to(Requesters::Table, Requesters::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_reservations_tenant_asset_status")
                    .table(Reservations::Table)
                    .col(Reservations::TenantId)
                    .col(Reservations::AssetId)
                    .col(Reservations::Status)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_reservations_window")
                    .table(Reservations::Table)
                    .col(Reservations::StartAt)
                    .col(Reservations::EndAt)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Reservations::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum Reservations {
    Table,
    Id,
    TenantId,
    AssetId,
    RequesterId,
    StartAt,
    EndAt,
    Amount,
    GuaranteeAmount,
    Status,
    CancellationReason,
    CancellationFee,
    Notes,
    CheckoutOdometer,
    CheckoutFuelLevel,
    CheckoutPaymentMethod,
    CheckedOutAt,
    CheckinOdometer,
    CheckinFuelLevel,
    CheckinDamageReports,
    CheckedInAt,
    ContractKey,
    CheckoutReportKey,
    CheckinReportKey,
    CreatedBy,
    CreatedAt,
    UpdatedAt,
}
