//! Create requesters table

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Requesters::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Requesters::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Requesters::TenantId).uuid().not_null())
                    .col(ColumnDef::new(Requesters::Name).string().not_null())
                    .col(ColumnDef::new(Requesters::Email).string())
                    .col(
                        ColumnDef::new(Requesters::Status)
                            .string()
                            .not_null()
                            .default("active"),
                    )
                    .col(ColumnDef::new(Requesters::LicenceExpiresOn).date())
                    .col(
                        ColumnDef::new(Requesters::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_requesters_tenant")
                    .table(Requesters::Table)
                    .col(Requesters::TenantId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Requesters::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum Requesters {
    Table,
    Id,
    TenantId,
    Name,
    Email,
    Status,
    LicenceExpiresOn,
    CreatedAt,
}
