//! Reservation entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "reservations")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub tenant_id: Uuid,
    pub asset_id: Uuid,
    pub requester_id: Uuid,

    pub start_at: DateTimeUtc,
    pub end_at: DateTimeUtc,

    /// Minor currency units
    pub amount: i64,
    pub guarantee_amount: i64,

    /// CONFIRMED, CHECKED_OUT, CHECKED_IN, CANCELLED, NO_SHOW
    pub status: String,

    #[sea_orm(nullable)]
    pub cancellation_reason: Option<String>,
    #[sea_orm(nullable)]
    pub cancellation_fee: Option<i64>,
    #[sea_orm(nullable, column_type = "Text")]
    pub notes: Option<String>,

    // Check-out
    #[sea_orm(nullable)]
    pub checkout_odometer: Option<i64>,
    #[sea_orm(nullable)]
    pub checkout_fuel_level: Option<i32>,
    #[sea_orm(nullable)]
    pub checkout_payment_method: Option<String>,
    #[sea_orm(nullable)]
    pub checked_out_at: Option<DateTimeUtc>,

    // Check-in
    #[sea_orm(nullable)]
    pub checkin_odometer: Option<i64>,
    #[sea_orm(nullable)]
    pub checkin_fuel_level: Option<i32>,
    /// JSON array of damage reports
    #[sea_orm(nullable, column_type = "Text")]
    pub checkin_damage_reports: Option<String>,
    #[sea_orm(nullable)]
    pub checked_in_at: Option<DateTimeUtc>,

    // Documents
    #[sea_orm(nullable)]
    pub contract_key: Option<String>,
    #[sea_orm(nullable)]
    pub checkout_report_key: Option<String>,
    #[sea_orm(nullable)]
    pub checkin_report_key: Option<String>,

    #[sea_orm(nullable)]
    pub created_by: Option<Uuid>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::asset::Entity",
        from = "Column::AssetId",
        to = "super::asset::Column::Id"
    )]
    Asset,
    #[sea_orm(
        belongs_to = "super::requester::Entity",
        from = "Column::RequesterId",
        to = "super::requester::Column::Id"
    )]
    Requester,
    #[sea_orm(has_many = "super::payment::Entity")]
    Payments,
}

impl Related<super::asset::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Asset.def()
    }
}

impl Related<super::requester::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Requester.def()
    }
}

impl Related<super::payment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Payments.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
