//! Slot entity
//!
//! Dated slots use `start_at` / `end_at`. Recurring (all-day template) slots
//! use `start_minute` / `end_minute` and leave the timestamps null.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "slots")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub charger_id: i32,

    #[sea_orm(nullable)]
    pub start_at: Option<DateTimeUtc>,
    #[sea_orm(nullable)]
    pub end_at: Option<DateTimeUtc>,

    #[sea_orm(nullable)]
    pub start_minute: Option<i32>,
    #[sea_orm(nullable)]
    pub end_minute: Option<i32>,

    pub all_day: bool,
    pub is_booked: bool,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::charger::Entity",
        from = "Column::ChargerId",
        to = "super::charger::Column::Id"
    )]
    Charger,
    #[sea_orm(has_many = "super::slot_booking::Entity")]
    SlotBooking,
}

impl Related<super::charger::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Charger.def()
    }
}

impl Related<super::slot_booking::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SlotBooking.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
