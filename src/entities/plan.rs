//! Plan entity - A purchasable workout plan with inventory.
//!
//! `stock` is only decremented by checkout; `version` is bumped by every write that
//! touches `stock` so a checkout can detect that its read went stale.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Plan database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "plans")]
pub struct Model {
    /// Store-assigned identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Display name
    pub name: String,
    /// Free-form description
    pub description: String,
    /// Price in minor currency units
    pub price: i64,
    /// Remaining units
    pub stock: i64,
    /// Whether the plan can currently be bought
    pub on_sale: bool,
    /// Cover image URL, empty when there is no cover
    pub image_url: String,
    /// Number of program days defined for the plan
    pub days_count: i64,
    /// Optimistic concurrency counter
    pub version: i64,
    /// When the plan was created
    pub created_at: DateTimeUtc,
    /// When the plan was last modified
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between Plan and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One plan has many day programs
    #[sea_orm(has_many = "super::day_program::Entity")]
    DayPrograms,
}

impl Related<super::day_program::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::DayPrograms.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
