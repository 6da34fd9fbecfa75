//! Day program entity - The title of one day of a plan's program.
//!
//! Exercises for the day live in the `exercises` table keyed by the same
//! `(plan_id, day_index)` pair.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Day program database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "day_programs")]
pub struct Model {
    /// Owning plan
    #[sea_orm(primary_key, auto_increment = false)]
    pub plan_id: i64,
    /// 1-based day number
    #[sea_orm(primary_key, auto_increment = false)]
    pub day_index: i32,
    /// Title shown for the day
    pub title: String,
}

/// Defines relationships between `DayProgram` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each day program belongs to one plan
    #[sea_orm(
        belongs_to = "super::plan::Entity",
        from = "Column::PlanId",
        to = "super::plan::Column::Id"
    )]
    Plan,
}

impl Related<super::plan::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Plan.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
