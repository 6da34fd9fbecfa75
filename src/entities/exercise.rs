//! Exercise entity - One row of a day program.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Exercise database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "exercises")]
pub struct Model {
    /// Row identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Owning plan
    pub plan_id: i64,
    /// Day the exercise belongs to
    pub day_index: i32,
    /// Position within the day, starting at 0
    pub position: i32,
    /// Exercise name
    pub name: String,
    /// Number of sets, kept as entered
    pub sets: String,
    /// Repetitions per set, kept as entered
    pub reps: String,
    /// Optional coaching note
    pub note: Option<String>,
}

/// Exercises are looked up by `(plan_id, day_index)` and have no declared relations
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
