//! Cart item entity - A plan id held in a user's cart.
//!
//! The `(user_id, plan_id)` primary key keeps each cart duplicate-free. `plan_id` is
//! deliberately not a foreign key: plans may be deleted while still sitting in carts.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Cart item database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "cart_items")]
pub struct Model {
    /// Owning cart
    #[sea_orm(primary_key, auto_increment = false)]
    pub user_id: String,
    /// Plan the user intends to buy
    #[sea_orm(primary_key, auto_increment = false)]
    pub plan_id: i64,
    /// When the plan was added
    pub added_at: DateTimeUtc,
}

/// Defines relationships between `CartItem` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each item belongs to one cart
    #[sea_orm(
        belongs_to = "super::cart::Entity",
        from = "Column::UserId",
        to = "super::cart::Column::UserId"
    )]
    Cart,
}

impl Related<super::cart::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Cart.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
