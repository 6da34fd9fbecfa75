//! Order entity - An immutable purchase record with a mutable status.
//!
//! The purchased plan ids live in `order_items`. `status` holds one of `"pending"`,
//! `"approved"` or `"cancelled"` and is decoded into
//! [`OrderStatus`](crate::models::OrderStatus).

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Order database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    /// Generated unique identifier
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    /// Buyer
    pub user_id: String,
    /// Sum of the plan prices read at checkout, in minor currency units
    pub total: i64,
    /// Order status
    pub status: String,
    /// Assigned when the checkout transaction wrote the order
    pub created_at: DateTimeUtc,
}

/// Defines relationships between Order and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One order has many line items
    #[sea_orm(has_many = "super::order_item::Entity")]
    Items,
}

impl Related<super::order_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Items.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
