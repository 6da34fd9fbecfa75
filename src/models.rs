//! Typed domain records decoded from the stored entity models.
//!
//! Decoding is explicit: a stored row whose values break a domain invariant (negative
//! stock, unknown status string) fails with [`Error::MalformedRecord`] instead of being
//! silently defaulted.

use crate::{
    entities::{order, plan, user},
    errors::{Error, Result},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// A purchasable workout plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    /// Store-assigned identifier
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
    /// Cover image URL, empty when there is none
    pub image_url: String,
    /// Number of program days defined
    pub days_count: i64,
}

impl Plan {
    /// Whether checkout would currently accept this plan.
    #[must_use]
    pub const fn is_purchasable(&self) -> bool {
        self.on_sale && self.stock > 0
    }
}

impl TryFrom<plan::Model> for Plan {
    type Error = Error;

    fn try_from(model: plan::Model) -> Result<Self> {
        let malformed = |reason: String| Error::MalformedRecord {
            collection: "plans",
            id: model.id.to_string(),
            reason,
        };
        if model.price < 0 {
            return Err(malformed(format!("negative price {}", model.price)));
        }
        if model.stock < 0 {
            return Err(malformed(format!("negative stock {}", model.stock)));
        }
        if model.days_count < 0 {
            return Err(malformed(format!("negative days_count {}", model.days_count)));
        }
        Ok(Self {
            id: model.id,
            name: model.name,
            description: model.description,
            price: model.price,
            stock: model.stock,
            on_sale: model.on_sale,
            image_url: model.image_url,
            days_count: model.days_count,
        })
    }
}

/// Input for creating a plan.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewPlan {
    /// Display name, must not be blank
    pub name: String,
    /// Description, must not be blank
    pub description: String,
    /// Price in minor currency units
    pub price: i64,
    /// Initial stock
    pub stock: i64,
    /// Cover image URL, empty for none
    #[serde(default)]
    pub image_url: String,
}

/// Partial update of a plan's editable attributes. `None` leaves a field untouched.
#[derive(Debug, Clone, Default)]
pub struct PlanUpdate {
    /// New display name
    pub name: Option<String>,
    /// New description
    pub description: Option<String>,
    /// New price
    pub price: Option<i64>,
    /// New stock level
    pub stock: Option<i64>,
}

/// One exercise in a day program.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Exercise {
    /// Exercise name
    pub name: String,
    /// Number of sets as entered, digits only
    pub sets: String,
    /// Repetitions as entered, digits only
    pub reps: String,
    /// Optional coaching note
    pub note: Option<String>,
}

/// The program for one day of a plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayProgram {
    /// Owning plan
    pub plan_id: i64,
    /// 1-based day number
    pub day_index: i32,
    /// Title shown for the day
    pub title: String,
    /// Exercises in display order
    pub exercises: Vec<Exercise>,
}

/// Lifecycle state of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    /// Recorded by checkout, awaiting an admin
    Pending,
    /// Accepted by an admin
    Approved,
    /// Display vocabulary only; no operation writes it
    Cancelled,
}

impl OrderStatus {
    /// The stored string form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(format!("unknown order status {other:?}")),
        }
    }
}

/// A recorded purchase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    /// Generated unique identifier
    pub id: String,
    /// Buyer
    pub user_id: String,
    /// Purchased plan ids in cart order
    pub items: Vec<i64>,
    /// Sum of prices read at checkout
    pub total: i64,
    /// Current status
    pub status: OrderStatus,
    /// When checkout wrote the order
    pub created_at: DateTime<Utc>,
}

impl Order {
    /// Builds an order from its row and its item plan ids (already in position order).
    pub fn decode(model: order::Model, items: Vec<i64>) -> Result<Self> {
        let status = model
            .status
            .parse::<OrderStatus>()
            .map_err(|reason| Error::MalformedRecord {
                collection: "orders",
                id: model.id.clone(),
                reason,
            })?;
        if model.total < 0 {
            return Err(Error::MalformedRecord {
                collection: "orders",
                id: model.id,
                reason: format!("negative total {}", model.total),
            });
        }
        Ok(Self {
            id: model.id,
            user_id: model.user_id,
            items,
            total: model.total,
            status,
            created_at: model.created_at,
        })
    }
}

/// Account role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Manages catalog and orders
    Admin,
    /// Browses and buys
    User,
}

impl Role {
    /// The stored string form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::User => "user",
        }
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Self::Admin),
            "user" => Ok(Self::User),
            other => Err(format!("unknown role {other:?}")),
        }
    }
}

/// A registered account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    /// Authentication provider id
    pub id: String,
    /// Display name
    pub name: String,
    /// Contact email
    pub email: String,
    /// Role flag
    pub role: Role,
    /// Whether the account may sign in
    pub active: bool,
}

impl TryFrom<user::Model> for UserProfile {
    type Error = Error;

    fn try_from(model: user::Model) -> Result<Self> {
        let role = model.role.parse::<Role>().map_err(|reason| Error::MalformedRecord {
            collection: "users",
            id: model.id.clone(),
            reason,
        })?;
        Ok(Self {
            id: model.id,
            name: model.name,
            email: model.email,
            role,
            active: model.active,
        })
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    fn plan_model(price: i64, stock: i64) -> plan::Model {
        let now = Utc::now();
        plan::Model {
            id: 7,
            name: "Strength".to_string(),
            description: "Six weeks".to_string(),
            price,
            stock,
            on_sale: true,
            image_url: String::new(),
            days_count: 0,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_plan_decode_rejects_negative_stock() {
        let err = Plan::try_from(plan_model(100, -1)).unwrap_err();
        assert!(matches!(
            err,
            Error::MalformedRecord {
                collection: "plans",
                ..
            }
        ));
    }

    #[test]
    fn test_plan_decode_rejects_negative_price() {
        assert!(Plan::try_from(plan_model(-5, 1)).is_err());
    }

    #[test]
    fn test_plan_purchasable_requires_stock_and_sale() {
        let mut plan = Plan::try_from(plan_model(100, 1)).unwrap();
        assert!(plan.is_purchasable());
        plan.stock = 0;
        assert!(!plan.is_purchasable());
        plan.stock = 3;
        plan.on_sale = false;
        assert!(!plan.is_purchasable());
    }

    #[test]
    fn test_order_status_parsing() {
        assert_eq!("pending".parse::<OrderStatus>(), Ok(OrderStatus::Pending));
        assert_eq!("approved".parse::<OrderStatus>(), Ok(OrderStatus::Approved));
        assert!("Pending".parse::<OrderStatus>().is_err());
        assert!("shipped".parse::<OrderStatus>().is_err());
        assert_eq!(OrderStatus::Cancelled.to_string(), "cancelled");
    }

    #[test]
    fn test_order_decode_rejects_unknown_status() {
        let model = order::Model {
            id: "o-1".to_string(),
            user_id: "u".to_string(),
            total: 10,
            status: "lost".to_string(),
            created_at: Utc::now(),
        };
        let err = Order::decode(model, vec![1]).unwrap_err();
        assert!(matches!(err, Error::MalformedRecord { collection: "orders", .. }));
    }

    #[test]
    fn test_user_decode_rejects_unknown_role() {
        let model = user::Model {
            id: "u".to_string(),
            name: "n".to_string(),
            email: "e".to_string(),
            role: "root".to_string(),
            active: true,
        };
        assert!(UserProfile::try_from(model).is_err());
    }
}
