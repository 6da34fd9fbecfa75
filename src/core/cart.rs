//! Cart business logic - The per-user set of plan ids awaiting checkout.
//!
//! Adds and removes are idempotent. Plan existence is not checked here; checkout
//! validates every id against the catalog when the order is placed.

use crate::{
    entities::{Cart, CartItem, cart, cart_item},
    errors::{Error, Result},
};
use chrono::Utc;
use sea_orm::{QueryOrder, QuerySelect, Set, TransactionTrait, prelude::*, sea_query::Expr};
use tracing::{debug, instrument};

pub(crate) fn require_user_id(user_id: &str) -> Result<&str> {
    let trimmed = user_id.trim();
    if trimmed.is_empty() {
        return Err(Error::Validation {
            message: "User id cannot be empty".to_string(),
        });
    }
    Ok(trimmed)
}

/// Creates the user's cart row if needed and stamps its modification time.
async fn touch_cart<C>(db: &C, user_id: &str) -> Result<()>
where
    C: ConnectionTrait,
{
    let now = Utc::now();
    match Cart::find_by_id(user_id.to_string()).one(db).await? {
        Some(existing) => {
            let mut active: cart::ActiveModel = existing.into();
            active.updated_at = Set(now);
            active.update(db).await?;
        }
        None => {
            cart::ActiveModel {
                user_id: Set(user_id.to_string()),
                updated_at: Set(now),
            }
            .insert(db)
            .await?;
        }
    }
    Ok(())
}

/// Returns the plan ids currently in the user's cart, oldest addition first.
///
/// A user who never added anything has an empty cart.
pub async fn cart_plan_ids<C>(db: &C, user_id: &str) -> Result<Vec<i64>>
where
    C: ConnectionTrait,
{
    let user_id = require_user_id(user_id)?;
    CartItem::find()
        .select_only()
        .column(cart_item::Column::PlanId)
        .filter(cart_item::Column::UserId.eq(user_id))
        .order_by_asc(cart_item::Column::AddedAt)
        .order_by_asc(cart_item::Column::PlanId)
        .into_tuple::<i64>()
        .all(db)
        .await
        .map_err(Into::into)
}

/// Adds a plan to the user's cart, creating the cart on first use.
///
/// Adding a plan that is already present leaves the cart unchanged.
///
/// # Returns
/// The cart contents after the add.
#[instrument(skip(db))]
pub async fn add_plan<C>(db: &C, user_id: &str, plan_id: i64) -> Result<Vec<i64>>
where
    C: ConnectionTrait + TransactionTrait,
{
    let user_id = require_user_id(user_id)?;
    let txn = db.begin().await?;

    touch_cart(&txn, user_id).await?;
    let present = CartItem::find_by_id((user_id.to_string(), plan_id))
        .one(&txn)
        .await?
        .is_some();
    if present {
        debug!("Plan already in cart");
    } else {
        cart_item::ActiveModel {
            user_id: Set(user_id.to_string()),
            plan_id: Set(plan_id),
            added_at: Set(Utc::now()),
        }
        .insert(&txn)
        .await?;
    }

    txn.commit().await?;
    cart_plan_ids(db, user_id).await
}

/// Removes a plan from the user's cart. Removing an absent plan is a no-op.
///
/// # Returns
/// The cart contents after the removal.
#[instrument(skip(db))]
pub async fn remove_plan<C>(db: &C, user_id: &str, plan_id: i64) -> Result<Vec<i64>>
where
    C: ConnectionTrait,
{
    let user_id = require_user_id(user_id)?;
    let result = CartItem::delete_by_id((user_id.to_string(), plan_id))
        .exec(db)
        .await?;
    if result.rows_affected > 0 {
        Cart::update_many()
            .col_expr(cart::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(cart::Column::UserId.eq(user_id))
            .exec(db)
            .await?;
    }
    cart_plan_ids(db, user_id).await
}

/// Empties the user's cart. The cart row itself is kept.
#[instrument(skip(db))]
pub async fn clear_cart<C>(db: &C, user_id: &str) -> Result<()>
where
    C: ConnectionTrait,
{
    let user_id = require_user_id(user_id)?;
    CartItem::delete_many()
        .filter(cart_item::Column::UserId.eq(user_id))
        .exec(db)
        .await?;
    Cart::update_many()
        .col_expr(cart::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(cart::Column::UserId.eq(user_id))
        .exec(db)
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::*;

    #[tokio::test]
    async fn test_add_plan_is_idempotent() -> Result<()> {
        let (db, plan) = setup_with_plan().await?;

        add_plan(&db, "user-1", plan.id).await?;
        let ids = add_plan(&db, "user-1", plan.id).await?;

        assert_eq!(ids, vec![plan.id]);
        Ok(())
    }

    #[tokio::test]
    async fn test_add_does_not_check_plan_existence() -> Result<()> {
        let db = setup_test_db().await?;
        let ids = add_plan(&db, "user-1", 9_999).await?;
        assert_eq!(ids, vec![9_999]);
        Ok(())
    }

    #[tokio::test]
    async fn test_remove_plan_is_idempotent() -> Result<()> {
        let db = setup_test_db().await?;
        let first = create_test_plan(&db, "First").await?;
        let second = create_test_plan(&db, "Second").await?;

        add_plan(&db, "user-1", first.id).await?;
        add_plan(&db, "user-1", second.id).await?;

        let ids = remove_plan(&db, "user-1", first.id).await?;
        assert_eq!(ids, vec![second.id]);
        let ids = remove_plan(&db, "user-1", first.id).await?;
        assert_eq!(ids, vec![second.id]);
        Ok(())
    }

    #[tokio::test]
    async fn test_carts_are_per_user() -> Result<()> {
        let (db, plan) = setup_with_plan().await?;
        add_plan(&db, "user-1", plan.id).await?;

        assert_eq!(cart_plan_ids(&db, "user-1").await?, vec![plan.id]);
        assert!(cart_plan_ids(&db, "user-2").await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_clear_cart() -> Result<()> {
        let (db, plan) = setup_with_plan().await?;
        add_plan(&db, "user-1", plan.id).await?;

        clear_cart(&db, "user-1").await?;
        assert!(cart_plan_ids(&db, "user-1").await?.is_empty());

        // Clearing a cart that never existed is fine too
        clear_cart(&db, "nobody").await?;
        Ok(())
    }

    #[tokio::test]
    async fn test_blank_user_rejected() -> Result<()> {
        let (db, plan) = setup_with_plan().await?;
        let result = add_plan(&db, "  ", plan.id).await;
        assert!(matches!(result, Err(Error::Validation { .. })));
        Ok(())
    }
}
