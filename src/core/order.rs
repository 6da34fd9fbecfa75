//! Order ledger - Queries and admin status changes for recorded orders.
//!
//! Orders are only created by checkout. Afterwards the item list and total never
//! change; the status may move `pending -> approved`, and an admin may delete the
//! order outright. Deleting an order does not give the consumed stock back.

use crate::{
    entities::{Order, OrderItem, order, order_item},
    errors::{Error, Result},
    models::{self, OrderStatus},
};
use sea_orm::{QueryOrder, TransactionTrait, prelude::*, sea_query::Expr};
use std::collections::HashMap;
use tracing::{info, instrument, warn};

/// Loads the item ids of the given orders, grouped by order and in position order.
async fn load_items<C>(db: &C, order_ids: Vec<String>) -> Result<HashMap<String, Vec<i64>>>
where
    C: ConnectionTrait,
{
    let mut grouped: HashMap<String, Vec<i64>> = HashMap::new();
    if order_ids.is_empty() {
        return Ok(grouped);
    }
    let rows = OrderItem::find()
        .filter(order_item::Column::OrderId.is_in(order_ids))
        .order_by_asc(order_item::Column::OrderId)
        .order_by_asc(order_item::Column::Position)
        .all(db)
        .await?;
    for row in rows {
        grouped.entry(row.order_id).or_default().push(row.plan_id);
    }
    Ok(grouped)
}

async fn decode_orders<C>(db: &C, rows: Vec<order::Model>) -> Result<Vec<models::Order>>
where
    C: ConnectionTrait,
{
    let mut items = load_items(db, rows.iter().map(|row| row.id.clone()).collect()).await?;
    rows.into_iter()
        .map(|row| {
            let plan_ids = items.remove(&row.id).unwrap_or_default();
            models::Order::decode(row, plan_ids)
        })
        .collect()
}

/// Retrieves an order by id, returning None if it does not exist.
pub async fn get_order<C>(db: &C, order_id: &str) -> Result<Option<models::Order>>
where
    C: ConnectionTrait,
{
    let Some(row) = Order::find_by_id(order_id.to_string()).one(db).await? else {
        return Ok(None);
    };
    decode_orders(db, vec![row]).await.map(|mut orders| orders.pop())
}

/// Retrieves every order, newest first.
pub async fn list_orders<C>(db: &C) -> Result<Vec<models::Order>>
where
    C: ConnectionTrait,
{
    let rows = Order::find()
        .order_by_desc(order::Column::CreatedAt)
        .order_by_desc(order::Column::Id)
        .all(db)
        .await?;
    decode_orders(db, rows).await
}

/// Retrieves the orders placed by one user, newest first.
pub async fn list_orders_for_user<C>(db: &C, user_id: &str) -> Result<Vec<models::Order>>
where
    C: ConnectionTrait,
{
    let rows = Order::find()
        .filter(order::Column::UserId.eq(user_id))
        .order_by_desc(order::Column::CreatedAt)
        .order_by_desc(order::Column::Id)
        .all(db)
        .await?;
    decode_orders(db, rows).await
}

/// Approves a pending order. Approving an already approved order changes nothing.
///
/// # Errors
/// Returns an error if the order does not exist, its stored status is unreadable, or
/// it is in a state that cannot be approved.
#[instrument(skip(db))]
pub async fn approve_order<C>(db: &C, order_id: &str) -> Result<models::Order>
where
    C: ConnectionTrait,
{
    let result = Order::update_many()
        .col_expr(
            order::Column::Status,
            Expr::value(OrderStatus::Approved.as_str()),
        )
        .filter(order::Column::Id.eq(order_id))
        .filter(order::Column::Status.eq(OrderStatus::Pending.as_str()))
        .exec(db)
        .await?;

    let order = get_order(db, order_id)
        .await?
        .ok_or_else(|| Error::OrderNotFound {
            id: order_id.to_string(),
        })?;

    match order.status {
        OrderStatus::Approved => {
            if result.rows_affected > 0 {
                info!("Order approved");
            }
            Ok(order)
        }
        other => Err(Error::InvalidStatusTransition {
            id: order.id,
            from: other.to_string(),
            to: OrderStatus::Approved.to_string(),
        }),
    }
}

/// Deletes an order and its items.
///
/// The stock consumed by the order is not restored.
///
/// # Errors
/// Returns an error if the order does not exist or the delete fails.
#[instrument(skip(db))]
pub async fn delete_order<C>(db: &C, order_id: &str) -> Result<()>
where
    C: ConnectionTrait + TransactionTrait,
{
    let txn = db.begin().await?;

    OrderItem::delete_many()
        .filter(order_item::Column::OrderId.eq(order_id))
        .exec(&txn)
        .await?;
    let result = Order::delete_by_id(order_id.to_string()).exec(&txn).await?;
    if result.rows_affected == 0 {
        return Err(Error::OrderNotFound {
            id: order_id.to_string(),
        });
    }

    txn.commit().await?;
    warn!("Order deleted; its stock was not returned to the catalog");
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::{core::checkout::checkout, core::plan::get_plan, test_utils::*};
    use sea_orm::Set;

    #[tokio::test]
    async fn test_approve_order_is_idempotent() -> Result<()> {
        let (db, plan) = setup_with_plan().await?;
        let order_id = checkout(&db, "user-1", &[plan.id], 3).await?;

        let first = approve_order(&db, &order_id).await?;
        assert_eq!(first.status, OrderStatus::Approved);

        let second = approve_order(&db, &order_id).await?;
        assert_eq!(second, first);
        Ok(())
    }

    #[tokio::test]
    async fn test_approve_missing_order() -> Result<()> {
        let db = setup_test_db().await?;
        let result = approve_order(&db, "missing").await;
        assert!(matches!(result, Err(Error::OrderNotFound { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_cancelled_order_cannot_be_approved() -> Result<()> {
        let (db, plan) = setup_with_plan().await?;
        let order_id = checkout(&db, "user-1", &[plan.id], 3).await?;
        order::ActiveModel {
            id: Set(order_id.clone()),
            status: Set(OrderStatus::Cancelled.as_str().to_string()),
            ..Default::default()
        }
        .update(&db)
        .await?;

        let result = approve_order(&db, &order_id).await;
        assert!(matches!(result, Err(Error::InvalidStatusTransition { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_miscased_status_is_malformed_not_approvable() -> Result<()> {
        let (db, plan) = setup_with_plan().await?;
        let order_id = checkout(&db, "user-1", &[plan.id], 3).await?;
        order::ActiveModel {
            id: Set(order_id.clone()),
            status: Set("Pending".to_string()),
            ..Default::default()
        }
        .update(&db)
        .await?;

        assert!(matches!(
            get_order(&db, &order_id).await,
            Err(Error::MalformedRecord { collection: "orders", .. })
        ));
        assert!(matches!(
            approve_order(&db, &order_id).await,
            Err(Error::MalformedRecord { .. })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_order_keeps_stock_consumed() -> Result<()> {
        let db = setup_test_db().await?;
        let plan = create_custom_plan(&db, "Plan", 100, 2).await?;
        let order_id = checkout(&db, "user-1", &[plan.id], 3).await?;

        delete_order(&db, &order_id).await?;

        assert!(get_order(&db, &order_id).await?.is_none());
        assert_eq!(get_plan(&db, plan.id).await?.unwrap().stock, 1);

        let again = delete_order(&db, &order_id).await;
        assert!(matches!(again, Err(Error::OrderNotFound { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_list_orders_for_user() -> Result<()> {
        let db = setup_test_db().await?;
        let plan = create_custom_plan(&db, "Plan", 100, 5).await?;
        checkout(&db, "user-1", &[plan.id], 3).await?;
        checkout(&db, "user-2", &[plan.id], 3).await?;
        checkout(&db, "user-1", &[plan.id], 3).await?;

        assert_eq!(list_orders(&db).await?.len(), 3);
        let mine = list_orders_for_user(&db, "user-1").await?;
        assert_eq!(mine.len(), 2);
        assert!(mine.iter().all(|o| o.user_id == "user-1"));
        assert!(mine[0].created_at >= mine[1].created_at);
        Ok(())
    }

    #[tokio::test]
    async fn test_plan_changes_do_not_rewrite_orders() -> Result<()> {
        let (db, plan) = setup_with_plan().await?;
        let order_id = checkout(&db, "user-1", &[plan.id], 3).await?;

        crate::core::plan::delete_plan(&db, plan.id).await?;

        let order = get_order(&db, &order_id).await?.unwrap();
        assert_eq!(order.items, vec![plan.id]);
        assert_eq!(order.total, plan.price);
        Ok(())
    }
}
