//! Checkout - Converts a cart snapshot into an order while consuming inventory.
//!
//! Every attempt runs as one store transaction: each plan is read inside the
//! transaction, validated (on sale, stock left), and decremented with a conditional
//! update guarded by the version read in the same transaction. The order and its items
//! are written before commit, so either all of it lands or none of it does.
//!
//! A conditional update that matches no row means another transaction changed the plan
//! after this one read it. The attempt is rolled back and the whole checkout is retried
//! with fresh reads, up to `max_attempts` times.
//!
//! Clearing the cart happens after commit and is not part of the transaction. When it
//! fails the order still stands and the caller receives
//! [`CheckoutError::PartialSuccessCartNotCleared`].

use crate::{
    core::cart::clear_cart,
    entities::{Plan, order, order_item, plan},
    errors::CheckoutError,
    models::OrderStatus,
};
use chrono::Utc;
use sea_orm::{
    DatabaseTransaction, DbErr, Set, TransactionTrait, prelude::*, sea_query::Expr,
};
use std::collections::HashSet;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

/// Why a single attempt did not commit.
enum AttemptFailure {
    /// Lost a race against another writer; safe to retry from scratch.
    Conflict,
    /// Final for this checkout.
    Abort(CheckoutError),
}

impl From<DbErr> for AttemptFailure {
    fn from(err: DbErr) -> Self {
        if is_lock_contention(&err) {
            Self::Conflict
        } else {
            Self::Abort(CheckoutError::StoreUnavailable(err))
        }
    }
}

impl From<CheckoutError> for AttemptFailure {
    fn from(err: CheckoutError) -> Self {
        Self::Abort(err)
    }
}

/// SQLite reports writer contention as a "database is locked" failure.
fn is_lock_contention(err: &DbErr) -> bool {
    let message = err.to_string();
    message.contains("database is locked") || message.contains("database table is locked")
}

fn validate_request(user_id: &str, plan_ids: &[i64]) -> Result<(), CheckoutError> {
    if user_id.trim().is_empty() {
        return Err(CheckoutError::Validation {
            message: "User id cannot be empty".to_string(),
        });
    }
    if plan_ids.is_empty() {
        return Err(CheckoutError::Validation {
            message: "Nothing to check out".to_string(),
        });
    }
    let mut seen = HashSet::with_capacity(plan_ids.len());
    if let Some(duplicate) = plan_ids.iter().find(|id| !seen.insert(**id)) {
        return Err(CheckoutError::Validation {
            message: format!("Plan {duplicate} appears more than once"),
        });
    }
    Ok(())
}

/// Reads and validates every plan inside `txn`.
async fn read_plans(
    txn: &DatabaseTransaction,
    plan_ids: &[i64],
) -> Result<Vec<plan::Model>, AttemptFailure> {
    let mut plans = Vec::with_capacity(plan_ids.len());
    for &plan_id in plan_ids {
        // A deleted plan reads as having no stock.
        let Some(plan) = Plan::find_by_id(plan_id).one(txn).await? else {
            return Err(CheckoutError::OutOfStock { plan_id }.into());
        };
        if !plan.on_sale {
            return Err(CheckoutError::NotOnSale { plan_id }.into());
        }
        if plan.stock <= 0 {
            return Err(CheckoutError::OutOfStock { plan_id }.into());
        }
        plans.push(plan);
    }
    Ok(plans)
}

/// Runs one transactional attempt and returns the new order id on commit.
async fn attempt_checkout<C>(
    db: &C,
    user_id: &str,
    plan_ids: &[i64],
) -> Result<String, AttemptFailure>
where
    C: ConnectionTrait + TransactionTrait,
{
    let txn = db.begin().await?;

    let plans = read_plans(&txn, plan_ids).await?;
    let total = plans
        .iter()
        .try_fold(0_i64, |acc, plan| acc.checked_add(plan.price))
        .ok_or_else(|| CheckoutError::Validation {
            message: "Order total is too large".to_string(),
        })?;

    let now = Utc::now();
    for plan in &plans {
        let result = Plan::update_many()
            .col_expr(plan::Column::Stock, Expr::col(plan::Column::Stock).sub(1))
            .col_expr(
                plan::Column::Version,
                Expr::col(plan::Column::Version).add(1),
            )
            .col_expr(plan::Column::UpdatedAt, Expr::value(now))
            .filter(plan::Column::Id.eq(plan.id))
            .filter(plan::Column::Version.eq(plan.version))
            .filter(plan::Column::Stock.gt(0))
            .exec(&txn)
            .await?;
        if result.rows_affected == 0 {
            warn!(plan_id = plan.id, "Plan changed during checkout");
            return Err(AttemptFailure::Conflict);
        }
    }

    let order_id = Uuid::new_v4().to_string();
    order::ActiveModel {
        id: Set(order_id.clone()),
        user_id: Set(user_id.to_string()),
        total: Set(total),
        status: Set(OrderStatus::Pending.as_str().to_string()),
        created_at: Set(now),
    }
    .insert(&txn)
    .await?;

    let items = plan_ids
        .iter()
        .zip(0_i32..)
        .map(|(&plan_id, position)| order_item::ActiveModel {
            order_id: Set(order_id.clone()),
            position: Set(position),
            plan_id: Set(plan_id),
        });
    crate::entities::OrderItem::insert_many(items)
        .exec_without_returning(&txn)
        .await?;

    txn.commit().await?;
    Ok(order_id)
}

/// Places an order for `plan_ids` on behalf of `user_id`.
///
/// `plan_ids` is the caller's snapshot of the cart. Stock and sale state are re-read
/// inside the transaction; nothing the caller displayed is trusted. The order stores
/// the ids in the given order and the sum of the prices read at commit time.
///
/// # Arguments
/// * `db` - Store handle; must support transactions
/// * `user_id` - Buyer
/// * `plan_ids` - Plans to buy, each at most once
/// * `max_attempts` - How many times to run the transaction when it loses a race
///   (values below 1 are treated as 1)
///
/// # Returns
/// The id of the new order.
///
/// # Errors
/// - [`CheckoutError::Validation`] for a blank user, an empty list or a repeated id
/// - [`CheckoutError::NotOnSale`] / [`CheckoutError::OutOfStock`] when a plan fails
///   validation; nothing was written
/// - [`CheckoutError::TransactionConflict`] when every attempt lost a race
/// - [`CheckoutError::StoreUnavailable`] for any other store failure
/// - [`CheckoutError::PartialSuccessCartNotCleared`] when the order was committed but
///   the cart could not be emptied
#[instrument(skip(db, plan_ids), fields(items = plan_ids.len()))]
pub async fn checkout<C>(
    db: &C,
    user_id: &str,
    plan_ids: &[i64],
    max_attempts: u32,
) -> Result<String, CheckoutError>
where
    C: ConnectionTrait + TransactionTrait,
{
    validate_request(user_id, plan_ids)?;
    let user_id = user_id.trim();
    let max_attempts = max_attempts.max(1);

    let mut attempt = 0;
    let order_id = loop {
        attempt += 1;
        match attempt_checkout(db, user_id, plan_ids).await {
            Ok(order_id) => break order_id,
            Err(AttemptFailure::Conflict) if attempt < max_attempts => {
                warn!(attempt, "Checkout conflicted, retrying with fresh reads");
            }
            Err(AttemptFailure::Conflict) => {
                warn!(attempt, "Checkout gave up after repeated conflicts");
                return Err(CheckoutError::TransactionConflict { attempts: attempt });
            }
            Err(AttemptFailure::Abort(err)) => {
                warn!(error = %err, "Checkout aborted");
                return Err(err);
            }
        }
    };
    info!(%order_id, attempt, "Order committed");

    if let Err(err) = clear_cart(db, user_id).await {
        error!(%order_id, error = %err, "Order committed but cart was not cleared");
        return Err(CheckoutError::PartialSuccessCartNotCleared {
            order_id,
            reason: err.to_string(),
        });
    }

    Ok(order_id)
}
