//! Catalog join - Resolves cart ids into plans for display.
//!
//! Lookups are issued as multi-id queries of at most `batch_size` ids each; larger id
//! sets are paged transparently so no id is ever dropped. Totals computed here use
//! the current catalog price and are informational only: checkout recomputes the
//! total from its own transactional reads.

use crate::{
    core::cart::cart_plan_ids,
    entities::{Plan, plan},
    errors::{Error, Result},
    models,
};
use sea_orm::prelude::*;
use serde::Serialize;
use std::collections::HashMap;
use tracing::debug;

/// Looks up many plans by id.
///
/// The result follows the order of `ids`, skips ids with no plan, and lists a repeated
/// id once.
///
/// # Errors
/// Returns an error if `batch_size` is zero, a query fails, or a stored plan is
/// malformed.
pub async fn resolve_plans<C>(db: &C, ids: &[i64], batch_size: usize) -> Result<Vec<models::Plan>>
where
    C: ConnectionTrait,
{
    if batch_size == 0 {
        return Err(Error::Validation {
            message: "Lookup batch size must be at least 1".to_string(),
        });
    }

    let mut found = HashMap::with_capacity(ids.len());
    for chunk in ids.chunks(batch_size) {
        debug!(batch = chunk.len(), "Resolving plan batch");
        let rows = Plan::find()
            .filter(plan::Column::Id.is_in(chunk.iter().copied()))
            .all(db)
            .await?;
        for row in rows {
            let decoded = models::Plan::try_from(row)?;
            found.insert(decoded.id, decoded);
        }
    }

    Ok(ids.iter().filter_map(|id| found.remove(id)).collect())
}

/// Sums plan prices.
///
/// # Errors
/// Returns [`Error::Validation`] if the sum does not fit in an `i64`.
pub fn total_price(plans: &[models::Plan]) -> Result<i64> {
    plans
        .iter()
        .try_fold(0_i64, |acc, plan| acc.checked_add(plan.price))
        .ok_or_else(|| Error::Validation {
            message: "Cart total is too large".to_string(),
        })
}

/// A cart joined with the current catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartView {
    /// Ids held in the cart
    pub plan_ids: Vec<i64>,
    /// Resolved plans, in cart order
    pub plans: Vec<models::Plan>,
    /// Sum of current prices
    pub total: i64,
    /// Plans without stock
    pub out_of_stock: Vec<i64>,
    /// Plans closed for sale
    pub not_on_sale: Vec<i64>,
    /// Ids with no plan in the catalog
    pub missing: Vec<i64>,
}

impl CartView {
    /// Builds the view from the cart ids and the plans resolved for them.
    pub fn new(plan_ids: Vec<i64>, plans: Vec<models::Plan>) -> Result<Self> {
        let total = total_price(&plans)?;
        let out_of_stock = plans.iter().filter(|p| p.stock <= 0).map(|p| p.id).collect();
        let not_on_sale = plans.iter().filter(|p| !p.on_sale).map(|p| p.id).collect();
        let missing = plan_ids
            .iter()
            .copied()
            .filter(|id| !plans.iter().any(|p| p.id == *id))
            .collect();
        Ok(Self {
            plan_ids,
            plans,
            total,
            out_of_stock,
            not_on_sale,
            missing,
        })
    }

    /// Whether the cart holds anything.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.plan_ids.is_empty()
    }

    /// Whether a checkout would currently pass validation, judged from this snapshot.
    #[must_use]
    pub fn can_order(&self) -> bool {
        !self.plans.is_empty()
            && self.missing.is_empty()
            && self.plans.iter().all(models::Plan::is_purchasable)
    }
}

/// Loads a user's cart joined with the catalog.
pub async fn cart_view<C>(db: &C, user_id: &str, batch_size: usize) -> Result<CartView>
where
    C: ConnectionTrait,
{
    let ids = cart_plan_ids(db, user_id).await?;
    let plans = resolve_plans(db, &ids, batch_size).await?;
    CartView::new(ids, plans)
}
