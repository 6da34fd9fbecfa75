//! Plan business logic - Handles catalog administration.
//!
//! This module provides functions for creating, retrieving, updating and deleting plans.
//! Every write bumps the plan's `version` so a checkout that read the plan earlier
//! notices the change and re-reads. Stock is never decremented here; only checkout does
//! that.

use crate::{
    entities::{DayProgram, Exercise, Plan, day_program, exercise, plan},
    errors::{Error, Result},
    models::{self, NewPlan, PlanUpdate},
};
use chrono::Utc;
use sea_orm::{
    QueryOrder, Set, TransactionTrait,
    prelude::*,
    sea_query::{Expr, SimpleExpr},
};
use tracing::{info, instrument};

/// Trims `value` and rejects it when nothing is left.
pub(crate) fn require_text(field: &str, value: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(Error::Validation {
            message: format!("{field} cannot be empty"),
        });
    }
    Ok(trimmed.to_string())
}

fn require_non_negative(field: &str, value: i64) -> Result<i64> {
    if value < 0 {
        return Err(Error::Validation {
            message: format!("{field} cannot be negative (got {value})"),
        });
    }
    Ok(value)
}

/// Loads the raw plan row, failing with [`Error::PlanNotFound`] when it is absent.
pub(crate) async fn require_plan_model<C>(db: &C, plan_id: i64) -> Result<plan::Model>
where
    C: ConnectionTrait,
{
    Plan::find_by_id(plan_id)
        .one(db)
        .await?
        .ok_or(Error::PlanNotFound { id: plan_id })
}

/// Applies column changes to a plan, bumping its version and modification time.
pub(crate) async fn apply_plan_changes<C>(
    db: &C,
    plan_id: i64,
    changes: Vec<(plan::Column, SimpleExpr)>,
) -> Result<models::Plan>
where
    C: ConnectionTrait,
{
    let mut update = Plan::update_many()
        .col_expr(
            plan::Column::Version,
            Expr::col(plan::Column::Version).add(1),
        )
        .col_expr(plan::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(plan::Column::Id.eq(plan_id));
    for (column, value) in changes {
        update = update.col_expr(column, value);
    }

    let result = update.exec(db).await?;
    if result.rows_affected == 0 {
        return Err(Error::PlanNotFound { id: plan_id });
    }

    models::Plan::try_from(require_plan_model(db, plan_id).await?)
}

/// Creates a new plan, on sale and with no program days yet.
///
/// # Errors
/// Returns an error if:
/// - The name or description is empty or whitespace-only
/// - The price or stock is negative
/// - The database insert operation fails
#[instrument(skip(db, new_plan), fields(name = %new_plan.name))]
pub async fn create_plan<C>(db: &C, new_plan: NewPlan) -> Result<models::Plan>
where
    C: ConnectionTrait,
{
    let name = require_text("Plan name", &new_plan.name)?;
    let description = require_text("Plan description", &new_plan.description)?;
    let price = require_non_negative("Price", new_plan.price)?;
    let stock = require_non_negative("Stock", new_plan.stock)?;

    let now = Utc::now();
    let plan = plan::ActiveModel {
        name: Set(name),
        description: Set(description),
        price: Set(price),
        stock: Set(stock),
        on_sale: Set(true),
        image_url: Set(new_plan.image_url.trim().to_string()),
        days_count: Set(0),
        version: Set(0),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    let created = plan.insert(db).await?;
    info!(plan_id = created.id, "Plan created");
    models::Plan::try_from(created)
}

/// Retrieves a plan by id, returning None if it does not exist.
pub async fn get_plan(db: &DatabaseConnection, plan_id: i64) -> Result<Option<models::Plan>> {
    Plan::find_by_id(plan_id)
        .one(db)
        .await?
        .map(models::Plan::try_from)
        .transpose()
}

/// Retrieves every plan in the catalog, ordered by id.
pub async fn list_plans(db: &DatabaseConnection) -> Result<Vec<models::Plan>> {
    Plan::find()
        .order_by_asc(plan::Column::Id)
        .all(db)
        .await?
        .into_iter()
        .map(models::Plan::try_from)
        .collect()
}

/// Retrieves the plans currently on sale, ordered by id.
///
/// Plans without stock are still listed so buyers can see them as sold out.
pub async fn list_plans_for_sale(db: &DatabaseConnection) -> Result<Vec<models::Plan>> {
    Plan::find()
        .filter(plan::Column::OnSale.eq(true))
        .order_by_asc(plan::Column::Id)
        .all(db)
        .await?
        .into_iter()
        .map(models::Plan::try_from)
        .collect()
}

/// Updates the editable attributes of a plan. Fields left as `None` are untouched.
///
/// # Errors
/// Returns an error if a provided text field is blank, a provided number is negative,
/// or the plan does not exist.
#[instrument(skip(db, update))]
pub async fn update_plan(
    db: &DatabaseConnection,
    plan_id: i64,
    update: PlanUpdate,
) -> Result<models::Plan> {
    let mut changes = Vec::new();
    if let Some(name) = update.name {
        changes.push((
            plan::Column::Name,
            Expr::value(require_text("Plan name", &name)?),
        ));
    }
    if let Some(description) = update.description {
        changes.push((
            plan::Column::Description,
            Expr::value(require_text("Plan description", &description)?),
        ));
    }
    if let Some(price) = update.price {
        changes.push((
            plan::Column::Price,
            Expr::value(require_non_negative("Price", price)?),
        ));
    }
    if let Some(stock) = update.stock {
        changes.push((
            plan::Column::Stock,
            Expr::value(require_non_negative("Stock", stock)?),
        ));
    }

    let updated = apply_plan_changes(db, plan_id, changes).await?;
    info!(plan_id, "Plan updated");
    Ok(updated)
}

/// Opens or closes a plan for sale.
#[instrument(skip(db))]
pub async fn set_on_sale<C>(db: &C, plan_id: i64, on_sale: bool) -> Result<models::Plan>
where
    C: ConnectionTrait,
{
    apply_plan_changes(
        db,
        plan_id,
        vec![(plan::Column::OnSale, Expr::value(on_sale))],
    )
    .await
}

/// Replaces the cover image URL of a plan; an empty string removes the cover.
pub async fn set_image_url(
    db: &DatabaseConnection,
    plan_id: i64,
    image_url: &str,
) -> Result<models::Plan> {
    apply_plan_changes(
        db,
        plan_id,
        vec![(plan::Column::ImageUrl, Expr::value(image_url.trim()))],
    )
    .await
}

/// Permanently deletes a plan together with its day programs.
///
/// Orders that bought the plan keep their copied ids and totals. Carts still holding the
/// id are left alone; checkout rejects the missing plan.
///
/// # Errors
/// Returns an error if the plan does not exist or the database delete fails.
#[instrument(skip(db))]
pub async fn delete_plan(db: &DatabaseConnection, plan_id: i64) -> Result<()> {
    let txn = db.begin().await?;

    Exercise::delete_many()
        .filter(exercise::Column::PlanId.eq(plan_id))
        .exec(&txn)
        .await?;
    DayProgram::delete_many()
        .filter(day_program::Column::PlanId.eq(plan_id))
        .exec(&txn)
        .await?;
    let result = Plan::delete_by_id(plan_id).exec(&txn).await?;
    if result.rows_affected == 0 {
        return Err(Error::PlanNotFound { id: plan_id });
    }

    txn.commit().await?;
    info!(plan_id, "Plan deleted");
    Ok(())
}
