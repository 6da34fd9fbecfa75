//! Day program business logic - Per-day exercise programs of a plan.
//!
//! A plan declares how many program days it has (`days_count`); each day in
//! `1..=days_count` may hold a saved program. Saving a day replaces it wholesale.

use crate::{
    core::plan::{apply_plan_changes, require_plan_model, require_text},
    entities::{DayProgram, Exercise, day_program, exercise},
    errors::{Error, Result},
    models::{self, Plan},
};
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*, sea_query::Expr};
use tracing::{info, instrument};

/// Title used for a day that has none.
#[must_use]
pub fn default_day_title(day_index: i32) -> String {
    format!("Day {day_index}")
}

fn check_day_in_range(plan: &crate::entities::PlanModel, day_index: i32) -> Result<()> {
    if day_index < 1 || i64::from(day_index) > plan.days_count {
        return Err(Error::Validation {
            message: format!(
                "Day {day_index} is outside plan {} which has {} days",
                plan.id, plan.days_count
            ),
        });
    }
    Ok(())
}

fn is_count(value: &str) -> bool {
    value.is_empty() || value.bytes().all(|b| b.is_ascii_digit())
}

fn normalize_exercise(index: usize, exercise: models::Exercise) -> Result<models::Exercise> {
    let name = require_text(&format!("Exercise {} name", index + 1), &exercise.name)?;
    let sets = exercise.sets.trim().to_string();
    let reps = exercise.reps.trim().to_string();
    if !is_count(&sets) || !is_count(&reps) {
        return Err(Error::Validation {
            message: format!("Sets and reps of {name} must be whole numbers"),
        });
    }
    let note = exercise
        .note
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty());
    Ok(models::Exercise {
        name,
        sets,
        reps,
        note,
    })
}

/// Sets how many program days a plan has.
///
/// # Errors
/// Returns an error if `days` is below 1 or the plan does not exist.
#[instrument(skip(db))]
pub async fn set_days_count(db: &DatabaseConnection, plan_id: i64, days: i64) -> Result<Plan> {
    if days < 1 {
        return Err(Error::Validation {
            message: "A plan needs at least one program day".to_string(),
        });
    }
    apply_plan_changes(
        db,
        plan_id,
        vec![(crate::entities::PlanColumn::DaysCount, Expr::value(days))],
    )
    .await
}

/// Saves the program for one day, replacing whatever was stored for it.
///
/// A blank title falls back to [`default_day_title`]. Exercise names must not be blank
/// and sets/reps, when given, must be whole numbers.
///
/// # Errors
/// Returns an error if:
/// - An exercise is invalid
/// - The plan does not exist
/// - `day_index` is outside `1..=days_count`
/// - The database write fails
#[instrument(skip(db, title, exercises), fields(exercise_count = exercises.len()))]
pub async fn save_day_program(
    db: &DatabaseConnection,
    plan_id: i64,
    day_index: i32,
    title: &str,
    exercises: Vec<models::Exercise>,
) -> Result<models::DayProgram> {
    let exercises = exercises
        .into_iter()
        .enumerate()
        .map(|(index, exercise)| normalize_exercise(index, exercise))
        .collect::<Result<Vec<_>>>()?;
    let title = match title.trim() {
        "" => default_day_title(day_index),
        trimmed => trimmed.to_string(),
    };

    let txn = db.begin().await?;

    let plan = require_plan_model(&txn, plan_id).await?;
    check_day_in_range(&plan, day_index)?;

    Exercise::delete_many()
        .filter(exercise::Column::PlanId.eq(plan_id))
        .filter(exercise::Column::DayIndex.eq(day_index))
        .exec(&txn)
        .await?;
    DayProgram::delete_by_id((plan_id, day_index))
        .exec(&txn)
        .await?;

    day_program::ActiveModel {
        plan_id: Set(plan_id),
        day_index: Set(day_index),
        title: Set(title.clone()),
    }
    .insert(&txn)
    .await?;

    if !exercises.is_empty() {
        let rows = exercises
            .iter()
            .zip(0_i32..)
            .map(|(exercise, position)| exercise::ActiveModel {
                plan_id: Set(plan_id),
                day_index: Set(day_index),
                position: Set(position),
                name: Set(exercise.name.clone()),
                sets: Set(exercise.sets.clone()),
                reps: Set(exercise.reps.clone()),
                note: Set(exercise.note.clone()),
                ..Default::default()
            });
        Exercise::insert_many(rows).exec_without_returning(&txn).await?;
    }

    txn.commit().await?;
    info!(plan_id, day_index, "Day program saved");

    Ok(models::DayProgram {
        plan_id,
        day_index,
        title,
        exercises,
    })
}

/// Loads the program for one day. A day that was never saved comes back with the
/// default title and no exercises.
///
/// # Errors
/// Returns an error if the plan does not exist or `day_index` is out of range.
pub async fn get_day_program(
    db: &DatabaseConnection,
    plan_id: i64,
    day_index: i32,
) -> Result<models::DayProgram> {
    let plan = require_plan_model(db, plan_id).await?;
    check_day_in_range(&plan, day_index)?;

    let title = DayProgram::find_by_id((plan_id, day_index))
        .one(db)
        .await?
        .map_or_else(|| default_day_title(day_index), |day| day.title);

    let exercises = Exercise::find()
        .filter(exercise::Column::PlanId.eq(plan_id))
        .filter(exercise::Column::DayIndex.eq(day_index))
        .order_by_asc(exercise::Column::Position)
        .all(db)
        .await?
        .into_iter()
        .map(|row| models::Exercise {
            name: row.name,
            sets: row.sets,
            reps: row.reps,
            note: row.note,
        })
        .collect();

    Ok(models::DayProgram {
        plan_id,
        day_index,
        title,
        exercises,
    })
}

/// Loads every day of a plan's program, in day order.
pub async fn list_day_programs(
    db: &DatabaseConnection,
    plan_id: i64,
) -> Result<Vec<models::DayProgram>> {
    let plan = require_plan_model(db, plan_id).await?;
    let days = i32::try_from(plan.days_count).map_err(|_| Error::MalformedRecord {
        collection: "plans",
        id: plan_id.to_string(),
        reason: format!("days_count {} out of range", plan.days_count),
    })?;

    let mut programs = Vec::with_capacity(usize::try_from(days).unwrap_or_default());
    for day_index in 1..=days {
        programs.push(get_day_program(db, plan_id, day_index).await?);
    }
    Ok(programs)
}
