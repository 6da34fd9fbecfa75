//! Shared test utilities.
//!
//! This module provides common helper functions for setting up test databases
//! and creating test entities with sensible defaults.

use crate::{core::plan, errors::Result, models};
use sea_orm::DatabaseConnection;
use std::path::Path;

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Creates a file-backed `SQLite` database at `path` with all tables initialized.
///
/// Unlike the in-memory setup this uses a real connection pool, so concurrent
/// transactions actually overlap.
pub async fn setup_file_db(path: &Path) -> Result<DatabaseConnection> {
    let url = format!("sqlite://{}?mode=rwc", path.display());
    let db = sea_orm::Database::connect(url).await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Creates a test plan with sensible defaults.
///
/// # Defaults
/// * `description`: `"Test plan"`
/// * `price`: 1000
/// * `stock`: 10
pub async fn create_test_plan(db: &DatabaseConnection, name: &str) -> Result<models::Plan> {
    create_custom_plan(db, name, 1000, 10).await
}

/// Creates a test plan with custom price and stock.
pub async fn create_custom_plan(
    db: &DatabaseConnection,
    name: &str,
    price: i64,
    stock: i64,
) -> Result<models::Plan> {
    plan::create_plan(
        db,
        models::NewPlan {
            name: name.to_string(),
            description: "Test plan".to_string(),
            price,
            stock,
            image_url: String::new(),
        },
    )
    .await
}

/// Sets up a complete test environment with one plan.
/// Returns (db, plan) for common test scenarios.
pub async fn setup_with_plan() -> Result<(DatabaseConnection, models::Plan)> {
    let db = setup_test_db().await?;
    let plan = create_test_plan(&db, "Test Plan").await?;
    Ok((db, plan))
}
