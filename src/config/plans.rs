//! Catalog seeding from the `[[plans]]` entries of config.toml
//!
//! Seeding only happens while the catalog is empty, so plans edited or removed by an
//! admin are never resurrected on restart. All entries land in one transaction; a bad
//! entry leaves the catalog empty and the next start seeds again.

use crate::{
    config::settings::PlanSeed,
    core::plan::{create_plan, set_on_sale},
    entities::Plan,
    errors::Result,
    models::NewPlan,
};
use sea_orm::{DatabaseConnection, EntityTrait, PaginatorTrait, TransactionTrait};
use tracing::{debug, info, instrument};

/// Inserts the configured plans into an empty catalog.
///
/// # Returns
/// The number of plans created; zero when the catalog already had plans.
///
/// # Errors
/// Returns an error if a seed entry fails validation or a database operation fails.
/// Nothing is stored in either case.
#[instrument(skip_all, fields(seeds = seeds.len()))]
pub async fn seed_catalog(db: &DatabaseConnection, seeds: &[PlanSeed]) -> Result<usize> {
    let existing = Plan::find().count(db).await?;
    if existing > 0 {
        debug!(existing, "Catalog already populated, skipping seed");
        return Ok(0);
    }

    let txn = db.begin().await?;
    for seed in seeds {
        let plan = create_plan(
            &txn,
            NewPlan {
                name: seed.name.clone(),
                description: seed.desc.clone(),
                price: seed.price,
                stock: seed.stock,
                image_url: seed.image_url.clone(),
            },
        )
        .await?;
        if !seed.on_sale {
            set_on_sale(&txn, plan.id, false).await?;
        }
    }
    txn.commit().await?;

    info!("Seeded {} plans", seeds.len());
    Ok(seeds.len())
}
