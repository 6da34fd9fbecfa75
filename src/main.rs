use dotenvy::dotenv;
use fitlife_store::{
    config::{
        database::{create_connection, create_tables},
        plans::seed_catalog,
        settings::load_default_config,
        users::{admin_user_ids, promote_admins},
    },
    core::plan::list_plans_for_sale,
    errors::Result,
    storefront::Storefront,
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file; env vars may also be set externally
    dotenv().ok();

    // 3. Load the application configuration
    let app_config = load_default_config()
        .inspect_err(|e| error!("Failed to load configuration: {}", e))?;

    // 4. Connect and make sure the schema exists
    if std::env::var("DATABASE_URL").is_err() {
        tokio::fs::create_dir_all("data").await?;
    }
    let db = create_connection()
        .await
        .inspect_err(|e| error!("Failed to connect to database: {}", e))?;
    create_tables(&db)
        .await
        .inspect(|()| info!("Database schema ready."))
        .inspect_err(|e| error!("Failed to create tables: {}", e))?;

    // 5. Seed the catalog and admin roles
    seed_catalog(&db, &app_config.plans)
        .await
        .inspect_err(|e| error!("Failed to seed catalog: {}", e))?;
    promote_admins(&db, &admin_user_ids())
        .await
        .inspect_err(|e| error!("Failed to promote admins: {}", e))?;

    let storefront = Storefront::new(db, &app_config);
    let for_sale = list_plans_for_sale(storefront.database()).await?;
    info!(
        plans_for_sale = for_sale.len(),
        max_attempts = app_config.checkout.max_attempts,
        covers = %app_config.blobs.base_url(),
        "Storefront ready"
    );

    Ok(())
}
