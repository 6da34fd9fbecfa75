/// Database configuration and connection management
pub mod database;

/// Catalog seeding from config.toml
pub mod plans;

/// Application settings loaded from config.toml
pub mod settings;

/// Admin role assignment from environment variables
pub mod users;
