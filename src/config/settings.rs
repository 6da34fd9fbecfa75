//! Application settings loaded from config.toml
//!
//! Every section is optional; a missing file or section yields the defaults below.
//! Values are checked after parsing so a zero retry bound or batch size is rejected
//! up front rather than surfacing later as a confusing runtime failure.

use crate::errors::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Default number of checkout attempts before a conflict is surfaced.
pub const DEFAULT_CHECKOUT_ATTEMPTS: u32 = 3;

/// Default number of ids per catalog lookup query.
pub const DEFAULT_LOOKUP_BATCH_SIZE: usize = 10;

/// Structure representing the entire config.toml file
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Checkout transaction tuning
    pub checkout: CheckoutSettings,
    /// Catalog lookup tuning
    pub catalog: CatalogSettings,
    /// Cover image storage
    pub blobs: BlobSettings,
    /// Plans inserted when the catalog is empty
    pub plans: Vec<PlanSeed>,
}

/// `[checkout]` section
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct CheckoutSettings {
    /// Attempts made when concurrent writers invalidate a checkout's reads
    pub max_attempts: u32,
}

impl Default for CheckoutSettings {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_CHECKOUT_ATTEMPTS,
        }
    }
}

/// `[catalog]` section
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct CatalogSettings {
    /// Ids per multi-id lookup; larger sets are paged
    pub lookup_batch_size: usize,
}

impl Default for CatalogSettings {
    fn default() -> Self {
        Self {
            lookup_batch_size: DEFAULT_LOOKUP_BATCH_SIZE,
        }
    }
}

/// `[blobs]` section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BlobSettings {
    /// Directory holding stored objects
    pub root: PathBuf,
    /// URL prefix under which stored objects are served; defaults to a `file://` URL of `root`
    pub public_base_url: Option<String>,
}

impl Default for BlobSettings {
    fn default() -> Self {
        Self {
            root: PathBuf::from("data/blobs"),
            public_base_url: None,
        }
    }
}

impl BlobSettings {
    /// The URL prefix stored objects are reachable under.
    #[must_use]
    pub fn base_url(&self) -> String {
        self.public_base_url
            .clone()
            .unwrap_or_else(|| format!("file://{}", self.root.display()))
    }
}

/// One `[[plans]]` entry
#[derive(Debug, Clone, Deserialize)]
pub struct PlanSeed {
    /// Display name
    pub name: String,
    /// Description
    pub desc: String,
    /// Price in minor currency units
    pub price: i64,
    /// Initial stock
    pub stock: i64,
    /// Whether the plan starts on sale
    #[serde(default = "default_on_sale")]
    pub on_sale: bool,
    /// Cover image URL
    #[serde(default)]
    pub image_url: String,
}

const fn default_on_sale() -> bool {
    true
}

impl AppConfig {
    /// Rejects settings that would make the storefront unusable.
    pub fn validate(&self) -> Result<()> {
        if self.checkout.max_attempts == 0 {
            return Err(Error::Config {
                message: "checkout.max_attempts must be at least 1".to_string(),
            });
        }
        if self.catalog.lookup_batch_size == 0 {
            return Err(Error::Config {
                message: "catalog.lookup_batch_size must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

/// Parses and validates configuration from a TOML string.
pub fn parse_config(contents: &str) -> Result<AppConfig> {
    let config: AppConfig = toml::from_str(contents).map_err(|e| Error::Config {
        message: format!("Failed to parse config.toml: {e}"),
    })?;
    config.validate()?;
    Ok(config)
}

/// Loads configuration from a TOML file, using defaults when the file does not exist.
///
/// # Errors
/// Returns an error if:
/// - The file exists but cannot be read
/// - The TOML syntax is invalid
/// - A value is out of range
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<AppConfig> {
    let path_ref = path.as_ref();
    if !path_ref.exists() {
        info!("No config file at {:?}, using defaults.", path_ref);
        return Ok(AppConfig::default());
    }
    debug!("Loading configuration from {:?}", path_ref);
    let contents = std::fs::read_to_string(path_ref).map_err(|e| Error::Config {
        message: format!("Failed to read config file {}: {e}", path_ref.display()),
    })?;
    parse_config(&contents)
}

/// Loads configuration from the default location (./config.toml)
pub fn load_default_config() -> Result<AppConfig> {
    load_config("config.toml")
}
