//! # Storefront Configuration
//!
//! ## Configuration Sources (Priority Order)
//! 1. Environment variables (`PHARMALINE_*`)
//! 2. Config file (`storefront.toml`)
//! 3. Defaults (this file)
//!
//! Pricing constants (VAT, delivery fee, free-delivery threshold) are not
//! configurable; they live in `pharmaline-core`.
//!
//! ## Example `storefront.toml`
//! ```toml
//! database_path = "/var/lib/pharmaline/storefront.db"
//! cart_storage_key = "pharma-line-cart"
//! currency_symbol = "₱"
//! order_number_attempts = 3
//! log_filter = "info,pharmaline=debug,sqlx=warn"
//! ```

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use pharmaline_core::{Money, CART_STORAGE_KEY};

/// Config file name, looked up in the platform config directory.
pub const CONFIG_FILE_NAME: &str = "storefront.toml";

/// Database file name used when no path is configured.
pub const DATABASE_FILE_NAME: &str = "pharmaline.db";

pub const DEFAULT_ORDER_NUMBER_ATTEMPTS: u32 = 3;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorefrontConfig {
    /// SQLite file. `None` means the platform data directory.
    pub database_path: Option<PathBuf>,

    /// Key the cart is persisted under.
    pub cart_storage_key: String,

    pub currency_symbol: String,

    /// How many order numbers to try before giving up on a collision.
    pub order_number_attempts: u32,

    /// Fallback `EnvFilter` directive when `RUST_LOG` is unset.
    pub log_filter: String,
}

impl Default for StorefrontConfig {
    fn default() -> Self {
        StorefrontConfig {
            database_path: None,
            cart_storage_key: CART_STORAGE_KEY.to_string(),
            currency_symbol: "₱".to_string(),
            order_number_attempts: DEFAULT_ORDER_NUMBER_ATTEMPTS,
            log_filter: "info".to_string(),
        }
    }
}

impl StorefrontConfig {
    /// Defaults, then the TOML file (explicit path or the platform default)
    /// if it exists, then environment overrides.
    pub fn load(config_path: Option<PathBuf>) -> ConfigResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading storefront config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = Self::from_toml_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    pub fn from_toml_str(contents: &str) -> ConfigResult<Self> {
        Ok(toml::from_str(contents)?)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.cart_storage_key.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "cart_storage_key must not be empty".into(),
            ));
        }
        if self.order_number_attempts == 0 {
            return Err(ConfigError::Invalid(
                "order_number_attempts must be greater than 0".into(),
            ));
        }
        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(path) = var("PHARMALINE_DATABASE_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database_path = Some(PathBuf::from(path));
        }

        if let Some(key) = var("PHARMALINE_CART_KEY") {
            self.cart_storage_key = key;
        }

        if let Some(filter) = var("PHARMALINE_LOG") {
            self.log_filter = filter;
        }

        if let Some(attempts) = var("PHARMALINE_ORDER_NUMBER_ATTEMPTS") {
            if let Ok(n) = attempts.parse::<u32>() {
                self.order_number_attempts = n;
            }
        }
    }

    /// `storefront.toml` in the platform config directory.
    pub fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "pharmaline", "storefront")
            .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
    }

    /// Configured database path, or `pharmaline.db` in the platform data
    /// directory (created if missing).
    pub fn resolve_database_path(&self) -> ConfigResult<PathBuf> {
        if let Some(path) = &self.database_path {
            return Ok(path.clone());
        }

        let dirs = directories::ProjectDirs::from("com", "pharmaline", "storefront")
            .ok_or_else(|| ConfigError::Invalid("no home directory for app data".into()))?;
        let data_dir = dirs.data_dir();
        std::fs::create_dir_all(data_dir)?;

        Ok(data_dir.join(DATABASE_FILE_NAME))
    }

    /// `₱1234.50` with the configured symbol.
    pub fn format_currency(&self, amount: Money) -> String {
        let sign = if amount.is_negative() { "-" } else { "" };
        let centavos = amount.centavos().unsigned_abs();
        format!(
            "{}{}{}.{:02}",
            sign,
            self.currency_symbol,
            centavos / 100,
            centavos % 100
        )
    }
}
