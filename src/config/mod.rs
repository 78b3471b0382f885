//! Configuration management for the spread monitor
//!
//! Loads from YAML/TOML files + environment variables via .env

mod types;

pub use types::*;

use anyhow::{bail, Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub upstream: UpstreamConfig,
    pub store: StoreConfig,
    pub pairing: PairingConfig,
    pub query: QueryConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpstreamConfig {
    /// Pulse aggregator endpoint
    pub url: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Poll interval in milliseconds
    pub poll_interval_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// Mid-price samples kept per (instrument, exchange)
    pub price_capacity: usize,
    /// Funding samples kept per (instrument, exchange); longer horizon than prices
    pub funding_capacity: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PairingConfig {
    /// Preferred first leg when it reports the instrument
    pub primary: String,
    /// Preferred second leg
    pub secondary: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QueryConfig {
    /// Rolling window used when a request omits `window`
    pub default_window: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Directory served for `/` and other non-API paths
    pub static_dir: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl AppConfig {
    /// Load configuration from file and environment
    pub fn load() -> Result<Self> {
        // Load .env file first
        dotenvy::dotenv().ok();

        let config = Self::builder()?
            // Load config file if exists
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            // Override with environment variables (PULSE__*)
            .add_source(Environment::with_prefix("PULSE").separator("__"))
            .build()
            .context("Failed to build configuration")?;

        let app_config: AppConfig = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        app_config.validate()?;
        Ok(app_config)
    }

    /// Built-in defaults only
    pub fn defaults() -> Result<Self> {
        Self::builder()?
            .build()
            .context("Failed to build configuration")?
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    fn builder() -> Result<config::ConfigBuilder<config::builder::DefaultState>> {
        let builder = Config::builder()
            // Upstream defaults
            .set_default("upstream.url", DEFAULT_UPSTREAM_URL)?
            .set_default("upstream.timeout_secs", 10)?
            .set_default("upstream.poll_interval_ms", 1000)?
            // Store defaults: ~1h of prices, ~4h of funding at 1 Hz
            .set_default("store.price_capacity", DEFAULT_PRICE_CAPACITY as i64)?
            .set_default("store.funding_capacity", DEFAULT_FUNDING_CAPACITY as i64)?
            // Pairing defaults
            .set_default("pairing.primary", DEFAULT_PRIMARY)?
            .set_default("pairing.secondary", DEFAULT_SECONDARY)?
            // Query defaults
            .set_default("query.default_window", DEFAULT_WINDOW as i64)?
            // Server defaults
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8000)?
            .set_default("server.static_dir", "static")?
            // Logging defaults
            .set_default("logging.json", false)?;
        Ok(builder)
    }

    /// Reject settings that would break store or poller invariants
    pub fn validate(&self) -> Result<()> {
        if self.upstream.url.trim().is_empty() {
            bail!("upstream.url must not be empty");
        }
        if self.upstream.timeout_secs == 0 {
            bail!("upstream.timeout_secs must be positive");
        }
        if self.upstream.poll_interval_ms == 0 {
            bail!("upstream.poll_interval_ms must be positive");
        }
        if self.store.price_capacity == 0 {
            bail!("store.price_capacity must be positive");
        }
        if self.store.funding_capacity <= self.store.price_capacity {
            bail!(
                "store.funding_capacity ({}) must exceed store.price_capacity ({})",
                self.store.funding_capacity,
                self.store.price_capacity
            );
        }
        if self.pairing.primary.eq_ignore_ascii_case(&self.pairing.secondary) {
            bail!("pairing.primary and pairing.secondary must differ");
        }
        if !(1..=MAX_WINDOW).contains(&self.query.default_window) {
            bail!("query.default_window must be between 1 and {}", MAX_WINDOW);
        }
        Ok(())
    }

    /// Generate a digest of the config for logging
    pub fn digest(&self) -> String {
        format!(
            "upstream={} poll_ms={} capacities={}/{} pair={}/{} window={} bind={}:{}",
            self.upstream.url,
            self.upstream.poll_interval_ms,
            self.store.price_capacity,
            self.store.funding_capacity,
            self.pairing.primary,
            self.pairing.secondary,
            self.query.default_window,
            self.server.host,
            self.server.port
        )
    }
}

impl std::fmt::Display for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.digest())
    }
}
