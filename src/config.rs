//! Configuration Module
//!
//! Handles loading and managing server configuration from environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::cache::CacheConfig;
use crate::store::StoreOptions;

/// Server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Seconds an entry lives after its last read
    pub entry_expiration: u64,
    /// Seconds between refresh notifications for one entry
    pub refresh_interval: u64,
    /// HTTP server port
    pub server_port: u16,
    /// Base URL of the JSON origin topics are fetched from
    pub origin_url: String,
    /// Listing pages to fetch on start (0 disables warm-up)
    pub warm_up_pages: usize,
    /// Capacity of the store error stream
    pub error_buffer: usize,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `ENTRY_EXPIRATION` - Entry time-to-live in seconds (default: 86400)
    /// - `REFRESH_INTERVAL` - Refresh interval in seconds (default: 30)
    /// - `SERVER_PORT` - HTTP server port (default: 8001)
    /// - `ORIGIN_URL` - Origin base URL (default: http://127.0.0.1:9000)
    /// - `WARM_UP_PAGES` - Pages fetched on start (default: 0)
    /// - `ERROR_BUFFER` - Store error stream capacity (default: 16)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            entry_expiration: env_or("ENTRY_EXPIRATION", defaults.entry_expiration),
            refresh_interval: env_or("REFRESH_INTERVAL", defaults.refresh_interval),
            server_port: env_or("SERVER_PORT", defaults.server_port),
            origin_url: env::var("ORIGIN_URL").unwrap_or(defaults.origin_url),
            warm_up_pages: env_or("WARM_UP_PAGES", defaults.warm_up_pages),
            error_buffer: env_or("ERROR_BUFFER", defaults.error_buffer).max(1),
        }
    }

    /// Cache settings derived from this configuration.
    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig::new(
            Duration::from_secs(self.entry_expiration),
            Duration::from_secs(self.refresh_interval),
        )
    }

    /// Store start-up options derived from this configuration.
    pub fn store_options(&self) -> StoreOptions {
        StoreOptions {
            warm_up_pages: self.warm_up_pages,
            error_buffer: self.error_buffer,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            entry_expiration: 24 * 60 * 60,
            refresh_interval: 30,
            server_port: 8001,
            origin_url: "http://127.0.0.1:9000".to_string(),
            warm_up_pages: 0,
            error_buffer: 16,
        }
    }
}

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
