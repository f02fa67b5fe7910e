//! Application configuration management.

use rust_decimal::Decimal;
use serde::Deserialize;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Posting engine tuning.
    #[serde(default)]
    pub posting: PostingSettings,
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Database connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

/// Posting engine settings.
#[derive(Debug, Clone, Deserialize)]
pub struct PostingSettings {
    /// Attempts per `post`/`reverse` call when the store reports contention.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Row lock wait before a posting gives up, in milliseconds.
    #[serde(default = "default_lock_timeout_ms")]
    pub lock_timeout_ms: u64,
    /// Maximum number of tenants whose posting configuration is cached.
    #[serde(default = "default_config_cache_capacity")]
    pub config_cache_capacity: u64,
    /// Lifetime of a cached tenant configuration, in seconds.
    #[serde(default = "default_config_cache_ttl_secs")]
    pub config_cache_ttl_secs: u64,
    /// Largest residual a round-off rule may absorb.
    #[serde(default = "default_round_off_tolerance")]
    pub round_off_tolerance: Decimal,
    /// Zero-padding width for voucher types that do not set their own.
    #[serde(default = "default_number_width")]
    pub default_number_width: u32,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_lock_timeout_ms() -> u64 {
    5_000
}

fn default_config_cache_capacity() -> u64 {
    1_000
}

fn default_config_cache_ttl_secs() -> u64 {
    300 // 5 minutes
}

fn default_round_off_tolerance() -> Decimal {
    Decimal::ONE
}

fn default_number_width() -> u32 {
    6
}

impl Default for PostingSettings {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            lock_timeout_ms: default_lock_timeout_ms(),
            config_cache_capacity: default_config_cache_capacity(),
            config_cache_ttl_secs: default_config_cache_ttl_secs(),
            round_off_tolerance: default_round_off_tolerance(),
            default_number_width: default_number_width(),
        }
    }
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// Sources, later ones overriding earlier ones:
    /// `config/default`, `config/{RUN_MODE}`, then `LEDGERPOST__*` variables.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(config::Environment::with_prefix("LEDGERPOST").separator("__"))
            .build()?;

        config.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_posting_settings_defaults() {
        let settings = PostingSettings::default();
        assert_eq!(settings.max_attempts, 3);
        assert_eq!(settings.lock_timeout_ms, 5_000);
        assert_eq!(settings.round_off_tolerance, dec!(1));
        assert_eq!(settings.default_number_width, 6);
    }

    #[test]
    fn test_load_from_environment() {
        temp_env::with_vars(
            [
                ("LEDGERPOST__DATABASE__URL", Some("postgres://localhost/ledger")),
                ("LEDGERPOST__POSTING__MAX_ATTEMPTS", Some("5")),
                ("RUN_MODE", Some("test-nonexistent")),
            ],
            || {
                let config = AppConfig::load().unwrap();
                assert_eq!(config.database.url, "postgres://localhost/ledger");
                assert_eq!(config.database.max_connections, 10);
                assert_eq!(config.posting.max_attempts, 5);
                assert_eq!(config.posting.config_cache_ttl_secs, 300);
            },
        );
    }

    #[test]
    fn test_load_requires_database_url() {
        temp_env::with_vars(
            [
                ("LEDGERPOST__DATABASE__URL", None::<&str>),
                ("RUN_MODE", Some("test-nonexistent")),
            ],
            || {
                assert!(AppConfig::load().is_err());
            },
        );
    }
}
