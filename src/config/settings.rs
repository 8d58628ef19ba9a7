//! Application settings management
//!
//! This module defines the configuration structure and provides methods
//! for loading settings from TOML files and environment variables.

use std::time::Duration;
use serde::{Deserialize, Serialize};

/// Main application configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Settings {
    pub bot: BotConfig,
    pub database: DatabaseConfig,
    pub access: AccessConfig,
    pub catalog: CatalogConfig,
    pub scheduler: SchedulerConfig,
    pub broadcast: BroadcastConfig,
    pub logging: LoggingConfig,
}

/// Telegram bot configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BotConfig {
    pub token: String,
    pub webhook_url: Option<String>,
    /// Admins inserted into the admin set at startup
    #[serde(default)]
    pub admin_ids: Vec<i64>,
}

/// Database configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    /// PostgreSQL url, or `memory://` for the in-process store
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout_seconds: u64,
}

impl DatabaseConfig {
    pub fn is_memory(&self) -> bool {
        self.url.starts_with("memory://")
    }
}

/// Access control configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AccessConfig {
    pub super_admin_id: i64,
    /// Denied admin attempts before a user is blocked; `None` disables counting
    pub auto_block_threshold: Option<u32>,
    /// Whether movie lookups need a paid subscription
    pub require_subscription: bool,
    pub membership_timeout_ms: u64,
    /// Inactivity after which the sweep blocks a user
    pub inactivity_days: Option<u32>,
}

impl AccessConfig {
    pub fn membership_timeout(&self) -> Duration {
        Duration::from_millis(self.membership_timeout_ms)
    }
}

/// Movie code allocation scheme
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CodeStrategy {
    /// Smallest positive integer not used by any row; hard-deleted codes are reused
    SmallestUnused,
    /// Random uppercase alphanumeric token; codes are never reissued in practice
    RandomToken,
}

/// Movie catalog configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CatalogConfig {
    pub code_strategy: CodeStrategy,
    pub token_length: usize,
    pub max_allocation_attempts: u32,
    pub search_limit: usize,
}

/// Periodic job configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SchedulerConfig {
    pub sweep_interval_minutes: u64,
    /// How often due ads are looked up; zero disables ad delivery
    pub ad_poll_seconds: u64,
    /// Gap between two deliveries of a repeating ad
    pub ad_repeat_interval_hours: u64,
}

impl SchedulerConfig {
    pub fn ad_repeat_interval(&self) -> chrono::Duration {
        chrono::Duration::hours(self.ad_repeat_interval_hours.min(i32::MAX as u64) as i64)
    }
}

/// Broadcast pacing
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BroadcastConfig {
    pub messages_per_second: u32,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    pub level: String,
    pub directory: String,
    pub file_prefix: String,
    /// Write the log file as JSON lines
    pub json: bool,
}

impl Settings {
    /// Load settings from configuration file and environment variables
    pub fn new() -> Result<Self, config::ConfigError> {
        let defaults = config::Config::try_from(&Settings::default())?;

        let settings = config::Config::builder()
            .add_source(defaults)
            .add_source(config::File::with_name("config").required(false))
            .add_source(
                config::Environment::with_prefix("KINOBOT")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("bot.admin_ids")
                    .try_parsing(true),
            )
            .build()?;

        settings.try_deserialize()
    }

    /// Validate configuration settings
    pub fn validate(&self) -> Result<(), crate::utils::errors::KinoBotError> {
        super::validation::validate_settings(self)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bot: BotConfig {
                token: String::new(),
                webhook_url: None,
                admin_ids: vec![],
            },
            database: DatabaseConfig {
                url: "postgresql://localhost/kinobot".to_string(),
                max_connections: 10,
                min_connections: 1,
                acquire_timeout_seconds: 30,
            },
            access: AccessConfig {
                super_admin_id: 0,
                auto_block_threshold: Some(3),
                require_subscription: true,
                membership_timeout_ms: 3000,
                inactivity_days: None,
            },
            catalog: CatalogConfig {
                code_strategy: CodeStrategy::SmallestUnused,
                token_length: 6,
                max_allocation_attempts: 8,
                search_limit: 10,
            },
            scheduler: SchedulerConfig {
                sweep_interval_minutes: 60,
                ad_poll_seconds: 60,
                ad_repeat_interval_hours: 24,
            },
            broadcast: BroadcastConfig {
                messages_per_second: 20,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                directory: "logs".to_string(),
                file_prefix: "kinobot.log".to_string(),
                json: false,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_strategy_serde_names() {
        let parsed: CodeStrategy = serde_json::from_str("\"random_token\"").unwrap();
        assert_eq!(parsed, CodeStrategy::RandomToken);
        assert_eq!(
            serde_json::to_string(&CodeStrategy::SmallestUnused).unwrap(),
            "\"smallest_unused\""
        );
    }

    #[test]
    fn test_memory_url_detection() {
        let mut settings = Settings::default();
        assert!(!settings.database.is_memory());
        settings.database.url = "memory://".to_string();
        assert!(settings.database.is_memory());
    }
}
