//! Configuration validation module
//!
//! This module provides validation functions for application configuration
//! to ensure all required settings are properly configured.

use crate::utils::errors::{KinoBotError, Result};
use super::Settings;

/// Validate all configuration settings
pub fn validate_settings(settings: &Settings) -> Result<()> {
    validate_bot_config(&settings.bot)?;
    validate_database_config(&settings.database)?;
    validate_access_config(&settings.access)?;
    validate_catalog_config(&settings.catalog)?;
    validate_scheduler_config(&settings.scheduler)?;
    validate_broadcast_config(&settings.broadcast)?;
    validate_logging_config(&settings.logging)?;

    Ok(())
}

/// Validate bot configuration
fn validate_bot_config(config: &super::BotConfig) -> Result<()> {
    if config.token.is_empty() {
        return Err(KinoBotError::Config(
            "Bot token is required".to_string()
        ));
    }

    Ok(())
}

/// Validate database configuration
fn validate_database_config(config: &super::DatabaseConfig) -> Result<()> {
    if config.url.is_empty() {
        return Err(KinoBotError::Config(
            "Database URL is required".to_string()
        ));
    }

    if config.max_connections == 0 {
        return Err(KinoBotError::Config(
            "Max connections must be greater than 0".to_string()
        ));
    }

    if config.min_connections > config.max_connections {
        return Err(KinoBotError::Config(
            "Min connections cannot be greater than max connections".to_string()
        ));
    }

    Ok(())
}

/// Validate access control configuration
fn validate_access_config(config: &super::AccessConfig) -> Result<()> {
    if config.super_admin_id == 0 {
        return Err(KinoBotError::Config(
            "Super admin ID is required".to_string()
        ));
    }

    if config.auto_block_threshold == Some(0) {
        return Err(KinoBotError::Config(
            "Auto-block threshold must be greater than 0 when set".to_string()
        ));
    }

    if config.membership_timeout_ms == 0 {
        return Err(KinoBotError::Config(
            "Membership check timeout must be greater than 0".to_string()
        ));
    }

    Ok(())
}

/// Validate catalog configuration
fn validate_catalog_config(config: &super::CatalogConfig) -> Result<()> {
    if config.token_length < 4 {
        return Err(KinoBotError::Config(
            "Random token length must be at least 4".to_string()
        ));
    }

    if config.max_allocation_attempts == 0 {
        return Err(KinoBotError::Config(
            "Max allocation attempts must be greater than 0".to_string()
        ));
    }

    if config.search_limit == 0 {
        return Err(KinoBotError::Config(
            "Search limit must be greater than 0".to_string()
        ));
    }

    Ok(())
}

/// Validate scheduler configuration
fn validate_scheduler_config(config: &super::SchedulerConfig) -> Result<()> {
    if config.ad_repeat_interval_hours == 0 {
        return Err(KinoBotError::Config(
            "Ad repeat interval must be greater than 0".to_string()
        ));
    }

    Ok(())
}

/// Validate broadcast configuration
fn validate_broadcast_config(config: &super::BroadcastConfig) -> Result<()> {
    if config.messages_per_second == 0 {
        return Err(KinoBotError::Config(
            "Broadcast rate must be greater than 0".to_string()
        ));
    }

    Ok(())
}

/// Validate logging configuration
fn validate_logging_config(config: &super::LoggingConfig) -> Result<()> {
    if config.level.is_empty() {
        return Err(KinoBotError::Config(
            "Log level is required".to_string()
        ));
    }

    let valid_levels = ["trace", "debug", "info", "warn", "error"];
    if !valid_levels.contains(&config.level.as_str()) {
        return Err(KinoBotError::Config(
            format!("Invalid log level: {}. Valid levels: {:?}", config.level, valid_levels)
        ));
    }

    Ok(())
}
