//! Logging configuration and setup
//!
//! This module provides logging initialization and structured logging utilities
//! for the KinoBot application.

use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt};
use crate::config::LoggingConfig;
use crate::utils::errors::{KinoBotError, Result};

/// Initialize logging based on configuration.
///
/// The returned guard flushes the file writer on drop and must be held
/// for the lifetime of the process.
pub fn init_logging(config: &LoggingConfig) -> Result<WorkerGuard> {
    let file_appender = tracing_appender::rolling::daily(&config.directory, &config.file_prefix);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(&config.level))
        .with(fmt::layer().with_writer(std::io::stdout))
        .with((!config.json).then(|| fmt::layer().with_ansi(false).with_writer(non_blocking.clone())))
        .with(config.json.then(|| fmt::layer().json().with_writer(non_blocking)))
        .try_init()
        .map_err(|e| KinoBotError::Config(format!("Failed to install subscriber: {}", e)))?;

    info!(level = %config.level, json = config.json, "Logging initialized");
    Ok(guard)
}

/// Log user actions with structured data
pub fn log_user_action(user_id: i64, action: &str, details: Option<&str>) {
    info!(
        user_id = user_id,
        action = action,
        details = details,
        "User action performed"
    );
}

/// Log admin actions
pub fn log_admin_action(admin_id: i64, action: &str, target: Option<&str>, details: Option<&str>) {
    warn!(
        admin_id = admin_id,
        action = action,
        target = target,
        details = details,
        "Admin action performed"
    );
}

/// Log an access gate denial
pub fn log_access_denied(user_id: i64, action: &str, reason: &str) {
    info!(
        user_id = user_id,
        action = action,
        reason = reason,
        "Access denied"
    );
}

/// Log a payment decision
pub fn log_payment_decision(payment_id: i64, admin_id: i64, decision: &str, user_id: i64) {
    warn!(
        payment_id = payment_id,
        admin_id = admin_id,
        decision = decision,
        user_id = user_id,
        "Payment decided"
    );
}
