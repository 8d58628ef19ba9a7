//! Error handling for KinoBot
//!
//! This module defines the main error types used throughout the application
//! and provides a unified error handling strategy.

use thiserror::Error;

/// Main error type for KinoBot application
#[derive(Error, Debug)]
pub enum KinoBotError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Telegram API error: {0}")]
    Telegram(#[from] teloxide::RequestError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("User not found: {user_id}")]
    UserNotFound { user_id: i64 },

    #[error("Movie not found: {code}")]
    MovieNotFound { code: String },

    #[error("Payment not found: {payment_id}")]
    PaymentNotFound { payment_id: i64 },

    #[error("Payment {payment_id} already decided ({status})")]
    AlreadyDecided { payment_id: i64, status: String },

    #[error("User {user_id} is not authorized for admin commands")]
    NotAuthorized { user_id: i64 },

    #[error("User {user_id} is blocked")]
    Blocked { user_id: i64 },

    #[error("Not subscribed to channels: {}", .channels.join(", "))]
    NotSubscribedToChannels { channels: Vec<String> },

    #[error("Subscription expired for user {user_id}")]
    SubscriptionExpired { user_id: i64 },

    #[error("Code allocation exhausted after {attempts} attempts")]
    CapacityExhausted { attempts: u32 },

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Persistence layer errors
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Database migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Storage backend error: {0}")]
    Backend(String),
}

impl From<sqlx::Error> for KinoBotError {
    fn from(err: sqlx::Error) -> Self {
        KinoBotError::Storage(StorageError::Database(err))
    }
}

impl From<sqlx::migrate::MigrateError> for KinoBotError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        KinoBotError::Storage(StorageError::Migration(err))
    }
}

/// Result type alias for KinoBot operations
pub type Result<T> = std::result::Result<T, KinoBotError>;

impl KinoBotError {
    /// Check if the error is recoverable
    pub fn is_recoverable(&self) -> bool {
        match self {
            KinoBotError::Storage(StorageError::Database(_)) => true,
            KinoBotError::Storage(_) => false,
            KinoBotError::Telegram(_) => true,
            KinoBotError::Config(_) => false,
            KinoBotError::UserNotFound { .. } => false,
            KinoBotError::MovieNotFound { .. } => false,
            KinoBotError::PaymentNotFound { .. } => false,
            KinoBotError::AlreadyDecided { .. } => false,
            KinoBotError::NotAuthorized { .. } => false,
            KinoBotError::Blocked { .. } => false,
            KinoBotError::NotSubscribedToChannels { .. } => true,
            KinoBotError::SubscriptionExpired { .. } => true,
            KinoBotError::CapacityExhausted { .. } => false,
            KinoBotError::InvalidInput(_) => false,
        }
    }

    /// Get error severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            KinoBotError::Storage(_) => ErrorSeverity::Critical,
            KinoBotError::Config(_) => ErrorSeverity::Critical,
            KinoBotError::CapacityExhausted { .. } => ErrorSeverity::Critical,
            KinoBotError::NotAuthorized { .. } => ErrorSeverity::Warning,
            KinoBotError::Blocked { .. } => ErrorSeverity::Warning,
            KinoBotError::AlreadyDecided { .. } => ErrorSeverity::Warning,
            KinoBotError::NotSubscribedToChannels { .. }
            | KinoBotError::SubscriptionExpired { .. }
            | KinoBotError::UserNotFound { .. }
            | KinoBotError::MovieNotFound { .. }
            | KinoBotError::PaymentNotFound { .. }
            | KinoBotError::InvalidInput(_) => ErrorSeverity::Info,
            _ => ErrorSeverity::Error,
        }
    }

    /// Whether this error is one of the not-found kinds
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            KinoBotError::UserNotFound { .. }
                | KinoBotError::MovieNotFound { .. }
                | KinoBotError::PaymentNotFound { .. }
        )
    }
}

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    Info,
    Warning,
    Error,
    Critical,
}

impl std::fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorSeverity::Info => write!(f, "INFO"),
            ErrorSeverity::Warning => write!(f, "WARN"),
            ErrorSeverity::Error => write!(f, "ERROR"),
            ErrorSeverity::Critical => write!(f, "CRITICAL"),
        }
    }
}
