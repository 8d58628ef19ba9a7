//! KinoBot Telegram Bot
//!
//! A Telegram bot that hands out movies by code. Access is gated behind
//! forced channel subscription and a manually approved paid subscription;
//! admins manage the catalog, the payment queue and the bot settings.

#![allow(non_snake_case)]

pub mod config;
pub mod database;
pub mod handlers;
pub mod models;
pub mod scheduler;
pub mod services;
pub mod utils;

// Re-export commonly used types
pub use config::Settings;
pub use utils::errors::{KinoBotError, StorageError, Result};

// Re-export main components for easy access
pub use database::{DatabaseService, MemoryStorage, Storage};
pub use services::ServiceFactory;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Get library information
pub fn info() -> String {
    format!("{} v{}", NAME, VERSION)
}
