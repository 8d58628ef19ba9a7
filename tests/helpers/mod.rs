//! Test helpers module
//!
//! Builds a complete service graph over in-memory storage, a manual clock
//! and a scripted membership checker, plus a mock Bot API server.

#![allow(dead_code)]

pub mod database_helper;
pub mod telegram_mock;
pub mod test_context;

pub use database_helper::*;
pub use telegram_mock::*;
pub use test_context::*;
