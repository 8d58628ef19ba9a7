//! Data models module
//!
//! This module contains all data structures used throughout the application

pub mod user;
pub mod movie;
pub mod payment;
pub mod admin;
pub mod ad;

// Re-export commonly used models
pub use user::{User, UpsertUserRequest, UpsertOutcome, extended_expiry};
pub use movie::{Movie, MovieMetadata, InsertOutcome};
pub use payment::{
    PendingPayment, PaymentStatus, Decision, SubmitPaymentRequest, TransitionOutcome, ApprovalOutcome,
    MAX_PERIOD_DAYS,
};
pub use ad::{Ad, NewAd, MAX_AD_REPEATS};
pub use admin::{Setting, Admin, SubscriptionTier, UsageStats};
