//! Admin, setting and statistics models

use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use sqlx::FromRow;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Setting {
    pub key: String,
    pub value: String,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Admin {
    pub user_id: i64,
    pub added_at: DateTime<Utc>,
}

/// Paid subscription option derived from the price settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionTier {
    pub months: u32,
    pub days: u32,
    pub amount: i64,
}

/// Counters shown on the admin panel
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageStats {
    pub total_users: i64,
    pub blocked_users: i64,
    pub active_subscriptions: i64,
    pub movies: i64,
    pub total_views: i64,
    pub pending_payments: i64,
}
