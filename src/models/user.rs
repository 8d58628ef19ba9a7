//! User model

use serde::{Deserialize, Serialize};
use chrono::{DateTime, Duration, Utc};
use sqlx::FromRow;
use crate::utils::errors::{KinoBotError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: i64,
    pub display_name: Option<String>,
    pub handle: Option<String>,
    pub joined_at: DateTime<Utc>,
    pub subscription_until: Option<DateTime<Utc>>,
    pub is_blocked: bool,
    pub last_activity_at: DateTime<Utc>,
    pub failed_attempts: i32,
}

impl User {
    /// Fresh registry row for a first contact
    pub fn new(request: UpsertUserRequest, now: DateTime<Utc>) -> Self {
        Self {
            id: request.id,
            display_name: request.display_name,
            handle: request.handle,
            joined_at: now,
            subscription_until: None,
            is_blocked: false,
            last_activity_at: now,
            failed_attempts: 0,
        }
    }

    pub fn has_active_subscription(&self, now: DateTime<Utc>) -> bool {
        self.subscription_until.map_or(false, |until| until > now)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpsertUserRequest {
    pub id: i64,
    pub display_name: Option<String>,
    pub handle: Option<String>,
}

/// Stored user row plus whether this call created it
#[derive(Debug, Clone, PartialEq)]
pub struct UpsertOutcome {
    pub user: User,
    pub created: bool,
}

/// Expiry after extending by `days`: counted from the later of `now` and the
/// current expiry, so an extension never shortens a subscription. Fails
/// instead of wrapping when the date leaves the representable range.
pub fn extended_expiry(current: Option<DateTime<Utc>>, now: DateTime<Utc>, days: u32) -> Result<DateTime<Utc>> {
    let base = match current {
        Some(until) if until > now => until,
        _ => now,
    };
    Duration::try_days(i64::from(days))
        .and_then(|period| base.checked_add_signed(period))
        .ok_or_else(|| KinoBotError::InvalidInput(format!("Extending by {} days overflows the calendar", days)))
}
