//! User registry service
//!
//! Tracks known users, their subscription expiry, block status and activity
//! recency. Rows are never deleted; blocking replaces removal.

use std::sync::Arc;
use chrono::Duration;
use tracing::{debug, info, warn};
use crate::database::store::UserStore;
use crate::models::user::{UpsertOutcome, UpsertUserRequest, User};
use crate::services::clock::Clock;
use crate::utils::errors::{KinoBotError, Result};

/// User registry for managing user operations
#[derive(Clone)]
pub struct UserRegistry {
    users: Arc<dyn UserStore>,
    clock: Arc<dyn Clock>,
}

impl UserRegistry {
    pub fn new(users: Arc<dyn UserStore>, clock: Arc<dyn Clock>) -> Self {
        Self { users, clock }
    }

    /// Register a user on first contact. Existing rows keep their `joined_at`
    /// and subscription state; only name and handle are refreshed.
    pub async fn upsert_user(&self, id: i64, display_name: Option<String>, handle: Option<String>) -> Result<User> {
        Ok(self.register_user(id, display_name, handle).await?.user)
    }

    /// Like [`upsert_user`](Self::upsert_user), also reporting whether the row is new
    pub async fn register_user(
        &self,
        id: i64,
        display_name: Option<String>,
        handle: Option<String>,
    ) -> Result<UpsertOutcome> {
        debug!(user_id = id, "Registering or refreshing user");

        let request = UpsertUserRequest {
            id,
            display_name,
            handle,
        };
        let outcome = self.users.upsert(request, self.clock.now()).await?;
        if outcome.created {
            info!(user_id = id, "New user registered");
        }
        Ok(outcome)
    }

    pub async fn get_user(&self, id: i64) -> Result<Option<User>> {
        self.users.find(id).await
    }

    /// Extend the subscription by `days` from the later of now and the current
    /// expiry. Also unblocks the user and resets the failure counter.
    pub async fn extend_subscription(&self, user_id: i64, days: u32) -> Result<User> {
        let user = self
            .users
            .extend_subscription(user_id, days, self.clock.now())
            .await?
            .ok_or(KinoBotError::UserNotFound { user_id })?;

        info!(
            user_id = user_id,
            days = days,
            subscription_until = ?user.subscription_until,
            "Subscription extended"
        );
        Ok(user)
    }

    /// Mark the user active now. Unknown users are ignored.
    pub async fn record_activity(&self, user_id: i64) -> Result<()> {
        if !self.users.touch(user_id, self.clock.now()).await? {
            debug!(user_id = user_id, "Activity for unknown user ignored");
        }
        Ok(())
    }

    pub async fn block(&self, user_id: i64) -> Result<User> {
        let user = self
            .users
            .set_blocked(user_id, true)
            .await?
            .ok_or(KinoBotError::UserNotFound { user_id })?;

        warn!(user_id = user_id, "User blocked");
        Ok(user)
    }

    pub async fn unblock(&self, user_id: i64) -> Result<User> {
        let user = self
            .users
            .set_blocked(user_id, false)
            .await?
            .ok_or(KinoBotError::UserNotFound { user_id })?;

        info!(user_id = user_id, "User unblocked");
        Ok(user)
    }

    /// Unknown users count as not blocked
    pub async fn is_blocked(&self, user_id: i64) -> Result<bool> {
        Ok(self.users.find(user_id).await?.map_or(false, |u| u.is_blocked))
    }

    pub async fn has_active_subscription(&self, user_id: i64) -> Result<bool> {
        let now = self.clock.now();
        Ok(self
            .users
            .find(user_id)
            .await?
            .map_or(false, |u| u.has_active_subscription(now)))
    }

    /// Count a denied privileged attempt; with a threshold the counting update
    /// also blocks the user once the threshold is reached.
    pub async fn register_failed_attempt(&self, user_id: i64, threshold: Option<u32>) -> Result<Option<User>> {
        let user = self.users.register_failure(user_id, threshold).await?;

        if let Some(ref user) = user {
            if user.is_blocked {
                warn!(user_id = user_id, failed_attempts = user.failed_attempts, "User blocked after repeated failures");
            } else {
                debug!(user_id = user_id, failed_attempts = user.failed_attempts, "Failed attempt recorded");
            }
        }
        Ok(user)
    }

    /// Maintenance sweep. This both reads and mutates: every unblocked user
    /// whose last activity is older than `threshold` is blocked, and the ids
    /// of the users blocked by this call are returned.
    pub async fn sweep_inactive(&self, threshold: Duration) -> Result<Vec<i64>> {
        let cutoff = self.clock.now() - threshold;
        let blocked = self.users.block_inactive_since(cutoff).await?;

        if !blocked.is_empty() {
            warn!(count = blocked.len(), cutoff = %cutoff, "Inactive users blocked by sweep");
        }
        Ok(blocked)
    }

    /// Ids of every user not blocked, oldest first
    pub async fn list_active_user_ids(&self) -> Result<Vec<i64>> {
        self.users.list_unblocked_ids().await
    }

    pub async fn count_users(&self) -> Result<i64> {
        self.users.count().await
    }

    pub async fn count_blocked(&self) -> Result<i64> {
        self.users.count_blocked().await
    }

    pub async fn count_active_subscriptions(&self) -> Result<i64> {
        self.users.count_active_subscriptions(self.clock.now()).await
    }
}
