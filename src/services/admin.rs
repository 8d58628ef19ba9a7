//! Admin set management
//!
//! The effective admin set is the stored admins plus the configured super
//! admin, who is always privileged and can never be removed.

use std::sync::Arc;
use tracing::{debug, info, warn};
use crate::database::store::AdminStore;
use crate::services::clock::Clock;
use crate::utils::errors::{KinoBotError, Result};

#[derive(Clone)]
pub struct AdminService {
    admins: Arc<dyn AdminStore>,
    clock: Arc<dyn Clock>,
    super_admin_id: i64,
}

impl AdminService {
    pub fn new(admins: Arc<dyn AdminStore>, clock: Arc<dyn Clock>, super_admin_id: i64) -> Self {
        Self {
            admins,
            clock,
            super_admin_id,
        }
    }

    pub fn super_admin_id(&self) -> i64 {
        self.super_admin_id
    }

    pub fn is_super_admin(&self, user_id: i64) -> bool {
        user_id == self.super_admin_id
    }

    pub async fn is_privileged(&self, user_id: i64) -> Result<bool> {
        if self.is_super_admin(user_id) {
            return Ok(true);
        }
        self.admins.contains(user_id).await
    }

    /// Returns true when the id was newly added. Adding the super admin is a no-op.
    pub async fn add_admin(&self, user_id: i64) -> Result<bool> {
        if user_id <= 0 {
            return Err(KinoBotError::InvalidInput(format!("Invalid admin id: {}", user_id)));
        }
        if self.is_super_admin(user_id) {
            debug!(user_id = user_id, "Super admin is implicitly privileged");
            return Ok(false);
        }

        let added = self.admins.insert(user_id, self.clock.now()).await?;
        if added {
            warn!(user_id = user_id, "Admin added");
        }
        Ok(added)
    }

    /// Returns true when a stored admin was removed. Removing the super admin is a no-op.
    pub async fn remove_admin(&self, user_id: i64) -> Result<bool> {
        if self.is_super_admin(user_id) {
            info!(user_id = user_id, "Ignoring removal of the super admin");
            return Ok(false);
        }

        let removed = self.admins.remove(user_id).await?;
        if removed {
            warn!(user_id = user_id, "Admin removed");
        }
        Ok(removed)
    }

    /// Effective admin ids, super admin first
    pub async fn list_admins(&self) -> Result<Vec<i64>> {
        let mut ids = vec![self.super_admin_id];
        ids.extend(
            self.admins
                .list()
                .await?
                .into_iter()
                .map(|a| a.user_id)
                .filter(|id| *id != self.super_admin_id),
        );
        Ok(ids)
    }

    /// Add every configured admin id; returns how many were new
    pub async fn seed(&self, admin_ids: &[i64]) -> Result<usize> {
        let mut added = 0;
        for id in admin_ids {
            if self.add_admin(*id).await? {
                added += 1;
            }
        }
        Ok(added)
    }
}
