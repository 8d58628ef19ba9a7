//! Services module
//!
//! This module contains the business logic services. They depend only on the
//! storage traits, a clock and a membership checker.

pub mod access;
pub mod ads;
pub mod admin;
pub mod catalog;
pub mod clock;
pub mod membership;
pub mod payment;
pub mod settings;
pub mod user;

// Re-export commonly used services
pub use access::{AccessGate, ActionKind, DenyReason, Verdict};
pub use ads::AdService;
pub use admin::AdminService;
pub use catalog::MovieCatalog;
pub use clock::{Clock, ManualClock, SystemClock};
pub use membership::{MembershipChecker, TelegramMembership};
pub use payment::{DecidedPayment, PaymentLedger};
pub use settings::SettingsService;
pub use user::UserRegistry;

use std::sync::Arc;
use crate::config::settings::Settings;
use crate::database::store::Storage;
use crate::models::UsageStats;
use crate::utils::errors::Result;

/// Service factory for creating and managing all services
#[derive(Clone)]
pub struct ServiceFactory {
    pub user_registry: UserRegistry,
    pub catalog: MovieCatalog,
    pub payments: PaymentLedger,
    pub settings: SettingsService,
    pub admins: AdminService,
    pub access_gate: AccessGate,
    pub ads: AdService,
    pub clock: Arc<dyn Clock>,
}

impl ServiceFactory {
    /// Wire every service over the given storage and capabilities
    pub fn new(
        storage: Storage,
        clock: Arc<dyn Clock>,
        membership: Arc<dyn MembershipChecker>,
        settings: &Settings,
    ) -> Self {
        let user_registry = UserRegistry::new(storage.users.clone(), clock.clone());
        let catalog = MovieCatalog::new(storage.movies.clone(), clock.clone(), settings.catalog.clone());
        let payments = PaymentLedger::new(storage.payments.clone(), clock.clone());
        let settings_service = SettingsService::new(storage.settings.clone(), clock.clone());
        let admins = AdminService::new(storage.admins.clone(), clock.clone(), settings.access.super_admin_id);
        let ads = AdService::new(storage.ads.clone(), clock.clone(), settings.scheduler.ad_repeat_interval());
        let access_gate = AccessGate::new(
            user_registry.clone(),
            admins.clone(),
            settings_service.clone(),
            membership,
            clock.clone(),
            settings.access.clone(),
        );

        Self {
            user_registry,
            catalog,
            payments,
            settings: settings_service,
            admins,
            access_gate,
            ads,
            clock,
        }
    }

    /// Seed default settings and the configured admin ids
    pub async fn seed(&self, admin_ids: &[i64]) -> Result<()> {
        self.settings.seed_defaults().await?;
        self.admins.seed(admin_ids).await?;
        Ok(())
    }

    /// Counters for the admin statistics view
    pub async fn usage_stats(&self) -> Result<UsageStats> {
        Ok(UsageStats {
            total_users: self.user_registry.count_users().await?,
            blocked_users: self.user_registry.count_blocked().await?,
            active_subscriptions: self.user_registry.count_active_subscriptions().await?,
            movies: self.catalog.count_movies().await?,
            total_views: self.catalog.total_views().await?,
            pending_payments: self.payments.count_pending().await?,
        })
    }
}
