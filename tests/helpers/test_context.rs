//! Service graph for integration tests

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use KinoBot::config::{CodeStrategy, Settings};
use KinoBot::database::{MemoryStorage, Storage};
use KinoBot::services::{ManualClock, MembershipChecker, ServiceFactory};
use KinoBot::utils::errors::{KinoBotError, Result};

pub const SUPER_ADMIN: i64 = 1_000;
pub const ADMIN: i64 = 2_000;

/// How a scripted channel answers membership queries
#[derive(Debug, Clone)]
pub enum ChannelBehavior {
    /// Members listed explicitly
    Members(HashSet<i64>),
    /// Every query fails
    Fails,
    /// Every query takes this long before answering true
    Slow(Duration),
}

/// Membership checker driven by a per-channel script; unknown channels
/// report non-membership
#[derive(Debug, Clone, Default)]
pub struct ScriptedMembership {
    channels: Arc<Mutex<HashMap<String, ChannelBehavior>>>,
    calls: Arc<Mutex<Vec<(String, i64)>>>,
}

impl ScriptedMembership {
    pub fn join(&self, channel: &str, user_id: i64) {
        let mut channels = self.channels.lock().unwrap();
        let entry = channels
            .entry(channel.to_string())
            .or_insert_with(|| ChannelBehavior::Members(HashSet::new()));
        match entry {
            ChannelBehavior::Members(members) => {
                members.insert(user_id);
            }
            other => *other = ChannelBehavior::Members([user_id].into_iter().collect()),
        }
    }

    pub fn set(&self, channel: &str, behavior: ChannelBehavior) {
        self.channels.lock().unwrap().insert(channel.to_string(), behavior);
    }

    pub fn calls(&self) -> Vec<(String, i64)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl MembershipChecker for ScriptedMembership {
    async fn is_member(&self, channel: &str, user_id: i64) -> Result<bool> {
        self.calls.lock().unwrap().push((channel.to_string(), user_id));
        let behavior = self.channels.lock().unwrap().get(channel).cloned();

        match behavior {
            Some(ChannelBehavior::Members(members)) => Ok(members.contains(&user_id)),
            Some(ChannelBehavior::Fails) => Err(KinoBotError::InvalidInput("chat not found".to_string())),
            Some(ChannelBehavior::Slow(delay)) => {
                tokio::time::sleep(delay).await;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 5, 1, 12, 0, 0).unwrap()
}

pub fn test_settings() -> Settings {
    let mut settings = Settings::default();
    settings.bot.token = "12345:test_token".to_string();
    settings.bot.admin_ids = vec![ADMIN];
    settings.database.url = "memory://".to_string();
    settings.access.super_admin_id = SUPER_ADMIN;
    settings.access.membership_timeout_ms = 200;
    settings
}

/// Everything a test needs to drive the services
pub struct TestContext {
    pub services: ServiceFactory,
    pub clock: ManualClock,
    pub membership: ScriptedMembership,
    pub storage: Storage,
    pub settings: Settings,
}

impl TestContext {
    pub async fn new() -> Self {
        Self::with_settings(test_settings()).await
    }

    pub async fn with_strategy(strategy: CodeStrategy) -> Self {
        let mut settings = test_settings();
        settings.catalog.code_strategy = strategy;
        Self::with_settings(settings).await
    }

    pub async fn with_settings(settings: Settings) -> Self {
        let storage = Storage::from_backend(Arc::new(MemoryStorage::new()));
        Self::with_storage(storage, settings).await
    }

    pub async fn with_storage(storage: Storage, settings: Settings) -> Self {
        let clock = ManualClock::new(start_time());
        let membership = ScriptedMembership::default();

        let services = ServiceFactory::new(
            storage.clone(),
            Arc::new(clock.clone()),
            Arc::new(membership.clone()),
            &settings,
        );
        services
            .seed(&settings.bot.admin_ids)
            .await
            .expect("Failed to seed services");

        Self {
            services,
            clock,
            membership,
            storage,
            settings,
        }
    }

    /// Register a user the way the transport does on first contact
    pub async fn user(&self, id: i64) -> KinoBot::models::User {
        self.services
            .user_registry
            .upsert_user(id, Some(format!("User {}", id)), None)
            .await
            .expect("Failed to register user")
    }
}
