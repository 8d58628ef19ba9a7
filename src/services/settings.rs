//! Settings store service
//!
//! Flat key/value settings with a few well-known keys for prices, payment
//! card details and forced-subscription channels.

use std::sync::Arc;
use tracing::{debug, info};
use crate::database::store::SettingStore;
use crate::models::{Setting, SubscriptionTier};
use crate::services::clock::Clock;
use crate::utils::errors::{KinoBotError, Result};
use crate::utils::helpers::split_list;

pub const FORCE_CHANNELS: &str = "force_channels";
pub const FORCE_SUBSCRIBE: &str = "force_subscribe";
pub const CARD_NUMBER: &str = "card_number";
pub const CARD_HOLDER: &str = "card_holder";

/// Price keys and the number of months each one buys
pub const PRICE_KEYS: [(&str, u32); 4] = [
    ("price_1m", 1),
    ("price_3m", 3),
    ("price_6m", 6),
    ("price_12m", 12),
];

const DEFAULTS: [(&str, &str); 6] = [
    ("price_1m", "35000"),
    ("price_3m", "90000"),
    ("price_6m", "160000"),
    ("price_12m", "300000"),
    (CARD_NUMBER, "8600 xxxx xxxx xxxx"),
    (CARD_HOLDER, "Card Holder"),
];

#[derive(Clone)]
pub struct SettingsService {
    store: Arc<dyn SettingStore>,
    clock: Arc<dyn Clock>,
}

impl SettingsService {
    pub fn new(store: Arc<dyn SettingStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    pub async fn get_setting(&self, key: &str) -> Result<Option<String>> {
        Ok(self.store.get(key).await?.map(|s| s.value))
    }

    pub async fn set_setting(&self, key: &str, value: &str) -> Result<Setting> {
        let key = key.trim();
        if key.is_empty() {
            return Err(KinoBotError::InvalidInput("Setting key cannot be empty".to_string()));
        }

        let setting = self.store.upsert(key, value, self.clock.now()).await?;
        info!(key = key, "Setting updated");
        Ok(setting)
    }

    pub async fn list_settings(&self) -> Result<Vec<Setting>> {
        self.store.list().await
    }

    /// Insert default prices and card details; values already present are kept.
    /// Returns how many keys were written.
    pub async fn seed_defaults(&self) -> Result<usize> {
        let now = self.clock.now();
        let mut written = 0;
        for (key, value) in DEFAULTS {
            if self.store.insert_if_absent(key, value, now).await? {
                written += 1;
            }
        }

        debug!(written = written, "Default settings seeded");
        Ok(written)
    }

    /// Configured force-subscribe channels in their stored order
    pub async fn list_channels(&self) -> Result<Vec<String>> {
        Ok(self
            .get_setting(FORCE_CHANNELS)
            .await?
            .map(|v| split_list(&v))
            .unwrap_or_default())
    }

    /// Returns false when the channel was already configured
    pub async fn add_channel(&self, channel: &str) -> Result<bool> {
        let channel = channel.trim();
        if channel.is_empty() {
            return Err(KinoBotError::InvalidInput("Channel cannot be empty".to_string()));
        }

        let mut channels = self.list_channels().await?;
        if channels.iter().any(|c| c == channel) {
            return Ok(false);
        }

        channels.push(channel.to_string());
        self.set_setting(FORCE_CHANNELS, &channels.join(",")).await?;
        info!(channel = channel, "Force-subscribe channel added");
        Ok(true)
    }

    /// Returns whether the channel was configured
    pub async fn remove_channel(&self, channel: &str) -> Result<bool> {
        let channel = channel.trim();
        let mut channels = self.list_channels().await?;
        let before = channels.len();
        channels.retain(|c| c != channel);

        if channels.len() == before {
            return Ok(false);
        }

        self.set_setting(FORCE_CHANNELS, &channels.join(",")).await?;
        info!(channel = channel, "Force-subscribe channel removed");
        Ok(true)
    }

    pub async fn set_force_subscribe(&self, enabled: bool) -> Result<()> {
        self.set_setting(FORCE_SUBSCRIBE, if enabled { "on" } else { "off" }).await?;
        Ok(())
    }

    /// Absent means on
    pub async fn force_subscribe_enabled(&self) -> Result<bool> {
        Ok(!matches!(
            self.get_setting(FORCE_SUBSCRIBE).await?.as_deref().map(str::trim),
            Some("off")
        ))
    }

    /// Channels the gate has to check; empty when force-subscribe is off
    pub async fn enforced_channels(&self) -> Result<Vec<String>> {
        if !self.force_subscribe_enabled().await? {
            return Ok(Vec::new());
        }
        self.list_channels().await
    }

    /// Tiers for every price key holding an integer amount
    pub async fn subscription_tiers(&self) -> Result<Vec<SubscriptionTier>> {
        let mut tiers = Vec::new();
        for (key, months) in PRICE_KEYS {
            let amount = match self.get_setting(key).await? {
                Some(value) => match value.trim().parse::<i64>() {
                    Ok(amount) => amount,
                    Err(_) => {
                        debug!(key = key, value = %value, "Ignoring non-numeric price");
                        continue;
                    }
                },
                None => continue,
            };

            tiers.push(SubscriptionTier {
                months,
                days: 30 * months,
                amount,
            });
        }
        Ok(tiers)
    }

    pub async fn tier_for_months(&self, months: u32) -> Result<Option<SubscriptionTier>> {
        Ok(self
            .subscription_tiers()
            .await?
            .into_iter()
            .find(|t| t.months == months))
    }
}
