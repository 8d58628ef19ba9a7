//! Scheduled advertisements
//!
//! An ad is delivered to every active user up to `repeat_count` times, the
//! first time at its scheduled moment and then once per repeat interval.
//! Deliveries are claimed in storage before sending, so two schedulers never
//! deliver the same round twice.

use std::sync::Arc;
use chrono::Duration;
use tracing::{debug, info};
use crate::database::store::AdStore;
use crate::models::{Ad, NewAd, MAX_AD_REPEATS};
use crate::services::clock::Clock;
use crate::utils::errors::{KinoBotError, Result};

#[derive(Clone)]
pub struct AdService {
    ads: Arc<dyn AdStore>,
    clock: Arc<dyn Clock>,
    repeat_interval: Duration,
}

impl AdService {
    pub fn new(ads: Arc<dyn AdStore>, clock: Arc<dyn Clock>, repeat_interval: Duration) -> Self {
        Self {
            ads,
            clock,
            repeat_interval,
        }
    }

    pub async fn add_ad(&self, ad: NewAd) -> Result<Ad> {
        validate_ad(&ad)?;

        let ad = self.ads.insert(ad, self.clock.now()).await?;
        info!(
            ad_id = ad.id,
            scheduled_at = %ad.scheduled_at,
            repeat_count = ad.repeat_count,
            "Ad scheduled"
        );
        Ok(ad)
    }

    pub async fn get_ad(&self, id: i64) -> Result<Option<Ad>> {
        self.ads.find(id).await
    }

    pub async fn list_ads(&self) -> Result<Vec<Ad>> {
        self.ads.list().await
    }

    /// True when the ad existed
    pub async fn delete_ad(&self, id: i64) -> Result<bool> {
        let removed = self.ads.delete(id).await?;
        if removed {
            info!(ad_id = id, "Ad deleted");
        }
        Ok(removed)
    }

    pub async fn due_ads(&self) -> Result<Vec<Ad>> {
        self.ads.list_due(self.clock.now()).await
    }

    /// Reserve the next delivery round of `ad`. `None` when it is no longer
    /// due, was deleted or another worker took the round.
    pub async fn claim_delivery(&self, ad: &Ad) -> Result<Option<Ad>> {
        let now = self.clock.now();
        let next_at = now
            .checked_add_signed(self.repeat_interval)
            .ok_or_else(|| KinoBotError::InvalidInput("Ad repeat interval overflows the calendar".to_string()))?;

        let claimed = self.ads.claim_delivery(ad.id, now, next_at).await?;
        match &claimed {
            Some(ad) => debug!(ad_id = ad.id, times_sent = ad.times_sent, "Ad delivery claimed"),
            None => debug!(ad_id = ad.id, "Ad delivery already claimed or finished"),
        }
        Ok(claimed)
    }
}

fn validate_ad(ad: &NewAd) -> Result<()> {
    if ad.text.trim().is_empty() && ad.image_handle.is_none() {
        return Err(KinoBotError::InvalidInput("An ad needs text or an image".to_string()));
    }
    if ad.repeat_count == 0 || ad.repeat_count > MAX_AD_REPEATS {
        return Err(KinoBotError::InvalidInput(format!(
            "Repeat count must be between 1 and {}",
            MAX_AD_REPEATS
        )));
    }

    match (&ad.button_text, &ad.button_url) {
        (None, None) => Ok(()),
        (Some(_), Some(link)) => match url::Url::parse(link) {
            Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => Ok(()),
            _ => Err(KinoBotError::InvalidInput(format!("Button link {} is not an http(s) URL", link))),
        },
        _ => Err(KinoBotError::InvalidInput(
            "Button text and link must be given together".to_string(),
        )),
    }
}
