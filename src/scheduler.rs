//! Periodic jobs
//!
//! The services own no timers; this module drives the inactivity sweep and
//! delivery of due ads on tokio intervals.

use std::sync::Arc;
use std::time::Duration;
use teloxide::Bot;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};
use crate::config::Settings;
use crate::handlers::broadcast::broadcast_ad;
use crate::services::ServiceFactory;
use crate::utils::errors::Result;

/// Running periodic jobs; aborted on drop
#[derive(Debug, Default)]
pub struct Scheduler {
    handles: Vec<JoinHandle<()>>,
}

impl Scheduler {
    /// Start the jobs enabled in `settings`
    pub fn spawn_jobs(bot: Bot, services: Arc<ServiceFactory>, settings: &Settings) -> Self {
        let mut handles = Vec::new();

        match settings.access.inactivity_days {
            Some(days) if settings.scheduler.sweep_interval_minutes > 0 => {
                let services = services.clone();
                let period = Duration::from_secs(settings.scheduler.sweep_interval_minutes * 60);
                handles.push(tokio::spawn(async move {
                    let mut ticker = tokio::time::interval(period);
                    loop {
                        ticker.tick().await;
                        if let Err(e) = run_inactivity_sweep(&services, days).await {
                            error!(error = %e, "Inactivity sweep failed");
                        }
                    }
                }));
                info!(inactivity_days = days, interval = ?period, "Started inactivity sweep");
            }
            _ => debug!("Inactivity sweep disabled"),
        }

        if settings.scheduler.ad_poll_seconds > 0 {
            let period = Duration::from_secs(settings.scheduler.ad_poll_seconds);
            let rate = settings.broadcast.messages_per_second;
            handles.push(tokio::spawn(async move {
                let mut ticker = tokio::time::interval(period);
                loop {
                    ticker.tick().await;
                    if let Err(e) = run_due_ads(&bot, &services, rate).await {
                        error!(error = %e, "Ad delivery failed");
                    }
                }
            }));
            info!(interval = ?period, "Started ad delivery");
        } else {
            debug!("Ad delivery disabled");
        }

        Self { handles }
    }

    pub fn job_count(&self) -> usize {
        self.handles.len()
    }

    pub fn stop(&mut self) {
        for handle in self.handles.drain(..) {
            handle.abort();
        }
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

/// One sweep pass; returns the ids blocked by it
pub async fn run_inactivity_sweep(services: &ServiceFactory, inactivity_days: u32) -> Result<Vec<i64>> {
    let blocked = services
        .user_registry
        .sweep_inactive(chrono::Duration::days(i64::from(inactivity_days)))
        .await?;

    if !blocked.is_empty() {
        info!(count = blocked.len(), "Inactivity sweep blocked users");
    }
    Ok(blocked)
}

/// Deliver one round of every due ad; returns how many ads went out.
/// A round is claimed before sending, so a failed send is not retried.
pub async fn run_due_ads(bot: &Bot, services: &ServiceFactory, messages_per_second: u32) -> Result<usize> {
    let mut rounds = 0;
    for ad in services.ads.due_ads().await? {
        let Some(claimed) = services.ads.claim_delivery(&ad).await? else {
            continue;
        };
        broadcast_ad(bot, services, &claimed, messages_per_second).await?;
        rounds += 1;
    }
    Ok(rounds)
}
