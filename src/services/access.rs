//! Access gate
//!
//! Combines registry state, the admin set and the force-subscribe settings
//! into an allow/deny verdict for one inbound action.

use std::sync::Arc;
use std::time::Duration;
use futures::future::join_all;
use tracing::{debug, warn};
use crate::config::AccessConfig;
use crate::services::admin::AdminService;
use crate::services::clock::Clock;
use crate::services::membership::MembershipChecker;
use crate::services::settings::SettingsService;
use crate::services::user::UserRegistry;
use crate::utils::errors::{KinoBotError, Result};
use crate::utils::logging::log_access_denied;

/// Kind of inbound request being gated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    AdminCommand,
    MovieLookup,
    PaymentSubmission,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::AdminCommand => "admin_command",
            ActionKind::MovieLookup => "movie_lookup",
            ActionKind::PaymentSubmission => "payment_submission",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DenyReason {
    NotAuthorized,
    Blocked,
    /// Channels the user still has to join, in configured order
    NotSubscribedToChannels(Vec<String>),
    SubscriptionExpired,
}

impl DenyReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DenyReason::NotAuthorized => "not_authorized",
            DenyReason::Blocked => "blocked",
            DenyReason::NotSubscribedToChannels(_) => "not_subscribed_to_channels",
            DenyReason::SubscriptionExpired => "subscription_expired",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Allow,
    Deny(DenyReason),
}

impl Verdict {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Verdict::Allow)
    }

    /// Map a denial onto the matching error kind
    pub fn into_result(self, user_id: i64) -> Result<()> {
        match self {
            Verdict::Allow => Ok(()),
            Verdict::Deny(DenyReason::NotAuthorized) => Err(KinoBotError::NotAuthorized { user_id }),
            Verdict::Deny(DenyReason::Blocked) => Err(KinoBotError::Blocked { user_id }),
            Verdict::Deny(DenyReason::NotSubscribedToChannels(channels)) => {
                Err(KinoBotError::NotSubscribedToChannels { channels })
            }
            Verdict::Deny(DenyReason::SubscriptionExpired) => Err(KinoBotError::SubscriptionExpired { user_id }),
        }
    }
}

#[derive(Clone)]
pub struct AccessGate {
    registry: UserRegistry,
    admins: AdminService,
    settings: SettingsService,
    membership: Arc<dyn MembershipChecker>,
    clock: Arc<dyn Clock>,
    config: AccessConfig,
}

impl AccessGate {
    pub fn new(
        registry: UserRegistry,
        admins: AdminService,
        settings: SettingsService,
        membership: Arc<dyn MembershipChecker>,
        clock: Arc<dyn Clock>,
        config: AccessConfig,
    ) -> Self {
        Self {
            registry,
            admins,
            settings,
            membership,
            clock,
            config,
        }
    }

    /// Evaluate with the configured membership timeout
    pub async fn evaluate_access(&self, user_id: i64, action: ActionKind) -> Result<Verdict> {
        self.evaluate_access_within(user_id, action, self.config.membership_timeout())
            .await
    }

    /// Evaluate with each membership query bounded by `timeout`. On `Allow`
    /// the user's activity timestamp is refreshed.
    pub async fn evaluate_access_within(
        &self,
        user_id: i64,
        action: ActionKind,
        timeout: Duration,
    ) -> Result<Verdict> {
        let verdict = match action {
            ActionKind::AdminCommand => self.check_admin(user_id).await?,
            ActionKind::MovieLookup | ActionKind::PaymentSubmission => {
                self.check_member(user_id, action, timeout).await?
            }
        };

        match &verdict {
            Verdict::Allow => self.registry.record_activity(user_id).await?,
            Verdict::Deny(reason) => log_access_denied(user_id, action.as_str(), reason.as_str()),
        }
        Ok(verdict)
    }

    /// Enforced channels the user has not joined yet, in configured order.
    /// Empty when force-subscribe is off or every channel is joined.
    pub async fn check_channels(&self, user_id: i64) -> Result<Vec<String>> {
        let channels = self.settings.enforced_channels().await?;
        if channels.is_empty() {
            return Ok(Vec::new());
        }
        Ok(self
            .unsatisfied_channels(user_id, channels, self.config.membership_timeout())
            .await)
    }

    async fn check_admin(&self, user_id: i64) -> Result<Verdict> {
        if self.admins.is_privileged(user_id).await? {
            return Ok(Verdict::Allow);
        }

        if let Some(threshold) = self.config.auto_block_threshold {
            self.registry
                .register_failed_attempt(user_id, Some(threshold))
                .await?;
        }
        Ok(Verdict::Deny(DenyReason::NotAuthorized))
    }

    async fn check_member(&self, user_id: i64, action: ActionKind, timeout: Duration) -> Result<Verdict> {
        let user = self.registry.get_user(user_id).await?;

        if user.as_ref().map_or(false, |u| u.is_blocked) {
            return Ok(Verdict::Deny(DenyReason::Blocked));
        }

        let channels = self.settings.enforced_channels().await?;
        if !channels.is_empty() {
            let missing = self.unsatisfied_channels(user_id, channels, timeout).await;
            if !missing.is_empty() {
                return Ok(Verdict::Deny(DenyReason::NotSubscribedToChannels(missing)));
            }
        }

        if action == ActionKind::MovieLookup && self.config.require_subscription {
            let now = self.clock.now();
            if !user.map_or(false, |u| u.has_active_subscription(now)) {
                return Ok(Verdict::Deny(DenyReason::SubscriptionExpired));
            }
        }

        Ok(Verdict::Allow)
    }

    /// Query all channels concurrently; a failed or timed out query counts as
    /// not joined
    async fn unsatisfied_channels(&self, user_id: i64, channels: Vec<String>, timeout: Duration) -> Vec<String> {
        let checks = channels.iter().map(|channel| async move {
            match tokio::time::timeout(timeout, self.membership.is_member(channel, user_id)).await {
                Ok(Ok(is_member)) => is_member,
                Ok(Err(e)) => {
                    warn!(user_id = user_id, channel = %channel, error = %e, "Membership check failed");
                    false
                }
                Err(_) => {
                    warn!(user_id = user_id, channel = %channel, timeout_ms = timeout.as_millis() as u64, "Membership check timed out");
                    false
                }
            }
        });

        let results = join_all(checks).await;
        let missing: Vec<String> = channels
            .into_iter()
            .zip(results)
            .filter_map(|(channel, joined)| (!joined).then_some(channel))
            .collect();

        debug!(user_id = user_id, missing = ?missing, "Force-subscribe check complete");
        missing
    }
}
