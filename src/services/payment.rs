//! Payment ledger and approval state machine
//!
//! Payments move `pending -> approved` or `pending -> rejected` exactly once.
//! The transition is a compare-and-swap in storage, so of two concurrent
//! decisions only one is applied. Approval and the subscription extension
//! are one storage operation: a failed extension leaves the payment pending.

use std::sync::Arc;
use chrono::{DateTime, Utc};
use tracing::{info, warn};
use crate::database::store::PaymentStore;
use crate::models::{
    ApprovalOutcome, Decision, PendingPayment, SubmitPaymentRequest, TransitionOutcome, User, MAX_PERIOD_DAYS,
};
use crate::services::clock::Clock;
use crate::utils::errors::{KinoBotError, Result};
use crate::utils::logging::log_payment_decision;

/// A decision that was applied, with the user row it affected
#[derive(Debug, Clone)]
pub struct DecidedPayment {
    pub payment: PendingPayment,
    /// Present for approvals: the user after the extension
    pub user: Option<User>,
}

#[derive(Clone)]
pub struct PaymentLedger {
    payments: Arc<dyn PaymentStore>,
    clock: Arc<dyn Clock>,
}

impl PaymentLedger {
    pub fn new(payments: Arc<dyn PaymentStore>, clock: Arc<dyn Clock>) -> Self {
        Self { payments, clock }
    }

    /// Record a receipt for admin review. Only presence of the fields is
    /// checked; judging the receipt is left to the admin.
    pub async fn submit_payment(
        &self,
        user_id: i64,
        amount: i64,
        period_days: u32,
        proof_handle: &str,
    ) -> Result<PendingPayment> {
        if proof_handle.trim().is_empty() {
            return Err(KinoBotError::InvalidInput("Payment proof is required".to_string()));
        }
        if period_days == 0 {
            return Err(KinoBotError::InvalidInput("Subscription period must be positive".to_string()));
        }
        if period_days > MAX_PERIOD_DAYS {
            return Err(KinoBotError::InvalidInput(format!(
                "Subscription period is limited to {} days",
                MAX_PERIOD_DAYS
            )));
        }

        let request = SubmitPaymentRequest {
            user_id,
            amount,
            period_days,
            proof_handle: proof_handle.to_string(),
        };
        let payment = self.payments.insert(request, self.clock.now()).await?;

        info!(
            payment_id = payment.id,
            user_id = user_id,
            amount = amount,
            period_days = period_days,
            "Payment submitted"
        );
        Ok(payment)
    }

    /// Apply an admin decision to a pending payment
    pub async fn decide(&self, payment_id: i64, decision: Decision, admin_id: i64) -> Result<DecidedPayment> {
        let current = self
            .payments
            .find(payment_id)
            .await?
            .ok_or(KinoBotError::PaymentNotFound { payment_id })?;

        if !current.is_pending() {
            return Err(KinoBotError::AlreadyDecided {
                payment_id,
                status: current.status.to_string(),
            });
        }

        let now = self.clock.now();
        let decided = match decision {
            Decision::Approve => self.approve(payment_id, admin_id, now).await?,
            Decision::Reject => self.reject(payment_id, admin_id, now).await?,
        };

        log_payment_decision(payment_id, admin_id, decision.as_str(), decided.payment.user_id);
        if let Some(user) = &decided.user {
            info!(
                user_id = user.id,
                subscription_until = ?user.subscription_until,
                "Subscription extended by payment"
            );
        }
        Ok(decided)
    }

    async fn approve(&self, payment_id: i64, admin_id: i64, now: DateTime<Utc>) -> Result<DecidedPayment> {
        match self.payments.approve(payment_id, admin_id, now).await? {
            ApprovalOutcome::Approved { payment, user } => Ok(DecidedPayment {
                payment,
                user: Some(user),
            }),
            ApprovalOutcome::AlreadyDecided(payment) => Err(concurrent_decision(payment, admin_id)),
            ApprovalOutcome::UserMissing { user_id } => Err(KinoBotError::UserNotFound { user_id }),
            ApprovalOutcome::Missing => Err(KinoBotError::PaymentNotFound { payment_id }),
        }
    }

    async fn reject(&self, payment_id: i64, admin_id: i64, now: DateTime<Utc>) -> Result<DecidedPayment> {
        match self
            .payments
            .transition(payment_id, Decision::Reject.target_status(), admin_id, now)
            .await?
        {
            TransitionOutcome::Applied(payment) => Ok(DecidedPayment { payment, user: None }),
            TransitionOutcome::AlreadyDecided(payment) => Err(concurrent_decision(payment, admin_id)),
            TransitionOutcome::Missing => Err(KinoBotError::PaymentNotFound { payment_id }),
        }
    }

    pub async fn get_payment(&self, payment_id: i64) -> Result<PendingPayment> {
        self.payments
            .find(payment_id)
            .await?
            .ok_or(KinoBotError::PaymentNotFound { payment_id })
    }

    /// Pending payments, newest first
    pub async fn list_pending(&self) -> Result<Vec<PendingPayment>> {
        self.payments.list_pending().await
    }

    pub async fn count_pending(&self) -> Result<i64> {
        self.payments.count_pending().await
    }
}

fn concurrent_decision(payment: PendingPayment, admin_id: i64) -> KinoBotError {
    warn!(payment_id = payment.id, admin_id = admin_id, "Payment decided concurrently");
    KinoBotError::AlreadyDecided {
        payment_id: payment.id,
        status: payment.status.to_string(),
    }
}
