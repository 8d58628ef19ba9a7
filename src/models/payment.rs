//! Payment model

use std::fmt;
use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use crate::models::user::User;
use crate::utils::errors::KinoBotError;

/// Longest period a single payment may buy
pub const MAX_PERIOD_DAYS: u32 = 3660;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct PendingPayment {
    pub id: i64,
    pub user_id: i64,
    pub amount: i64,
    pub period_days: i32,
    pub proof_handle: String,
    #[sqlx(try_from = "String")]
    pub status: PaymentStatus,
    pub decided_by: Option<i64>,
    pub decided_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl PendingPayment {
    pub fn is_pending(&self) -> bool {
        self.status == PaymentStatus::Pending
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Approved,
    Rejected,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Approved => "approved",
            PaymentStatus::Rejected => "rejected",
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for PaymentStatus {
    type Error = KinoBotError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "pending" => Ok(PaymentStatus::Pending),
            "approved" => Ok(PaymentStatus::Approved),
            "rejected" => Ok(PaymentStatus::Rejected),
            other => Err(KinoBotError::InvalidInput(format!("Unknown payment status: {}", other))),
        }
    }
}

/// Admin verdict on a pending payment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Approve,
    Reject,
}

impl Decision {
    pub fn target_status(&self) -> PaymentStatus {
        match self {
            Decision::Approve => PaymentStatus::Approved,
            Decision::Reject => PaymentStatus::Rejected,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Decision::Approve => "approve",
            Decision::Reject => "reject",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitPaymentRequest {
    pub user_id: i64,
    pub amount: i64,
    pub period_days: u32,
    pub proof_handle: String,
}

/// Result of the conditional pending -> decided update
#[derive(Debug, Clone, PartialEq)]
pub enum TransitionOutcome {
    /// The row was pending and now carries the decision
    Applied(PendingPayment),
    /// The row had already left pending; carries its current state
    AlreadyDecided(PendingPayment),
    Missing,
}

/// Result of approving a payment together with the subscription extension
#[derive(Debug, Clone, PartialEq)]
pub enum ApprovalOutcome {
    /// Both writes landed: the decided payment and the extended user
    Approved { payment: PendingPayment, user: User },
    /// The row had already left pending; nothing was written
    AlreadyDecided(PendingPayment),
    /// The payer has no registry row; nothing was written
    UserMissing { user_id: i64 },
    Missing,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip_through_text() {
        for status in [PaymentStatus::Pending, PaymentStatus::Approved, PaymentStatus::Rejected] {
            assert_eq!(PaymentStatus::try_from(status.as_str().to_string()).unwrap(), status);
        }
        assert!(PaymentStatus::try_from("refunded".to_string()).is_err());
    }

    #[test]
    fn test_decision_targets() {
        assert_eq!(Decision::Approve.target_status(), PaymentStatus::Approved);
        assert_eq!(Decision::Reject.target_status(), PaymentStatus::Rejected);
    }
}
