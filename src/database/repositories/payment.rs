//! Payment repository implementation

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use crate::database::store::PaymentStore;
use crate::models::payment::{
    ApprovalOutcome, PaymentStatus, PendingPayment, SubmitPaymentRequest, TransitionOutcome,
};
use crate::models::user::User;
use crate::utils::errors::{KinoBotError, Result};

const PAYMENT_COLUMNS: &str =
    "id, user_id, amount, period_days, proof_handle, status, decided_by, decided_at, created_at";

const USER_COLUMNS: &str =
    "id, display_name, handle, joined_at, subscription_until, is_blocked, last_activity_at, failed_attempts";

#[derive(Clone, Debug)]
pub struct PaymentRepository {
    pool: PgPool,
}

impl PaymentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PaymentStore for PaymentRepository {
    async fn insert(&self, request: SubmitPaymentRequest, now: DateTime<Utc>) -> Result<PendingPayment> {
        let sql = format!(
            r#"
            INSERT INTO pending_payments (user_id, amount, period_days, proof_handle, status, created_at)
            VALUES ($1, $2, $3, $4, 'pending', $5)
            RETURNING {PAYMENT_COLUMNS}
            "#
        );

        let period_days = i32::try_from(request.period_days).map_err(|_| {
            KinoBotError::InvalidInput(format!("Period {} is out of range", request.period_days))
        })?;

        let payment = sqlx::query_as::<_, PendingPayment>(&sql)
            .bind(request.user_id)
            .bind(request.amount)
            .bind(period_days)
            .bind(request.proof_handle)
            .bind(now)
            .fetch_one(&self.pool)
            .await?;

        Ok(payment)
    }

    async fn find(&self, id: i64) -> Result<Option<PendingPayment>> {
        let sql = format!("SELECT {PAYMENT_COLUMNS} FROM pending_payments WHERE id = $1");
        let payment = sqlx::query_as::<_, PendingPayment>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(payment)
    }

    async fn transition(
        &self,
        id: i64,
        status: PaymentStatus,
        decided_by: i64,
        now: DateTime<Utc>,
    ) -> Result<TransitionOutcome> {
        let sql = format!(
            r#"
            UPDATE pending_payments
            SET status = $2, decided_by = $3, decided_at = $4
            WHERE id = $1 AND status = 'pending'
            RETURNING {PAYMENT_COLUMNS}
            "#
        );

        let updated = sqlx::query_as::<_, PendingPayment>(&sql)
            .bind(id)
            .bind(status.as_str())
            .bind(decided_by)
            .bind(now)
            .fetch_optional(&self.pool)
            .await?;

        if let Some(payment) = updated {
            return Ok(TransitionOutcome::Applied(payment));
        }

        // The conditional update matched nothing: either decided or unknown
        Ok(match self.find(id).await? {
            Some(current) => TransitionOutcome::AlreadyDecided(current),
            None => TransitionOutcome::Missing,
        })
    }

    async fn approve(&self, id: i64, decided_by: i64, now: DateTime<Utc>) -> Result<ApprovalOutcome> {
        let mut tx = self.pool.begin().await?;

        let payment_sql = format!(
            r#"
            UPDATE pending_payments
            SET status = 'approved', decided_by = $2, decided_at = $3
            WHERE id = $1 AND status = 'pending'
            RETURNING {PAYMENT_COLUMNS}
            "#
        );

        let payment = sqlx::query_as::<_, PendingPayment>(&payment_sql)
            .bind(id)
            .bind(decided_by)
            .bind(now)
            .fetch_optional(&mut *tx)
            .await?;

        let Some(payment) = payment else {
            tx.rollback().await?;
            return Ok(match self.find(id).await? {
                Some(current) => ApprovalOutcome::AlreadyDecided(current),
                None => ApprovalOutcome::Missing,
            });
        };

        let user_sql = format!(
            r#"
            UPDATE users
            SET subscription_until = GREATEST(COALESCE(subscription_until, $3), $3) + make_interval(days => $2),
                is_blocked = FALSE,
                failed_attempts = 0
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        );

        // A calendar overflow surfaces as a database error and the
        // dropped transaction rolls the status change back
        let user = sqlx::query_as::<_, User>(&user_sql)
            .bind(payment.user_id)
            .bind(payment.period_days)
            .bind(now)
            .fetch_optional(&mut *tx)
            .await?;

        let Some(user) = user else {
            tx.rollback().await?;
            return Ok(ApprovalOutcome::UserMissing { user_id: payment.user_id });
        };

        tx.commit().await?;
        Ok(ApprovalOutcome::Approved { payment, user })
    }

    async fn list_pending(&self) -> Result<Vec<PendingPayment>> {
        let sql = format!(
            "SELECT {PAYMENT_COLUMNS} FROM pending_payments WHERE status = 'pending' ORDER BY created_at DESC, id DESC"
        );
        let payments = sqlx::query_as::<_, PendingPayment>(&sql)
            .fetch_all(&self.pool)
            .await?;

        Ok(payments)
    }

    async fn count_pending(&self) -> Result<i64> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM pending_payments WHERE status = 'pending'")
            .fetch_one(&self.pool)
            .await?;

        Ok(count.0)
    }
}
