//! User repository implementation

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Row};
use crate::database::store::UserStore;
use crate::models::user::{UpsertOutcome, UpsertUserRequest, User};
use crate::utils::errors::{KinoBotError, Result};

const USER_COLUMNS: &str =
    "id, display_name, handle, joined_at, subscription_until, is_blocked, last_activity_at, failed_attempts";

#[derive(Clone, Debug)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for UserRepository {
    /// Create the user, or refresh name and handle of an existing one
    async fn upsert(&self, request: UpsertUserRequest, now: DateTime<Utc>) -> Result<UpsertOutcome> {
        let sql = format!(
            r#"
            INSERT INTO users (id, display_name, handle, joined_at, last_activity_at)
            VALUES ($1, $2, $3, $4, $4)
            ON CONFLICT (id) DO UPDATE SET
                display_name = COALESCE(EXCLUDED.display_name, users.display_name),
                handle = COALESCE(EXCLUDED.handle, users.handle)
            RETURNING {USER_COLUMNS}, (xmax = 0) AS inserted
            "#
        );

        // xmax is zero only on a freshly inserted tuple
        let row = sqlx::query(&sql)
            .bind(request.id)
            .bind(request.display_name)
            .bind(request.handle)
            .bind(now)
            .fetch_one(&self.pool)
            .await?;

        Ok(UpsertOutcome {
            user: User::from_row(&row)?,
            created: row.try_get("inserted")?,
        })
    }

    async fn find(&self, id: i64) -> Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    async fn touch(&self, id: i64, now: DateTime<Utc>) -> Result<bool> {
        let result = sqlx::query("UPDATE users SET last_activity_at = $2 WHERE id = $1")
            .bind(id)
            .bind(now)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn extend_subscription(&self, id: i64, days: u32, now: DateTime<Utc>) -> Result<Option<User>> {
        let sql = format!(
            r#"
            UPDATE users
            SET subscription_until = GREATEST(COALESCE(subscription_until, $3), $3) + make_interval(days => $2),
                is_blocked = FALSE,
                failed_attempts = 0
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        );

        let days = i32::try_from(days)
            .map_err(|_| KinoBotError::InvalidInput(format!("Extending by {} days overflows the calendar", days)))?;

        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .bind(days)
            .bind(now)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    async fn set_blocked(&self, id: i64, blocked: bool) -> Result<Option<User>> {
        let sql = format!("UPDATE users SET is_blocked = $2 WHERE id = $1 RETURNING {USER_COLUMNS}");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .bind(blocked)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    async fn register_failure(&self, id: i64, threshold: Option<u32>) -> Result<Option<User>> {
        let sql = format!(
            r#"
            UPDATE users
            SET failed_attempts = failed_attempts + 1,
                is_blocked = CASE
                    WHEN $2::INTEGER IS NOT NULL AND failed_attempts + 1 >= $2::INTEGER THEN TRUE
                    ELSE is_blocked
                END
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        );

        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .bind(threshold.map(|t| t as i32))
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    async fn block_inactive_since(&self, cutoff: DateTime<Utc>) -> Result<Vec<i64>> {
        let mut ids = sqlx::query_scalar::<_, i64>(
            r#"
            UPDATE users
            SET is_blocked = TRUE
            WHERE is_blocked = FALSE AND last_activity_at < $1
            RETURNING id
            "#
        )
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await?;

        ids.sort_unstable();
        Ok(ids)
    }

    async fn list_unblocked_ids(&self) -> Result<Vec<i64>> {
        let ids = sqlx::query_scalar::<_, i64>("SELECT id FROM users WHERE is_blocked = FALSE ORDER BY joined_at ASC")
            .fetch_all(&self.pool)
            .await?;

        Ok(ids)
    }

    async fn count(&self) -> Result<i64> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;

        Ok(count.0)
    }

    async fn count_blocked(&self) -> Result<i64> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users WHERE is_blocked = TRUE")
            .fetch_one(&self.pool)
            .await?;

        Ok(count.0)
    }

    async fn count_active_subscriptions(&self, now: DateTime<Utc>) -> Result<i64> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users WHERE subscription_until > $1")
            .bind(now)
            .fetch_one(&self.pool)
            .await?;

        Ok(count.0)
    }
}
