//! Admin and settings repository implementation

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use crate::database::store::{AdminStore, SettingStore};
use crate::models::admin::{Admin, Setting};
use crate::utils::errors::Result;

#[derive(Clone, Debug)]
pub struct AdminRepository {
    pool: PgPool,
}

impl AdminRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SettingStore for AdminRepository {
    /// Get setting by key
    async fn get(&self, key: &str) -> Result<Option<Setting>> {
        let setting = sqlx::query_as::<_, Setting>(
            "SELECT key, value, updated_at FROM settings WHERE key = $1"
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        Ok(setting)
    }

    /// Create or overwrite a setting
    async fn upsert(&self, key: &str, value: &str, now: DateTime<Utc>) -> Result<Setting> {
        let setting = sqlx::query_as::<_, Setting>(
            r#"
            INSERT INTO settings (key, value, updated_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (key)
            DO UPDATE SET
                value = EXCLUDED.value,
                updated_at = EXCLUDED.updated_at
            RETURNING key, value, updated_at
            "#
        )
        .bind(key)
        .bind(value)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        Ok(setting)
    }

    async fn insert_if_absent(&self, key: &str, value: &str, now: DateTime<Utc>) -> Result<bool> {
        let result = sqlx::query(
            "INSERT INTO settings (key, value, updated_at) VALUES ($1, $2, $3) ON CONFLICT (key) DO NOTHING"
        )
        .bind(key)
        .bind(value)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// List all settings
    async fn list(&self) -> Result<Vec<Setting>> {
        let settings = sqlx::query_as::<_, Setting>(
            "SELECT key, value, updated_at FROM settings ORDER BY key ASC"
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(settings)
    }
}

#[async_trait]
impl AdminStore for AdminRepository {
    async fn contains(&self, user_id: i64) -> Result<bool> {
        let found = sqlx::query_scalar::<_, i64>("SELECT user_id FROM admins WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(found.is_some())
    }

    async fn insert(&self, user_id: i64, now: DateTime<Utc>) -> Result<bool> {
        let result = sqlx::query(
            "INSERT INTO admins (user_id, added_at) VALUES ($1, $2) ON CONFLICT (user_id) DO NOTHING"
        )
        .bind(user_id)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn remove(&self, user_id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM admins WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list(&self) -> Result<Vec<Admin>> {
        let admins = sqlx::query_as::<_, Admin>(
            "SELECT user_id, added_at FROM admins ORDER BY added_at ASC, user_id ASC"
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(admins)
    }
}
