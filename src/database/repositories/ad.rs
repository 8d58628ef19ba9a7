//! Advertisement repository implementation

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use crate::database::store::AdStore;
use crate::models::ad::{Ad, NewAd};
use crate::utils::errors::{KinoBotError, Result};

const AD_COLUMNS: &str =
    "id, image_handle, text, button_text, button_url, scheduled_at, repeat_count, times_sent, created_at";

#[derive(Clone, Debug)]
pub struct AdRepository {
    pool: PgPool,
}

impl AdRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AdStore for AdRepository {
    async fn insert(&self, ad: NewAd, now: DateTime<Utc>) -> Result<Ad> {
        let repeat_count = i32::try_from(ad.repeat_count)
            .map_err(|_| KinoBotError::InvalidInput(format!("Repeat count {} is out of range", ad.repeat_count)))?;

        let sql = format!(
            r#"
            INSERT INTO ads (image_handle, text, button_text, button_url, scheduled_at, repeat_count, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {AD_COLUMNS}
            "#
        );

        let ad = sqlx::query_as::<_, Ad>(&sql)
            .bind(ad.image_handle)
            .bind(ad.text)
            .bind(ad.button_text)
            .bind(ad.button_url)
            .bind(ad.scheduled_at)
            .bind(repeat_count)
            .bind(now)
            .fetch_one(&self.pool)
            .await?;

        Ok(ad)
    }

    async fn find(&self, id: i64) -> Result<Option<Ad>> {
        let sql = format!("SELECT {AD_COLUMNS} FROM ads WHERE id = $1");
        let ad = sqlx::query_as::<_, Ad>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(ad)
    }

    async fn list(&self) -> Result<Vec<Ad>> {
        let sql = format!("SELECT {AD_COLUMNS} FROM ads ORDER BY id ASC");
        let ads = sqlx::query_as::<_, Ad>(&sql)
            .fetch_all(&self.pool)
            .await?;

        Ok(ads)
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM ads WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_due(&self, now: DateTime<Utc>) -> Result<Vec<Ad>> {
        let sql = format!(
            r#"
            SELECT {AD_COLUMNS} FROM ads
            WHERE scheduled_at <= $1 AND times_sent < repeat_count
            ORDER BY scheduled_at ASC, id ASC
            "#
        );
        let ads = sqlx::query_as::<_, Ad>(&sql)
            .bind(now)
            .fetch_all(&self.pool)
            .await?;

        Ok(ads)
    }

    async fn claim_delivery(&self, id: i64, now: DateTime<Utc>, next_at: DateTime<Utc>) -> Result<Option<Ad>> {
        let sql = format!(
            r#"
            UPDATE ads
            SET times_sent = times_sent + 1, scheduled_at = $3
            WHERE id = $1 AND times_sent < repeat_count AND scheduled_at <= $2
            RETURNING {AD_COLUMNS}
            "#
        );

        let ad = sqlx::query_as::<_, Ad>(&sql)
            .bind(id)
            .bind(now)
            .bind(next_at)
            .fetch_optional(&self.pool)
            .await?;

        Ok(ad)
    }
}
