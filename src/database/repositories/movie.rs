//! Movie repository implementation

use async_trait::async_trait;
use sqlx::PgPool;
use crate::database::store::MovieStore;
use crate::models::movie::{InsertOutcome, Movie};
use crate::utils::errors::Result;
use crate::utils::helpers::escape_like;

const MOVIE_COLUMNS: &str =
    "code, title, description, quality, year, language, rating, file_handle, view_count, is_deleted, created_at";

#[derive(Clone, Debug)]
pub struct MovieRepository {
    pool: PgPool,
}

impl MovieRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MovieStore for MovieRepository {
    async fn list_codes(&self) -> Result<Vec<String>> {
        let codes = sqlx::query_scalar::<_, String>("SELECT code FROM movies")
            .fetch_all(&self.pool)
            .await?;

        Ok(codes)
    }

    async fn insert(&self, movie: Movie) -> Result<InsertOutcome> {
        let sql = format!(
            r#"
            INSERT INTO movies (code, title, description, quality, year, language, rating, file_handle, view_count, is_deleted, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ON CONFLICT (code) DO NOTHING
            RETURNING {MOVIE_COLUMNS}
            "#
        );

        let inserted = sqlx::query_as::<_, Movie>(&sql)
            .bind(movie.code)
            .bind(movie.title)
            .bind(movie.description)
            .bind(movie.quality)
            .bind(movie.year)
            .bind(movie.language)
            .bind(movie.rating)
            .bind(movie.file_handle)
            .bind(movie.view_count)
            .bind(movie.is_deleted)
            .bind(movie.created_at)
            .fetch_optional(&self.pool)
            .await?;

        Ok(match inserted {
            Some(movie) => InsertOutcome::Inserted(movie),
            None => InsertOutcome::CodeTaken,
        })
    }

    async fn find(&self, code: &str) -> Result<Option<Movie>> {
        let sql = format!("SELECT {MOVIE_COLUMNS} FROM movies WHERE code = $1");
        let movie = sqlx::query_as::<_, Movie>(&sql)
            .bind(code)
            .fetch_optional(&self.pool)
            .await?;

        Ok(movie)
    }

    async fn increment_views(&self, code: &str) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE movies SET view_count = view_count + 1 WHERE code = $1 AND is_deleted = FALSE"
        )
        .bind(code)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn soft_delete(&self, code: &str) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE movies SET is_deleted = TRUE WHERE code = $1 AND is_deleted = FALSE"
        )
        .bind(code)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn hard_delete(&self, code: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM movies WHERE code = $1")
            .bind(code)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<Movie>> {
        let sql = format!(
            r#"
            SELECT {MOVIE_COLUMNS} FROM movies
            WHERE is_deleted = FALSE
              AND (title ILIKE $1 OR COALESCE(description, '') ILIKE $1 OR code ILIKE $1)
            ORDER BY LENGTH(code), code
            LIMIT $2
            "#
        );

        let movies = sqlx::query_as::<_, Movie>(&sql)
            .bind(format!("%{}%", escape_like(query)))
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await?;

        Ok(movies)
    }

    async fn list(&self, include_deleted: bool) -> Result<Vec<Movie>> {
        let sql = format!(
            "SELECT {MOVIE_COLUMNS} FROM movies WHERE ($1 OR is_deleted = FALSE) ORDER BY LENGTH(code), code"
        );
        let movies = sqlx::query_as::<_, Movie>(&sql)
            .bind(include_deleted)
            .fetch_all(&self.pool)
            .await?;

        Ok(movies)
    }

    async fn count_live(&self) -> Result<i64> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM movies WHERE is_deleted = FALSE")
            .fetch_one(&self.pool)
            .await?;

        Ok(count.0)
    }

    async fn total_views(&self) -> Result<i64> {
        let total: (i64,) = sqlx::query_as("SELECT COALESCE(SUM(view_count), 0)::BIGINT FROM movies")
            .fetch_one(&self.pool)
            .await?;

        Ok(total.0)
    }
}
