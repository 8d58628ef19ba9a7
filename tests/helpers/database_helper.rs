//! Test database helper utilities
//!
//! PostgreSQL tests run only when `TEST_DATABASE_URL` points at a database
//! they may freely truncate.

use sqlx::PgPool;
use KinoBot::database::{run_migrations, DatabaseService, Storage};

pub struct TestDatabase {
    pub pool: PgPool,
}

impl TestDatabase {
    /// Connect, migrate and clear all tables; `None` when no database is configured
    pub async fn from_env() -> Option<Self> {
        let url = std::env::var("TEST_DATABASE_URL").ok()?;
        let pool = PgPool::connect(&url).await.expect("Failed to connect to test database");
        run_migrations(&pool).await.expect("Failed to run migrations");

        let db = Self { pool };
        db.clean().await;
        Some(db)
    }

    pub async fn clean(&self) {
        sqlx::query("TRUNCATE users, movies, pending_payments, settings, admins, ads RESTART IDENTITY")
            .execute(&self.pool)
            .await
            .expect("Failed to truncate tables");
    }

    pub fn storage(&self) -> Storage {
        DatabaseService::new(self.pool.clone()).storage()
    }
}
