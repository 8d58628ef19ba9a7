//! Database module
//!
//! This module handles database connections and the storage backends

pub mod connection;
pub mod memory;
pub mod repositories;
pub mod service;
pub mod store;

// Re-export commonly used database components
pub use connection::{DatabasePool, PoolConfig, create_pool, run_migrations, health_check};
pub use memory::MemoryStorage;
pub use repositories::{UserRepository, MovieRepository, PaymentRepository, AdminRepository, AdRepository};
pub use service::DatabaseService;
pub use store::{Storage, UserStore, MovieStore, PaymentStore, SettingStore, AdminStore, AdStore};
