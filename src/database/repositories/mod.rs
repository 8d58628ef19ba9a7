//! Database repositories module
//!
//! PostgreSQL implementations of the storage capability traits

pub mod user;
pub mod movie;
pub mod payment;
pub mod admin;
pub mod ad;

// Re-export repositories
pub use user::UserRepository;
pub use movie::MovieRepository;
pub use payment::PaymentRepository;
pub use admin::AdminRepository;
pub use ad::AdRepository;
