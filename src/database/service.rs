//! Database service layer
//!
//! Groups the PostgreSQL repositories and exposes them as storage capabilities

use std::sync::Arc;
use crate::database::{DatabasePool, UserRepository, MovieRepository, PaymentRepository, AdminRepository, AdRepository};
use crate::database::store::Storage;

#[derive(Debug, Clone)]
pub struct DatabaseService {
    pub users: UserRepository,
    pub movies: MovieRepository,
    pub payments: PaymentRepository,
    pub admin: AdminRepository,
    pub ads: AdRepository,
}

impl DatabaseService {
    pub fn new(pool: DatabasePool) -> Self {
        Self {
            users: UserRepository::new(pool.clone()),
            movies: MovieRepository::new(pool.clone()),
            payments: PaymentRepository::new(pool.clone()),
            admin: AdminRepository::new(pool.clone()),
            ads: AdRepository::new(pool),
        }
    }

    /// Storage handles backed by the repositories
    pub fn storage(&self) -> Storage {
        let admin = Arc::new(self.admin.clone());
        Storage {
            users: Arc::new(self.users.clone()),
            movies: Arc::new(self.movies.clone()),
            payments: Arc::new(self.payments.clone()),
            settings: admin.clone(),
            admins: admin,
            ads: Arc::new(self.ads.clone()),
        }
    }
}
