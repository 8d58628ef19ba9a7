//! Persistence capability traits
//!
//! The services own no connections; they talk to these traits. Every method
//! is a single storage operation with its own scoped acquisition, and the
//! ones documented as atomic must be implemented as one conditional write.

use std::sync::Arc;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use crate::models::{
    Ad, Admin, ApprovalOutcome, InsertOutcome, Movie, NewAd, PaymentStatus, PendingPayment, Setting,
    SubmitPaymentRequest, TransitionOutcome, UpsertOutcome, UpsertUserRequest, User,
};
use crate::utils::errors::Result;

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert if absent; an existing row only gets its informational fields refreshed
    async fn upsert(&self, request: UpsertUserRequest, now: DateTime<Utc>) -> Result<UpsertOutcome>;

    async fn find(&self, id: i64) -> Result<Option<User>>;

    /// Returns false when the user does not exist
    async fn touch(&self, id: i64, now: DateTime<Utc>) -> Result<bool>;

    /// Atomically set expiry to `max(now, current) + days`, unblock and reset
    /// failures. A period past the calendar range is an error, never a wrap.
    async fn extend_subscription(&self, id: i64, days: u32, now: DateTime<Utc>) -> Result<Option<User>>;

    async fn set_blocked(&self, id: i64, blocked: bool) -> Result<Option<User>>;

    /// Atomically bump `failed_attempts` and block when it reaches `threshold`
    async fn register_failure(&self, id: i64, threshold: Option<u32>) -> Result<Option<User>>;

    /// Block every unblocked user idle since before `cutoff`, returning their ids
    async fn block_inactive_since(&self, cutoff: DateTime<Utc>) -> Result<Vec<i64>>;

    async fn list_unblocked_ids(&self) -> Result<Vec<i64>>;

    async fn count(&self) -> Result<i64>;

    async fn count_blocked(&self) -> Result<i64>;

    async fn count_active_subscriptions(&self, now: DateTime<Utc>) -> Result<i64>;
}

#[async_trait]
pub trait MovieStore: Send + Sync {
    /// Every code in use, deleted rows included
    async fn list_codes(&self) -> Result<Vec<String>>;

    /// Insert guarded by code uniqueness; a clash is reported, not raised
    async fn insert(&self, movie: Movie) -> Result<InsertOutcome>;

    /// Lookup including soft-deleted rows
    async fn find(&self, code: &str) -> Result<Option<Movie>>;

    /// Increment views of a live movie; false when nothing matched
    async fn increment_views(&self, code: &str) -> Result<bool>;

    /// Flag the row deleted; false when absent or already deleted
    async fn soft_delete(&self, code: &str) -> Result<bool>;

    /// Remove the row; false when absent
    async fn hard_delete(&self, code: &str) -> Result<bool>;

    /// Live movies matching title, description or code, ordered by code
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<Movie>>;

    async fn list(&self, include_deleted: bool) -> Result<Vec<Movie>>;

    async fn count_live(&self) -> Result<i64>;

    async fn total_views(&self) -> Result<i64>;
}

#[async_trait]
pub trait PaymentStore: Send + Sync {
    async fn insert(&self, request: SubmitPaymentRequest, now: DateTime<Utc>) -> Result<PendingPayment>;

    async fn find(&self, id: i64) -> Result<Option<PendingPayment>>;

    /// Compare-and-swap on `status = pending`
    async fn transition(
        &self,
        id: i64,
        status: PaymentStatus,
        decided_by: i64,
        now: DateTime<Utc>,
    ) -> Result<TransitionOutcome>;

    /// Compare-and-swap to `approved` and extend the payer's subscription by
    /// the payment period as one atomic unit. When any part fails nothing is
    /// written and the payment stays pending.
    async fn approve(&self, id: i64, decided_by: i64, now: DateTime<Utc>) -> Result<ApprovalOutcome>;

    /// Pending rows, newest first
    async fn list_pending(&self) -> Result<Vec<PendingPayment>>;

    async fn count_pending(&self) -> Result<i64>;
}

#[async_trait]
pub trait SettingStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Setting>>;

    async fn upsert(&self, key: &str, value: &str, now: DateTime<Utc>) -> Result<Setting>;

    /// Write only when the key is absent; true when written
    async fn insert_if_absent(&self, key: &str, value: &str, now: DateTime<Utc>) -> Result<bool>;

    async fn list(&self) -> Result<Vec<Setting>>;
}

#[async_trait]
pub trait AdminStore: Send + Sync {
    async fn contains(&self, user_id: i64) -> Result<bool>;

    /// True when newly added
    async fn insert(&self, user_id: i64, now: DateTime<Utc>) -> Result<bool>;

    /// True when a row was removed
    async fn remove(&self, user_id: i64) -> Result<bool>;

    async fn list(&self) -> Result<Vec<Admin>>;
}

#[async_trait]
pub trait AdStore: Send + Sync {
    async fn insert(&self, ad: NewAd, now: DateTime<Utc>) -> Result<Ad>;

    async fn find(&self, id: i64) -> Result<Option<Ad>>;

    /// All ads by id
    async fn list(&self) -> Result<Vec<Ad>>;

    /// True when a row was removed
    async fn delete(&self, id: i64) -> Result<bool>;

    /// Ads scheduled at or before `now` with deliveries left, by schedule time
    async fn list_due(&self, now: DateTime<Utc>) -> Result<Vec<Ad>>;

    /// Claim one delivery: bump `times_sent` and move the schedule to
    /// `next_at`, only while deliveries are left and the ad is still due at
    /// `now`. `None` when the claim lost or the ad is gone.
    async fn claim_delivery(&self, id: i64, now: DateTime<Utc>, next_at: DateTime<Utc>) -> Result<Option<Ad>>;
}

/// Bundle of storage capabilities handed to the service layer
#[derive(Clone)]
pub struct Storage {
    pub users: Arc<dyn UserStore>,
    pub movies: Arc<dyn MovieStore>,
    pub payments: Arc<dyn PaymentStore>,
    pub settings: Arc<dyn SettingStore>,
    pub admins: Arc<dyn AdminStore>,
    pub ads: Arc<dyn AdStore>,
}

impl Storage {
    /// Build from a single backend implementing every capability
    pub fn from_backend<B>(backend: Arc<B>) -> Self
    where
        B: UserStore + MovieStore + PaymentStore + SettingStore + AdminStore + AdStore + 'static,
    {
        Self {
            users: backend.clone(),
            movies: backend.clone(),
            payments: backend.clone(),
            settings: backend.clone(),
            admins: backend.clone(),
            ads: backend,
        }
    }
}

impl std::fmt::Debug for Storage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Storage").finish_non_exhaustive()
    }
}
