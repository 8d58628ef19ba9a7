//! In-process storage backend
//!
//! Mirrors the PostgreSQL semantics with a single mutex-guarded state, so each
//! call is atomic the same way the corresponding SQL statement is. Used by the
//! test suites and when `database.url` is `memory://`.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use crate::database::store::{AdStore, AdminStore, MovieStore, PaymentStore, SettingStore, UserStore};
use crate::models::{
    extended_expiry, Ad, Admin, ApprovalOutcome, InsertOutcome, Movie, NewAd, PaymentStatus,
    PendingPayment, Setting, SubmitPaymentRequest, TransitionOutcome, UpsertOutcome,
    UpsertUserRequest, User,
};
use crate::utils::errors::{KinoBotError, Result, StorageError};

#[derive(Debug, Default)]
struct MemoryState {
    users: HashMap<i64, User>,
    movies: HashMap<String, Movie>,
    payments: BTreeMap<i64, PendingPayment>,
    next_payment_id: i64,
    settings: BTreeMap<String, Setting>,
    admins: BTreeMap<i64, Admin>,
    ads: BTreeMap<i64, Ad>,
    next_ad_id: i64,
}

#[derive(Debug, Default)]
pub struct MemoryStorage {
    state: Mutex<MemoryState>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, MemoryState>> {
        self.state
            .lock()
            .map_err(|e| StorageError::Backend(format!("memory store poisoned: {}", e)).into())
    }
}

fn column_i32(value: u32, what: &str) -> Result<i32> {
    i32::try_from(value).map_err(|_| KinoBotError::InvalidInput(format!("{} {} is out of range", what, value)))
}

/// Numeric-looking codes sort by magnitude, then lexically
fn code_order(movie: &Movie) -> (usize, String) {
    (movie.code.len(), movie.code.clone())
}

#[async_trait]
impl UserStore for MemoryStorage {
    async fn upsert(&self, request: UpsertUserRequest, now: DateTime<Utc>) -> Result<UpsertOutcome> {
        let mut state = self.lock()?;
        if let Some(existing) = state.users.get_mut(&request.id) {
            if request.display_name.is_some() {
                existing.display_name = request.display_name;
            }
            if request.handle.is_some() {
                existing.handle = request.handle;
            }
            return Ok(UpsertOutcome { user: existing.clone(), created: false });
        }

        let user = User::new(request, now);
        state.users.insert(user.id, user.clone());
        Ok(UpsertOutcome { user, created: true })
    }

    async fn find(&self, id: i64) -> Result<Option<User>> {
        Ok(self.lock()?.users.get(&id).cloned())
    }

    async fn touch(&self, id: i64, now: DateTime<Utc>) -> Result<bool> {
        let mut state = self.lock()?;
        Ok(match state.users.get_mut(&id) {
            Some(user) => {
                user.last_activity_at = now;
                true
            }
            None => false,
        })
    }

    async fn extend_subscription(&self, id: i64, days: u32, now: DateTime<Utc>) -> Result<Option<User>> {
        let mut state = self.lock()?;
        let Some(user) = state.users.get_mut(&id) else {
            return Ok(None);
        };
        // Computed before any field changes so an overflow leaves the row untouched
        let until = extended_expiry(user.subscription_until, now, days)?;
        user.subscription_until = Some(until);
        user.is_blocked = false;
        user.failed_attempts = 0;
        Ok(Some(user.clone()))
    }

    async fn set_blocked(&self, id: i64, blocked: bool) -> Result<Option<User>> {
        let mut state = self.lock()?;
        Ok(state.users.get_mut(&id).map(|user| {
            user.is_blocked = blocked;
            user.clone()
        }))
    }

    async fn register_failure(&self, id: i64, threshold: Option<u32>) -> Result<Option<User>> {
        let mut state = self.lock()?;
        Ok(state.users.get_mut(&id).map(|user| {
            user.failed_attempts += 1;
            if let Some(limit) = threshold {
                if user.failed_attempts >= limit as i32 {
                    user.is_blocked = true;
                }
            }
            user.clone()
        }))
    }

    async fn block_inactive_since(&self, cutoff: DateTime<Utc>) -> Result<Vec<i64>> {
        let mut state = self.lock()?;
        let mut blocked: Vec<i64> = state
            .users
            .values_mut()
            .filter(|user| !user.is_blocked && user.last_activity_at < cutoff)
            .map(|user| {
                user.is_blocked = true;
                user.id
            })
            .collect();
        blocked.sort_unstable();
        Ok(blocked)
    }

    async fn list_unblocked_ids(&self) -> Result<Vec<i64>> {
        let state = self.lock()?;
        let mut users: Vec<&User> = state.users.values().filter(|u| !u.is_blocked).collect();
        users.sort_by_key(|u| (u.joined_at, u.id));
        Ok(users.into_iter().map(|u| u.id).collect())
    }

    async fn count(&self) -> Result<i64> {
        Ok(self.lock()?.users.len() as i64)
    }

    async fn count_blocked(&self) -> Result<i64> {
        Ok(self.lock()?.users.values().filter(|u| u.is_blocked).count() as i64)
    }

    async fn count_active_subscriptions(&self, now: DateTime<Utc>) -> Result<i64> {
        Ok(self
            .lock()?
            .users
            .values()
            .filter(|u| u.has_active_subscription(now))
            .count() as i64)
    }
}

#[async_trait]
impl MovieStore for MemoryStorage {
    async fn list_codes(&self) -> Result<Vec<String>> {
        Ok(self.lock()?.movies.keys().cloned().collect())
    }

    async fn insert(&self, movie: Movie) -> Result<InsertOutcome> {
        let mut state = self.lock()?;
        if state.movies.contains_key(&movie.code) {
            return Ok(InsertOutcome::CodeTaken);
        }
        state.movies.insert(movie.code.clone(), movie.clone());
        Ok(InsertOutcome::Inserted(movie))
    }

    async fn find(&self, code: &str) -> Result<Option<Movie>> {
        Ok(self.lock()?.movies.get(code).cloned())
    }

    async fn increment_views(&self, code: &str) -> Result<bool> {
        let mut state = self.lock()?;
        Ok(match state.movies.get_mut(code) {
            Some(movie) if !movie.is_deleted => {
                movie.view_count += 1;
                true
            }
            _ => false,
        })
    }

    async fn soft_delete(&self, code: &str) -> Result<bool> {
        let mut state = self.lock()?;
        Ok(match state.movies.get_mut(code) {
            Some(movie) if !movie.is_deleted => {
                movie.is_deleted = true;
                true
            }
            _ => false,
        })
    }

    async fn hard_delete(&self, code: &str) -> Result<bool> {
        Ok(self.lock()?.movies.remove(code).is_some())
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<Movie>> {
        let needle = query.to_lowercase();
        let state = self.lock()?;
        let mut found: Vec<Movie> = state
            .movies
            .values()
            .filter(|m| !m.is_deleted && m.matches(&needle))
            .cloned()
            .collect();
        found.sort_by_key(code_order);
        found.truncate(limit);
        Ok(found)
    }

    async fn list(&self, include_deleted: bool) -> Result<Vec<Movie>> {
        let state = self.lock()?;
        let mut movies: Vec<Movie> = state
            .movies
            .values()
            .filter(|m| include_deleted || !m.is_deleted)
            .cloned()
            .collect();
        movies.sort_by_key(code_order);
        Ok(movies)
    }

    async fn count_live(&self) -> Result<i64> {
        Ok(self.lock()?.movies.values().filter(|m| !m.is_deleted).count() as i64)
    }

    async fn total_views(&self) -> Result<i64> {
        Ok(self.lock()?.movies.values().map(|m| m.view_count).sum())
    }
}

#[async_trait]
impl PaymentStore for MemoryStorage {
    async fn insert(&self, request: SubmitPaymentRequest, now: DateTime<Utc>) -> Result<PendingPayment> {
        let period_days = column_i32(request.period_days, "Period")?;
        let mut state = self.lock()?;
        state.next_payment_id += 1;
        let payment = PendingPayment {
            id: state.next_payment_id,
            user_id: request.user_id,
            amount: request.amount,
            period_days,
            proof_handle: request.proof_handle,
            status: PaymentStatus::Pending,
            decided_by: None,
            decided_at: None,
            created_at: now,
        };
        state.payments.insert(payment.id, payment.clone());
        Ok(payment)
    }

    async fn find(&self, id: i64) -> Result<Option<PendingPayment>> {
        Ok(self.lock()?.payments.get(&id).cloned())
    }

    async fn transition(
        &self,
        id: i64,
        status: PaymentStatus,
        decided_by: i64,
        now: DateTime<Utc>,
    ) -> Result<TransitionOutcome> {
        let mut state = self.lock()?;
        Ok(match state.payments.get_mut(&id) {
            Some(payment) if payment.is_pending() => {
                payment.status = status;
                payment.decided_by = Some(decided_by);
                payment.decided_at = Some(now);
                TransitionOutcome::Applied(payment.clone())
            }
            Some(payment) => TransitionOutcome::AlreadyDecided(payment.clone()),
            None => TransitionOutcome::Missing,
        })
    }

    async fn approve(&self, id: i64, decided_by: i64, now: DateTime<Utc>) -> Result<ApprovalOutcome> {
        let mut guard = self.lock()?;
        let state = &mut *guard;

        let payment = match state.payments.get_mut(&id) {
            Some(payment) if payment.is_pending() => payment,
            Some(payment) => return Ok(ApprovalOutcome::AlreadyDecided(payment.clone())),
            None => return Ok(ApprovalOutcome::Missing),
        };
        let Some(user) = state.users.get_mut(&payment.user_id) else {
            return Ok(ApprovalOutcome::UserMissing { user_id: payment.user_id });
        };

        let days = u32::try_from(payment.period_days).map_err(|_| {
            KinoBotError::InvalidInput(format!("Payment {} has a negative period", payment.id))
        })?;
        let until = extended_expiry(user.subscription_until, now, days)?;

        payment.status = PaymentStatus::Approved;
        payment.decided_by = Some(decided_by);
        payment.decided_at = Some(now);
        user.subscription_until = Some(until);
        user.is_blocked = false;
        user.failed_attempts = 0;

        Ok(ApprovalOutcome::Approved {
            payment: payment.clone(),
            user: user.clone(),
        })
    }

    async fn list_pending(&self) -> Result<Vec<PendingPayment>> {
        let state = self.lock()?;
        let mut pending: Vec<PendingPayment> = state
            .payments
            .values()
            .filter(|p| p.is_pending())
            .cloned()
            .collect();
        pending.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(pending)
    }

    async fn count_pending(&self) -> Result<i64> {
        Ok(self.lock()?.payments.values().filter(|p| p.is_pending()).count() as i64)
    }
}

#[async_trait]
impl SettingStore for MemoryStorage {
    async fn get(&self, key: &str) -> Result<Option<Setting>> {
        Ok(self.lock()?.settings.get(key).cloned())
    }

    async fn upsert(&self, key: &str, value: &str, now: DateTime<Utc>) -> Result<Setting> {
        let setting = Setting {
            key: key.to_string(),
            value: value.to_string(),
            updated_at: now,
        };
        self.lock()?.settings.insert(key.to_string(), setting.clone());
        Ok(setting)
    }

    async fn insert_if_absent(&self, key: &str, value: &str, now: DateTime<Utc>) -> Result<bool> {
        let mut state = self.lock()?;
        if state.settings.contains_key(key) {
            return Ok(false);
        }
        state.settings.insert(
            key.to_string(),
            Setting {
                key: key.to_string(),
                value: value.to_string(),
                updated_at: now,
            },
        );
        Ok(true)
    }

    async fn list(&self) -> Result<Vec<Setting>> {
        Ok(self.lock()?.settings.values().cloned().collect())
    }
}

#[async_trait]
impl AdminStore for MemoryStorage {
    async fn contains(&self, user_id: i64) -> Result<bool> {
        Ok(self.lock()?.admins.contains_key(&user_id))
    }

    async fn insert(&self, user_id: i64, now: DateTime<Utc>) -> Result<bool> {
        let mut state = self.lock()?;
        if state.admins.contains_key(&user_id) {
            return Ok(false);
        }
        state.admins.insert(user_id, Admin { user_id, added_at: now });
        Ok(true)
    }

    async fn remove(&self, user_id: i64) -> Result<bool> {
        Ok(self.lock()?.admins.remove(&user_id).is_some())
    }

    async fn list(&self) -> Result<Vec<Admin>> {
        let state = self.lock()?;
        let mut admins: Vec<Admin> = state.admins.values().cloned().collect();
        admins.sort_by_key(|a| (a.added_at, a.user_id));
        Ok(admins)
    }
}

#[async_trait]
impl AdStore for MemoryStorage {
    async fn insert(&self, ad: NewAd, now: DateTime<Utc>) -> Result<Ad> {
        let repeat_count = column_i32(ad.repeat_count, "Repeat count")?;
        let mut state = self.lock()?;
        state.next_ad_id += 1;
        let ad = Ad {
            id: state.next_ad_id,
            image_handle: ad.image_handle,
            text: ad.text,
            button_text: ad.button_text,
            button_url: ad.button_url,
            scheduled_at: ad.scheduled_at,
            repeat_count,
            times_sent: 0,
            created_at: now,
        };
        state.ads.insert(ad.id, ad.clone());
        Ok(ad)
    }

    async fn find(&self, id: i64) -> Result<Option<Ad>> {
        Ok(self.lock()?.ads.get(&id).cloned())
    }

    async fn list(&self) -> Result<Vec<Ad>> {
        Ok(self.lock()?.ads.values().cloned().collect())
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        Ok(self.lock()?.ads.remove(&id).is_some())
    }

    async fn list_due(&self, now: DateTime<Utc>) -> Result<Vec<Ad>> {
        let state = self.lock()?;
        let mut due: Vec<Ad> = state.ads.values().filter(|ad| ad.is_due(now)).cloned().collect();
        due.sort_by_key(|ad| (ad.scheduled_at, ad.id));
        Ok(due)
    }

    async fn claim_delivery(&self, id: i64, now: DateTime<Utc>, next_at: DateTime<Utc>) -> Result<Option<Ad>> {
        let mut state = self.lock()?;
        Ok(match state.ads.get_mut(&id) {
            Some(ad) if ad.is_due(now) => {
                ad.times_sent += 1;
                ad.scheduled_at = next_at;
                Some(ad.clone())
            }
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn movie(code: &str) -> Movie {
        Movie::new(
            code.to_string(),
            crate::models::MovieMetadata::titled(format!("Movie {}", code)),
            format!("file-{}", code),
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn test_insert_reports_code_clash() {
        let store = MemoryStorage::new();
        let movies: &dyn MovieStore = &store;

        assert!(matches!(movies.insert(movie("1")).await.unwrap(), InsertOutcome::Inserted(_)));
        assert_eq!(movies.insert(movie("1")).await.unwrap(), InsertOutcome::CodeTaken);
    }

    #[tokio::test]
    async fn test_list_orders_codes_numerically() {
        let store = MemoryStorage::new();
        let movies: &dyn MovieStore = &store;
        for code in ["10", "2", "1"] {
            movies.insert(movie(code)).await.unwrap();
        }

        let codes: Vec<String> = movies.list(true).await.unwrap().into_iter().map(|m| m.code).collect();
        assert_eq!(codes, vec!["1", "2", "10"]);
    }

    #[tokio::test]
    async fn test_transition_is_single_shot() {
        let store = MemoryStorage::new();
        let payments: &dyn PaymentStore = &store;
        let now = Utc::now();
        let payment = payments
            .insert(
                SubmitPaymentRequest {
                    user_id: 5,
                    amount: 35000,
                    period_days: 30,
                    proof_handle: "receipt".to_string(),
                },
                now,
            )
            .await
            .unwrap();

        let first = payments.transition(payment.id, PaymentStatus::Approved, 1, now).await.unwrap();
        assert!(matches!(first, TransitionOutcome::Applied(ref p) if p.status == PaymentStatus::Approved));

        let second = payments.transition(payment.id, PaymentStatus::Rejected, 2, now).await.unwrap();
        assert!(matches!(second, TransitionOutcome::AlreadyDecided(ref p) if p.decided_by == Some(1)));

        assert_eq!(payments.transition(99, PaymentStatus::Rejected, 2, now).await.unwrap(), TransitionOutcome::Missing);
    }

    fn user_request(id: i64) -> UpsertUserRequest {
        UpsertUserRequest {
            id,
            display_name: Some("Payer".to_string()),
            handle: None,
        }
    }

    #[tokio::test]
    async fn test_upsert_reports_creation_once() {
        let store = MemoryStorage::new();
        let users: &dyn UserStore = &store;

        assert!(users.upsert(user_request(5), Utc::now()).await.unwrap().created);
        assert!(!users.upsert(user_request(5), Utc::now()).await.unwrap().created);
    }

    #[tokio::test]
    async fn test_overflowing_extension_leaves_state_usable() {
        let store = MemoryStorage::new();
        let users: &dyn UserStore = &store;
        let now = Utc::now();
        users.upsert(user_request(5), now).await.unwrap();

        let result = users.extend_subscription(5, u32::MAX, now).await;
        assert!(matches!(result, Err(KinoBotError::InvalidInput(_))));

        let user = users.find(5).await.unwrap().unwrap();
        assert!(user.subscription_until.is_none());
    }

    #[tokio::test]
    async fn test_approve_rolls_back_on_overflow() {
        let store = MemoryStorage::new();
        let now = Utc::now();
        UserStore::upsert(&store, user_request(5), now).await.unwrap();
        let payment = PaymentStore::insert(
            &store,
            SubmitPaymentRequest {
                user_id: 5,
                amount: 35000,
                period_days: i32::MAX as u32,
                proof_handle: "receipt".to_string(),
            },
            now,
        )
        .await
        .unwrap();

        let result = store.approve(payment.id, 1, now).await;
        assert!(matches!(result, Err(KinoBotError::InvalidInput(_))));

        let stored = PaymentStore::find(&store, payment.id).await.unwrap().unwrap();
        assert_eq!(stored.status, PaymentStatus::Pending);
        assert!(UserStore::find(&store, 5).await.unwrap().unwrap().subscription_until.is_none());
    }

    #[tokio::test]
    async fn test_insert_rejects_period_past_i32() {
        let store = MemoryStorage::new();
        let result = PaymentStore::insert(
            &store,
            SubmitPaymentRequest {
                user_id: 5,
                amount: 1,
                period_days: u32::MAX,
                proof_handle: "receipt".to_string(),
            },
            Utc::now(),
        )
        .await;
        assert!(matches!(result, Err(KinoBotError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_ad_claim_stops_after_repeat_count() {
        let store = MemoryStorage::new();
        let ads: &dyn AdStore = &store;
        let now = Utc::now();
        let ad = ads
            .insert(
                NewAd {
                    image_handle: None,
                    text: "Premiere tonight".to_string(),
                    button_text: None,
                    button_url: None,
                    scheduled_at: now,
                    repeat_count: 1,
                },
                now,
            )
            .await
            .unwrap();

        let later = now + chrono::Duration::hours(1);
        let claimed = ads.claim_delivery(ad.id, now, later).await.unwrap().unwrap();
        assert_eq!(claimed.times_sent, 1);
        assert_eq!(claimed.scheduled_at, later);

        assert!(ads.claim_delivery(ad.id, later, later).await.unwrap().is_none());
        assert!(ads.list_due(later).await.unwrap().is_empty());
    }
}
