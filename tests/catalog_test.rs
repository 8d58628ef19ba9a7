//! Movie catalog: code allocation, views, deletion and search

mod helpers;

use std::collections::HashSet;
use std::sync::Arc;
use assert_matches::assert_matches;
use async_trait::async_trait;
use helpers::*;
use proptest::prelude::*;
use KinoBot::config::CodeStrategy;
use KinoBot::database::{MemoryStorage, MovieStore};
use KinoBot::models::{InsertOutcome, Movie, MovieMetadata};
use KinoBot::services::{ManualClock, MovieCatalog};
use KinoBot::KinoBotError;

fn meta(title: &str) -> MovieMetadata {
    MovieMetadata::titled(title)
}

#[tokio::test]
async fn test_views_and_soft_delete_scenario() {
    let ctx = TestContext::new().await;
    let catalog = &ctx.services.catalog;

    let movie = catalog.add_movie(meta("Interstellar"), "file-a").await.unwrap();
    assert_eq!(movie.code, "1");
    assert_eq!(catalog.get_movie(&movie.code).await.unwrap().view_count, 0);

    for _ in 0..3 {
        catalog.increment_view(&movie.code).await.unwrap();
    }
    assert_eq!(catalog.get_movie(&movie.code).await.unwrap().view_count, 3);

    assert!(catalog.delete_movie(&movie.code, false).await.unwrap());
    assert_matches!(catalog.get_movie(&movie.code).await, Err(KinoBotError::MovieNotFound { .. }));

    let all = catalog.list_movies(true).await.unwrap();
    assert_eq!(all.len(), 1);
    assert!(all[0].is_deleted);
    assert_eq!(all[0].view_count, 3);
    assert!(catalog.list_movies(false).await.unwrap().is_empty());

    // Deleted movies keep their views and ignore new ones
    catalog.increment_view(&movie.code).await.unwrap();
    assert_eq!(catalog.list_movies(true).await.unwrap()[0].view_count, 3);
    assert_eq!(catalog.total_views().await.unwrap(), 3);
    assert_eq!(catalog.count_movies().await.unwrap(), 0);
}

#[tokio::test]
async fn test_smallest_unused_skips_soft_deleted_and_reuses_hard_deleted() {
    let ctx = TestContext::with_strategy(CodeStrategy::SmallestUnused).await;
    let catalog = &ctx.services.catalog;

    let first = catalog.add_movie(meta("A"), "f1").await.unwrap();
    let second = catalog.add_movie(meta("B"), "f2").await.unwrap();
    assert_eq!((first.code.as_str(), second.code.as_str()), ("1", "2"));

    catalog.delete_movie("1", false).await.unwrap();
    assert_eq!(catalog.add_movie(meta("C"), "f3").await.unwrap().code, "3");

    catalog.delete_movie("2", true).await.unwrap();
    assert_eq!(catalog.add_movie(meta("D"), "f4").await.unwrap().code, "2");
}

#[tokio::test]
async fn test_random_tokens_are_not_reused() {
    let ctx = TestContext::with_strategy(CodeStrategy::RandomToken).await;
    let catalog = &ctx.services.catalog;

    let movie = catalog.add_movie(meta("A"), "f1").await.unwrap();
    assert_eq!(movie.code.len(), ctx.settings.catalog.token_length);
    assert!(movie.code.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));

    // Even a hard-deleted token is not handed out again on purpose
    assert!(catalog.delete_movie(&movie.code, true).await.unwrap());
    let next = catalog.add_movie(meta("B"), "f2").await.unwrap();
    assert_ne!(next.code, movie.code);
}

#[tokio::test]
async fn test_random_tokens_exhausted_when_every_code_is_taken() {
    let mut settings = test_settings();
    settings.catalog.code_strategy = CodeStrategy::RandomToken;
    settings.catalog.token_length = 1;
    let ctx = TestContext::with_settings(settings).await;

    for code in ('A'..='Z').chain('0'..='9') {
        let movie = Movie::new(code.to_string(), meta("Filler"), "f".to_string(), start_time());
        assert_matches!(ctx.storage.movies.insert(movie).await.unwrap(), InsertOutcome::Inserted(_));
    }

    let attempts = ctx.settings.catalog.max_allocation_attempts;
    assert_matches!(
        ctx.services.catalog.add_movie(meta("One too many"), "f").await,
        Err(KinoBotError::CapacityExhausted { attempts: a }) if a == attempts
    );
    assert_eq!(ctx.services.catalog.list_movies(true).await.unwrap().len(), 36);
}

/// Movie store whose inserts always lose the uniqueness race
struct AlwaysTaken(MemoryStorage);

#[async_trait]
impl MovieStore for AlwaysTaken {
    async fn list_codes(&self) -> KinoBot::Result<Vec<String>> {
        self.0.list_codes().await
    }
    async fn insert(&self, _movie: Movie) -> KinoBot::Result<InsertOutcome> {
        Ok(InsertOutcome::CodeTaken)
    }
    async fn find(&self, code: &str) -> KinoBot::Result<Option<Movie>> {
        MovieStore::find(&self.0, code).await
    }
    async fn increment_views(&self, code: &str) -> KinoBot::Result<bool> {
        self.0.increment_views(code).await
    }
    async fn soft_delete(&self, code: &str) -> KinoBot::Result<bool> {
        self.0.soft_delete(code).await
    }
    async fn hard_delete(&self, code: &str) -> KinoBot::Result<bool> {
        self.0.hard_delete(code).await
    }
    async fn search(&self, query: &str, limit: usize) -> KinoBot::Result<Vec<Movie>> {
        self.0.search(query, limit).await
    }
    async fn list(&self, include_deleted: bool) -> KinoBot::Result<Vec<Movie>> {
        MovieStore::list(&self.0, include_deleted).await
    }
    async fn count_live(&self) -> KinoBot::Result<i64> {
        self.0.count_live().await
    }
    async fn total_views(&self) -> KinoBot::Result<i64> {
        self.0.total_views().await
    }
}

#[tokio::test]
async fn test_lost_insert_races_end_in_capacity_exhausted() {
    let settings = test_settings();
    for strategy in [CodeStrategy::SmallestUnused, CodeStrategy::RandomToken] {
        let mut config = settings.catalog.clone();
        config.code_strategy = strategy;
        let catalog = MovieCatalog::new(
            Arc::new(AlwaysTaken(MemoryStorage::new())),
            Arc::new(ManualClock::new(start_time())),
            config.clone(),
        );

        assert_matches!(
            catalog.add_movie(meta("Raced"), "f").await,
            Err(KinoBotError::CapacityExhausted { attempts }) if attempts == config.max_allocation_attempts
        );
    }
}

#[tokio::test]
async fn test_add_requires_title_and_file() {
    let ctx = TestContext::new().await;
    assert_matches!(
        ctx.services.catalog.add_movie(meta("   "), "f").await,
        Err(KinoBotError::InvalidInput(_))
    );
    assert_matches!(
        ctx.services.catalog.add_movie(meta("Title"), "").await,
        Err(KinoBotError::InvalidInput(_))
    );
}

#[tokio::test]
async fn test_delete_unknown_movie_is_not_an_error() {
    let ctx = TestContext::new().await;
    assert!(!ctx.services.catalog.delete_movie("77", false).await.unwrap());
    assert!(!ctx.services.catalog.delete_movie("77", true).await.unwrap());
    ctx.services.catalog.increment_view("77").await.unwrap();
}

#[tokio::test]
async fn test_search_is_case_insensitive_limited_and_skips_deleted() {
    let mut settings = test_settings();
    settings.catalog.search_limit = 2;
    let ctx = TestContext::with_settings(settings).await;
    let catalog = &ctx.services.catalog;

    catalog.add_movie(meta("Star Wars"), "f1").await.unwrap();
    catalog.add_movie(meta("Star Trek"), "f2").await.unwrap();
    catalog.add_movie(meta("Lone Star"), "f3").await.unwrap();
    catalog.add_movie(meta("Alien"), "f4").await.unwrap();
    catalog.delete_movie("1", false).await.unwrap();

    let found: Vec<String> = catalog
        .search("STAR")
        .await
        .unwrap()
        .into_iter()
        .map(|m| m.title)
        .collect();
    assert_eq!(found, vec!["Star Trek".to_string(), "Lone Star".to_string()]);

    assert!(catalog.search("   ").await.unwrap().is_empty());
    assert!(catalog.search("matrix").await.unwrap().is_empty());
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn prop_codes_are_distinct(count in 1usize..40, random in any::<bool>()) {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let codes = runtime.block_on(async {
            let strategy = if random { CodeStrategy::RandomToken } else { CodeStrategy::SmallestUnused };
            let ctx = TestContext::with_strategy(strategy).await;
            let mut codes = Vec::new();
            for i in 0..count {
                let movie = ctx
                    .services
                    .catalog
                    .add_movie(meta(&format!("Movie {}", i)), "file")
                    .await
                    .unwrap();
                codes.push(movie.code);
            }
            codes
        });

        let unique: HashSet<&String> = codes.iter().collect();
        prop_assert_eq!(unique.len(), count);
        if !random {
            let expected: HashSet<String> = (1..=count).map(|n| n.to_string()).collect();
            prop_assert_eq!(codes.into_iter().collect::<HashSet<_>>(), expected);
        }
    }
}
