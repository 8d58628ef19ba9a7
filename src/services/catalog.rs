//! Movie catalog service
//!
//! Code allocation follows the configured [`CodeStrategy`]:
//!
//! * `SmallestUnused` hands out the smallest positive integer not used by any
//!   row, deleted rows included. A hard-deleted code becomes free again.
//! * `RandomToken` draws a fixed-length uppercase alphanumeric token. Codes are
//!   never deliberately reused.
//!
//! In both schemes the insert itself is guarded by the storage uniqueness
//! constraint; a clash triggers a fresh allocation, up to
//! `max_allocation_attempts` tries.

use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};
use crate::config::{CatalogConfig, CodeStrategy};
use crate::database::store::MovieStore;
use crate::models::{InsertOutcome, Movie, MovieMetadata};
use crate::services::clock::Clock;
use crate::utils::errors::{KinoBotError, Result};
use crate::utils::helpers::{generate_random_string, normalize_whitespace};

#[derive(Clone)]
pub struct MovieCatalog {
    movies: Arc<dyn MovieStore>,
    clock: Arc<dyn Clock>,
    config: CatalogConfig,
}

impl MovieCatalog {
    pub fn new(movies: Arc<dyn MovieStore>, clock: Arc<dyn Clock>, config: CatalogConfig) -> Self {
        Self { movies, clock, config }
    }

    pub fn strategy(&self) -> CodeStrategy {
        self.config.code_strategy
    }

    /// Propose a code not currently present in the catalog
    pub async fn allocate_code(&self) -> Result<String> {
        match self.config.code_strategy {
            CodeStrategy::SmallestUnused => {
                let used: HashSet<u64> = self
                    .movies
                    .list_codes()
                    .await?
                    .iter()
                    .filter_map(|c| c.parse::<u64>().ok())
                    .collect();
                Ok(smallest_unused(&used).to_string())
            }
            CodeStrategy::RandomToken => {
                let used: HashSet<String> = self.movies.list_codes().await?.into_iter().collect();
                for _ in 0..self.config.max_allocation_attempts {
                    let token = generate_random_string(self.config.token_length);
                    if !used.contains(&token) {
                        return Ok(token);
                    }
                }
                Err(KinoBotError::CapacityExhausted {
                    attempts: self.config.max_allocation_attempts,
                })
            }
        }
    }

    /// Allocate a code and persist the movie under it
    pub async fn add_movie(&self, metadata: MovieMetadata, file_handle: &str) -> Result<Movie> {
        let title = metadata.title.trim();
        if title.is_empty() {
            return Err(KinoBotError::InvalidInput("Movie title is required".to_string()));
        }
        if file_handle.trim().is_empty() {
            return Err(KinoBotError::InvalidInput("Movie file is required".to_string()));
        }

        let metadata = MovieMetadata {
            title: title.to_string(),
            ..metadata
        };

        for attempt in 1..=self.config.max_allocation_attempts {
            let code = self.allocate_code().await?;
            let movie = Movie::new(code.clone(), metadata.clone(), file_handle.to_string(), self.clock.now());

            match self.movies.insert(movie).await? {
                InsertOutcome::Inserted(movie) => {
                    info!(code = %movie.code, title = %movie.title, "Movie added");
                    return Ok(movie);
                }
                InsertOutcome::CodeTaken => {
                    debug!(code = %code, attempt = attempt, "Code taken concurrently, reallocating");
                }
            }
        }

        warn!(attempts = self.config.max_allocation_attempts, "Could not allocate a movie code");
        Err(KinoBotError::CapacityExhausted {
            attempts: self.config.max_allocation_attempts,
        })
    }

    /// Live movie by code
    pub async fn get_movie(&self, code: &str) -> Result<Movie> {
        let code = code.trim();
        match self.movies.find(code).await? {
            Some(movie) if !movie.is_deleted => Ok(movie),
            _ => Err(KinoBotError::MovieNotFound { code: code.to_string() }),
        }
    }

    /// Count a retrieval. A miss is logged, never raised.
    pub async fn increment_view(&self, code: &str) -> Result<()> {
        if !self.movies.increment_views(code.trim()).await? {
            debug!(code = code, "View increment for unknown or deleted movie ignored");
        }
        Ok(())
    }

    /// Returns whether a movie was affected. Repeating a delete is not an error.
    pub async fn delete_movie(&self, code: &str, hard: bool) -> Result<bool> {
        let code = code.trim();
        let found = if hard {
            self.movies.hard_delete(code).await?
        } else {
            self.movies.soft_delete(code).await?
        };

        if found {
            warn!(code = code, hard = hard, "Movie deleted");
        }
        Ok(found)
    }

    /// Case-insensitive search over live movies, capped at `search_limit`
    pub async fn search(&self, query: &str) -> Result<Vec<Movie>> {
        let query = normalize_whitespace(query);
        if query.is_empty() {
            return Ok(Vec::new());
        }
        self.movies.search(&query, self.config.search_limit).await
    }

    /// Admin listing ordered by code
    pub async fn list_movies(&self, include_deleted: bool) -> Result<Vec<Movie>> {
        self.movies.list(include_deleted).await
    }

    pub async fn count_movies(&self) -> Result<i64> {
        self.movies.count_live().await
    }

    pub async fn total_views(&self) -> Result<i64> {
        self.movies.total_views().await
    }
}

fn smallest_unused(used: &HashSet<u64>) -> u64 {
    (1..).find(|n| !used.contains(n)).unwrap_or(1)
}
