//! Movie model

use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use sqlx::FromRow;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Movie {
    pub code: String,
    pub title: String,
    pub description: Option<String>,
    pub quality: Option<String>,
    pub year: Option<String>,
    pub language: Option<String>,
    pub rating: Option<String>,
    pub file_handle: String,
    pub view_count: i64,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
}

impl Movie {
    pub fn new(code: String, metadata: MovieMetadata, file_handle: String, now: DateTime<Utc>) -> Self {
        Self {
            code,
            title: metadata.title,
            description: metadata.description,
            quality: metadata.quality,
            year: metadata.year,
            language: metadata.language,
            rating: metadata.rating,
            file_handle,
            view_count: 0,
            is_deleted: false,
            created_at: now,
        }
    }

    /// Case-insensitive match of an already lowercased needle
    pub fn matches(&self, needle: &str) -> bool {
        self.code.to_lowercase().contains(needle)
            || self.title.to_lowercase().contains(needle)
            || self
                .description
                .as_deref()
                .map_or(false, |d| d.to_lowercase().contains(needle))
    }
}

/// Descriptive fields supplied by the admin; only the title is required
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MovieMetadata {
    pub title: String,
    pub description: Option<String>,
    pub quality: Option<String>,
    pub year: Option<String>,
    pub language: Option<String>,
    pub rating: Option<String>,
}

impl MovieMetadata {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    /// Parse `Title | quality | year | language | rating | description`.
    /// Empty segments are treated as absent.
    pub fn parse_pipe_separated(text: &str) -> Option<Self> {
        let mut parts = text.split('|').map(|p| {
            let p = p.trim();
            (!p.is_empty()).then(|| p.to_string())
        });

        let title = parts.next().flatten()?;
        Some(Self {
            title,
            quality: parts.next().flatten(),
            year: parts.next().flatten(),
            language: parts.next().flatten(),
            rating: parts.next().flatten(),
            description: parts.next().flatten(),
        })
    }
}

/// Result of an insert attempt against the code uniqueness constraint
#[derive(Debug, Clone, PartialEq)]
pub enum InsertOutcome {
    Inserted(Movie),
    CodeTaken,
}
