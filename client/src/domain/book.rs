//! Catalogue book entity and its create/update payloads.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::EntityId;

/// Category assigned when the remote record has none.
pub const DEFAULT_CATEGORY: &str = "General";

/// Availability of a catalogue entry. Controlled by the books service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookStatus {
    /// On the shelf.
    #[default]
    Available,
    /// Every copy is out.
    Loaned,
    /// Held for a borrower.
    Reserved,
}

impl BookStatus {
    /// Lower-case display name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Available => "available",
            Self::Loaned => "loaned",
            Self::Reserved => "reserved",
        }
    }
}

impl fmt::Display for BookStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Copy counts reported by the books service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CopyCounts {
    /// Copies owned.
    pub total: u32,
    /// Copies on the shelf.
    pub available: u32,
}

impl CopyCounts {
    /// Availability implied by the counts.
    #[must_use]
    pub const fn status(&self) -> BookStatus {
        if self.available > 0 {
            BookStatus::Available
        } else {
            BookStatus::Loaned
        }
    }
}

/// Cached catalogue entry in display form.
///
/// ## Invariants
/// - When `copies` is present, `status` is only ever changed by the books
///   service; local merges leave it alone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    /// Local identifier.
    pub id: EntityId,
    /// Title as catalogued.
    pub title: String,
    /// Author or authors.
    pub author: String,
    /// Never blank; [`DEFAULT_CATEGORY`] when unknown.
    pub category: String,
    /// Free-text summary; may be empty.
    #[serde(default)]
    pub description: String,
    /// Cover image reference; empty when there is none.
    #[serde(default)]
    pub cover_url: String,
    /// Availability.
    #[serde(default)]
    pub status: BookStatus,
    /// Tracked only when the books service reports them.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub copies: Option<CopyCounts>,
}

impl Book {
    /// Case-insensitive match on title or author.
    #[must_use]
    pub fn matches_query(&self, query: &str) -> bool {
        let needle = query.trim().to_lowercase();
        needle.is_empty()
            || self.title.to_lowercase().contains(&needle)
            || self.author.to_lowercase().contains(&needle)
    }
}

/// Fields for a new catalogue entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookDraft {
    /// Required.
    pub title: String,
    /// Required.
    pub author: String,
    /// Blank or absent files the book under [`DEFAULT_CATEGORY`].
    pub category: Option<String>,
    /// Free-text summary.
    pub description: Option<String>,
    /// Cover image reference.
    pub cover_url: Option<String>,
    /// Only honoured for local-only entries; the service decides otherwise.
    pub status: Option<BookStatus>,
}

impl BookDraft {
    /// Draft with only the required fields.
    pub fn new(title: impl Into<String>, author: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            author: author.into(),
            ..Self::default()
        }
    }

    /// File the book under `category`.
    #[must_use]
    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Attach a description.
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Partial update of a catalogue entry. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookPatch {
    /// Must not be blank.
    pub title: Option<String>,
    /// Must not be blank.
    pub author: Option<String>,
    /// A blank value files the book under [`DEFAULT_CATEGORY`].
    pub category: Option<String>,
    /// Replacement summary.
    pub description: Option<String>,
    /// Replacement cover reference.
    pub cover_url: Option<String>,
    /// Applied locally only while copy counts are untracked.
    pub status: Option<BookStatus>,
}
