//! Entity identifiers shared by books, users and loans.
//!
//! Locally every id is a string. Records that came from a remote service use
//! the decimal form of the service's numeric key; records created while the
//! service was unreachable get a UUID and never acquire a remote form.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable local identifier of a cached entity.
///
/// # Examples
/// ```
/// use library_client::domain::EntityId;
///
/// let remote = EntityId::from(42_u64);
/// assert_eq!(remote.remote_id(), Some(42));
/// assert!(EntityId::new("042").matches(&remote));
/// assert_eq!(EntityId::generate().remote_id(), None);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    /// Wrap an existing identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh local-only identifier.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Borrow the string form.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Numeric form understood by the remote services, if the id has one.
    #[must_use]
    pub fn remote_id(&self) -> Option<u64> {
        let trimmed = self.0.trim();
        if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        trimmed.parse().ok()
    }

    /// True when the id was generated locally and the remote cannot know it.
    #[must_use]
    pub fn is_local_only(&self) -> bool {
        self.remote_id().is_none()
    }

    /// Compare by raw string, then by numeric value when both sides are numeric.
    #[must_use]
    pub fn matches(&self, other: &Self) -> bool {
        if self.0 == other.0 {
            return true;
        }
        match (self.remote_id(), other.remote_id()) {
            (Some(left), Some(right)) => left == right,
            _ => false,
        }
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for EntityId {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl From<u64> for EntityId {
    fn from(value: u64) -> Self {
        Self(value.to_string())
    }
}

impl From<&str> for EntityId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl From<String> for EntityId {
    fn from(value: String) -> Self {
        Self(value)
    }
}
