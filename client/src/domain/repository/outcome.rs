//! Write results tagged with where they were persisted.

/// Where a write landed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Provenance {
    /// The remote service accepted the write; the cache mirrors its answer.
    Remote,
    /// The remote service was unreachable; only the local cache holds it.
    LocalOnly,
}

/// Value produced by a repository write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteOutcome<T> {
    /// The written record.
    pub value: T,
    /// Where it landed.
    pub provenance: Provenance,
}

impl<T> WriteOutcome<T> {
    /// Outcome of a write the remote service accepted.
    #[must_use]
    pub const fn remote(value: T) -> Self {
        Self {
            value,
            provenance: Provenance::Remote,
        }
    }

    /// Outcome of a write held only by the local cache.
    #[must_use]
    pub const fn local_only(value: T) -> Self {
        Self {
            value,
            provenance: Provenance::LocalOnly,
        }
    }

    /// True when the remote service holds the write.
    #[must_use]
    pub fn persisted_remotely(&self) -> bool {
        self.provenance == Provenance::Remote
    }

    /// Drop the provenance.
    pub fn into_value(self) -> T {
        self.value
    }

    /// Transform the value, keeping the provenance.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> WriteOutcome<U> {
        WriteOutcome {
            value: f(self.value),
            provenance: self.provenance,
        }
    }
}
