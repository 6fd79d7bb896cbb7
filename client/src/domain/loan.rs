//! Loan entity and its creation payload.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{CanonicalStatus, EntityId, LegacyStatus, ValidationError};

/// Loan length used when the caller does not choose one.
pub const DEFAULT_LOAN_DAYS: u32 = 14;
/// Longest loan a draft may request.
pub const MAX_LOAN_DAYS: u32 = 365;

/// Cached loan in display form.
///
/// Foreign keys are ids only; the loan cache never embeds books or users.
///
/// ## Invariants
/// - `return_date.is_some()` if and only if `status` is
///   [`LegacyStatus::Devuelto`].
/// - `due_date >= loan_date` at creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Loan {
    /// Local identifier.
    pub id: EntityId,
    /// Borrower.
    pub user_id: EntityId,
    /// Borrowed book.
    pub book_id: EntityId,
    /// When the loan was requested.
    pub loan_date: DateTime<Utc>,
    /// When the book must be back.
    pub due_date: DateTime<Utc>,
    /// Set once the book is back.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_date: Option<DateTime<Utc>>,
    /// Display status.
    pub status: LegacyStatus,
    /// Number of extensions already granted.
    #[serde(default)]
    pub renewals: u32,
}

impl Loan {
    /// Canonical state as seen at `now`. An approved loan past its due date
    /// is reported as overdue.
    #[must_use]
    pub fn effective_status(&self, now: DateTime<Utc>) -> CanonicalStatus {
        match self.status.to_canonical() {
            CanonicalStatus::Active if self.due_date < now => CanonicalStatus::Overdue,
            status => status,
        }
    }

    /// Whether the loan is approved and past its due date at `now`.
    #[must_use]
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.effective_status(now) == CanonicalStatus::Overdue
    }

    /// Whether the loan was taken out by `user_id`.
    #[must_use]
    pub fn belongs_to(&self, user_id: &EntityId) -> bool {
        self.user_id.matches(user_id)
    }

    /// Whether the loan is for `book_id`.
    #[must_use]
    pub fn is_for_book(&self, book_id: &EntityId) -> bool {
        self.book_id.matches(book_id)
    }
}

/// Request for a new loan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoanDraft {
    /// Requested book.
    pub book_id: EntityId,
    /// Borrower.
    pub user_id: EntityId,
    /// Requested length, between one day and [`MAX_LOAN_DAYS`].
    pub loan_days: u32,
}

impl LoanDraft {
    /// Draft for the default loan length.
    pub fn new(book_id: impl Into<EntityId>, user_id: impl Into<EntityId>) -> Self {
        Self {
            book_id: book_id.into(),
            user_id: user_id.into(),
            loan_days: DEFAULT_LOAN_DAYS,
        }
    }

    /// Request `days` instead of the default length.
    #[must_use]
    pub const fn loan_days(mut self, days: u32) -> Self {
        self.loan_days = days;
        self
    }

    /// # Errors
    ///
    /// Returns [`ValidationError::Invalid`] when either foreign key is blank.
    pub fn validate(&self) -> Result<(), ValidationError> {
        ValidationError::require_text("bookId", self.book_id.as_str())?;
        ValidationError::require_text("userId", self.user_id.as_str())
    }
}

/// Partial update of a loan's dates. Status changes go through the lifecycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoanPatch {
    /// New due date; must not precede the loan date.
    pub due_date: Option<DateTime<Utc>>,
}
