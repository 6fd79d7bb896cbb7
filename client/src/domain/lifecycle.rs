//! Loan lifecycle state machine.
//!
//! Canonical transitions:
//! - `Pending -> Active` (approve) and `Pending -> Cancelled` (reject);
//! - `Active -> Returned` and `Overdue -> Returned` (return);
//! - `Active -> Active` (extend, bounded by the policy);
//! - `Active -> Cancelled` (cancel).
//!
//! `Returned` and `Cancelled` are terminal. The checks run against the
//! effective status, so an approved loan past its due date counts as overdue.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;

use super::{CanonicalStatus, Loan, ValidationError, WriteOutcome};
use super::repository::Provenance;

/// Fixed extension increment used by the loans service.
pub const DEFAULT_EXTENSION_DAYS: u32 = 7;
/// Maximum extensions granted by the loans service.
pub const DEFAULT_MAX_EXTENSIONS: u32 = 2;
/// Largest extension increment a policy accepts.
pub const MAX_EXTENSION_DAYS: u32 = 365;

/// A lifecycle operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Transition {
    /// Grant a pending request.
    Approve,
    /// Refuse a pending request.
    Reject,
    /// Bring the book back.
    Return,
    /// Push the due date back by the policy increment.
    Extend,
    /// Withdraw an active loan.
    Cancel,
}

impl Transition {
    /// Verb used in messages and logs.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Approve => "approve",
            Self::Reject => "reject",
            Self::Return => "return",
            Self::Extend => "extend",
            Self::Cancel => "cancel",
        }
    }

    const fn permits(self, from: CanonicalStatus) -> bool {
        matches!(
            (self, from),
            (Self::Approve | Self::Reject, CanonicalStatus::Pending)
                | (Self::Return, CanonicalStatus::Active | CanonicalStatus::Overdue)
                | (Self::Extend | Self::Cancel, CanonicalStatus::Active)
        )
    }

    const fn target(self, from: CanonicalStatus) -> CanonicalStatus {
        match self {
            Self::Approve => CanonicalStatus::Active,
            Self::Reject | Self::Cancel => CanonicalStatus::Cancelled,
            Self::Return => CanonicalStatus::Returned,
            Self::Extend => from,
        }
    }
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a transition was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidTransitionReason {
    /// The loan is not in a source state of the transition.
    WrongState,
    /// The loan has used every extension the policy allows.
    ExtensionsExhausted,
    /// Extending would move the due date past the representable range.
    DueDateOutOfRange,
}

/// A transition attempted from a state that does not permit it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("cannot {transition} a loan that is {from}{}", match .reason {
    InvalidTransitionReason::WrongState => "",
    InvalidTransitionReason::ExtensionsExhausted => " with no extensions left",
    InvalidTransitionReason::DueDateOutOfRange => " past the latest due date",
})]
pub struct InvalidTransition {
    /// The refused operation.
    pub transition: Transition,
    /// Effective state of the loan when it was refused.
    pub from: CanonicalStatus,
    /// Which guard refused it.
    pub reason: InvalidTransitionReason,
}

/// Extension limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LifecyclePolicy {
    /// Days added by one extension, at most [`MAX_EXTENSION_DAYS`].
    pub extension_days: u32,
    /// Extensions granted per loan.
    pub max_extensions: u32,
}

impl LifecyclePolicy {
    /// Build a policy from configured values.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::Invalid`] when `extension_days` is zero or
    /// larger than [`MAX_EXTENSION_DAYS`].
    pub fn new(extension_days: u32, max_extensions: u32) -> Result<Self, ValidationError> {
        if extension_days == 0 || extension_days > MAX_EXTENSION_DAYS {
            return Err(ValidationError::invalid(
                "extensionDays",
                format!("must be between 1 and {MAX_EXTENSION_DAYS}"),
            ));
        }
        Ok(Self {
            extension_days,
            max_extensions,
        })
    }
}

impl Default for LifecyclePolicy {
    fn default() -> Self {
        Self {
            extension_days: DEFAULT_EXTENSION_DAYS,
            max_extensions: DEFAULT_MAX_EXTENSIONS,
        }
    }
}

/// Result of a lifecycle operation that found its loan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionOutcome {
    /// The transition was applied and written through.
    Applied(WriteOutcome<Loan>),
    /// Nothing was written; the loan is returned as it was.
    Unchanged {
        /// The cached loan, untouched.
        loan: Loan,
        /// Why the lifecycle refused the transition.
        rejection: InvalidTransition,
    },
}

impl TransitionOutcome {
    /// The loan after the call, changed or not.
    #[must_use]
    pub const fn loan(&self) -> &Loan {
        match self {
            Self::Applied(outcome) => &outcome.value,
            Self::Unchanged { loan, .. } => loan,
        }
    }

    /// Whether the transition was written.
    #[must_use]
    pub const fn is_applied(&self) -> bool {
        matches!(self, Self::Applied(_))
    }

    /// Provenance of an applied transition.
    #[must_use]
    pub const fn provenance(&self) -> Option<Provenance> {
        match self {
            Self::Applied(outcome) => Some(outcome.provenance),
            Self::Unchanged { .. } => None,
        }
    }

    /// Convert into a result, surfacing the refusal as an error.
    ///
    /// # Errors
    ///
    /// Returns the [`InvalidTransition`] of an unchanged outcome.
    pub fn into_result(self) -> Result<WriteOutcome<Loan>, InvalidTransition> {
        match self {
            Self::Applied(outcome) => Ok(outcome),
            Self::Unchanged { rejection, .. } => Err(rejection),
        }
    }
}

/// Pure state machine over cached loans.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoanLifecycle {
    policy: LifecyclePolicy,
}

impl LoanLifecycle {
    /// Lifecycle enforcing `policy`.
    #[must_use]
    pub const fn new(policy: LifecyclePolicy) -> Self {
        Self { policy }
    }

    /// Extension limits in force.
    #[must_use]
    pub const fn policy(&self) -> LifecyclePolicy {
        self.policy
    }

    fn extended_due_date(&self, loan: &Loan) -> Option<DateTime<Utc>> {
        loan.due_date
            .checked_add_signed(Duration::days(i64::from(self.policy.extension_days)))
    }

    /// Check whether `transition` may be applied to `loan` at `now`.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidTransition`] when the effective state is not a source
    /// state of the transition, when no extension is left, or when the
    /// extended due date cannot be represented.
    pub fn check(
        &self,
        loan: &Loan,
        transition: Transition,
        now: DateTime<Utc>,
    ) -> Result<CanonicalStatus, InvalidTransition> {
        let from = loan.effective_status(now);
        if !transition.permits(from) {
            return Err(InvalidTransition {
                transition,
                from,
                reason: InvalidTransitionReason::WrongState,
            });
        }
        if transition == Transition::Extend && loan.renewals >= self.policy.max_extensions {
            return Err(InvalidTransition {
                transition,
                from,
                reason: InvalidTransitionReason::ExtensionsExhausted,
            });
        }
        if transition == Transition::Extend && self.extended_due_date(loan).is_none() {
            return Err(InvalidTransition {
                transition,
                from,
                reason: InvalidTransitionReason::DueDateOutOfRange,
            });
        }
        Ok(transition.target(from))
    }

    /// Apply `transition` to a copy of `loan`.
    ///
    /// # Errors
    ///
    /// Propagates the refusal from [`LoanLifecycle::check`]; `loan` is never
    /// modified.
    pub fn apply(
        &self,
        loan: &Loan,
        transition: Transition,
        now: DateTime<Utc>,
    ) -> Result<Loan, InvalidTransition> {
        let target = self.check(loan, transition, now)?;
        let mut next = loan.clone();
        next.status = target.to_legacy();
        match transition {
            Transition::Return => next.return_date = Some(now),
            Transition::Extend => {
                if let Some(due_date) = self.extended_due_date(loan) {
                    next.due_date = due_date;
                }
                next.renewals = next.renewals.saturating_add(1);
            }
            Transition::Approve | Transition::Reject | Transition::Cancel => {
                next.return_date = None;
            }
        }
        Ok(next)
    }
}
