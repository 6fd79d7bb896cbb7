//! Loans service: the loan repository guarded by the lifecycle state machine.
//!
//! Every transition is checked against the cached loan before any remote
//! call. A refused transition writes nothing and reports
//! [`TransitionOutcome::Unchanged`] with the reason. A loan that is not
//! cached is left for the loans service to judge.

use chrono::{DateTime, Utc};
use tracing::info;

use super::codec::LoanResource;
use super::lifecycle::{LoanLifecycle, Transition, TransitionOutcome};
use super::ports::RemoteClient;
use super::repository::{RemoteCommand, ResilientRepository, WriteOutcome};
use super::{CanonicalStatus, EntityId, LegacyStatus, Loan, LoanDraft, LoanPatch, RepositoryError};

type Loans<C> = ResilientRepository<LoanResource, C>;

/// Outcome of a lifecycle operation. `None` when the loan is neither known
/// to the remote service nor cached.
pub type TransitionResult = Result<Option<TransitionOutcome>, RepositoryError>;

/// Loan requests and their lifecycle, backed by the loans service.
pub struct LoanService<C: ?Sized> {
    loans: Loans<C>,
    lifecycle: LoanLifecycle,
}

impl<C> LoanService<C>
where
    C: RemoteClient + ?Sized,
{
    /// Loans governed by `lifecycle`.
    #[must_use]
    pub const fn new(loans: Loans<C>, lifecycle: LoanLifecycle) -> Self {
        Self { loans, lifecycle }
    }

    /// Lifecycle applied to cached loans.
    #[must_use]
    pub const fn lifecycle(&self) -> LoanLifecycle {
        self.lifecycle
    }

    /// Cached records, verbatim.
    #[must_use]
    pub fn get_all_sync(&self) -> &[Loan] {
        self.loans.get_all_sync()
    }

    /// Cached record matching `id`.
    #[must_use]
    pub fn get_by_id_sync(&self, id: &EntityId) -> Option<&Loan> {
        self.loans.get_by_id_sync(id)
    }

    /// List remotely, falling back to the cache.
    pub async fn get_all_async(&mut self) -> Vec<Loan> {
        self.loans.get_all_async().await
    }

    /// Fetch one record; `None` when absent.
    pub async fn get_by_id_async(&mut self, id: &EntityId) -> Option<Loan> {
        self.loans.get_by_id_async(id).await
    }

    /// Create a loan, remotely when possible.
    ///
    /// # Errors
    ///
    /// See [`ResilientRepository::create`].
    pub async fn create(&mut self, draft: LoanDraft) -> Result<WriteOutcome<Loan>, RepositoryError> {
        self.loans.create(draft).await
    }

    /// Update a loan, remotely when possible.
    ///
    /// # Errors
    ///
    /// See [`ResilientRepository::update`].
    pub async fn update(
        &mut self,
        id: &EntityId,
        patch: LoanPatch,
    ) -> Result<Option<WriteOutcome<Loan>>, RepositoryError> {
        self.loans.update(id, patch).await
    }

    /// Delete remotely and always locally; `true` when a cached record went.
    pub async fn delete(&mut self, id: &EntityId) -> bool {
        self.loans.delete(id).await
    }

    /// Request a loan for the default number of days.
    ///
    /// # Errors
    ///
    /// See [`ResilientRepository::create`].
    pub async fn request(
        &mut self,
        book_id: &EntityId,
        user_id: &EntityId,
    ) -> Result<WriteOutcome<Loan>, RepositoryError> {
        self.create(LoanDraft::new(book_id.clone(), user_id.clone()))
            .await
    }

    /// Request one loan per book. Each request succeeds or fails on its own.
    pub async fn request_many(
        &mut self,
        book_ids: &[EntityId],
        user_id: &EntityId,
    ) -> Vec<Result<WriteOutcome<Loan>, RepositoryError>> {
        let mut results = Vec::with_capacity(book_ids.len());
        for book_id in book_ids {
            results.push(self.request(book_id, user_id).await);
        }
        results
    }

    /// `Pending -> Active`.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::Rejected`] when the loans service refuses.
    pub async fn approve(&mut self, id: &EntityId) -> TransitionResult {
        self.transition(id, Transition::Approve).await
    }

    /// `Pending -> Cancelled`.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::Rejected`] when the loans service refuses.
    pub async fn reject(&mut self, id: &EntityId) -> TransitionResult {
        self.transition(id, Transition::Reject).await
    }

    /// `Active | Overdue -> Returned`, stamping the return date.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::Rejected`] when the loans service refuses.
    pub async fn return_book(&mut self, id: &EntityId) -> TransitionResult {
        self.transition(id, Transition::Return).await
    }

    /// Push the due date back by the policy increment.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::Rejected`] when the loans service refuses.
    pub async fn extend(&mut self, id: &EntityId) -> TransitionResult {
        self.transition(id, Transition::Extend).await
    }

    /// `Active -> Cancelled`.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::Rejected`] when the loans service refuses.
    pub async fn cancel(&mut self, id: &EntityId) -> TransitionResult {
        self.transition(id, Transition::Cancel).await
    }

    /// Cached loans of `user_id`.
    #[must_use]
    pub fn by_user_sync(&self, user_id: &EntityId) -> Vec<Loan> {
        self.cached_where(|loan| loan.belongs_to(user_id))
    }

    /// Loans of `user_id` from the loans service, falling back to the cache.
    pub async fn by_user_async(&mut self, user_id: &EntityId) -> Vec<Loan> {
        let Some(remote_id) = user_id.remote_id() else {
            return self.by_user_sync(user_id);
        };
        self.loans
            .query(&format!("/user/{remote_id}"), |loan| loan.belongs_to(user_id))
            .await
    }

    /// Cached loans of `book_id`.
    #[must_use]
    pub fn by_book_sync(&self, book_id: &EntityId) -> Vec<Loan> {
        self.cached_where(|loan| loan.is_for_book(book_id))
    }

    /// Loans awaiting a decision.
    pub async fn pending(&mut self) -> Vec<Loan> {
        let path = format!("/status/{}", CanonicalStatus::Pending);
        self.loans
            .query(&path, |loan| loan.status == LegacyStatus::Pendiente)
            .await
    }

    /// Cached loans past their due date at `now`.
    #[must_use]
    pub fn overdue_sync(&self, now: DateTime<Utc>) -> Vec<Loan> {
        self.cached_where(|loan| loan.is_overdue(now))
    }

    fn cached_where(&self, keep: impl Fn(&Loan) -> bool) -> Vec<Loan> {
        self.get_all_sync()
            .iter()
            .filter(|loan| keep(loan))
            .cloned()
            .collect()
    }

    async fn transition(&mut self, id: &EntityId, transition: Transition) -> TransitionResult {
        let now = self.loans.now();
        let lifecycle = self.lifecycle;
        if let Some(cached) = self.loans.get_by_id_sync(id) {
            if let Err(rejection) = lifecycle.check(cached, transition, now) {
                info!(entity = "loan", %id, %rejection, "transition refused");
                return Ok(Some(TransitionOutcome::Unchanged {
                    loan: cached.clone(),
                    rejection,
                }));
            }
        }
        let outcome = self
            .loans
            .command(id, remote_command(transition), |loan| {
                if let Ok(next) = lifecycle.apply(loan, transition, now) {
                    *loan = next;
                }
            })
            .await?;
        Ok(outcome.map(TransitionOutcome::Applied))
    }
}

fn remote_command(transition: Transition) -> RemoteCommand {
    match transition {
        Transition::Approve => RemoteCommand::put("/approve"),
        Transition::Reject => RemoteCommand::put("/reject"),
        Transition::Return => RemoteCommand::post("/return"),
        Transition::Extend => RemoteCommand::post("/renew"),
        Transition::Cancel => RemoteCommand::put("/cancel"),
    }
}

#[cfg(test)]
#[path = "loan_service_tests.rs"]
mod tests;
