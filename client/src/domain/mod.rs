//! Library domain: entities, codecs, the loan lifecycle and the resilient
//! repositories that serve them.
//!
//! Purpose: keep the catalogue, accounts and loans usable whether or not the
//! remote services answer. Remote services are authoritative; the local
//! cache answers whenever they cannot be reached.
//!
//! Public surface:
//! - BookService, LoanService, UserService: per-entity facades.
//! - ResilientRepository (in `repository`): the shared remote-first engine.
//! - LoanLifecycle (in `lifecycle`): transition guards for loans.
//! - RemoteClient, LocalStore (in `ports`): the two external collaborators.

mod book;
mod book_service;
pub mod codec;
mod error;
mod ids;
pub mod lifecycle;
mod loan;
mod loan_service;
mod loan_status;
pub mod ports;
pub mod repository;
mod user;
mod user_service;

pub use self::book::{Book, BookDraft, BookPatch, BookStatus, CopyCounts, DEFAULT_CATEGORY};
pub use self::book_service::BookService;
pub use self::error::{RepositoryError, ValidationError};
pub use self::ids::EntityId;
pub use self::lifecycle::{
    InvalidTransition, InvalidTransitionReason, LifecyclePolicy, LoanLifecycle, Transition,
    TransitionOutcome,
};
pub use self::loan::{DEFAULT_LOAN_DAYS, Loan, LoanDraft, LoanPatch, MAX_LOAN_DAYS};
pub use self::loan_service::{LoanService, TransitionResult};
pub use self::loan_status::{CanonicalStatus, LegacyStatus};
pub use self::repository::{Provenance, WriteOutcome};
pub use self::user::{
    Credential, PublicUser, Role, User, UserDraft, UserPatch, normalize_email,
};
pub use self::user_service::{SESSION_KEY, Session, UserService};
