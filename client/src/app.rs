//! Composition root: builds the three entity services once, sharing one local
//! store and one clock.

use std::path::PathBuf;
use std::sync::Arc;

use mockable::{Clock, DefaultClock};
use thiserror::Error;
use tracing::info;
use url::Url;

use crate::config::ClientSettings;
use crate::domain::ports::{LocalStore, RemoteClient};
use crate::domain::repository::ResilientRepository;
use crate::domain::{BookService, LoanLifecycle, LoanService, UserService, ValidationError};
use crate::outbound::http::HttpRemoteClient;
use crate::outbound::storage::{FileLocalStore, InMemoryLocalStore};

/// Failures while wiring the services from configuration.
#[derive(Debug, Error)]
pub enum BuildError {
    /// A service base URL does not parse.
    #[error("invalid {service} service url {url}: {source}")]
    InvalidUrl {
        /// `books`, `users` or `loans`.
        service: &'static str,
        /// The configured value.
        url: String,
        /// Parser failure.
        #[source]
        source: url::ParseError,
    },
    /// The HTTP client could not be built.
    #[error("failed to build http client: {0}")]
    HttpClient(#[from] reqwest::Error),
    /// The storage directory could not be created or opened.
    #[error("failed to open local store at {}: {source}", path.display())]
    Storage {
        /// The configured directory.
        path: PathBuf,
        /// Filesystem failure.
        #[source]
        source: std::io::Error,
    },
    /// The configured lifecycle policy is out of range.
    #[error("invalid loan policy: {0}")]
    Policy(#[from] ValidationError),
}

/// One remote client per service.
pub struct Remotes<C: ?Sized> {
    /// Books service.
    pub books: Arc<C>,
    /// Users service.
    pub users: Arc<C>,
    /// Loans service.
    pub loans: Arc<C>,
}

/// Records held after a full refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncReport {
    /// Cached books.
    pub books: usize,
    /// Cached users.
    pub users: usize,
    /// Cached loans.
    pub loans: usize,
}

/// The library's entity services, ready for use by a display layer.
pub struct LibraryServices<C: ?Sized> {
    /// Catalogue.
    pub books: BookService<C>,
    /// Accounts and the session.
    pub users: UserService<C>,
    /// Loans and their lifecycle.
    pub loans: LoanService<C>,
}

impl<C> LibraryServices<C>
where
    C: RemoteClient + ?Sized,
{
    /// Build the services over `store`, loading each cache once.
    pub fn new(
        remotes: Remotes<C>,
        store: Arc<dyn LocalStore>,
        clock: Arc<dyn Clock>,
        seed: bool,
        lifecycle: LoanLifecycle,
    ) -> Self {
        let books = ResilientRepository::new(remotes.books, store.clone(), clock.clone(), seed);
        let users = ResilientRepository::new(remotes.users, store.clone(), clock.clone(), seed);
        let loans = ResilientRepository::new(remotes.loans, store.clone(), clock, seed);
        Self {
            books: BookService::new(books),
            users: UserService::new(users, store),
            loans: LoanService::new(loans, lifecycle),
        }
    }

    /// Refresh every cache from its service. Unreachable services leave
    /// their cache as it was.
    pub async fn sync(&mut self) -> SyncReport {
        let report = SyncReport {
            books: self.books.get_all_async().await.len(),
            users: self.users.get_all_async().await.len(),
            loans: self.loans.get_all_async().await.len(),
        };
        info!(
            books = report.books,
            users = report.users,
            loans = report.loans,
            "caches refreshed"
        );
        report
    }
}

impl LibraryServices<HttpRemoteClient> {
    /// Wire HTTP clients, the configured store and the system clock.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError`] for a malformed service URL, an out-of-range
    /// loan policy, an HTTP client that cannot be built, or a storage
    /// directory that cannot be opened.
    pub fn from_settings(settings: &ClientSettings) -> Result<Self, BuildError> {
        let policy = settings.lifecycle_policy()?;
        let remotes = Remotes {
            books: Arc::new(http_client("books", settings.books_url(), settings)?),
            users: Arc::new(http_client("users", settings.users_url(), settings)?),
            loans: Arc::new(http_client("loans", settings.loans_url(), settings)?),
        };
        let store: Arc<dyn LocalStore> = match &settings.storage_dir {
            Some(path) => Arc::new(FileLocalStore::open(path).map_err(|source| {
                BuildError::Storage {
                    path: path.clone(),
                    source,
                }
            })?),
            None => Arc::new(InMemoryLocalStore::default()),
        };
        Ok(Self::new(
            remotes,
            store,
            Arc::new(DefaultClock),
            settings.seed,
            LoanLifecycle::new(policy),
        ))
    }
}

fn http_client(
    service: &'static str,
    url: &str,
    settings: &ClientSettings,
) -> Result<HttpRemoteClient, BuildError> {
    let base = Url::parse(url).map_err(|source| BuildError::InvalidUrl {
        service,
        url: url.to_owned(),
        source,
    })?;
    Ok(HttpRemoteClient::new(base, settings.timeout())?)
}
