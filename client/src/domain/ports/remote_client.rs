//! Port abstraction for the authoritative remote microservices.
//!
//! Each repository talks to exactly one service through this trait. Paths are
//! relative to the service base (`""`, `"/42"`, `"/42/approve"`); bodies and
//! responses are untyped JSON so the entity codecs own every wire shape.

use async_trait::async_trait;
use serde_json::Value;

use super::define_port_error;

define_port_error! {
    /// Errors raised by remote client adapters.
    pub enum RemoteClientError {
        /// The service answered with a non-success HTTP status.
        Status { status: u16, message: String } => "remote service returned {status}: {message}",
        /// The request never produced a response (DNS, refused connection, TLS).
        Transport { message: String } => "remote transport failed: {message}",
        /// The request exceeded the configured timeout.
        Timeout { message: String } => "remote request timed out: {message}",
        /// The response body could not be decoded.
        Decode { message: String } => "remote response could not be decoded: {message}",
    }
}

impl RemoteClientError {
    /// HTTP status carried by the error, when the service answered at all.
    #[must_use]
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// True for `404 Not Found`, which read paths decode as "absent".
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.status_code() == Some(404)
    }

    /// True when the service understood the request and refused it.
    ///
    /// Rejections are 4xx statuses other than 404, 408 and 429; they carry a
    /// verdict from the authority and are never papered over by a fallback.
    #[must_use]
    pub fn is_rejection(&self) -> bool {
        matches!(
            self.status_code(),
            Some(status) if (400..500).contains(&status) && !matches!(status, 404 | 408 | 429)
        )
    }

    /// Status and message of a rejection; `None` for any other failure.
    #[must_use]
    pub fn rejection(&self) -> Option<(u16, &str)> {
        match self {
            Self::Status { status, message } if self.is_rejection() => Some((*status, message)),
            _ => None,
        }
    }

    /// True when the failure says nothing about the request itself and the
    /// caller may substitute local data.
    #[must_use]
    pub fn is_unavailable(&self) -> bool {
        !self.is_not_found() && !self.is_rejection()
    }
}

/// Typed HTTP calls against one remote service.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RemoteClient: Send + Sync {
    /// Fetch one record.
    async fn get(&self, path: &str) -> Result<Value, RemoteClientError>;

    /// Fetch a collection of records.
    async fn list(&self, path: &str) -> Result<Vec<Value>, RemoteClientError>;

    /// Create a record or trigger a command.
    async fn post(&self, path: &str, body: Value) -> Result<Value, RemoteClientError>;

    /// Replace a record or trigger an idempotent command.
    async fn put(&self, path: &str, body: Value) -> Result<Value, RemoteClientError>;

    /// Partially update a record.
    async fn patch(&self, path: &str, body: Value) -> Result<Value, RemoteClientError>;

    /// Remove a record.
    async fn delete(&self, path: &str) -> Result<(), RemoteClientError>;
}
