//! Resilient data access for a library-management client.
//!
//! Books, users and loans live in remote microservices. Every read and write
//! goes to the service first and falls back to a durable local cache when the
//! service cannot be reached, so the display layer keeps working offline.

pub mod app;
pub mod config;
pub mod domain;
pub mod outbound;
pub mod telemetry;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use app::{BuildError, LibraryServices};
pub use config::ClientSettings;
