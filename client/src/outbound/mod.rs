//! Outbound adapters implementing the domain ports.
//!
//! - **http**: reqwest-backed client for the books, users and loans services
//! - **storage**: key/value stores backing the local caches
//!
//! Adapters are thin translators. They contain no library logic.

pub mod http;
pub mod storage;
