//! Client configuration loaded via OrthoConfig.

use std::path::PathBuf;
use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::Deserialize;

use crate::domain::{LifecyclePolicy, ValidationError};

const DEFAULT_BOOKS_URL: &str = "http://localhost:8081/api/books";
const DEFAULT_USERS_URL: &str = "http://localhost:8082/api/users";
const DEFAULT_LOANS_URL: &str = "http://localhost:8083/api/loans";
const DEFAULT_TIMEOUT_MS: u64 = 10_000;

/// Configuration values for the library client.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "LIBRARY")]
pub struct ClientSettings {
    /// Base URL of the books service.
    pub books_url: Option<String>,
    /// Base URL of the users service.
    pub users_url: Option<String>,
    /// Base URL of the loans service.
    pub loans_url: Option<String>,
    /// Per-request timeout in milliseconds.
    pub timeout_ms: Option<u64>,
    /// Directory holding the durable cache. Absent keeps the cache in memory.
    pub storage_dir: Option<PathBuf>,
    /// Populate empty caches with the built-in catalogue and accounts.
    #[ortho_config(default = true)]
    pub seed: bool,
    /// Days added by one loan extension.
    pub extension_days: Option<u32>,
    /// Extensions allowed per loan.
    pub max_extensions: Option<u32>,
}

impl ClientSettings {
    /// Books service base URL.
    #[must_use]
    pub fn books_url(&self) -> &str {
        self.books_url.as_deref().unwrap_or(DEFAULT_BOOKS_URL)
    }

    /// Users service base URL.
    #[must_use]
    pub fn users_url(&self) -> &str {
        self.users_url.as_deref().unwrap_or(DEFAULT_USERS_URL)
    }

    /// Loans service base URL.
    #[must_use]
    pub fn loans_url(&self) -> &str {
        self.loans_url.as_deref().unwrap_or(DEFAULT_LOANS_URL)
    }

    /// Per-request timeout.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms.unwrap_or(DEFAULT_TIMEOUT_MS))
    }

    /// Lifecycle policy, with unset values taken from the default policy.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::Invalid`] when the configured extension
    /// increment is out of range.
    pub fn lifecycle_policy(&self) -> Result<LifecyclePolicy, ValidationError> {
        let defaults = LifecyclePolicy::default();
        LifecyclePolicy::new(
            self.extension_days.unwrap_or(defaults.extension_days),
            self.max_extensions.unwrap_or(defaults.max_extensions),
        )
    }
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            books_url: None,
            users_url: None,
            loans_url: None,
            timeout_ms: None,
            storage_dir: None,
            seed: true,
            extension_days: None,
            max_extensions: None,
        }
    }
}
