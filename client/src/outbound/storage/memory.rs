//! Process-local store. Contents vanish with the process.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::domain::ports::{LocalStore, LocalStoreError};

/// [`LocalStore`] keeping every entry in a mutex-guarded map.
#[derive(Debug, Default)]
pub struct InMemoryLocalStore {
    entries: Mutex<HashMap<String, String>>,
}

impl InMemoryLocalStore {
    /// Store pre-populated with raw JSON entries.
    #[must_use]
    pub fn with_entries<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let entries = entries
            .into_iter()
            .map(|(key, value)| (key.into(), value.into()))
            .collect();
        Self {
            entries: Mutex::new(entries),
        }
    }

    /// Keys currently held, sorted.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<_> = self.lock().keys().cloned().collect();
        keys.sort();
        keys
    }

    // Entries are whole strings, so a writer that panicked cannot leave one
    // half-written.
    fn lock(&self) -> MutexGuard<'_, HashMap<String, String>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl LocalStore for InMemoryLocalStore {
    fn read_raw(&self, key: &str) -> Result<Option<String>, LocalStoreError> {
        Ok(self.lock().get(key).cloned())
    }

    fn write_raw(&self, key: &str, contents: &str) -> Result<(), LocalStoreError> {
        self.lock().insert(key.to_owned(), contents.to_owned());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), LocalStoreError> {
        self.lock().remove(key);
        Ok(())
    }
}
