//! Port for the durable key/value store backing the local caches.
//!
//! The store is a plain shared resource with no transactional guarantees. It
//! holds raw JSON text so adapters stay format agnostic; typed access goes
//! through [`LocalStoreExt`].

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::warn;

use super::define_port_error;

define_port_error! {
    /// Errors raised by local store adapters.
    pub enum LocalStoreError {
        /// The backing medium could not be read or written.
        Io { key: String, message: String } => "local store i/o failed for {key}: {message}",
        /// A value could not be serialised before writing.
        Serialization { key: String, message: String } =>
            "local store serialisation failed for {key}: {message}",
    }
}

/// Synchronous string key to JSON text mapping.
pub trait LocalStore: Send + Sync {
    /// Read the raw JSON stored under `key`, if any.
    fn read_raw(&self, key: &str) -> Result<Option<String>, LocalStoreError>;

    /// Replace the JSON stored under `key`.
    fn write_raw(&self, key: &str, contents: &str) -> Result<(), LocalStoreError>;

    /// Drop the value stored under `key`. Missing keys are not an error.
    fn remove(&self, key: &str) -> Result<(), LocalStoreError>;
}

/// Typed helpers layered over any [`LocalStore`].
pub trait LocalStoreExt {
    /// Read and decode `key`, yielding `fallback` when the key is missing,
    /// unreadable or malformed. Never fails.
    fn read_or<T: DeserializeOwned>(&self, key: &str, fallback: T) -> T;

    /// Encode and write `value` under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`LocalStoreError`] when encoding or the underlying write fails.
    fn write_json<T: Serialize + ?Sized>(&self, key: &str, value: &T)
    -> Result<(), LocalStoreError>;
}

impl<S: LocalStore + ?Sized> LocalStoreExt for S {
    fn read_or<T: DeserializeOwned>(&self, key: &str, fallback: T) -> T {
        let raw = match self.read_raw(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return fallback,
            Err(error) => {
                warn!(key, %error, "local store read failed; using fallback value");
                return fallback;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(value) => value,
            Err(error) => {
                warn!(key, %error, "malformed local store entry; using fallback value");
                fallback
            }
        }
    }

    fn write_json<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
    ) -> Result<(), LocalStoreError> {
        let contents = serde_json::to_string(value)
            .map_err(|error| LocalStoreError::serialization(key, error.to_string()))?;
        self.write_raw(key, &contents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct MapStore {
        entries: Mutex<HashMap<String, String>>,
        fail_reads: bool,
    }

    impl LocalStore for MapStore {
        fn read_raw(&self, key: &str) -> Result<Option<String>, LocalStoreError> {
            if self.fail_reads {
                return Err(LocalStoreError::io(key, "disk unplugged"));
            }
            Ok(self.entries.lock().expect("store poisoned").get(key).cloned())
        }

        fn write_raw(&self, key: &str, contents: &str) -> Result<(), LocalStoreError> {
            self.entries
                .lock()
                .expect("store poisoned")
                .insert(key.to_owned(), contents.to_owned());
            Ok(())
        }

        fn remove(&self, key: &str) -> Result<(), LocalStoreError> {
            self.entries.lock().expect("store poisoned").remove(key);
            Ok(())
        }
    }

    #[test]
    fn read_or_decodes_stored_values() {
        let store = MapStore::default();
        store
            .write_json("numbers", &vec![1, 2, 3])
            .expect("write succeeds");

        let numbers: Vec<i32> = store.read_or("numbers", Vec::new());
        assert_eq!(numbers, vec![1, 2, 3]);
    }

    #[test]
    fn read_or_returns_fallback_for_missing_keys() {
        let store = MapStore::default();
        let value: Vec<String> = store.read_or("absent", vec!["default".to_owned()]);
        assert_eq!(value, vec!["default".to_owned()]);
    }

    #[test]
    fn read_or_returns_fallback_for_malformed_json() {
        let store = MapStore::default();
        store.write_raw("books", "{not json").expect("write succeeds");

        let value: Vec<String> = store.read_or("books", Vec::new());
        assert!(value.is_empty());
    }

    #[test]
    fn read_or_returns_fallback_when_the_medium_fails() {
        let store = MapStore {
            fail_reads: true,
            ..MapStore::default()
        };
        let value: Option<u32> = store.read_or("session", None);
        assert!(value.is_none());
    }
}
