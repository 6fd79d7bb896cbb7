//! In-memory mirror of one cached collection, written through to the store.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::domain::EntityId;
use crate::domain::codec::Resource;
use crate::domain::ports::{LocalStore, LocalStoreExt};

/// Cached records of one entity type.
///
/// Every mutation is mirrored to the [`LocalStore`] under
/// [`Resource::STORE_KEY`]. A failed durable write is logged and the
/// in-memory copy stays authoritative for the rest of the process.
pub struct EntityCache<R: Resource> {
    store: Arc<dyn LocalStore>,
    records: Vec<R::Local>,
}

impl<R: Resource> EntityCache<R> {
    /// Load the collection, seeding it when the store holds nothing and
    /// `seed_at` is set.
    pub fn load(store: Arc<dyn LocalStore>, seed_at: Option<DateTime<Utc>>) -> Self {
        let records: Vec<R::Local> = store.read_or(R::STORE_KEY, Vec::new());
        let mut cache = Self { store, records };
        if let (true, Some(now)) = (cache.records.is_empty(), seed_at) {
            cache.records = R::seed(now);
            if !cache.records.is_empty() {
                debug!(entity = R::ENTITY, count = cache.records.len(), "seeded local cache");
                cache.persist();
            }
        }
        cache
    }

    /// Cached records in store order.
    #[must_use]
    pub fn records(&self) -> &[R::Local] {
        &self.records
    }

    /// Record whose id matches `id` in raw or numeric form.
    #[must_use]
    pub fn find(&self, id: &EntityId) -> Option<&R::Local> {
        self.records.iter().find(|record| R::id(record).matches(id))
    }

    fn position(&self, id: &EntityId) -> Option<usize> {
        self.records.iter().position(|record| R::id(record).matches(id))
    }

    fn put(&mut self, record: R::Local) {
        let id = R::id(&record).clone();
        match self.records.iter_mut().find(|cached| R::id(cached).matches(&id)) {
            Some(slot) => *slot = record,
            None => self.records.push(record),
        }
    }

    /// Replace the whole collection.
    pub fn replace_all(&mut self, records: Vec<R::Local>) {
        self.records = records;
        self.persist();
    }

    /// Overwrite the record with the same id, or append it.
    pub fn upsert(&mut self, record: R::Local) {
        self.put(record);
        self.persist();
    }

    /// Overwrite or append each record, keeping everything else.
    pub fn upsert_many(&mut self, records: impl IntoIterator<Item = R::Local>) {
        for record in records {
            self.put(record);
        }
        self.persist();
    }

    /// Remove the matching record, returning it.
    pub fn remove(&mut self, id: &EntityId) -> Option<R::Local> {
        let index = self.position(id)?;
        let removed = self.records.remove(index);
        self.persist();
        Some(removed)
    }

    fn persist(&self) {
        match self.store.write_json(R::STORE_KEY, &self.records) {
            Ok(()) => debug!(entity = R::ENTITY, count = self.records.len(), "wrote cache through"),
            Err(error) => warn!(
                entity = R::ENTITY,
                %error,
                "local store write failed; keeping in-memory copy"
            ),
        }
    }
}
