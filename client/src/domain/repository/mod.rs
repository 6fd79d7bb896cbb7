//! Remote-first repository with local fallback.
//!
//! One engine serves every entity. Each operation tries the authoritative
//! service first, translates the answer through the entity codec and writes
//! it through to the cache. When the service cannot be reached the operation
//! is answered from the cache instead, with the entity's local invariants
//! enforced before anything is written.
//!
//! Failure handling:
//! - `404` on a read is an absent value, never an error;
//! - a 4xx verdict on a write is surfaced as [`RepositoryError::Rejected`];
//! - anything else (transport, timeout, 5xx, undecodable body) falls back.
//!
//! Operations take `&mut self`: the cache has exactly one owner and callers
//! serialise their calls. Concurrent writers racing on one id are not
//! detected; the last write-through wins.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use mockable::Clock;
use serde_json::Value;
use tracing::{debug, warn};

use super::codec::Resource;
use super::ports::{LocalStore, RemoteClient, RemoteClientError};
use super::{EntityId, RepositoryError};

mod cache;
mod outcome;

pub use cache::EntityCache;
pub use outcome::{Provenance, WriteOutcome};

/// HTTP verb of an entity-specific remote command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    /// `POST`.
    Post,
    /// `PUT`.
    Put,
    /// `PATCH`.
    Patch,
}

/// Entity-specific remote mutation addressed below a record's path, such as
/// `PUT /42/approve`.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteCommand {
    /// Verb of the call.
    pub method: HttpMethod,
    /// Appended to the record path; starts with `/`.
    pub suffix: String,
    /// JSON body; an empty object unless given.
    pub body: Value,
}

impl RemoteCommand {
    /// `POST` command with an empty body.
    pub fn post(suffix: impl Into<String>) -> Self {
        Self::new(HttpMethod::Post, suffix)
    }

    /// `PUT` command with an empty body.
    pub fn put(suffix: impl Into<String>) -> Self {
        Self::new(HttpMethod::Put, suffix)
    }

    /// `PATCH` command carrying `body`.
    pub fn patch(suffix: impl Into<String>, body: Value) -> Self {
        Self {
            body,
            ..Self::new(HttpMethod::Patch, suffix)
        }
    }

    fn new(method: HttpMethod, suffix: impl Into<String>) -> Self {
        Self {
            method,
            suffix: suffix.into(),
            body: Value::Object(serde_json::Map::new()),
        }
    }
}

/// Remote-first repository over one entity type.
pub struct ResilientRepository<R: Resource, C: ?Sized> {
    remote: Arc<C>,
    cache: EntityCache<R>,
    clock: Arc<dyn Clock>,
}

impl<R, C> ResilientRepository<R, C>
where
    R: Resource,
    C: RemoteClient + ?Sized,
{
    /// Build a repository, loading its cache from `store`. With `seed` set,
    /// an empty store is populated with the entity's seed records.
    pub fn new(remote: Arc<C>, store: Arc<dyn LocalStore>, clock: Arc<dyn Clock>, seed: bool) -> Self {
        let seed_at = seed.then(|| clock.utc());
        Self {
            remote,
            cache: EntityCache::load(store, seed_at),
            clock,
        }
    }

    /// Current instant of the injected clock.
    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.utc()
    }

    pub(crate) fn remote(&self) -> &C {
        &self.remote
    }

    /// The cached records, verbatim. Never touches the remote service.
    #[must_use]
    pub fn get_all_sync(&self) -> &[R::Local] {
        self.cache.records()
    }

    /// Cached record matching `id`.
    #[must_use]
    pub fn get_by_id_sync(&self, id: &EntityId) -> Option<&R::Local> {
        self.cache.find(id)
    }

    /// List every record remotely and replace the cache with the answer.
    /// Falls back to the cached records.
    pub async fn get_all_async(&mut self) -> Vec<R::Local> {
        match self.fetch_list(R::LIST_PATH).await {
            Ok(records) => {
                self.cache.replace_all(records.clone());
                records
            }
            Err(error) => {
                warn!(entity = R::ENTITY, %error, "remote list failed; serving cache");
                self.get_all_sync().to_vec()
            }
        }
    }

    /// Fetch one record. `404` yields `None`; other failures fall back to the
    /// cache. Local-only ids never reach the remote service.
    pub async fn get_by_id_async(&mut self, id: &EntityId) -> Option<R::Local> {
        let Some(remote_id) = id.remote_id() else {
            return self.cache.find(id).cloned();
        };
        let reply = self.remote.get(&R::item_path(remote_id)).await;
        match reply.and_then(decode_record::<R>) {
            Ok(Some(record)) => Some(self.write_through(record)),
            Ok(None) => self.cache.find(id).cloned(),
            Err(error) if error.is_not_found() => {
                debug!(entity = R::ENTITY, %id, "remote reports record absent");
                None
            }
            Err(error) => {
                warn!(entity = R::ENTITY, %id, %error, "remote get failed; serving cache");
                self.cache.find(id).cloned()
            }
        }
    }

    /// List records at an arbitrary path, merging them into the cache. Falls
    /// back to the cached records accepted by `fallback`.
    pub async fn query<F>(&mut self, path: &str, fallback: F) -> Vec<R::Local>
    where
        F: Fn(&R::Local) -> bool,
    {
        match self.fetch_list(path).await {
            Ok(records) => {
                self.cache.upsert_many(records.clone());
                records
            }
            Err(error) => {
                warn!(entity = R::ENTITY, path, %error, "remote query failed; filtering cache");
                self.cache
                    .records()
                    .iter()
                    .filter(|record| fallback(record))
                    .cloned()
                    .collect()
            }
        }
    }

    /// Create a record remotely, or synthesise a local-only one.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::Validation`] when the draft is malformed or
    /// breaks a local invariant on the fallback path, and
    /// [`RepositoryError::Rejected`] when the service refuses it.
    pub async fn create(
        &mut self,
        draft: R::Draft,
    ) -> Result<WriteOutcome<R::Local>, RepositoryError> {
        R::validate_draft(&draft)?;
        if let Some(payload) = R::draft_payload(&draft) {
            let reply = self.remote.post(R::CREATE_PATH, payload).await;
            match reply.and_then(decode_record::<R>) {
                Ok(Some(mut record)) => {
                    R::on_remote_created(&mut record, &draft);
                    return Ok(WriteOutcome::remote(self.write_through(record)));
                }
                Ok(None) => warn!(entity = R::ENTITY, "remote create returned no record; storing locally"),
                Err(error) => self.unless_rejected(&error, "create")?,
            }
        }
        R::check_local_create(self.cache.records(), &draft)?;
        let record = R::synthesize(&draft, EntityId::generate(), self.now());
        debug!(entity = R::ENTITY, id = %R::id(&record), "created local-only record");
        self.cache.upsert(record.clone());
        Ok(WriteOutcome::local_only(record))
    }

    /// Update a record remotely, or merge the patch onto the cached copy.
    /// `Ok(None)` when no cached record matches on the fallback path.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::Validation`] for a malformed patch or a
    /// broken local invariant, and [`RepositoryError::Rejected`] when the
    /// service refuses the update.
    pub async fn update(
        &mut self,
        id: &EntityId,
        patch: R::Patch,
    ) -> Result<Option<WriteOutcome<R::Local>>, RepositoryError> {
        R::validate_patch(&patch)?;
        if let Some(remote_id) = id.remote_id() {
            let reply = self
                .remote
                .put(&R::item_path(remote_id), R::patch_payload(&patch))
                .await;
            match reply.and_then(decode_record::<R>) {
                Ok(Some(record)) => return Ok(Some(WriteOutcome::remote(self.write_through(record)))),
                Ok(None) => {
                    return Ok(self
                        .merge_cached(id, |record| R::merge(record, &patch))
                        .map(WriteOutcome::remote));
                }
                Err(error) => self.unless_rejected(&error, "update")?,
            }
        }
        let Some(target) = self.cache.find(id) else {
            debug!(entity = R::ENTITY, %id, "no cached record to update");
            return Ok(None);
        };
        R::check_local_update(self.cache.records(), target, &patch)?;
        Ok(self
            .merge_cached(id, |record| R::merge(record, &patch))
            .map(WriteOutcome::local_only))
    }

    /// Delete a record remotely and always locally. Returns whether a cached
    /// record was removed.
    pub async fn delete(&mut self, id: &EntityId) -> bool {
        if let Some(remote_id) = id.remote_id() {
            if let Err(error) = self.remote.delete(&R::item_path(remote_id)).await {
                warn!(entity = R::ENTITY, %id, %error, "remote delete failed; deleting locally");
            }
        }
        self.cache.remove(id).is_some()
    }

    /// Send an entity-specific command, or apply `fallback` to the cached
    /// record. `Ok(None)` when the remote call failed and nothing is cached.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::Rejected`] when the service refuses the
    /// command.
    pub async fn command<F>(
        &mut self,
        id: &EntityId,
        command: RemoteCommand,
        fallback: F,
    ) -> Result<Option<WriteOutcome<R::Local>>, RepositoryError>
    where
        F: FnOnce(&mut R::Local),
    {
        if let Some(remote_id) = id.remote_id() {
            let path = format!("{}{}", R::item_path(remote_id), command.suffix);
            let reply = match command.method {
                HttpMethod::Post => self.remote.post(&path, command.body).await,
                HttpMethod::Put => self.remote.put(&path, command.body).await,
                HttpMethod::Patch => self.remote.patch(&path, command.body).await,
            };
            match reply.and_then(decode_record::<R>) {
                Ok(Some(record)) => return Ok(Some(WriteOutcome::remote(self.write_through(record)))),
                Ok(None) => return Ok(self.merge_cached(id, fallback).map(WriteOutcome::remote)),
                Err(error) => self.unless_rejected(&error, "command")?,
            }
        }
        Ok(self.merge_cached(id, fallback).map(WriteOutcome::local_only))
    }

    /// Cache a fresh remote record, keeping local-only data of the copy it
    /// replaces.
    pub(crate) fn write_through(&mut self, mut record: R::Local) -> R::Local {
        if let Some(previous) = self.cache.find(R::id(&record)) {
            R::retain_local(&mut record, previous);
        }
        self.cache.upsert(record.clone());
        record
    }

    fn merge_cached(
        &mut self,
        id: &EntityId,
        apply: impl FnOnce(&mut R::Local),
    ) -> Option<R::Local> {
        let mut record = self.cache.find(id)?.clone();
        apply(&mut record);
        self.cache.upsert(record.clone());
        Some(record)
    }

    async fn fetch_list(&self, path: &str) -> Result<Vec<R::Local>, RemoteClientError> {
        let items = self.remote.list(path).await?;
        let mut records = items
            .into_iter()
            .map(|item| decode_remote::<R>(item).map(R::to_local))
            .collect::<Result<Vec<_>, _>>()?;
        for record in &mut records {
            if let Some(previous) = self.cache.find(R::id(record)) {
                R::retain_local(record, previous);
            }
        }
        Ok(records)
    }

    /// Turn a rejection into an error; log anything else and let the caller
    /// fall back.
    fn unless_rejected(&self, error: &RemoteClientError, operation: &str) -> Result<(), RepositoryError> {
        if let Some((status, message)) = error.rejection() {
            return Err(RepositoryError::rejected(R::ENTITY, status, message));
        }
        warn!(entity = R::ENTITY, operation, %error, "remote write failed; applying locally");
        Ok(())
    }
}

fn decode_remote<R: Resource>(value: Value) -> Result<R::Remote, RemoteClientError> {
    serde_json::from_value(value).map_err(|error| RemoteClientError::decode(error.to_string()))
}

/// Decode a response body. An empty body is `Ok(None)`.
fn decode_record<R: Resource>(value: Value) -> Result<Option<R::Local>, RemoteClientError> {
    if value.is_null() {
        return Ok(None);
    }
    decode_remote::<R>(value).map(|remote| Some(R::to_local(remote)))
}

#[cfg(test)]
#[path = "repository_tests.rs"]
mod tests;
