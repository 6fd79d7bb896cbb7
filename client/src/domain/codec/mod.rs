//! Translation between remote records and cached records, plus the local
//! policy each entity applies when the remote service cannot be reached.
//!
//! Codec functions are pure: no I/O, no clock reads. Anything that needs the
//! current time receives it as an argument.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::{EntityId, ValidationError};

mod book;
mod dates;
mod loan;
mod user;

pub use book::{BookResource, RemoteBook, RemoteBookStatus};
pub use loan::{LoanResource, RemoteLoan};
pub use user::{RemoteRole, RemoteUser, UserResource};

/// Pure translation between the remote and local vocabularies of an entity.
pub trait EntityCodec {
    /// Record as returned by the remote service.
    type Remote: DeserializeOwned + Serialize;
    /// Record as cached and rendered.
    type Local: Clone + Serialize + DeserializeOwned + Send + Sync;
    /// Creation input.
    type Draft: Send + Sync;
    /// Partial update input.
    type Patch: Send + Sync;

    /// Decode a remote record, filling defaults for absent optional fields.
    fn to_local(remote: Self::Remote) -> Self::Local;

    /// Express a cached record remotely. `None` for local-only records.
    fn to_remote(local: &Self::Local) -> Option<Self::Remote>;

    /// Creation body, or `None` when the draft references local-only records.
    fn draft_payload(draft: &Self::Draft) -> Option<Value>;

    /// Update body carrying only the fields present in `patch`.
    fn patch_payload(patch: &Self::Patch) -> Value;
}

/// Local policy and remote layout of an entity.
pub trait Resource: EntityCodec {
    /// Singular name used in logs and errors.
    const ENTITY: &'static str;
    /// Key of the cached collection in the local store.
    const STORE_KEY: &'static str;
    /// Path listing every record, relative to the service base URL.
    const LIST_PATH: &'static str = "";
    /// Path accepting creation requests.
    const CREATE_PATH: &'static str = "";

    /// Identifier of a cached record.
    fn id(local: &Self::Local) -> &EntityId;

    /// Path of a single record on the remote service.
    fn item_path(remote_id: u64) -> String {
        format!("/{remote_id}")
    }

    /// Shape checks applied on every create, remote or not.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] when the draft is malformed.
    fn validate_draft(_draft: &Self::Draft) -> Result<(), ValidationError> {
        Ok(())
    }

    /// Shape checks applied on every update, remote or not.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] when the patch is malformed.
    fn validate_patch(_patch: &Self::Patch) -> Result<(), ValidationError> {
        Ok(())
    }

    /// Invariants the remote service enforces that must be enforced locally
    /// before a fallback create.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] when the cached records forbid the create.
    fn check_local_create(
        _cached: &[Self::Local],
        _draft: &Self::Draft,
    ) -> Result<(), ValidationError> {
        Ok(())
    }

    /// Invariants to enforce before a fallback update of `target`.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] when the cached records forbid the update.
    fn check_local_update(
        _cached: &[Self::Local],
        _target: &Self::Local,
        _patch: &Self::Patch,
    ) -> Result<(), ValidationError> {
        Ok(())
    }

    /// Build a local-only record from a draft.
    fn synthesize(draft: &Self::Draft, id: EntityId, now: DateTime<Utc>) -> Self::Local;

    /// Shallow merge of a patch onto a cached record.
    fn merge(local: &mut Self::Local, patch: &Self::Patch);

    /// Attach local-only data to a record the remote service just created.
    fn on_remote_created(_local: &mut Self::Local, _draft: &Self::Draft) {}

    /// Carry local-only data from the cached copy onto a fresh remote record.
    fn retain_local(_fresh: &mut Self::Local, _previous: &Self::Local) {}

    /// Records used when the local store holds nothing yet.
    fn seed(_now: DateTime<Utc>) -> Vec<Self::Local> {
        Vec::new()
    }
}

/// Insert `value` under `key` only when it is present.
fn put_some<T: Serialize>(body: &mut serde_json::Map<String, Value>, key: &str, value: Option<T>) {
    if let Some(value) = value {
        body.insert(key.to_owned(), serde_json::json!(value));
    }
}
