//! Test doubles shared by unit tests (in `src/`) and integration tests (in
//! `tests/`). Compiled for tests and under the `test-support` feature.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Local, Utc};
use mockable::Clock;
use serde_json::Value;

use crate::domain::ports::{RemoteClient, RemoteClientError};

/// Clock frozen at a chosen instant until advanced.
pub struct FixtureClock(Mutex<DateTime<Utc>>);

impl FixtureClock {
    /// Clock reading `now` until advanced.
    #[must_use]
    pub const fn new(now: DateTime<Utc>) -> Self {
        Self(Mutex::new(now))
    }

    /// Move the clock forward by `delta`.
    pub fn advance(&self, delta: Duration) {
        *self.lock_clock() += delta;
    }

    fn lock_clock(&self) -> MutexGuard<'_, DateTime<Utc>> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Clock for FixtureClock {
    fn local(&self) -> DateTime<Local> {
        self.utc().with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        *self.lock_clock()
    }
}

/// Remote call kinds understood by [`ScriptedRemoteClient`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Call {
    /// [`RemoteClient::get`].
    Get,
    /// [`RemoteClient::list`].
    List,
    /// [`RemoteClient::post`].
    Post,
    /// [`RemoteClient::put`].
    Put,
    /// [`RemoteClient::patch`].
    Patch,
    /// [`RemoteClient::delete`].
    Delete,
}

type Reply = Result<Value, RemoteClientError>;

#[derive(Default)]
struct Script {
    replies: HashMap<(Call, String), VecDeque<Reply>>,
    calls: Vec<(Call, String, Option<Value>)>,
    offline: bool,
}

/// Remote client answering from a script instead of the network.
///
/// Replies queued for a call and path are consumed in order; the last one
/// repeats. Unscripted calls, and every call while offline, fail with a
/// transport error.
#[derive(Default)]
pub struct ScriptedRemoteClient(Mutex<Script>);

impl ScriptedRemoteClient {
    /// Client with an empty script.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `reply` for `call` on `path`.
    pub fn reply(&self, call: Call, path: &str, reply: Reply) {
        self.lock_script()
            .replies
            .entry((call, path.to_owned()))
            .or_default()
            .push_back(reply);
    }

    /// Make every call fail as if the service were unreachable.
    pub fn set_offline(&self, offline: bool) {
        self.lock_script().offline = offline;
    }

    /// Every call received so far, with its body.
    #[must_use]
    pub fn calls(&self) -> Vec<(Call, String, Option<Value>)> {
        self.lock_script().calls.clone()
    }

    /// Number of calls of `call` made to `path`.
    #[must_use]
    pub fn count(&self, call: Call, path: &str) -> usize {
        self.lock_script()
            .calls
            .iter()
            .filter(|(made, made_path, _)| *made == call && made_path == path)
            .count()
    }

    fn answer(&self, call: Call, path: &str, body: Option<Value>) -> Reply {
        let mut script = self.lock_script();
        script.calls.push((call, path.to_owned(), body));
        if script.offline {
            return Err(RemoteClientError::transport("service offline"));
        }
        let Some(queue) = script.replies.get_mut(&(call, path.to_owned())) else {
            return Err(RemoteClientError::transport(format!(
                "no scripted reply for {call:?} {path}"
            )));
        };
        if queue.len() > 1 {
            queue
                .pop_front()
                .unwrap_or_else(|| Err(RemoteClientError::transport("script exhausted")))
        } else {
            queue
                .front()
                .cloned()
                .unwrap_or_else(|| Err(RemoteClientError::transport("script exhausted")))
        }
    }

    fn lock_script(&self) -> MutexGuard<'_, Script> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl RemoteClient for ScriptedRemoteClient {
    async fn get(&self, path: &str) -> Result<Value, RemoteClientError> {
        self.answer(Call::Get, path, None)
    }

    async fn list(&self, path: &str) -> Result<Vec<Value>, RemoteClientError> {
        match self.answer(Call::List, path, None)? {
            Value::Array(items) => Ok(items),
            other => Err(RemoteClientError::decode(format!("expected an array, got {other}"))),
        }
    }

    async fn post(&self, path: &str, body: Value) -> Result<Value, RemoteClientError> {
        self.answer(Call::Post, path, Some(body))
    }

    async fn put(&self, path: &str, body: Value) -> Result<Value, RemoteClientError> {
        self.answer(Call::Put, path, Some(body))
    }

    async fn patch(&self, path: &str, body: Value) -> Result<Value, RemoteClientError> {
        self.answer(Call::Patch, path, Some(body))
    }

    async fn delete(&self, path: &str) -> Result<(), RemoteClientError> {
        self.answer(Call::Delete, path, None).map(drop)
    }
}
