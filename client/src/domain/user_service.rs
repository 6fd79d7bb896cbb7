//! Accounts service: the user repository plus registration, login and the
//! persisted session.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, warn};

use super::codec::{EntityCodec, RemoteRole, RemoteUser, UserResource};
use super::ports::{LocalStore, LocalStoreExt, RemoteClient, RemoteClientError};
use super::repository::{RemoteCommand, ResilientRepository, WriteOutcome};
use super::{
    Credential, EntityId, PublicUser, RepositoryError, Role, User, UserDraft, UserPatch,
    ValidationError,
};

/// Local store key holding the active session.
pub const SESSION_KEY: &str = "session";

type Users<C> = ResilientRepository<UserResource, C>;

/// The signed-in account. The token is only present for remote logins.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    /// The signed-in account.
    pub user: PublicUser,
    /// Bearer token issued by the users service.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    /// Token lifetime in seconds, as reported by the users service.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<u64>,
}

impl Session {
    fn local(user: PublicUser) -> Self {
        Self {
            user,
            token: None,
            expires_in: None,
        }
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("user", &self.user)
            .field("token", &self.token.as_ref().map(|_| "***"))
            .field("expires_in", &self.expires_in)
            .finish()
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginReply {
    token: String,
    user: RemoteUser,
    #[serde(default)]
    expires_in: Option<u64>,
}

/// Accounts backed by the users service.
pub struct UserService<C: ?Sized> {
    users: Users<C>,
    store: Arc<dyn LocalStore>,
}

impl<C> UserService<C>
where
    C: RemoteClient + ?Sized,
{
    /// `store` holds the session; it is usually the store backing `users`.
    #[must_use]
    pub fn new(users: Users<C>, store: Arc<dyn LocalStore>) -> Self {
        Self { users, store }
    }

    /// Cached records, verbatim.
    #[must_use]
    pub fn get_all_sync(&self) -> &[User] {
        self.users.get_all_sync()
    }

    /// Cached record matching `id`.
    #[must_use]
    pub fn get_by_id_sync(&self, id: &EntityId) -> Option<&User> {
        self.users.get_by_id_sync(id)
    }

    /// List remotely, falling back to the cache.
    pub async fn get_all_async(&mut self) -> Vec<User> {
        self.users.get_all_async().await
    }

    /// Fetch one record; `None` when absent.
    pub async fn get_by_id_async(&mut self, id: &EntityId) -> Option<User> {
        self.users.get_by_id_async(id).await
    }

    /// Cached account with `email`, ignoring case and surrounding blanks.
    #[must_use]
    pub fn find_by_email_sync(&self, email: &str) -> Option<&User> {
        self.get_all_sync().iter().find(|user| user.has_email(email))
    }

    /// Register a regular account and sign it in.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::EmailTaken`] when the address is already
    /// cached on the fallback path, and [`RepositoryError::Rejected`] when
    /// the users service refuses the registration.
    pub async fn register(
        &mut self,
        mut draft: UserDraft,
    ) -> Result<WriteOutcome<PublicUser>, RepositoryError> {
        draft.role = None;
        let created = self.users.create(draft).await?.map(|user| user.public());
        self.save_session(&Session::local(created.value.clone()));
        Ok(created)
    }

    /// Create an account of any role without touching the session.
    ///
    /// # Errors
    ///
    /// See [`UserService::register`].
    pub async fn create_by_admin(
        &mut self,
        draft: UserDraft,
    ) -> Result<WriteOutcome<PublicUser>, RepositoryError> {
        Ok(self.users.create(draft).await?.map(|user| user.public()))
    }

    /// Update an account, remotely when possible.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] for a malformed patch or an address used
    /// by another cached account, and [`RepositoryError::Rejected`] when the
    /// users service refuses the update.
    pub async fn update(
        &mut self,
        id: &EntityId,
        patch: UserPatch,
    ) -> Result<Option<WriteOutcome<PublicUser>>, RepositoryError> {
        let updated = self.users.update(id, patch).await?;
        Ok(updated.map(|outcome| outcome.map(|user| user.public())))
    }

    /// Grant or revoke administrator rights.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::Rejected`] when the users service refuses.
    pub async fn change_role(
        &mut self,
        id: &EntityId,
        role: Role,
    ) -> Result<Option<WriteOutcome<PublicUser>>, RepositoryError> {
        let command = RemoteCommand::patch("/role", json!({ "role": RemoteRole::from(role) }));
        let updated = self
            .users
            .command(id, command, |user| user.role = role)
            .await?;
        Ok(updated.map(|outcome| outcome.map(|user| user.public())))
    }

    /// Delete remotely and always locally; `true` when a cached record went.
    pub async fn delete(&mut self, id: &EntityId) -> bool {
        self.users.delete(id).await
    }

    /// Sign in against the users service, or against the cached credentials
    /// when it cannot be reached.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidCredentials`] when the service
    /// answers `401`/`403` or no cached account accepts the password, and
    /// [`RepositoryError::Rejected`] for any other refusal.
    pub async fn login(&mut self, email: &str, password: &str) -> Result<Session, RepositoryError> {
        let body = json!({ "email": email.trim(), "password": password });
        let reply = self.users.remote().post("/login", body).await.and_then(|value| {
            serde_json::from_value::<LoginReply>(value)
                .map_err(|error| RemoteClientError::decode(error.to_string()))
        });
        match reply {
            Ok(reply) => {
                let mut user = UserResource::to_local(reply.user);
                user.credential = Some(Credential::derive(email, password));
                let user = self.users.write_through(user);
                let session = Session {
                    user: user.public(),
                    token: Some(reply.token),
                    expires_in: reply.expires_in,
                };
                self.save_session(&session);
                return Ok(session);
            }
            Err(error) if matches!(error.status_code(), Some(401 | 403)) => {
                return Err(ValidationError::InvalidCredentials.into());
            }
            Err(error) => {
                if let Some((status, message)) = error.rejection() {
                    return Err(RepositoryError::rejected("user", status, message));
                }
                warn!(%error, "remote login failed; checking cached credentials");
            }
        }

        let user = self
            .find_by_email_sync(email)
            .filter(|user| {
                user.credential
                    .as_ref()
                    .is_some_and(|credential| credential.verify(email, password))
            })
            .ok_or(ValidationError::InvalidCredentials)?;
        let session = Session::local(user.public());
        self.save_session(&session);
        Ok(session)
    }

    /// Forget the active session.
    pub fn logout(&self) {
        if let Err(error) = self.store.remove(SESSION_KEY) {
            warn!(%error, "failed to clear session");
        }
    }

    /// The active session, if any.
    #[must_use]
    pub fn session(&self) -> Option<Session> {
        self.store.read_or(SESSION_KEY, None)
    }

    fn save_session(&self, session: &Session) {
        match self.store.write_json(SESSION_KEY, session) {
            Ok(()) => debug!(user = %session.user.id, "session saved"),
            Err(error) => warn!(%error, "failed to persist session"),
        }
    }
}

#[cfg(test)]
#[path = "user_service_tests.rs"]
mod tests;
