//! Users service records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{EntityCodec, Resource, put_some};
use crate::domain::user::validate_email;
use crate::domain::{
    Credential, EntityId, Role, User, UserDraft, UserPatch, ValidationError, normalize_email,
};

/// Role as spelled by the users service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RemoteRole {
    /// `USER`.
    #[serde(alias = "USUARIO", alias = "User")]
    User,
    /// `ADMIN`.
    #[serde(alias = "ADMINISTRADOR", alias = "Admin")]
    Admin,
}

impl From<RemoteRole> for Role {
    fn from(value: RemoteRole) -> Self {
        match value {
            RemoteRole::User => Self::User,
            RemoteRole::Admin => Self::Admin,
        }
    }
}

impl From<Role> for RemoteRole {
    fn from(value: Role) -> Self {
        match value {
            Role::User => Self::User,
            Role::Admin => Self::Admin,
        }
    }
}

/// Account as returned by the users service.
///
/// `roleFrontend` carries the display role directly and wins over `role`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteUser {
    /// Numeric key.
    pub id: u64,
    /// Display name.
    pub name: String,
    /// Address as stored by the service.
    pub email: String,
    /// Service role.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<RemoteRole>,
    /// Display role, when the service sends one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role_frontend: Option<Role>,
}

/// Accounts served by the users service.
#[derive(Debug, Clone, Copy, Default)]
pub struct UserResource;

impl EntityCodec for UserResource {
    type Remote = RemoteUser;
    type Local = User;
    type Draft = UserDraft;
    type Patch = UserPatch;

    fn to_local(remote: RemoteUser) -> User {
        let role = remote
            .role_frontend
            .or_else(|| remote.role.map(Role::from))
            .unwrap_or_default();
        User {
            id: EntityId::from(remote.id),
            name: remote.name,
            email: normalize_email(&remote.email),
            role,
            credential: None,
        }
    }

    fn to_remote(local: &User) -> Option<RemoteUser> {
        Some(RemoteUser {
            id: local.id.remote_id()?,
            name: local.name.clone(),
            email: local.email.clone(),
            role: Some(local.role.into()),
            role_frontend: Some(local.role),
        })
    }

    fn draft_payload(draft: &UserDraft) -> Option<Value> {
        let mut body = Map::new();
        body.insert("name".into(), draft.name.trim().into());
        body.insert("email".into(), normalize_email(&draft.email).into());
        body.insert("password".into(), draft.password.as_str().into());
        put_some(&mut body, "role", draft.role.map(RemoteRole::from));
        Some(Value::Object(body))
    }

    fn patch_payload(patch: &UserPatch) -> Value {
        let mut body = Map::new();
        put_some(&mut body, "name", patch.name.as_deref().map(str::trim));
        put_some(&mut body, "email", patch.email.as_deref().map(normalize_email));
        Value::Object(body)
    }
}

impl Resource for UserResource {
    const ENTITY: &'static str = "user";
    const STORE_KEY: &'static str = "users";
    const CREATE_PATH: &'static str = "/register";

    fn id(local: &User) -> &EntityId {
        &local.id
    }

    fn validate_draft(draft: &UserDraft) -> Result<(), ValidationError> {
        draft.validate()
    }

    fn validate_patch(patch: &UserPatch) -> Result<(), ValidationError> {
        if let Some(name) = &patch.name {
            ValidationError::require_text("name", name)?;
        }
        if let Some(email) = &patch.email {
            validate_email(email)?;
        }
        Ok(())
    }

    fn check_local_create(cached: &[User], draft: &UserDraft) -> Result<(), ValidationError> {
        ensure_email_free(cached, &draft.email, None)
    }

    fn check_local_update(
        cached: &[User],
        target: &User,
        patch: &UserPatch,
    ) -> Result<(), ValidationError> {
        match &patch.email {
            Some(email) => ensure_email_free(cached, email, Some(&target.id)),
            None => Ok(()),
        }
    }

    fn synthesize(draft: &UserDraft, id: EntityId, _now: DateTime<Utc>) -> User {
        User {
            id,
            name: draft.name.trim().to_owned(),
            email: normalize_email(&draft.email),
            role: draft.role.unwrap_or_default(),
            credential: Some(Credential::derive(&draft.email, &draft.password)),
        }
    }

    fn merge(local: &mut User, patch: &UserPatch) {
        if let Some(name) = &patch.name {
            local.name = name.trim().to_owned();
        }
        if let Some(email) = &patch.email {
            local.email = normalize_email(email);
        }
    }

    fn on_remote_created(local: &mut User, draft: &UserDraft) {
        local.credential = Some(Credential::derive(&draft.email, &draft.password));
    }

    fn retain_local(fresh: &mut User, previous: &User) {
        if fresh.credential.is_none() && fresh.has_email(&previous.email) {
            fresh.credential = previous.credential.clone();
        }
    }

    fn seed(_now: DateTime<Utc>) -> Vec<User> {
        [
            ("1", "Administrador", "admin@biblioteca.com", Role::Admin, "admin123"),
            ("2", "Usuario Prueba", "usuario@biblioteca.com", Role::User, "user123"),
        ]
        .into_iter()
        .map(|(id, name, email, role, password)| User {
            id: EntityId::new(id),
            name: name.to_owned(),
            email: email.to_owned(),
            role,
            credential: Some(Credential::derive(email, password)),
        })
        .collect()
    }
}

fn ensure_email_free(
    cached: &[User],
    email: &str,
    except: Option<&EntityId>,
) -> Result<(), ValidationError> {
    let taken = cached
        .iter()
        .filter(|user| except.is_none_or(|id| !user.id.matches(id)))
        .any(|user| user.has_email(email));
    if taken {
        return Err(ValidationError::EmailTaken {
            email: normalize_email(email),
        });
    }
    Ok(())
}
