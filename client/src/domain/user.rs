//! Library account entity, its opaque credential and its payloads.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

use super::{EntityId, ValidationError};

/// Account role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Role {
    /// Borrower.
    #[default]
    User,
    /// Librarian; may approve loans and manage accounts.
    Admin,
}

/// Trim and lower-case an email address. Uniqueness is judged on this form.
///
/// # Examples
/// ```
/// use library_client::domain::normalize_email;
///
/// assert_eq!(normalize_email("  Ada@Example.COM "), "ada@example.com");
/// ```
#[must_use]
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Opaque local credential: hex SHA-256 of the normalised email and password.
///
/// One fast hash salted only with the email. It recognises a returning user
/// offline and is not a password store: the cache file can be brute-forced.
/// Never displayed; `Debug` is redacted. Digests are compared in constant
/// time.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Credential(String);

impl Credential {
    /// Derive the credential for an account.
    #[must_use]
    pub fn derive(email: &str, password: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(normalize_email(email).as_bytes());
        hasher.update(b":");
        hasher.update(password.as_bytes());
        Self(hex::encode(hasher.finalize()))
    }

    /// True when `password` produces this credential for `email`.
    #[must_use]
    pub fn verify(&self, email: &str, password: &str) -> bool {
        let candidate = Self::derive(email, password);
        self.0.as_bytes().ct_eq(candidate.0.as_bytes()).into()
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

/// Cached account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Local identifier.
    pub id: EntityId,
    /// Display name.
    pub name: String,
    /// Normalised address; unique among cached users.
    pub email: String,
    /// Access level.
    #[serde(default)]
    pub role: Role,
    /// Present only for accounts registered or logged in through this client.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credential: Option<Credential>,
}

impl User {
    /// Display projection without the credential.
    #[must_use]
    pub fn public(&self) -> PublicUser {
        PublicUser {
            id: self.id.clone(),
            name: self.name.clone(),
            email: self.email.clone(),
            role: self.role,
        }
    }

    /// Address comparison on the normalised form.
    #[must_use]
    pub fn has_email(&self, email: &str) -> bool {
        normalize_email(&self.email) == normalize_email(email)
    }
}

/// Account as shown to the display layer and kept in the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    /// Local identifier.
    pub id: EntityId,
    /// Display name.
    pub name: String,
    /// Normalised address.
    pub email: String,
    /// Access level.
    pub role: Role,
}

/// Registration input. The clear-text password is wiped on drop.
#[derive(Clone)]
pub struct UserDraft {
    /// Display name.
    pub name: String,
    /// Normalised before any comparison or write.
    pub email: String,
    /// Clear text; sent to the users service and digested locally.
    pub password: Zeroizing<String>,
    /// Defaults to [`Role::User`].
    pub role: Option<Role>,
}

impl UserDraft {
    /// Draft for an ordinary account.
    pub fn new(
        name: impl Into<String>,
        email: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            password: Zeroizing::new(password.into()),
            role: None,
        }
    }

    /// Request `role` instead of the default.
    #[must_use]
    pub const fn with_role(mut self, role: Role) -> Self {
        self.role = Some(role);
        self
    }

    /// Shape checks shared by the remote and fallback paths.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::Invalid`] for a blank name or password, or
    /// an address without a local part and domain.
    pub fn validate(&self) -> Result<(), ValidationError> {
        ValidationError::require_text("name", &self.name)?;
        validate_email(&self.email)?;
        if self.password.is_empty() {
            return Err(ValidationError::invalid("password", "must not be empty"));
        }
        Ok(())
    }
}

impl fmt::Debug for UserDraft {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserDraft")
            .field("name", &self.name)
            .field("email", &self.email)
            .field("password", &"***")
            .field("role", &self.role)
            .finish()
    }
}

/// Partial update of an account.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserPatch {
    /// Replacement display name.
    pub name: Option<String>,
    /// Replacement address; re-checked for uniqueness offline.
    pub email: Option<String>,
}

pub(crate) fn validate_email(email: &str) -> Result<(), ValidationError> {
    let normalized = normalize_email(email);
    match normalized.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(()),
        _ => Err(ValidationError::invalid("email", "must look like name@domain")),
    }
}
