//! Error types surfaced by the repositories.
//!
//! Only two failure kinds ever reach a caller. Validation failures are raised
//! locally before anything is written; rejections are verdicts from a remote
//! service that answered with a 4xx status. Remote unavailability is always
//! recovered through the local cache, and "not found" is reported as an
//! absent value.

use thiserror::Error;

use super::lifecycle::InvalidTransition;

/// Invariant violations detected before a write.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A field is missing or malformed.
    #[error("{field}: {message}")]
    Invalid {
        /// Wire name of the offending field.
        field: &'static str,
        /// What is wrong with it.
        message: String,
    },
    /// Another cached account already uses the address (case-insensitive).
    #[error("email already registered")]
    EmailTaken {
        /// The normalised address.
        email: String,
    },
    /// Neither the remote service nor the local accounts accept the login.
    #[error("invalid credentials")]
    InvalidCredentials,
    /// A loan lifecycle transition is not permitted from the current state.
    #[error(transparent)]
    InvalidTransition(#[from] InvalidTransition),
}

impl ValidationError {
    /// Convenience constructor for [`ValidationError::Invalid`].
    #[must_use]
    pub fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            message: message.into(),
        }
    }

    /// Reject blank values for a required text field.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::Invalid`] when `value` is empty once trimmed.
    pub fn require_text(field: &'static str, value: &str) -> Result<(), Self> {
        if value.trim().is_empty() {
            return Err(Self::invalid(field, "must not be empty"));
        }
        Ok(())
    }
}

/// Failures returned by repository operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RepositoryError {
    /// The request violates an entity invariant.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// The remote service understood the request and refused it.
    #[error("{entity} service rejected the request ({status}): {message}")]
    Rejected {
        /// Entity whose service answered.
        entity: &'static str,
        /// HTTP status of the verdict.
        status: u16,
        /// Service-provided explanation.
        message: String,
    },
}

impl RepositoryError {
    /// Convenience constructor for [`RepositoryError::Rejected`].
    #[must_use]
    pub fn rejected(entity: &'static str, status: u16, message: impl Into<String>) -> Self {
        Self::Rejected {
            entity,
            status,
            message: message.into(),
        }
    }

    /// The validation failure, when this error is one.
    #[must_use]
    pub fn as_validation(&self) -> Option<&ValidationError> {
        match self {
            Self::Validation(error) => Some(error),
            Self::Rejected { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_taken_uses_the_user_facing_message() {
        let error = ValidationError::EmailTaken {
            email: "a@b.com".to_owned(),
        };
        assert_eq!(error.to_string(), "email already registered");
    }

    #[test]
    fn require_text_rejects_whitespace() {
        let error = ValidationError::require_text("title", "   ").expect_err("blank rejected");
        assert_eq!(error.to_string(), "title: must not be empty");
        assert!(ValidationError::require_text("title", "Refactoring").is_ok());
    }

    #[test]
    fn rejected_errors_name_the_service() {
        let error = RepositoryError::rejected("user", 409, "duplicate email");
        assert_eq!(
            error.to_string(),
            "user service rejected the request (409): duplicate email"
        );
        assert!(error.as_validation().is_none());
    }
}
