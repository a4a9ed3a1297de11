//! User domain model.
//!
//! # Responsibility
//! - Define the canonical user account record.
//! - Provide the validation gate called by repository write paths.
//!
//! # Invariants
//! - `uuid` is stable and never reused for another user.
//! - `email` is unique across all users; uniqueness is enforced by storage.
//! - `password` is an opaque credential. It is never serialized and never
//!   logged.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable identifier for a user.
pub type UserId = Uuid;

/// Minimum number of characters a password must carry.
pub const PASSWORD_MIN_CHARS: usize = 6;

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid email regex"));

/// Canonical user account record.
///
/// The user's ordered place list is not part of this write model; it is
/// persisted as ownership rows and only ever mutated by place lifecycle
/// transactions. Read paths expose it through `UserRecord`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Stable global ID.
    pub uuid: UserId,
    /// Display name. Must not be blank.
    pub name: String,
    /// Unique account email, stored normalized to lowercase.
    pub email: String,
    /// Reference to an externally stored avatar image. Opaque to core.
    pub image: Option<String>,
    /// Opaque credential. Excluded from every serialized representation.
    #[serde(skip_serializing)]
    pub password: String,
}

/// Validation failures for user write paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserValidationError {
    /// Name is empty after trimming.
    BlankName,
    /// Email does not have a plausible address shape.
    InvalidEmail,
    /// Password is shorter than the required minimum.
    PasswordTooShort { min_chars: usize },
}

impl Display for UserValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankName => write!(f, "user name must not be blank"),
            Self::InvalidEmail => write!(f, "user email is not a valid address"),
            Self::PasswordTooShort { min_chars } => {
                write!(f, "user password must have at least {min_chars} characters")
            }
        }
    }
}

impl Error for UserValidationError {}

impl User {
    /// Creates a new user with a generated stable ID.
    pub fn new(
        name: impl Into<String>,
        email: impl Into<String>,
        image: Option<String>,
        password: impl Into<String>,
    ) -> Self {
        Self::with_id(Uuid::new_v4(), name, email, image, password)
    }

    /// Creates a new user with a caller-provided stable ID.
    pub fn with_id(
        uuid: UserId,
        name: impl Into<String>,
        email: impl Into<String>,
        image: Option<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            uuid,
            name: name.into(),
            email: email.into(),
            image,
            password: password.into(),
        }
    }

    /// Validates the whole record. Called by repository write paths before
    /// any SQL mutation.
    pub fn validate(&self) -> Result<(), UserValidationError> {
        if self.name.trim().is_empty() {
            return Err(UserValidationError::BlankName);
        }
        if !EMAIL_RE.is_match(self.email.trim()) {
            return Err(UserValidationError::InvalidEmail);
        }
        if self.password.chars().count() < PASSWORD_MIN_CHARS {
            return Err(UserValidationError::PasswordTooShort {
                min_chars: PASSWORD_MIN_CHARS,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{User, UserValidationError};

    fn valid_user() -> User {
        User::new("Max Schwarz", "max@example.com", None, "secret-pass")
    }

    #[test]
    fn valid_user_passes_validation() {
        assert!(valid_user().validate().is_ok());
    }

    #[test]
    fn blank_name_is_rejected() {
        let mut user = valid_user();
        user.name = " ".to_string();
        assert_eq!(user.validate(), Err(UserValidationError::BlankName));
    }

    #[test]
    fn malformed_emails_are_rejected() {
        for email in ["", "plain", "two@@example.com", "no-domain@", "a b@c.d"] {
            let mut user = valid_user();
            user.email = email.to_string();
            assert_eq!(
                user.validate(),
                Err(UserValidationError::InvalidEmail),
                "email `{email}` should be rejected"
            );
        }
    }

    #[test]
    fn short_password_is_rejected() {
        let mut user = valid_user();
        user.password = "12345".to_string();
        assert!(matches!(
            user.validate(),
            Err(UserValidationError::PasswordTooShort { .. })
        ));
    }
}
