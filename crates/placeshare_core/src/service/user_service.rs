//! User account use-case service.
//!
//! # Responsibility
//! - Provide signup, login and listing entry points for core callers.
//! - Normalize emails before storage and lookup.
//!
//! # Invariants
//! - Passwords are compared as opaque values and never serialized or logged.
//! - Unknown email and wrong password are indistinguishable to callers.
//! - A user's place list starts empty and is only ever mutated by place
//!   lifecycle transactions.

use crate::model::user::{User, UserId, UserValidationError};
use crate::repo::user_repo::{UserRecord, UserRepoError, UserRepository};
use log::{error, info};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

/// Request model for account signup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignUpRequest {
    pub name: String,
    pub email: String,
    pub image: Option<String>,
    pub password: String,
}

/// Service error for user account use-cases.
#[derive(Debug)]
pub enum UserServiceError {
    /// Input failed model validation.
    InvalidInput(UserValidationError),
    /// Target user does not exist.
    UserNotFound(UserId),
    /// Another account already registered this email.
    EmailTaken(String),
    /// Login failed; the reason is deliberately unspecified.
    InvalidCredentials,
    /// Internal consistency mismatch between write and read-back.
    InconsistentState(&'static str),
    /// Persistence-layer failure.
    Repo(UserRepoError),
}

impl Display for UserServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidInput(err) => write!(f, "{err}"),
            Self::UserNotFound(id) => write!(f, "user not found: {id}"),
            Self::EmailTaken(email) => write!(f, "email already registered: {email}"),
            Self::InvalidCredentials => write!(f, "invalid credentials"),
            Self::InconsistentState(details) => write!(f, "inconsistent user state: {details}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for UserServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidInput(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<UserRepoError> for UserServiceError {
    fn from(value: UserRepoError) -> Self {
        match value {
            UserRepoError::Validation(err) => Self::InvalidInput(err),
            UserRepoError::NotFound(id) => Self::UserNotFound(id),
            UserRepoError::EmailTaken(email) => Self::EmailTaken(email),
            other => Self::Repo(other),
        }
    }
}

impl UserServiceError {
    /// Stable code for metadata-only log records.
    fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "invalid_input",
            Self::UserNotFound(_) => "user_not_found",
            Self::EmailTaken(_) => "email_taken",
            Self::InvalidCredentials => "invalid_credentials",
            Self::InconsistentState(_) => "inconsistent_state",
            Self::Repo(_) => "user_store_failed",
        }
    }
}

/// Use-case service for user accounts.
pub struct UserService<U: UserRepository> {
    users: U,
}

impl<U: UserRepository> UserService<U> {
    /// Creates a service using the provided repository implementation.
    pub fn new(users: U) -> Self {
        Self { users }
    }

    /// Creates one account with an empty place list.
    ///
    /// # Contract
    /// - The email is normalized (trimmed, lowercased) before storage.
    /// - An already-registered email fails with `EmailTaken`, whether it is
    ///   caught by the pre-check or by the storage uniqueness constraint.
    pub fn sign_up(&self, request: &SignUpRequest) -> Result<UserRecord, UserServiceError> {
        let started_at = Instant::now();
        match self.sign_up_inner(request) {
            Ok(record) => {
                info!(
                    "event=user_signup module=service status=ok user_uuid={} duration_ms={}",
                    record.uuid,
                    started_at.elapsed().as_millis()
                );
                Ok(record)
            }
            Err(err) => {
                error!(
                    "event=user_signup module=service status=error duration_ms={} error_code={}",
                    started_at.elapsed().as_millis(),
                    err.error_code()
                );
                Err(err)
            }
        }
    }

    /// Verifies a credential pair and returns the account id.
    ///
    /// Credentials are opaque values; comparison is exact. Unknown email and
    /// wrong password both fail with `InvalidCredentials`.
    pub fn log_in(&self, email: &str, password: &str) -> Result<UserId, UserServiceError> {
        let started_at = Instant::now();
        let normalized = normalize_email(email);
        match self.users.credentials_by_email(&normalized) {
            Ok(Some((user_uuid, stored_password))) if stored_password == password => {
                info!(
                    "event=user_login module=service status=ok user_uuid={user_uuid} duration_ms={}",
                    started_at.elapsed().as_millis()
                );
                Ok(user_uuid)
            }
            Ok(_) => {
                error!(
                    "event=user_login module=service status=error duration_ms={} error_code=invalid_credentials",
                    started_at.elapsed().as_millis()
                );
                Err(UserServiceError::InvalidCredentials)
            }
            Err(err) => {
                let err = UserServiceError::from(err);
                error!(
                    "event=user_login module=service status=error duration_ms={} error_code={}",
                    started_at.elapsed().as_millis(),
                    err.error_code()
                );
                Err(err)
            }
        }
    }

    /// Lists all accounts as password-free records.
    pub fn list_users(&self) -> Result<Vec<UserRecord>, UserServiceError> {
        Ok(self.users.list_users()?)
    }

    /// Gets one account by id.
    pub fn get_user(&self, user_uuid: UserId) -> Result<UserRecord, UserServiceError> {
        self.users
            .get_user(user_uuid)?
            .ok_or(UserServiceError::UserNotFound(user_uuid))
    }

    fn sign_up_inner(&self, request: &SignUpRequest) -> Result<UserRecord, UserServiceError> {
        let user = User::new(
            request.name.clone(),
            normalize_email(&request.email),
            request.image.clone(),
            request.password.clone(),
        );
        user.validate().map_err(UserServiceError::InvalidInput)?;

        // Pre-check for a clean error; the UNIQUE constraint still covers
        // the race between check and insert.
        if self.users.find_user_by_email(&user.email)?.is_some() {
            return Err(UserServiceError::EmailTaken(user.email));
        }

        self.users.create_user(&user)?;
        self.users
            .get_user(user.uuid)?
            .ok_or(UserServiceError::InconsistentState(
                "created user not found in read-back",
            ))
    }
}

/// Normalizes an email for storage and lookup.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}
