//! User repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide persistence APIs for user accounts.
//! - Expose the ordered ownership list as part of the user read model.
//!
//! # Invariants
//! - Write paths must call `User::validate()` before SQL mutations.
//! - `user_places` rows are read here but written only by the place
//!   lifecycle transactions.
//! - Read models never carry the password.

use crate::db::migrations::latest_version;
use crate::db::DbError;
use crate::model::place::PlaceId;
use crate::model::user::{User, UserId, UserValidationError};
use crate::repo::{table_exists, table_has_column};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Serialize;
use uuid::Uuid;

const USER_SELECT_SQL: &str = "SELECT
    uuid,
    name,
    email,
    image
FROM users";

pub type UserRepoResult<T> = Result<T, UserRepoError>;

/// Errors from user persistence and query operations.
#[derive(Debug)]
pub enum UserRepoError {
    /// Model validation failed before persistence.
    Validation(UserValidationError),
    /// Underlying SQLite/bootstrap error.
    Db(DbError),
    /// Target user does not exist.
    NotFound(UserId),
    /// Another user already registered this email.
    EmailTaken(String),
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    /// Required table is missing.
    MissingRequiredTable(&'static str),
    /// Required column is missing from expected table.
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
    /// Persisted data cannot be converted to a valid read model.
    InvalidData(String),
}

impl std::fmt::Display for UserRepoError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "user not found: {id}"),
            Self::EmailTaken(email) => write!(f, "email already registered: {email}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "user repository requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "user repository requires table `{table}`")
            }
            Self::MissingRequiredColumn { table, column } => write!(
                f,
                "user repository requires column `{column}` in table `{table}`"
            ),
            Self::InvalidData(message) => write!(f, "invalid persisted user data: {message}"),
        }
    }
}

impl std::error::Error for UserRepoError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<UserValidationError> for UserRepoError {
    fn from(value: UserValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for UserRepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for UserRepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Password-free user read model, including the ordered place list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserRecord {
    /// Stable user id.
    pub uuid: UserId,
    /// Display name.
    pub name: String,
    /// Normalized account email.
    pub email: String,
    /// Avatar image reference.
    pub image: Option<String>,
    /// Owned place ids in insertion order.
    pub places: Vec<PlaceId>,
}

/// Repository interface for user account operations.
pub trait UserRepository {
    /// Creates one user with an empty ownership list.
    fn create_user(&self, user: &User) -> UserRepoResult<()>;
    /// Loads one user by id.
    fn get_user(&self, user_uuid: UserId) -> UserRepoResult<Option<UserRecord>>;
    /// Loads one user by normalized email.
    fn find_user_by_email(&self, email: &str) -> UserRepoResult<Option<UserRecord>>;
    /// Lists all users in deterministic order.
    fn list_users(&self) -> UserRepoResult<Vec<UserRecord>>;
    /// Loads the stored credential for a login attempt.
    fn credentials_by_email(&self, email: &str) -> UserRepoResult<Option<(UserId, String)>>;
}

/// SQLite-backed user repository.
pub struct SqliteUserRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteUserRepository<'conn> {
    /// Constructs a repository from a migrated/ready connection.
    pub fn try_new(conn: &'conn Connection) -> UserRepoResult<Self> {
        ensure_user_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl UserRepository for SqliteUserRepository<'_> {
    fn create_user(&self, user: &User) -> UserRepoResult<()> {
        user.validate()?;

        self.conn
            .execute(
                "INSERT INTO users (uuid, name, email, image, password)
                 VALUES (?1, ?2, ?3, ?4, ?5);",
                params![
                    user.uuid.to_string(),
                    user.name.as_str(),
                    user.email.as_str(),
                    user.image.as_deref(),
                    user.password.as_str(),
                ],
            )
            .map_err(|err| map_insert_error(&user.email, err))?;
        Ok(())
    }

    fn get_user(&self, user_uuid: UserId) -> UserRepoResult<Option<UserRecord>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{USER_SELECT_SQL} WHERE uuid = ?1;"))?;
        let mut rows = stmt.query([user_uuid.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(self.parse_user_record(row)?));
        }
        Ok(None)
    }

    fn find_user_by_email(&self, email: &str) -> UserRepoResult<Option<UserRecord>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{USER_SELECT_SQL} WHERE email = ?1;"))?;
        let mut rows = stmt.query([email])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(self.parse_user_record(row)?));
        }
        Ok(None)
    }

    fn list_users(&self) -> UserRepoResult<Vec<UserRecord>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{USER_SELECT_SQL} ORDER BY created_at ASC, uuid ASC;"))?;
        let mut rows = stmt.query([])?;
        let mut users = Vec::new();
        while let Some(row) = rows.next()? {
            users.push(self.parse_user_record(row)?);
        }
        Ok(users)
    }

    fn credentials_by_email(&self, email: &str) -> UserRepoResult<Option<(UserId, String)>> {
        let result = self
            .conn
            .query_row(
                "SELECT uuid, password FROM users WHERE email = ?1;",
                [email],
                |row| {
                    let uuid: String = row.get(0)?;
                    let password: String = row.get(1)?;
                    Ok((uuid, password))
                },
            )
            .optional()?;

        match result {
            None => Ok(None),
            Some((uuid_text, password)) => {
                let uuid = parse_uuid(&uuid_text, "users.uuid")?;
                Ok(Some((uuid, password)))
            }
        }
    }
}

impl SqliteUserRepository<'_> {
    fn parse_user_record(&self, row: &Row<'_>) -> UserRepoResult<UserRecord> {
        let uuid_text: String = row.get("uuid")?;
        let uuid = parse_uuid(&uuid_text, "users.uuid")?;
        let places = owned_place_ids(self.conn, &uuid_text)?;

        Ok(UserRecord {
            uuid,
            name: row.get("name")?,
            email: row.get("email")?,
            image: row.get("image")?,
            places,
        })
    }
}

fn owned_place_ids(conn: &Connection, user_uuid: &str) -> UserRepoResult<Vec<PlaceId>> {
    let mut stmt = conn.prepare(
        "SELECT place_uuid
         FROM user_places
         WHERE user_uuid = ?1
         ORDER BY sort_order ASC, place_uuid ASC;",
    )?;
    let mut rows = stmt.query([user_uuid])?;
    let mut ids = Vec::new();
    while let Some(row) = rows.next()? {
        let value: String = row.get(0)?;
        ids.push(parse_uuid(&value, "user_places.place_uuid")?);
    }
    Ok(ids)
}

fn map_insert_error(email: &str, err: rusqlite::Error) -> UserRepoError {
    if let rusqlite::Error::SqliteFailure(code, _) = &err {
        if code.code == rusqlite::ErrorCode::ConstraintViolation {
            return UserRepoError::EmailTaken(email.to_string());
        }
    }
    UserRepoError::Db(DbError::Sqlite(err))
}

fn parse_uuid(value: &str, column: &'static str) -> UserRepoResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|_| UserRepoError::InvalidData(format!("invalid uuid `{value}` in {column}")))
}

fn ensure_user_connection_ready(conn: &Connection) -> UserRepoResult<()> {
    let expected_version = latest_version();
    let actual_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    if actual_version != expected_version {
        return Err(UserRepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    if !table_exists(conn, "users")? {
        return Err(UserRepoError::MissingRequiredTable("users"));
    }
    for column in [
        "uuid",
        "name",
        "email",
        "image",
        "password",
        "created_at",
        "updated_at",
    ] {
        if !table_has_column(conn, "users", column)? {
            return Err(UserRepoError::MissingRequiredColumn {
                table: "users",
                column,
            });
        }
    }

    if !table_exists(conn, "user_places")? {
        return Err(UserRepoError::MissingRequiredTable("user_places"));
    }
    for column in ["user_uuid", "place_uuid", "sort_order"] {
        if !table_has_column(conn, "user_places", column)? {
            return Err(UserRepoError::MissingRequiredColumn {
                table: "user_places",
                column,
            });
        }
    }

    Ok(())
}
