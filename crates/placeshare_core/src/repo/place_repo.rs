//! Place repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide stable CRUD APIs over canonical `places` storage.
//! - Own the two cross-record lifecycle operations that mutate a place and
//!   its owner's ownership list as one atomic unit.
//!
//! # Invariants
//! - Write paths must call `Place::validate()` before SQL mutations.
//! - Read paths must reject invalid persisted state instead of masking it.
//! - Create and delete never commit a state where `places.creator_uuid` and
//!   the `user_places` rows disagree.
//!
//! # See also
//! - docs/architecture/data-model.md

use crate::db::migrations::latest_version;
use crate::db::{begin_write_tx, DbError};
use crate::model::place::{GeoPoint, Place, PlaceId, PlaceValidationError};
use crate::model::user::UserId;
use crate::repo::{table_exists, table_has_column};
use rusqlite::{params, Connection, Row};
use uuid::Uuid;

const PLACE_SELECT_SQL: &str = "SELECT
    uuid,
    title,
    description,
    address,
    lat,
    lng,
    image,
    creator_uuid
FROM places";

pub type PlaceRepoResult<T> = Result<T, PlaceRepoError>;

/// Errors from place persistence and lifecycle operations.
#[derive(Debug)]
pub enum PlaceRepoError {
    /// Model validation failed before or after persistence.
    Validation(PlaceValidationError),
    /// Underlying SQLite/bootstrap error.
    Db(DbError),
    /// Begin or commit of a write transaction failed; any staged writes
    /// were rolled back.
    Transaction(DbError),
    /// Target place does not exist.
    NotFound(PlaceId),
    /// The user a new place would belong to does not exist.
    CreatorNotFound(UserId),
    /// A stored place references a user that no longer exists.
    OwnerMissing {
        place_uuid: PlaceId,
        creator_uuid: UserId,
    },
    /// The owner exists but holds no ownership entry for the place.
    OwnershipEntryMissing {
        place_uuid: PlaceId,
        creator_uuid: UserId,
    },
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

impl std::fmt::Display for PlaceRepoError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::Transaction(err) => write!(f, "write transaction failed: {err}"),
            Self::NotFound(id) => write!(f, "place not found: {id}"),
            Self::CreatorNotFound(id) => write!(f, "creator user not found: {id}"),
            Self::OwnerMissing {
                place_uuid,
                creator_uuid,
            } => write!(
                f,
                "place {place_uuid} references missing owner {creator_uuid}"
            ),
            Self::OwnershipEntryMissing {
                place_uuid,
                creator_uuid,
            } => write!(
                f,
                "owner {creator_uuid} has no ownership entry for place {place_uuid}"
            ),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "place repository requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "place repository requires table `{table}`")
            }
            Self::MissingRequiredColumn { table, column } => write!(
                f,
                "place repository requires column `{column}` in table `{table}`"
            ),
            Self::InvalidData(message) => write!(f, "invalid persisted place data: {message}"),
        }
    }
}

impl std::error::Error for PlaceRepoError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) | Self::Transaction(err) => Some(err),
            _ => None,
        }
    }
}

impl From<PlaceValidationError> for PlaceRepoError {
    fn from(value: PlaceValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for PlaceRepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for PlaceRepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Repository interface for place CRUD and lifecycle operations.
pub trait PlaceRepository {
    /// Creates one place and appends it to the owner's place list, as one
    /// atomic unit.
    fn create_place(&self, place: &Place) -> PlaceRepoResult<()>;
    /// Loads one place by id.
    fn get_place(&self, place_uuid: PlaceId) -> PlaceRepoResult<Option<Place>>;
    /// Lists places whose `creator` matches the given user.
    fn list_places_by_creator(&self, creator_uuid: UserId) -> PlaceRepoResult<Vec<Place>>;
    /// Replaces title and description of one place. All other fields are
    /// immutable.
    fn update_place_content(
        &self,
        place_uuid: PlaceId,
        title: &str,
        description: &str,
    ) -> PlaceRepoResult<()>;
    /// Removes one place and its owner's ownership entry, as one atomic
    /// unit. Returns the place as it existed before deletion.
    fn delete_place(&self, place_uuid: PlaceId) -> PlaceRepoResult<Place>;
}

/// SQLite-backed place repository.
pub struct SqlitePlaceRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqlitePlaceRepository<'conn> {
    /// Constructs a repository from a migrated/ready connection.
    pub fn try_new(conn: &'conn Connection) -> PlaceRepoResult<Self> {
        ensure_place_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl PlaceRepository for SqlitePlaceRepository<'_> {
    fn create_place(&self, place: &Place) -> PlaceRepoResult<()> {
        place.validate()?;

        let tx = begin_write_tx(self.conn).map_err(PlaceRepoError::Transaction)?;

        // The service layer pre-checks the creator for a clean error path;
        // this check runs under the write lock and closes the race against a
        // concurrent user deletion.
        if !user_row_exists(&tx, place.creator)? {
            return Err(PlaceRepoError::CreatorNotFound(place.creator));
        }

        insert_place_row(&tx, place)?;
        append_owned_place(&tx, place.creator, place.uuid)?;

        tx.commit()
            .map_err(|err| PlaceRepoError::Transaction(DbError::Sqlite(err)))?;
        Ok(())
    }

    fn get_place(&self, place_uuid: PlaceId) -> PlaceRepoResult<Option<Place>> {
        load_place_row(self.conn, place_uuid)
    }

    fn list_places_by_creator(&self, creator_uuid: UserId) -> PlaceRepoResult<Vec<Place>> {
        let mut stmt = self.conn.prepare(&format!(
            "{PLACE_SELECT_SQL}
             WHERE creator_uuid = ?1
             ORDER BY created_at ASC, uuid ASC;"
        ))?;

        let mut rows = stmt.query([creator_uuid.to_string()])?;
        let mut places = Vec::new();
        while let Some(row) = rows.next()? {
            places.push(parse_place_row(row)?);
        }
        Ok(places)
    }

    fn update_place_content(
        &self,
        place_uuid: PlaceId,
        title: &str,
        description: &str,
    ) -> PlaceRepoResult<()> {
        Place::validate_content(title, description)?;

        let changed = self.conn.execute(
            "UPDATE places
             SET
                title = ?2,
                description = ?3,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE uuid = ?1;",
            params![place_uuid.to_string(), title, description],
        )?;

        if changed == 0 {
            return Err(PlaceRepoError::NotFound(place_uuid));
        }

        Ok(())
    }

    fn delete_place(&self, place_uuid: PlaceId) -> PlaceRepoResult<Place> {
        let tx = begin_write_tx(self.conn).map_err(PlaceRepoError::Transaction)?;

        let place =
            load_place_row(&tx, place_uuid)?.ok_or(PlaceRepoError::NotFound(place_uuid))?;

        if !user_row_exists(&tx, place.creator)? {
            return Err(PlaceRepoError::OwnerMissing {
                place_uuid,
                creator_uuid: place.creator,
            });
        }

        tx.execute("DELETE FROM places WHERE uuid = ?1;", [place_uuid.to_string()])?;

        let removed = remove_owned_place(&tx, place.creator, place_uuid)?;
        if removed == 0 {
            // The ownership list was already out of step with the creator
            // index. Roll back so the place row survives for inspection.
            return Err(PlaceRepoError::OwnershipEntryMissing {
                place_uuid,
                creator_uuid: place.creator,
            });
        }

        tx.commit()
            .map_err(|err| PlaceRepoError::Transaction(DbError::Sqlite(err)))?;
        Ok(place)
    }
}

fn insert_place_row(conn: &Connection, place: &Place) -> PlaceRepoResult<()> {
    conn.execute(
        "INSERT INTO places (
            uuid,
            title,
            description,
            address,
            lat,
            lng,
            image,
            creator_uuid
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8);",
        params![
            place.uuid.to_string(),
            place.title.as_str(),
            place.description.as_str(),
            place.address.as_str(),
            place.location.lat,
            place.location.lng,
            place.image.as_deref(),
            place.creator.to_string(),
        ],
    )?;
    Ok(())
}

fn load_place_row(conn: &Connection, place_uuid: PlaceId) -> PlaceRepoResult<Option<Place>> {
    let mut stmt = conn.prepare(&format!("{PLACE_SELECT_SQL} WHERE uuid = ?1;"))?;
    let mut rows = stmt.query([place_uuid.to_string()])?;
    if let Some(row) = rows.next()? {
        return Ok(Some(parse_place_row(row)?));
    }
    Ok(None)
}

fn user_row_exists(conn: &Connection, user_uuid: UserId) -> PlaceRepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM users WHERE uuid = ?1);",
        [user_uuid.to_string()],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn append_owned_place(
    conn: &Connection,
    user_uuid: UserId,
    place_uuid: PlaceId,
) -> PlaceRepoResult<()> {
    let sort_order: i64 = conn.query_row(
        "SELECT COALESCE(MAX(sort_order), -1) + 1
         FROM user_places
         WHERE user_uuid = ?1;",
        [user_uuid.to_string()],
        |row| row.get(0),
    )?;

    conn.execute(
        "INSERT INTO user_places (user_uuid, place_uuid, sort_order)
         VALUES (?1, ?2, ?3);",
        params![user_uuid.to_string(), place_uuid.to_string(), sort_order],
    )?;
    Ok(())
}

fn remove_owned_place(
    conn: &Connection,
    user_uuid: UserId,
    place_uuid: PlaceId,
) -> PlaceRepoResult<usize> {
    let removed = conn.execute(
        "DELETE FROM user_places
         WHERE user_uuid = ?1
           AND place_uuid = ?2;",
        params![user_uuid.to_string(), place_uuid.to_string()],
    )?;
    Ok(removed)
}

fn parse_place_row(row: &Row<'_>) -> PlaceRepoResult<Place> {
    let uuid_text: String = row.get("uuid")?;
    let uuid = parse_uuid(&uuid_text, "places.uuid")?;

    let creator_text: String = row.get("creator_uuid")?;
    let creator = parse_uuid(&creator_text, "places.creator_uuid")?;

    let place = Place {
        uuid,
        title: row.get("title")?,
        description: row.get("description")?,
        address: row.get("address")?,
        location: GeoPoint {
            lat: row.get("lat")?,
            lng: row.get("lng")?,
        },
        image: row.get("image")?,
        creator,
    };
    place.validate()?;
    Ok(place)
}

fn parse_uuid(value: &str, column: &'static str) -> PlaceRepoResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|_| PlaceRepoError::InvalidData(format!("invalid uuid `{value}` in {column}")))
}

fn ensure_place_connection_ready(conn: &Connection) -> PlaceRepoResult<()> {
    let expected_version = latest_version();
    let actual_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    if actual_version != expected_version {
        return Err(PlaceRepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    if !table_exists(conn, "places")? {
        return Err(PlaceRepoError::MissingRequiredTable("places"));
    }
    for column in [
        "uuid",
        "title",
        "description",
        "address",
        "lat",
        "lng",
        "image",
        "creator_uuid",
        "created_at",
        "updated_at",
    ] {
        if !table_has_column(conn, "places", column)? {
            return Err(PlaceRepoError::MissingRequiredColumn {
                table: "places",
                column,
            });
        }
    }

    if !table_exists(conn, "user_places")? {
        return Err(PlaceRepoError::MissingRequiredTable("user_places"));
    }
    for column in ["user_uuid", "place_uuid", "sort_order"] {
        if !table_has_column(conn, "user_places", column)? {
            return Err(PlaceRepoError::MissingRequiredColumn {
                table: "user_places",
                column,
            });
        }
    }

    Ok(())
}
