//! Place lifecycle and lookup service.
//!
//! # Responsibility
//! - Provide create/update/delete entry points that keep a place and its
//!   owner's place list consistent.
//! - Provide lookup APIs that refuse to serve data violating the ownership
//!   invariant.
//!
//! # Invariants
//! - Service APIs never bypass repository validation/persistence contracts.
//! - `places_by_user` returns places in ownership-list order and fails when
//!   the ownership list and the creator index disagree.
//! - Log events carry ids and durations only.

use crate::db::DbError;
use crate::model::place::{GeoPoint, Place, PlaceId, PlaceValidationError};
use crate::model::user::UserId;
use crate::repo::place_repo::{PlaceRepoError, PlaceRepository};
use crate::repo::user_repo::{UserRepoError, UserRepository};
use crate::service::geocode::{GeocodeError, Geocoder};
use log::{error, info};
use std::collections::HashMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

/// Request model for creating a place with resolved coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct CreatePlaceRequest {
    pub title: String,
    pub description: String,
    pub address: String,
    /// Coordinates already resolved by a geocoding collaborator.
    pub location: GeoPoint,
    pub image: Option<String>,
    pub creator_uuid: UserId,
}

/// Request model for creating a place from an unresolved address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatePlaceAtAddressRequest {
    pub title: String,
    pub description: String,
    pub address: String,
    pub image: Option<String>,
    pub creator_uuid: UserId,
}

/// Service error for place use-cases.
#[derive(Debug)]
pub enum PlaceServiceError {
    /// Input failed model validation.
    InvalidInput(PlaceValidationError),
    /// Target place does not exist.
    PlaceNotFound(PlaceId),
    /// Referenced user does not exist.
    CreatorNotFound(UserId),
    /// A stored place references a user that no longer exists.
    OwnerMissing {
        place_uuid: PlaceId,
        creator_uuid: UserId,
    },
    /// A write transaction could not begin or commit; nothing was applied.
    TransactionFailed(DbError),
    /// Address resolution failed before the lifecycle was reached.
    Geocode(GeocodeError),
    /// Stored state contradicts the ownership invariant.
    InconsistentState(&'static str),
    /// Place persistence failure.
    Repo(PlaceRepoError),
    /// User store failure during creator checks or lookups.
    UserStore(UserRepoError),
}

impl Display for PlaceServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidInput(err) => write!(f, "{err}"),
            Self::PlaceNotFound(id) => write!(f, "place not found: {id}"),
            Self::CreatorNotFound(id) => write!(f, "creator user not found: {id}"),
            Self::OwnerMissing {
                place_uuid,
                creator_uuid,
            } => write!(
                f,
                "place {place_uuid} references missing owner {creator_uuid}"
            ),
            Self::TransactionFailed(err) => write!(f, "write transaction failed: {err}"),
            Self::Geocode(err) => write!(f, "{err}"),
            Self::InconsistentState(details) => {
                write!(f, "inconsistent ownership state: {details}")
            }
            Self::Repo(err) => write!(f, "{err}"),
            Self::UserStore(err) => write!(f, "{err}"),
        }
    }
}

impl Error for PlaceServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidInput(err) => Some(err),
            Self::TransactionFailed(err) => Some(err),
            Self::Geocode(err) => Some(err),
            Self::Repo(err) => Some(err),
            Self::UserStore(err) => Some(err),
            _ => None,
        }
    }
}

impl From<PlaceRepoError> for PlaceServiceError {
    fn from(value: PlaceRepoError) -> Self {
        match value {
            PlaceRepoError::Validation(err) => Self::InvalidInput(err),
            PlaceRepoError::NotFound(id) => Self::PlaceNotFound(id),
            PlaceRepoError::CreatorNotFound(id) => Self::CreatorNotFound(id),
            PlaceRepoError::OwnerMissing {
                place_uuid,
                creator_uuid,
            } => Self::OwnerMissing {
                place_uuid,
                creator_uuid,
            },
            PlaceRepoError::Transaction(err) => Self::TransactionFailed(err),
            other => Self::Repo(other),
        }
    }
}

impl From<UserRepoError> for PlaceServiceError {
    fn from(value: UserRepoError) -> Self {
        match value {
            UserRepoError::NotFound(id) => Self::CreatorNotFound(id),
            other => Self::UserStore(other),
        }
    }
}

impl PlaceServiceError {
    /// Stable code for metadata-only log records.
    fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "invalid_input",
            Self::PlaceNotFound(_) => "place_not_found",
            Self::CreatorNotFound(_) => "creator_not_found",
            Self::OwnerMissing { .. } => "owner_missing",
            Self::TransactionFailed(_) => "transaction_failed",
            Self::Geocode(_) => "geocode_failed",
            Self::InconsistentState(_) => "inconsistent_state",
            Self::Repo(_) => "place_store_failed",
            Self::UserStore(_) => "user_store_failed",
        }
    }
}

/// Use-case service for place lifecycle and lookups.
pub struct PlaceService<P: PlaceRepository, U: UserRepository> {
    places: P,
    users: U,
}

impl<P: PlaceRepository, U: UserRepository> PlaceService<P, U> {
    /// Creates a service using the provided repository implementations.
    pub fn new(places: P, users: U) -> Self {
        Self { places, users }
    }

    /// Creates one place and appends it to the creator's place list.
    ///
    /// # Contract
    /// - Fails with `CreatorNotFound` when the creator does not exist; no
    ///   place is created in that case.
    /// - On any failure after the transaction opened, neither the place nor
    ///   the ownership entry is visible afterwards.
    pub fn create_place(
        &self,
        request: &CreatePlaceRequest,
    ) -> Result<Place, PlaceServiceError> {
        let started_at = Instant::now();
        match self.create_place_inner(request) {
            Ok(place) => {
                info!(
                    "event=place_create module=service status=ok place_uuid={} creator_uuid={} duration_ms={}",
                    place.uuid,
                    place.creator,
                    started_at.elapsed().as_millis()
                );
                Ok(place)
            }
            Err(err) => {
                error!(
                    "event=place_create module=service status=error creator_uuid={} duration_ms={} error_code={}",
                    request.creator_uuid,
                    started_at.elapsed().as_millis(),
                    err.error_code()
                );
                Err(err)
            }
        }
    }

    /// Resolves the address through the given geocoder, then creates the
    /// place with the resolved coordinates.
    pub fn create_place_at_address<G: Geocoder>(
        &self,
        geocoder: &G,
        request: &CreatePlaceAtAddressRequest,
    ) -> Result<Place, PlaceServiceError> {
        let location = geocoder
            .resolve(&request.address)
            .map_err(PlaceServiceError::Geocode)?;
        self.create_place(&CreatePlaceRequest {
            title: request.title.clone(),
            description: request.description.clone(),
            address: request.address.clone(),
            location,
            image: request.image.clone(),
            creator_uuid: request.creator_uuid,
        })
    }

    /// Replaces title and description of one place. Creator, location and
    /// id are immutable.
    pub fn update_place(
        &self,
        place_uuid: PlaceId,
        title: &str,
        description: &str,
    ) -> Result<Place, PlaceServiceError> {
        let started_at = Instant::now();
        match self.update_place_inner(place_uuid, title, description) {
            Ok(place) => {
                info!(
                    "event=place_update module=service status=ok place_uuid={place_uuid} duration_ms={}",
                    started_at.elapsed().as_millis()
                );
                Ok(place)
            }
            Err(err) => {
                error!(
                    "event=place_update module=service status=error place_uuid={place_uuid} duration_ms={} error_code={}",
                    started_at.elapsed().as_millis(),
                    err.error_code()
                );
                Err(err)
            }
        }
    }

    /// Deletes one place and removes it from the owner's place list.
    ///
    /// Returns the place as it existed immediately before deletion.
    pub fn delete_place(&self, place_uuid: PlaceId) -> Result<Place, PlaceServiceError> {
        let started_at = Instant::now();
        match self.places.delete_place(place_uuid) {
            Ok(place) => {
                info!(
                    "event=place_delete module=service status=ok place_uuid={place_uuid} creator_uuid={} duration_ms={}",
                    place.creator,
                    started_at.elapsed().as_millis()
                );
                Ok(place)
            }
            Err(err) => {
                let err = PlaceServiceError::from(err);
                error!(
                    "event=place_delete module=service status=error place_uuid={place_uuid} duration_ms={} error_code={}",
                    started_at.elapsed().as_millis(),
                    err.error_code()
                );
                Err(err)
            }
        }
    }

    /// Gets one place by id.
    pub fn get_place(&self, place_uuid: PlaceId) -> Result<Place, PlaceServiceError> {
        self.places
            .get_place(place_uuid)?
            .ok_or(PlaceServiceError::PlaceNotFound(place_uuid))
    }

    /// Lists the places a user owns, in ownership-list order.
    ///
    /// # Contract
    /// - Unknown user fails with `CreatorNotFound`.
    /// - An existing user with no places yields an empty list.
    /// - Any disagreement between the ownership list and the creator index
    ///   fails with `InconsistentState` rather than returning partial data.
    pub fn places_by_user(&self, user_uuid: UserId) -> Result<Vec<Place>, PlaceServiceError> {
        let user = self
            .users
            .get_user(user_uuid)?
            .ok_or(PlaceServiceError::CreatorNotFound(user_uuid))?;

        let places = self.places.list_places_by_creator(user_uuid)?;
        if places.len() != user.places.len() {
            return Err(PlaceServiceError::InconsistentState(
                "ownership list and creator index disagree",
            ));
        }

        let mut by_id: HashMap<PlaceId, Place> =
            places.into_iter().map(|place| (place.uuid, place)).collect();
        let mut ordered = Vec::with_capacity(user.places.len());
        for place_uuid in &user.places {
            let place = by_id.remove(place_uuid).ok_or(
                PlaceServiceError::InconsistentState(
                    "ownership entry without matching place",
                ),
            )?;
            ordered.push(place);
        }
        Ok(ordered)
    }

    fn create_place_inner(
        &self,
        request: &CreatePlaceRequest,
    ) -> Result<Place, PlaceServiceError> {
        // Pre-check for a clean error path; the repository re-checks under
        // the write lock.
        if self.users.get_user(request.creator_uuid)?.is_none() {
            return Err(PlaceServiceError::CreatorNotFound(request.creator_uuid));
        }

        let place = Place::new(
            request.title.clone(),
            request.description.clone(),
            request.address.clone(),
            request.location,
            request.image.clone(),
            request.creator_uuid,
        );
        self.places.create_place(&place)?;

        self.places
            .get_place(place.uuid)?
            .ok_or(PlaceServiceError::InconsistentState(
                "created place not found in read-back",
            ))
    }

    fn update_place_inner(
        &self,
        place_uuid: PlaceId,
        title: &str,
        description: &str,
    ) -> Result<Place, PlaceServiceError> {
        self.places
            .update_place_content(place_uuid, title, description)?;
        self.places
            .get_place(place_uuid)?
            .ok_or(PlaceServiceError::InconsistentState(
                "updated place not found in read-back",
            ))
    }
}
