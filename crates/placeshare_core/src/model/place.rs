//! Place domain model.
//!
//! # Responsibility
//! - Define the canonical place record and its coordinate pair.
//! - Provide the validation gate called by repository write paths.
//!
//! # Invariants
//! - `uuid` is stable and never reused for another place.
//! - `creator` is set at creation and immutable thereafter.
//! - `location` is produced by a geocoding collaborator and immutable once
//!   set.
//!
//! # See also
//! - docs/architecture/data-model.md

use crate::model::user::UserId;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable identifier for a place.
///
/// Kept as a type alias to make semantic intent explicit in signatures.
pub type PlaceId = Uuid;

/// Minimum number of characters a place description must carry.
pub const DESCRIPTION_MIN_CHARS: usize = 5;

/// Coordinate pair produced by address geocoding.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    /// Latitude in degrees, `-90.0..=90.0`.
    pub lat: f64,
    /// Longitude in degrees, `-180.0..=180.0`.
    pub lng: f64,
}

/// Canonical place record.
///
/// A place always belongs to exactly one user. The owning user's ordered
/// place list is stored separately and mutated only together with this
/// record, inside one transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Place {
    /// Stable global ID used for linking and auditing.
    pub uuid: PlaceId,
    /// Display title. Must not be blank.
    pub title: String,
    /// Free-form description, at least [`DESCRIPTION_MIN_CHARS`] characters.
    pub description: String,
    /// Postal address the location was resolved from. Opaque to core.
    pub address: String,
    /// Resolved coordinates. Immutable once set.
    pub location: GeoPoint,
    /// Reference to an externally stored image. Opaque to core.
    pub image: Option<String>,
    /// Identifier of the owning user. Immutable after creation.
    pub creator: UserId,
}

/// Validation failures for place write paths.
#[derive(Debug, Clone, PartialEq)]
pub enum PlaceValidationError {
    /// Title is empty after trimming.
    BlankTitle,
    /// Description is shorter than the required minimum.
    DescriptionTooShort { min_chars: usize, actual_chars: usize },
    /// Address is empty after trimming.
    BlankAddress,
    /// Latitude or longitude is non-finite or outside its valid range.
    CoordinateOutOfRange { axis: &'static str, value: f64 },
}

impl Display for PlaceValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankTitle => write!(f, "place title must not be blank"),
            Self::DescriptionTooShort {
                min_chars,
                actual_chars,
            } => write!(
                f,
                "place description must have at least {min_chars} characters, got {actual_chars}"
            ),
            Self::BlankAddress => write!(f, "place address must not be blank"),
            Self::CoordinateOutOfRange { axis, value } => {
                write!(f, "place {axis} {value} is outside the valid range")
            }
        }
    }
}

impl Error for PlaceValidationError {}

impl Place {
    /// Creates a new place with a generated stable ID.
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        address: impl Into<String>,
        location: GeoPoint,
        image: Option<String>,
        creator: UserId,
    ) -> Self {
        Self::with_id(
            Uuid::new_v4(),
            title,
            description,
            address,
            location,
            image,
            creator,
        )
    }

    /// Creates a new place with a caller-provided stable ID.
    ///
    /// Used by import paths and tests where identity already exists
    /// externally.
    pub fn with_id(
        uuid: PlaceId,
        title: impl Into<String>,
        description: impl Into<String>,
        address: impl Into<String>,
        location: GeoPoint,
        image: Option<String>,
        creator: UserId,
    ) -> Self {
        Self {
            uuid,
            title: title.into(),
            description: description.into(),
            address: address.into(),
            location,
            image,
            creator,
        }
    }

    /// Validates the whole record. Called by repository write paths before
    /// any SQL mutation and by read paths on persisted rows.
    pub fn validate(&self) -> Result<(), PlaceValidationError> {
        Self::validate_content(&self.title, &self.description)?;
        if self.address.trim().is_empty() {
            return Err(PlaceValidationError::BlankAddress);
        }
        self.location.validate()
    }

    /// Validates the mutable content fields only.
    ///
    /// Shared between full-record validation and the title/description
    /// update path, which never touches the remaining fields.
    pub fn validate_content(title: &str, description: &str) -> Result<(), PlaceValidationError> {
        if title.trim().is_empty() {
            return Err(PlaceValidationError::BlankTitle);
        }
        let actual_chars = description.trim().chars().count();
        if actual_chars < DESCRIPTION_MIN_CHARS {
            return Err(PlaceValidationError::DescriptionTooShort {
                min_chars: DESCRIPTION_MIN_CHARS,
                actual_chars,
            });
        }
        Ok(())
    }
}

impl GeoPoint {
    /// Checks both axes for finiteness and range.
    pub fn validate(self) -> Result<(), PlaceValidationError> {
        if !self.lat.is_finite() || !(-90.0..=90.0).contains(&self.lat) {
            return Err(PlaceValidationError::CoordinateOutOfRange {
                axis: "latitude",
                value: self.lat,
            });
        }
        if !self.lng.is_finite() || !(-180.0..=180.0).contains(&self.lng) {
            return Err(PlaceValidationError::CoordinateOutOfRange {
                axis: "longitude",
                value: self.lng,
            });
        }
        Ok(())
    }
}
