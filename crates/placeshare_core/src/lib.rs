//! Core domain logic for Placeshare.
//! This crate is the single source of truth for business invariants.

pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use logging::{default_log_level, init_logging, logging_status};
pub use model::place::{GeoPoint, Place, PlaceId, PlaceValidationError};
pub use model::user::{User, UserId, UserValidationError};
pub use repo::place_repo::{
    PlaceRepoError, PlaceRepoResult, PlaceRepository, SqlitePlaceRepository,
};
pub use repo::user_repo::{
    SqliteUserRepository, UserRecord, UserRepoError, UserRepoResult, UserRepository,
};
pub use service::geocode::{GeocodeError, Geocoder};
pub use service::place_service::{
    CreatePlaceAtAddressRequest, CreatePlaceRequest, PlaceService, PlaceServiceError,
};
pub use service::user_service::{SignUpRequest, UserService, UserServiceError};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
