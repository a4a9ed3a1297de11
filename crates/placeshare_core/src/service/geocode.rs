//! Address geocoding seam.
//!
//! Core never resolves addresses itself; callers plug in a provider behind
//! this trait. Coordinates handed to the place lifecycle are treated as
//! already resolved.

use crate::model::place::GeoPoint;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Errors from an address resolution attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GeocodeError {
    /// The provider found no coordinates for the address.
    AddressNotFound(String),
    /// The provider itself failed.
    Provider(String),
}

impl Display for GeocodeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AddressNotFound(address) => {
                write!(f, "no coordinates found for address `{address}`")
            }
            Self::Provider(message) => write!(f, "geocoding provider failed: {message}"),
        }
    }
}

impl Error for GeocodeError {}

/// Resolves a postal address to a coordinate pair.
pub trait Geocoder {
    fn resolve(&self, address: &str) -> Result<GeoPoint, GeocodeError>;
}
