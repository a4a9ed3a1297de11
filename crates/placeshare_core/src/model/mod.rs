//! Domain models for places and the users that own them.
//!
//! # Responsibility
//! - Define canonical data structures used by core business logic.
//! - Keep validation rules next to the data they constrain.
//!
//! # Invariants
//! - Every domain object is identified by a stable uuid.
//! - A place references exactly one owning user via `creator`; the reverse
//!   ownership list is persisted separately and kept consistent by the
//!   lifecycle transactions.
//!
//! # See also
//! - docs/architecture/data-model.md

pub mod place;
pub mod user;
