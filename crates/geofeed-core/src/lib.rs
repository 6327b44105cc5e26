//! # Geofeed Core
//!
//! Domain layer of the geofeed backend: geotagged posts, likes, follows,
//! comments and place labels. Storage, caching and lookups are reached only
//! through the traits in [`ports`].

pub mod domain;
pub mod error;
pub mod pagination;
pub mod ports;
pub mod services;
pub mod spatial;

pub use error::{DomainError, RepoError};
pub use pagination::{Cursor, Page};
