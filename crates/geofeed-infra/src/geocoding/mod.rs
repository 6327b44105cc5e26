//! Reverse geocoding adapters.

mod nominatim;

pub use nominatim::{NominatimConfig, NominatimGeocoder};
