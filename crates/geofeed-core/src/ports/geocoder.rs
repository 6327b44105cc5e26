use async_trait::async_trait;

use crate::domain::ResolvedPlace;

/// Reverse lookup of a coordinate into a place description.
#[async_trait]
pub trait AddressLookup: Send + Sync {
    async fn reverse(&self, latitude: f64, longitude: f64) -> Result<ResolvedPlace, LookupError>;
}

#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    #[error("Lookup request failed: {0}")]
    Request(String),

    #[error("Lookup returned status {0}")]
    Status(u16),

    #[error("Malformed lookup response: {0}")]
    Decode(String),
}
