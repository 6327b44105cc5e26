use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Structured address parts returned by the address-lookup collaborator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub village: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub city_district: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub city: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub state: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub region: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub postcode: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub country: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub country_code: String,
}

/// Result of a reverse lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedPlace {
    pub display_name: String,
    pub name: String,
    pub address: Address,
}

/// Human-readable label for a coarse spatial cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationLabel {
    pub cell_prefix: String,
    pub display_name: String,
    pub name: String,
    pub address: Address,
    /// Coordinate the label was resolved from.
    pub latitude: f64,
    pub longitude: f64,
    pub created_at: DateTime<Utc>,
}
