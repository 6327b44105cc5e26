//! OpenStreetMap Nominatim reverse geocoder.
//!
//! The public instance allows about one request per second, so every call
//! waits on a process-wide limiter before going out.

use std::time::Duration;

use async_trait::async_trait;
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use serde::Deserialize;

use geofeed_core::domain::{Address, ResolvedPlace};
use geofeed_core::ports::{AddressLookup, LookupError};

type DirectRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

#[derive(Debug, Clone)]
pub struct NominatimConfig {
    pub base_url: String,
    /// Nominatim rejects requests without an identifying agent.
    pub user_agent: String,
    /// Minimum spacing between requests.
    pub min_interval: Duration,
    pub request_timeout: Duration,
}

impl Default for NominatimConfig {
    fn default() -> Self {
        Self {
            base_url: "https://nominatim.openstreetmap.org/reverse".to_string(),
            user_agent: "geofeed/0.1".to_string(),
            min_interval: Duration::from_millis(1100),
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl NominatimConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            base_url: std::env::var("GEOCODER_BASE_URL").unwrap_or(defaults.base_url),
            user_agent: std::env::var("GEOCODER_USER_AGENT").unwrap_or(defaults.user_agent),
            ..defaults
        }
    }
}

pub struct NominatimGeocoder {
    client: reqwest::Client,
    limiter: DirectRateLimiter,
    config: NominatimConfig,
}

impl NominatimGeocoder {
    pub fn new(config: NominatimConfig) -> Result<Self, LookupError> {
        let quota = Quota::with_period(config.min_interval)
            .ok_or_else(|| LookupError::Request("rate limit interval must be non-zero".into()))?;

        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| LookupError::Request(e.to_string()))?;

        Ok(Self {
            client,
            limiter: RateLimiter::direct(quota),
            config,
        })
    }

    pub fn from_env() -> Result<Self, LookupError> {
        Self::new(NominatimConfig::from_env())
    }
}

#[async_trait]
impl AddressLookup for NominatimGeocoder {
    async fn reverse(&self, latitude: f64, longitude: f64) -> Result<ResolvedPlace, LookupError> {
        self.limiter.until_ready().await;

        let lat = format!("{latitude:.6}");
        let lon = format!("{longitude:.6}");
        let response = self
            .client
            .get(&self.config.base_url)
            .query(&[
                ("format", "jsonv2"),
                ("lat", lat.as_str()),
                ("lon", lon.as_str()),
                ("zoom", "15"),
                ("addressdetails", "1"),
            ])
            .send()
            .await
            .map_err(|e| LookupError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(LookupError::Status(status.as_u16()));
        }

        let body: NominatimResponse = response
            .json()
            .await
            .map_err(|e| LookupError::Decode(e.to_string()))?;

        tracing::debug!(lat = %lat, lon = %lon, name = %body.name, "Reverse geocoded");
        Ok(body.into())
    }
}

#[derive(Debug, Default, Deserialize)]
struct NominatimResponse {
    #[serde(default)]
    display_name: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    address: NominatimAddress,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct NominatimAddress {
    village: String,
    neighbourhood: String,
    town: String,
    city_district: String,
    city: String,
    municipality: String,
    county: String,
    state: String,
    region: String,
    postcode: String,
    country: String,
    country_code: String,
}

fn first_non_empty<const N: usize>(candidates: [String; N]) -> String {
    candidates
        .into_iter()
        .find(|c| !c.is_empty())
        .unwrap_or_default()
}

impl From<NominatimResponse> for ResolvedPlace {
    fn from(resp: NominatimResponse) -> Self {
        let a = resp.address;
        Self {
            display_name: resp.display_name,
            name: resp.name,
            address: Address {
                village: first_non_empty([a.village, a.neighbourhood]),
                city: first_non_empty([a.city, a.town, a.municipality, a.county]),
                city_district: a.city_district,
                state: a.state,
                region: a.region,
                postcode: a.postcode,
                country: a.country,
                country_code: a.country_code,
            },
        }
    }
}
