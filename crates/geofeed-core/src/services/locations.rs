use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use chrono::{SubsecRound, Utc};

use crate::domain::{LocationLabel, Post};
use crate::error::DomainError;
use crate::ports::{AddressLookup, Cache, LocationRepository};
use crate::spatial;

/// TTL of labels in the hot cache.
pub const LABEL_CACHE_TTL: Duration = Duration::from_secs(60 * 60);

/// Human-readable place names per coarse cell.
///
/// Lookup order is hot cache, durable labels, then the address-lookup
/// collaborator. Labels are decoration: lookup failures degrade to `None`.
#[derive(Clone)]
pub struct LocationStore {
    cache: Arc<dyn Cache>,
    repo: Arc<dyn LocationRepository>,
    lookup: Option<Arc<dyn AddressLookup>>,
}

impl LocationStore {
    pub fn new(
        cache: Arc<dyn Cache>,
        repo: Arc<dyn LocationRepository>,
        lookup: Option<Arc<dyn AddressLookup>>,
    ) -> Self {
        Self {
            cache,
            repo,
            lookup,
        }
    }

    pub async fn label_for(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> Result<Option<LocationLabel>, DomainError> {
        if !latitude.is_finite()
            || !longitude.is_finite()
            || !(-90.0..=90.0).contains(&latitude)
            || !(-180.0..=180.0).contains(&longitude)
        {
            return Err(DomainError::validation("coordinates out of range"));
        }

        let cell_prefix = spatial::cell_prefix(latitude, longitude);
        let key = cache_key(&cell_prefix);

        if let Some(raw) = self.cache.get(&key).await {
            match serde_json::from_str::<LocationLabel>(&raw) {
                Ok(label) => return Ok(Some(label)),
                Err(e) => tracing::warn!(key = %key, error = %e, "Discarding unreadable cached label"),
            }
        }

        if let Some(label) = self.repo.get(&cell_prefix).await? {
            self.remember(&key, &label).await;
            return Ok(Some(label));
        }

        let Some(lookup) = &self.lookup else {
            return Ok(None);
        };

        let place = match lookup.reverse(latitude, longitude).await {
            Ok(place) => place,
            Err(e) => {
                tracing::warn!(cell_prefix = %cell_prefix, error = %e, "Address lookup failed");
                return Ok(None);
            }
        };

        let label = LocationLabel {
            cell_prefix,
            display_name: place.display_name,
            name: place.name,
            address: place.address,
            latitude,
            longitude,
            created_at: Utc::now().trunc_subsecs(6),
        };

        if let Err(e) = self.repo.save(&label).await {
            tracing::warn!(cell_prefix = %label.cell_prefix, error = %e, "Label not persisted");
        }
        self.remember(&key, &label).await;

        tracing::debug!(cell_prefix = %label.cell_prefix, name = %label.name, "Location resolved");
        Ok(Some(label))
    }

    /// Labels keyed by cell prefix, resolving each distinct cell once.
    /// Cells that cannot be labelled are left out.
    pub async fn labels_for_posts(&self, posts: &[Post]) -> HashMap<String, LocationLabel> {
        let mut labels = HashMap::new();
        let mut seen = HashSet::new();
        for post in posts {
            if !seen.insert(post.cell_prefix.as_str()) {
                continue;
            }
            match self.label_for(post.latitude, post.longitude).await {
                Ok(Some(label)) => {
                    labels.insert(post.cell_prefix.clone(), label);
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(cell_prefix = %post.cell_prefix, error = %e, "Label lookup failed");
                }
            }
        }
        labels
    }

    async fn remember(&self, key: &str, label: &LocationLabel) {
        let raw = match serde_json::to_string(label) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(error = %e, "Label not serializable");
                return;
            }
        };
        if let Err(e) = self.cache.set(key, &raw, Some(LABEL_CACHE_TTL)).await {
            tracing::warn!(key = %key, error = %e, "Label not cached");
        }
    }
}

fn cache_key(cell_prefix: &str) -> String {
    format!("location:{cell_prefix}")
}
