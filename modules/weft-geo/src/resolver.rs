use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};
use weft_common::{CoordinatePair, LocationRecord, WeftError};

use crate::cache::LocationCache;
use crate::nominatim::GeocodeProvider;

/// Successful forward resolution. `display_name` is absent on cache hits,
/// where only the coordinate pair was stored.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedAddress {
    pub coords: CoordinatePair,
    pub display_name: Option<String>,
}

/// Resolves addresses to coordinates (and back) through an ordered sequence
/// of fallback queries, consulting the shared [`LocationCache`] before any
/// network call.
pub struct GeocodeResolver {
    provider: Arc<dyn GeocodeProvider>,
    cache: LocationCache,
    delay: Duration,
}

impl GeocodeResolver {
    pub fn new(provider: Arc<dyn GeocodeProvider>, cache: LocationCache, delay: Duration) -> Self {
        Self {
            provider,
            cache,
            delay,
        }
    }

    pub fn cache(&self) -> &LocationCache {
        &self.cache
    }

    /// The inter-request delay used between fallback attempts (and between
    /// nodes in a progressive batch).
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Forward-resolve an address to coordinates.
    ///
    /// Candidate queries are tried most-specific first; a transport error on
    /// one candidate moves on to the next. Returns `NotFound` once every
    /// candidate has answered empty, or `Transient` if every attempt failed
    /// outright.
    pub async fn resolve_forward(
        &self,
        location: &LocationRecord,
    ) -> Result<ResolvedAddress, WeftError> {
        let key = location.address_key();
        if key.has_content() {
            if let Some(coords) = self.cache.get(&key) {
                debug!(key = key.as_str(), "Geocode cache hit");
                return Ok(ResolvedAddress {
                    coords,
                    display_name: None,
                });
            }
        }

        let candidates = candidate_queries(location);
        if candidates.is_empty() {
            return Err(WeftError::Invalid(
                "No address text to geocode".to_string(),
            ));
        }

        let mut last_failure: Option<WeftError> = None;
        let mut any_answered = false;

        for (i, query) in candidates.iter().enumerate() {
            if i > 0 {
                // Upstream rate limit: fixed pause between attempts.
                tokio::time::sleep(self.delay).await;
            }

            match self.provider.search(query).await {
                Ok(hits) => {
                    any_answered = true;
                    if let Some(resolved) = first_valid_hit(&hits) {
                        if key.has_content() {
                            self.cache.put(key.clone(), resolved.coords);
                        }
                        debug!(query = query.as_str(), "Geocode resolved");
                        return Ok(resolved);
                    }
                    debug!(query = query.as_str(), "Geocode candidate had no match");
                }
                Err(e) => {
                    warn!(query = query.as_str(), error = %e, "Geocode candidate failed");
                    last_failure = Some(e);
                }
            }
        }

        if any_answered {
            Err(WeftError::NotFound(format!(
                "No geocoding match after {} candidates",
                candidates.len()
            )))
        } else {
            Err(last_failure.unwrap_or_else(|| {
                WeftError::Transient("Geocoding failed on every candidate".to_string())
            }))
        }
    }

    /// Reverse-resolve coordinates to a structured address. Returns `None`
    /// on any failure; never a partially filled record from a failed call.
    pub async fn resolve_reverse(&self, coords: CoordinatePair) -> Option<LocationRecord> {
        let hit = match self.provider.reverse(coords.lat, coords.lon).await {
            Ok(Some(hit)) => hit,
            Ok(None) => return None,
            Err(e) => {
                warn!(lat = coords.lat, lon = coords.lon, error = %e, "Reverse geocode failed");
                return None;
            }
        };

        let record = LocationRecord {
            country: hit.address.country.clone(),
            city: hit.address.city_name().map(str::to_string),
            district: hit.address.district_name().map(str::to_string),
            street: hit.address.road.clone(),
            location_name: Some(hit.display_name),
            coords: Some(coords),
        };

        let key = record.address_key();
        if key.has_content() {
            self.cache.put(key, coords);
        }
        Some(record)
    }
}

/// Ordered candidate queries, most specific to least: full address, address
/// without street, then city + country only. Duplicates and empty variants
/// are dropped.
fn candidate_queries(location: &LocationRecord) -> Vec<String> {
    let join = |parts: &[Option<&str>]| -> String {
        parts
            .iter()
            .filter_map(|p| *p)
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .collect::<Vec<_>>()
            .join(", ")
    };

    let street = location.street.as_deref();
    let district = location.district.as_deref();
    let city = location.city.as_deref();
    let country = location.country.as_deref();
    let name = location.location_name.as_deref();

    let full = join(&[street, district, city, country]);
    let no_street = join(&[district, city, country]);
    let coarse = join(&[city, country]);

    let mut queries: Vec<String> = Vec::new();
    for q in [full, no_street, coarse] {
        if !q.is_empty() && !queries.contains(&q) {
            queries.push(q);
        }
    }

    // A free-text place name stands alone as the coarsest fallback when the
    // structured fields produced nothing.
    if queries.is_empty() {
        if let Some(n) = name {
            let n = n.trim();
            if !n.is_empty() {
                queries.push(n.to_string());
            }
        }
    }

    queries
}

fn first_valid_hit(hits: &[crate::nominatim::GeocodeHit]) -> Option<ResolvedAddress> {
    hits.iter().find_map(|hit| {
        CoordinatePair::parse(&hit.lat, &hit.lon).map(|coords| ResolvedAddress {
            coords,
            display_name: Some(hit.display_name.trim().to_string()),
        })
    })
}
