//! Per-day city resolution for phototrack.
//!
//! For each day of the trip this samples a few representative
//! coordinates, resolves them to city names through a shared
//! rounded-coordinate cache and the `Geocoder`, and picks the most
//! frequent name as the day's primary city. Manual overrides bypass
//! geocoding entirely for their day.
//!
//! Resolution is strictly sequential: one day at a time, one sample at
//! a time, with a fixed delay after every live call so the Nominatim
//! rate limit is respected. Failed calls degrade that sample to
//! "Unknown" and trigger a longer backoff; they never abort the run.

use chrono::NaiveDate;
use log::{debug, warn};
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;
use tokio::time::sleep;

use crate::geocode::Geocoder;
use crate::group::{DayBucket, TripDays};

/// Sentinel for a coordinate or day without a resolvable place name.
pub const UNKNOWN_CITY: &str = "Unknown";

/// The resolved location label for one trip day.
#[derive(Debug, Clone, PartialEq)]
pub struct LocationResolution {
    /// The day this resolution belongs to
    pub date: NaiveDate,
    /// Most frequent sampled city, or "Unknown"
    pub primary_city: String,
    /// Deduplicated sampled cities in frequency order; empty when the
    /// day resolved to "Unknown"
    pub all_cities: Vec<String>,
    /// Photos taken that day
    pub photo_count: usize,
    /// True when the city came from a manual override
    pub manual: bool,
}

/// Process-lifetime memoization of geocoding results.
///
/// Keys are coordinates rounded to 2 decimal places, a grid of roughly
/// 1.1 km — close enough that two photos in the same cell share a city.
/// Only confirmed (non-"Unknown") results are ever stored, so an early
/// failure cannot poison later lookups in the same cell. Entries are
/// never evicted; trips are small enough that unbounded growth is fine.
#[derive(Debug, Default)]
pub struct GeocodeCache {
    entries: HashMap<(i64, i64), String>,
}

impl GeocodeCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rounds to the 2-decimal grid. f64 is not hashable, so the key is
    /// the rounded value scaled to an integer pair.
    fn key(latitude: f64, longitude: f64) -> (i64, i64) {
        (
            (latitude * 100.0).round() as i64,
            (longitude * 100.0).round() as i64,
        )
    }

    pub fn get(&self, latitude: f64, longitude: f64) -> Option<&str> {
        self.entries
            .get(&Self::key(latitude, longitude))
            .map(String::as_str)
    }

    pub fn insert(&mut self, latitude: f64, longitude: f64, city: String) {
        self.entries.insert(Self::key(latitude, longitude), city);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Resolves a primary city per trip day.
pub struct CityResolver<'a, G: Geocoder> {
    geocoder: &'a G,
    cache: GeocodeCache,
    /// Minimum delay after every live geocoding call
    call_delay: Duration,
    /// Longer delay after a failed call
    error_backoff: Duration,
}

impl<'a, G: Geocoder> CityResolver<'a, G> {
    pub fn new(geocoder: &'a G, call_delay: Duration, error_backoff: Duration) -> Self {
        Self {
            geocoder,
            cache: GeocodeCache::new(),
            call_delay,
            error_backoff,
        }
    }

    /// The shared cache, exposed for inspection.
    pub fn cache(&self) -> &GeocodeCache {
        &self.cache
    }

    /// Resolves every day of the trip in ascending date order.
    ///
    /// `overrides` maps 1-based day indices to manually specified
    /// cities; an overridden day is labeled without any geocoding.
    /// `on_day` fires once per day as it resolves, in order.
    pub async fn resolve_all(
        &mut self,
        trip: &TripDays,
        overrides: &BTreeMap<usize, String>,
        mut on_day: impl FnMut(usize, &LocationResolution),
    ) -> BTreeMap<NaiveDate, LocationResolution> {
        let mut resolutions = BTreeMap::new();

        for (index, bucket) in trip.buckets.values().enumerate() {
            let day = index + 1;

            let resolution = if let Some(city) = overrides.get(&day) {
                LocationResolution {
                    date: bucket.date,
                    primary_city: city.clone(),
                    all_cities: vec![city.clone()],
                    photo_count: bucket.photos.len(),
                    manual: true,
                }
            } else {
                self.resolve_day(bucket).await
            };

            on_day(day, &resolution);
            resolutions.insert(bucket.date, resolution);
        }

        resolutions
    }

    /// Samples the bucket and picks the day's primary city.
    async fn resolve_day(&mut self, bucket: &DayBucket) -> LocationResolution {
        let mut sampled = Vec::new();

        for index in sample_indices(bucket.photos.len()) {
            let photo = &bucket.photos[index];
            if let Some(city) = self.resolve_sample(photo.latitude, photo.longitude).await {
                sampled.push(city);
            }
        }

        let (primary_city, all_cities) = match rank_cities(&sampled) {
            Some(ranked) => ranked,
            None => (UNKNOWN_CITY.to_string(), Vec::new()),
        };

        LocationResolution {
            date: bucket.date,
            primary_city,
            all_cities,
            photo_count: bucket.photos.len(),
            manual: false,
        }
    }

    /// Resolves one coordinate, consulting the cache first. Returns
    /// `None` when the sample comes back "Unknown".
    async fn resolve_sample(&mut self, latitude: f64, longitude: f64) -> Option<String> {
        if let Some(city) = self.cache.get(latitude, longitude) {
            debug!("cache hit for ({latitude:.2}, {longitude:.2}): {city}");
            return Some(city.to_string());
        }

        match self.geocoder.reverse_geocode(latitude, longitude).await {
            Ok(address) => {
                let city = address.as_ref().and_then(|a| a.preferred_name());
                let result = city.map(|c| {
                    self.cache.insert(latitude, longitude, c.to_string());
                    c.to_string()
                });
                sleep(self.call_delay).await;
                result
            }
            Err(err) => {
                warn!("reverse geocoding ({latitude:.4}, {longitude:.4}) failed: {err:#}");
                sleep(self.error_backoff).await;
                None
            }
        }
    }
}

/// Which bucket positions to sample: everything for tiny buckets, else
/// first, midpoint, and last to catch intra-day travel.
fn sample_indices(len: usize) -> Vec<usize> {
    if len <= 2 {
        (0..len).collect()
    } else {
        vec![0, len / 2, len - 1]
    }
}

/// Picks the most frequent city (first-encountered wins a tie) and the
/// deduplicated name list in frequency order. `None` for no samples.
fn rank_cities(sampled: &[String]) -> Option<(String, Vec<String>)> {
    let mut counts: Vec<(&str, usize)> = Vec::new();
    for city in sampled {
        match counts.iter_mut().find(|(name, _)| name == city) {
            Some((_, count)) => *count += 1,
            None => counts.push((city, 1)),
        }
    }

    // Stable sort: among equal counts, first-encountered stays first.
    counts.sort_by(|a, b| b.1.cmp(&a.1));

    let primary = counts.first()?.0.to_string();
    let all = counts.into_iter().map(|(name, _)| name.to_string()).collect();
    Some((primary, all))
}
