//! Trip summary output for phototrack.
//!
//! Builds the JSON document that accompanies the GPX track: one entry
//! per day with its resolved city, plus the overall list of cities
//! visited. This is the file a photo-blog pipeline or a human reads to
//! see where the trip went.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::resolve::LocationResolution;

/// One day's entry in the trip summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyLocation {
    /// 1-based day index in chronological order
    pub day: usize,
    /// The day's date
    pub date: NaiveDate,
    /// The day's resolved (or manually set) city
    pub primary_city: String,
    /// All sampled cities, most frequent first
    pub all_cities: Vec<String>,
    /// Photos taken that day
    pub photo_count: usize,
    /// True when the city was supplied with a `--day` override
    pub manually_set: bool,
}

/// The whole trip, one JSON document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TripSummary {
    pub trip_name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub total_days: usize,
    pub daily_locations: Vec<DailyLocation>,
    /// Deduplicated primary cities, alphabetically sorted
    pub cities_visited: Vec<String>,
}

/// Assembles the summary from the per-day resolutions.
pub fn build_summary(
    trip_name: &str,
    resolutions: &BTreeMap<NaiveDate, LocationResolution>,
) -> Result<TripSummary> {
    let start_date = *resolutions
        .keys()
        .next()
        .context("Cannot summarize a trip with no days")?;
    let end_date = *resolutions
        .keys()
        .next_back()
        .context("Cannot summarize a trip with no days")?;

    let daily_locations: Vec<DailyLocation> = resolutions
        .values()
        .enumerate()
        .map(|(index, resolution)| DailyLocation {
            day: index + 1,
            date: resolution.date,
            primary_city: resolution.primary_city.clone(),
            all_cities: resolution.all_cities.clone(),
            photo_count: resolution.photo_count,
            manually_set: resolution.manual,
        })
        .collect();

    let cities_visited: Vec<String> = resolutions
        .values()
        .map(|r| r.primary_city.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    Ok(TripSummary {
        trip_name: trip_name.to_string(),
        start_date,
        end_date,
        total_days: daily_locations.len(),
        daily_locations,
        cities_visited,
    })
}
