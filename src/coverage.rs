//! Coverage validation for phototrack.
//!
//! After resolution, every trip day must carry a usable city label: a
//! day whose primary city is "Unknown" and that was not manually
//! overridden fails coverage. Any failure is a hard gate — no track or
//! summary is written until the caller supplies overrides for the
//! reported days.

use chrono::NaiveDate;
use std::collections::BTreeMap;

use crate::resolve::{LocationResolution, UNKNOWN_CITY};

/// Returns the (1-based day index, date) pairs that fail coverage, in
/// ascending date order. An empty result means the trip passes.
pub fn unresolved_days(
    resolutions: &BTreeMap<NaiveDate, LocationResolution>,
) -> Vec<(usize, NaiveDate)> {
    resolutions
        .iter()
        .enumerate()
        .filter(|(_, (_, resolution))| {
            resolution.primary_city == UNKNOWN_CITY && !resolution.manual
        })
        .map(|(index, (date, _))| (index + 1, *date))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolution(date: NaiveDate, city: &str, manual: bool) -> LocationResolution {
        LocationResolution {
            date,
            primary_city: city.to_string(),
            all_cities: if city == UNKNOWN_CITY {
                Vec::new()
            } else {
                vec![city.to_string()]
            },
            photo_count: 1,
            manual,
        }
    }

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 8, d).unwrap()
    }

    #[test]
    fn test_unknown_day_fails_with_its_index() {
        let mut resolutions = BTreeMap::new();
        resolutions.insert(date(15), resolution(date(15), "Tórshavn", false));
        resolutions.insert(date(16), resolution(date(16), UNKNOWN_CITY, false));
        resolutions.insert(date(17), resolution(date(17), UNKNOWN_CITY, false));

        let failing = unresolved_days(&resolutions);

        assert_eq!(failing, vec![(2, date(16)), (3, date(17))]);
    }

    #[test]
    fn test_manual_override_satisfies_coverage() {
        // A manual "Unknown" would be odd but the user asked for it.
        let mut resolutions = BTreeMap::new();
        resolutions.insert(date(15), resolution(date(15), UNKNOWN_CITY, true));
        resolutions.insert(date(16), resolution(date(16), "Copenhagen", false));

        assert!(unresolved_days(&resolutions).is_empty());
    }

    #[test]
    fn test_fully_resolved_trip_passes() {
        let mut resolutions = BTreeMap::new();
        resolutions.insert(date(15), resolution(date(15), "Tórshavn", false));
        resolutions.insert(date(16), resolution(date(16), "Copenhagen", true));

        assert!(unresolved_days(&resolutions).is_empty());
    }
}
