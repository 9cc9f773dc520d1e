//! End-to-end pipeline tests over the mock geocoder.

use anyhow::Result;
use chrono::NaiveDate;
use phototrack::config::Config;
use phototrack::error::PipelineError;
use phototrack::extract::PhotoRecord;
use phototrack::geocode::MockGeocoder;
use phototrack::pipeline::{Pipeline, PipelineOptions, PipelineUi, SilentUi};
use phototrack::summary::TripSummary;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn record(filename: &str, gps: Option<(f64, f64)>, timestamp: Option<&str>) -> PhotoRecord {
    PhotoRecord {
        filename: filename.to_string(),
        latitude: gps.map(|(lat, _)| lat),
        longitude: gps.map(|(_, lon)| lon),
        elevation: None,
        timestamp: timestamp.map(String::from),
    }
}

/// 7 records: 3 photos on 2025-08-15 in the Faroes, 2 on 2025-08-16 in
/// Copenhagen, one without GPS, one without a timestamp.
fn faroe_trip_records() -> Vec<PhotoRecord> {
    vec![
        record("f1.jpg", Some((62.0104, -6.7719)), Some("2025:08:15 09:00:00")),
        record("f2.jpg", Some((62.0105, -6.7720)), Some("2025:08:15 12:30:00")),
        record("f3.jpg", Some((62.0110, -6.7800)), Some("2025:08:15 18:45:00")),
        record("c1.jpg", Some((55.6761, 12.5683)), Some("2025:08:16 10:00:00")),
        record("c2.jpg", Some((55.6800, 12.5700)), Some("2025:08:16 15:20:00")),
        record("no_gps.jpg", None, Some("2025:08:15 11:00:00")),
        record("no_time.jpg", Some((62.0, -6.7)), None),
    ]
}

fn faroe_geocoder() -> MockGeocoder {
    MockGeocoder::new()
        .with_place(62.01, -6.77, "Tórshavn")
        .with_place(55.68, 12.57, "Copenhagen")
}

fn options(out_dir: &Path) -> PipelineOptions {
    PipelineOptions {
        photo_folder: out_dir.join("photos"),
        output_name: "faroe-2025".to_string(),
        out_dir: out_dir.to_path_buf(),
        expected_start: None,
        expected_end: None,
        overrides: BTreeMap::new(),
    }
}

/// Zero delays so tests do not wait on the rate limiter.
fn test_config() -> Config {
    Config {
        rate_limit_secs: 0.0,
        error_backoff_secs: 0.0,
        ..Config::default()
    }
}

fn date(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 8, d).unwrap()
}

#[tokio::test]
async fn test_end_to_end_trip() -> Result<()> {
    let temp = TempDir::new()?;
    let geocoder = faroe_geocoder();
    let pipeline = Pipeline::new(options(temp.path()), test_config());

    let report = pipeline
        .process_records(faroe_trip_records(), &geocoder, &mut SilentUi)
        .await?
        .expect("run should not be cancelled");

    // 5 of 7 records survive filtering, across 2 days.
    assert_eq!(report.track_points, 5);
    assert_eq!(report.total_days, 2);

    let gpx_xml = fs::read_to_string(&report.gpx_path)?;
    assert_eq!(gpx_xml.matches("<trkpt").count(), 5);
    assert!(gpx_xml.contains("Trip 2025-08-15 to 2025-08-16"));

    let summary: TripSummary = serde_json::from_str(&fs::read_to_string(&report.summary_path)?)?;
    assert_eq!(summary.trip_name, "faroe-2025");
    assert_eq!(summary.start_date, date(15));
    assert_eq!(summary.end_date, date(16));
    assert_eq!(summary.total_days, 2);
    assert_eq!(summary.daily_locations[0].primary_city, "Tórshavn");
    assert_eq!(summary.daily_locations[0].photo_count, 3);
    assert_eq!(summary.daily_locations[1].primary_city, "Copenhagen");
    assert_eq!(summary.daily_locations[1].photo_count, 2);
    assert_eq!(summary.cities_visited, vec!["Copenhagen", "Tórshavn"]);

    Ok(())
}

#[tokio::test]
async fn test_track_points_are_time_sorted() -> Result<()> {
    let temp = TempDir::new()?;
    let geocoder = faroe_geocoder();
    let pipeline = Pipeline::new(options(temp.path()), test_config());

    // Shuffle arrival order; output must still be chronological.
    let mut records = faroe_trip_records();
    records.reverse();

    let report = pipeline
        .process_records(records, &geocoder, &mut SilentUi)
        .await?
        .expect("run should not be cancelled");

    let gpx_xml = fs::read_to_string(&report.gpx_path)?;
    let times: Vec<&str> = gpx_xml
        .match_indices("<time>")
        .map(|(start, _)| &gpx_xml[start + 6..start + 25])
        .collect();
    assert_eq!(times.len(), 5);
    let mut sorted = times.clone();
    sorted.sort();
    assert_eq!(times, sorted);

    Ok(())
}

#[tokio::test]
async fn test_coverage_gap_blocks_all_output() -> Result<()> {
    let temp = TempDir::new()?;
    let geocoder = MockGeocoder::failing();
    let pipeline = Pipeline::new(options(temp.path()), test_config());

    let err = pipeline
        .process_records(faroe_trip_records(), &geocoder, &mut SilentUi)
        .await
        .expect_err("unresolvable days must fail");

    match err.downcast_ref::<PipelineError>() {
        Some(PipelineError::CoverageGap(days)) => {
            assert_eq!(days, &vec![(1, date(15)), (2, date(16))]);
        }
        other => panic!("expected CoverageGap, got {other:?}"),
    }

    assert!(!temp.path().join("faroe-2025.gpx").exists());
    assert!(!temp.path().join("faroe-2025-summary.json").exists());

    Ok(())
}

#[tokio::test]
async fn test_manual_overrides_rescue_unresolvable_days() -> Result<()> {
    let temp = TempDir::new()?;
    // Geocoder down, but both days are overridden.
    let geocoder = MockGeocoder::failing();
    let mut opts = options(temp.path());
    opts.overrides.insert(1, "Tórshavn".to_string());
    opts.overrides.insert(2, "Copenhagen".to_string());
    let pipeline = Pipeline::new(opts, test_config());

    let report = pipeline
        .process_records(faroe_trip_records(), &geocoder, &mut SilentUi)
        .await?
        .expect("run should not be cancelled");

    // Overridden days never touch the geocoder.
    assert_eq!(geocoder.live_calls(), 0);

    let summary: TripSummary = serde_json::from_str(&fs::read_to_string(&report.summary_path)?)?;
    assert!(summary.daily_locations.iter().all(|d| d.manually_set));
    assert_eq!(summary.daily_locations[1].primary_city, "Copenhagen");

    Ok(())
}

#[tokio::test]
async fn test_incomplete_range_aborts_before_geocoding() -> Result<()> {
    let temp = TempDir::new()?;
    let geocoder = faroe_geocoder();
    let mut opts = options(temp.path());
    opts.expected_start = Some(date(14));
    opts.expected_end = Some(date(17));
    let pipeline = Pipeline::new(opts, test_config());

    let err = pipeline
        .process_records(faroe_trip_records(), &geocoder, &mut SilentUi)
        .await
        .expect_err("range gaps must fail");

    match err.downcast_ref::<PipelineError>() {
        Some(PipelineError::IncompleteRange {
            missing,
            trip_start,
        }) => {
            assert_eq!(missing, &vec![date(14), date(17)]);
            assert_eq!(*trip_start, date(14));
        }
        other => panic!("expected IncompleteRange, got {other:?}"),
    }

    // The gate sits before resolution: no geocoding happened.
    assert_eq!(geocoder.live_calls(), 0);
    assert!(!temp.path().join("faroe-2025.gpx").exists());

    Ok(())
}

#[tokio::test]
async fn test_out_of_range_override_is_rejected() -> Result<()> {
    let temp = TempDir::new()?;
    let geocoder = faroe_geocoder();
    let mut opts = options(temp.path());
    opts.overrides.insert(5, "Copenhagen".to_string());
    let pipeline = Pipeline::new(opts, test_config());

    let err = pipeline
        .process_records(faroe_trip_records(), &geocoder, &mut SilentUi)
        .await
        .expect_err("override beyond the trip length must fail");

    match err.downcast_ref::<PipelineError>() {
        Some(PipelineError::InvalidOverride { day, total_days }) => {
            assert_eq!(*day, 5);
            assert_eq!(*total_days, 2);
        }
        other => panic!("expected InvalidOverride, got {other:?}"),
    }

    Ok(())
}

#[tokio::test]
async fn test_all_records_invalid_is_no_valid_records() -> Result<()> {
    let temp = TempDir::new()?;
    let geocoder = faroe_geocoder();
    let pipeline = Pipeline::new(options(temp.path()), test_config());

    let records = vec![
        record("no_gps.jpg", None, Some("2025:08:15 11:00:00")),
        record("no_time.jpg", Some((62.0, -6.7)), None),
    ];

    let err = pipeline
        .process_records(records, &geocoder, &mut SilentUi)
        .await
        .expect_err("nothing to group must fail");

    assert!(matches!(
        err.downcast_ref::<PipelineError>(),
        Some(PipelineError::NoValidRecords)
    ));

    Ok(())
}

struct CancelAtCityLookup;

impl PipelineUi for CancelAtCityLookup {
    fn confirm(&mut self, prompt: &str) -> bool {
        !prompt.contains("city lookup")
    }
}

#[tokio::test]
async fn test_declining_a_gate_cancels_without_output() -> Result<()> {
    let temp = TempDir::new()?;
    let geocoder = faroe_geocoder();
    let pipeline = Pipeline::new(options(temp.path()), test_config());

    let report = pipeline
        .process_records(faroe_trip_records(), &geocoder, &mut CancelAtCityLookup)
        .await?;

    assert!(report.is_none());
    assert_eq!(geocoder.live_calls(), 0);
    assert!(!temp.path().join("faroe-2025.gpx").exists());

    Ok(())
}

#[derive(Default)]
struct RecordingUi {
    resolved_days: Vec<(usize, String)>,
    coverage_cities: Vec<String>,
}

impl PipelineUi for RecordingUi {
    fn day_resolved(
        &mut self,
        day: usize,
        resolution: &phototrack::resolve::LocationResolution,
    ) {
        self.resolved_days
            .push((day, resolution.primary_city.clone()));
    }

    fn coverage_ok(&mut self, _total_days: usize, cities: &[String]) {
        self.coverage_cities = cities.to_vec();
    }
}

#[tokio::test]
async fn test_progress_hooks_fire_in_day_order() -> Result<()> {
    let temp = TempDir::new()?;
    let geocoder = faroe_geocoder();
    let pipeline = Pipeline::new(options(temp.path()), test_config());
    let mut ui = RecordingUi::default();

    pipeline
        .process_records(faroe_trip_records(), &geocoder, &mut ui)
        .await?;

    assert_eq!(
        ui.resolved_days,
        vec![
            (1, "Tórshavn".to_string()),
            (2, "Copenhagen".to_string()),
        ]
    );
    assert_eq!(ui.coverage_cities, vec!["Copenhagen", "Tórshavn"]);

    Ok(())
}
