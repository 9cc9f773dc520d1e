//! Pipeline orchestration for phototrack.
//!
//! Wires the stages together in order — scan, filter, group, range
//! check, city resolution, coverage check, output — and enforces the
//! hard gates between them. The stages themselves are pure; the only
//! I/O here is exiftool at the front, the geocoder in the middle, and
//! the output files at the very end, which are written only after every
//! gate has passed.
//!
//! User interaction is injected through the `PipelineUi` trait: the CLI
//! implements it with colored prompts and progress lines, tests drive
//! the pipeline with a silent implementation.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use log::info;
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use crate::config::Config;
use crate::coverage::unresolved_days;
use crate::error::PipelineError;
use crate::extract::{ExtractStats, PhotoRecord, scan_photos};
use crate::filter::{SkipStats, filter_records};
use crate::geocode::Geocoder;
use crate::group::{TripDays, group_by_date};
use crate::range::missing_dates;
use crate::resolve::{CityResolver, LocationResolution};
use crate::summary::build_summary;
use crate::track::{assemble_track, build_gpx, track_name, write_gpx};

/// Everything the caller decides about a run.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Folder scanned recursively for photos
    pub photo_folder: PathBuf,
    /// Base name of the output files
    pub output_name: String,
    /// Directory the outputs are written into
    pub out_dir: PathBuf,
    /// Expected first day of the trip, if known
    pub expected_start: Option<NaiveDate>,
    /// Expected last day of the trip, if known
    pub expected_end: Option<NaiveDate>,
    /// Manual city overrides, 1-based day index → city
    pub overrides: BTreeMap<usize, String>,
}

/// Hooks for stage confirmation and progress display. Every method has
/// a no-op (or always-yes) default, so non-interactive callers only
/// implement what they need.
pub trait PipelineUi {
    /// Asked between stages; returning false cancels the run.
    fn confirm(&mut self, _prompt: &str) -> bool {
        true
    }
    /// Fired after the photo scan.
    fn scanned(&mut self, _stats: &ExtractStats) {}
    /// Fired after filtering and grouping.
    fn grouped(&mut self, _trip: &TripDays, _skips: &SkipStats) {}
    /// Fired once per day during city resolution, in order.
    fn day_resolved(&mut self, _day: usize, _resolution: &LocationResolution) {}
    /// Fired when every day has a usable city label.
    fn coverage_ok(&mut self, _total_days: usize, _cities: &[String]) {}
}

/// A `PipelineUi` that never prompts and never prints.
pub struct SilentUi;

impl PipelineUi for SilentUi {}

/// Files written by a completed run.
#[derive(Debug)]
pub struct RunReport {
    pub gpx_path: PathBuf,
    pub summary_path: PathBuf,
    pub track_points: usize,
    pub total_days: usize,
}

/// The orchestrator. Construct once per run.
pub struct Pipeline {
    options: PipelineOptions,
    config: Config,
}

impl Pipeline {
    pub fn new(options: PipelineOptions, config: Config) -> Self {
        Self { options, config }
    }

    /// Runs the whole pipeline: scans the photo folder, then processes
    /// the records. Returns `Ok(None)` when the user cancels at a gate.
    pub async fn run<G: Geocoder>(
        &self,
        geocoder: &G,
        ui: &mut impl PipelineUi,
    ) -> Result<Option<RunReport>> {
        let scan = scan_photos(&self.options.photo_folder)?;
        self.write_raw_dump(&scan.raw_json)?;
        ui.scanned(&scan.stats);

        if !ui.confirm("Continue with trip analysis?") {
            return Ok(None);
        }

        self.process_records(scan.records, geocoder, ui).await
    }

    /// The pipeline from the record filter onward. Split from `run` so
    /// tests can feed records directly instead of shelling out to
    /// exiftool.
    pub async fn process_records<G: Geocoder>(
        &self,
        records: Vec<PhotoRecord>,
        geocoder: &G,
        ui: &mut impl PipelineUi,
    ) -> Result<Option<RunReport>> {
        let (photos, skips) = filter_records(&records);
        let trip = group_by_date(photos)?;
        ui.grouped(&trip, &skips);

        self.check_range(&trip)?;
        self.check_overrides(&trip)?;

        if !ui.confirm("Continue with city lookup?") {
            return Ok(None);
        }

        let mut resolver = CityResolver::new(
            geocoder,
            self.config.rate_limit(),
            self.config.error_backoff(),
        );
        let resolutions = resolver
            .resolve_all(&trip, &self.options.overrides, |day, resolution| {
                ui.day_resolved(day, resolution)
            })
            .await;
        info!("geocode cache holds {} grid cells", resolver.cache().len());

        let failing = unresolved_days(&resolutions);
        if !failing.is_empty() {
            return Err(PipelineError::CoverageGap(failing).into());
        }

        let summary = build_summary(&self.options.output_name, &resolutions)?;
        ui.coverage_ok(summary.total_days, &summary.cities_visited);

        if !ui.confirm("Coverage looks good. Write GPX and summary?") {
            return Ok(None);
        }

        let points = assemble_track(&trip);
        let name = track_name(summary.start_date, summary.end_date);
        let gpx = build_gpx(&points, &self.config.gpx_creator, &name)?;

        fs::create_dir_all(&self.options.out_dir).with_context(|| {
            format!(
                "Failed to create output directory {}",
                self.options.out_dir.display()
            )
        })?;

        let gpx_path = self.output_path("gpx");
        let file = fs::File::create(&gpx_path)
            .with_context(|| format!("Failed to create {}", gpx_path.display()))?;
        write_gpx(&gpx, file)?;

        let summary_path = self
            .options
            .out_dir
            .join(format!("{}-summary.json", self.options.output_name));
        let json = serde_json::to_string_pretty(&summary)?;
        fs::write(&summary_path, json)
            .with_context(|| format!("Failed to write {}", summary_path.display()))?;

        Ok(Some(RunReport {
            gpx_path,
            summary_path,
            track_points: points.len(),
            total_days: summary.total_days,
        }))
    }

    /// Hard gate: expected-range gaps abort before any geocoding.
    fn check_range(&self, trip: &TripDays) -> Result<()> {
        let (first, last) = trip
            .span()
            .context("Trip has no days after grouping")?;

        let missing = missing_dates(
            first,
            last,
            self.options.expected_start,
            self.options.expected_end,
        );
        if !missing.is_empty() {
            let trip_start = self.options.expected_start.unwrap_or(first);
            return Err(PipelineError::IncompleteRange {
                missing,
                trip_start,
            }
            .into());
        }

        Ok(())
    }

    /// Overrides are validated once against the date-sequence length.
    fn check_overrides(&self, trip: &TripDays) -> Result<()> {
        let total_days = trip.total_days();
        for &day in self.options.overrides.keys() {
            if day == 0 || day > total_days {
                return Err(PipelineError::InvalidOverride { day, total_days }.into());
            }
        }
        Ok(())
    }

    /// The raw exiftool dump is a diagnostic artifact and is written at
    /// scan time, before any gate.
    fn write_raw_dump(&self, raw_json: &str) -> Result<()> {
        fs::create_dir_all(&self.options.out_dir).with_context(|| {
            format!(
                "Failed to create output directory {}",
                self.options.out_dir.display()
            )
        })?;
        let dump_path = self.dump_path();
        fs::write(&dump_path, raw_json)
            .with_context(|| format!("Failed to write {}", dump_path.display()))
    }

    /// Path of the raw exiftool dump.
    pub fn dump_path(&self) -> PathBuf {
        self.options
            .out_dir
            .join(format!("{}-gps.json", self.options.output_name))
    }

    fn output_path(&self, extension: &str) -> PathBuf {
        self.options
            .out_dir
            .join(format!("{}.{extension}", self.options.output_name))
    }
}

/// Convenience used by error reporting: 1-based day number of `date`
/// counted from `trip_start`.
pub fn day_number(trip_start: NaiveDate, date: NaiveDate) -> i64 {
    (date - trip_start).num_days() + 1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_day_number() {
        let start = NaiveDate::from_ymd_opt(2025, 8, 12).unwrap();
        assert_eq!(day_number(start, start), 1);
        assert_eq!(
            day_number(start, NaiveDate::from_ymd_opt(2025, 8, 23).unwrap()),
            12
        );
    }

    fn path_options() -> PipelineOptions {
        PipelineOptions {
            photo_folder: PathBuf::from("/photos"),
            output_name: "denmark-2025".to_string(),
            out_dir: PathBuf::from("gpx"),
            expected_start: None,
            expected_end: None,
            overrides: BTreeMap::new(),
        }
    }

    #[test]
    fn test_output_paths() {
        let pipeline = Pipeline::new(path_options(), Config::default());

        assert_eq!(
            pipeline.output_path("gpx"),
            PathBuf::from("gpx/denmark-2025.gpx")
        );
        assert_eq!(
            pipeline.dump_path(),
            PathBuf::from("gpx/denmark-2025-gps.json")
        );
    }
}
