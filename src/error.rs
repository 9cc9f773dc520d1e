//! Pipeline error taxonomy for phototrack.
//!
//! Stage-local failures (a single record that will not filter, a single
//! geocoding call that times out) are absorbed and counted where they
//! happen. The variants here are the pipeline-level failures: each one
//! halts the run before any track or summary file is written.

use chrono::NaiveDate;
use thiserror::Error;

/// Failures that abort the whole pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// exiftool could not be run or exited with an error.
    #[error("exiftool failed: {0}")]
    ExiftoolFailed(String),

    /// The scan finished but not a single photo carried GPS coordinates.
    #[error("no photos with GPS coordinates found under {0}")]
    NoGpsPhotos(String),

    /// Every record was dropped by the filter; there is nothing to group.
    #[error("no photos with complete GPS and timestamp data")]
    NoValidRecords,

    /// The expected travel-date range has days with no photo coverage.
    /// `trip_start` is the day-1 anchor used to number the missing days
    /// in retry hints.
    #[error("expected date range has {} day(s) without photos", missing.len())]
    IncompleteRange {
        missing: Vec<NaiveDate>,
        trip_start: NaiveDate,
    },

    /// A `--day` override points outside the actual date sequence.
    #[error("--day {day} is out of range: the trip has {total_days} day(s)")]
    InvalidOverride { day: usize, total_days: usize },

    /// One or more days resolved to "Unknown" with no manual override.
    /// Carries the 1-based day indices and dates that need input.
    #[error("{} day(s) could not be resolved to a city", .0.len())]
    CoverageGap(Vec<(usize, NaiveDate)>),
}
