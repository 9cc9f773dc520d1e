//! Record filtering for phototrack.
//!
//! The first pipeline stage: keep only the photos that can become track
//! points. A record must carry both coordinates and a timestamp that
//! parses against the EXIF format. Records are evaluated independently,
//! so one malformed photo can never abort a batch — it is counted as a
//! skip and the pipeline moves on.

use chrono::NaiveDateTime;
use log::debug;

use crate::extract::PhotoRecord;

/// EXIF capture-time format, e.g. "2025:08:15 10:30:00".
pub const EXIF_TIME_FORMAT: &str = "%Y:%m:%d %H:%M:%S";

/// How many individual skip reasons are kept for diagnostics; the rest
/// are only counted.
const MAX_SKIP_REASONS: usize = 5;

/// A photo that survived filtering: coordinates and capture time are
/// guaranteed present. Times are naive local wall-clock values — no
/// timezone arithmetic happens anywhere in the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct GpsPhoto {
    /// Original filename
    pub filename: String,
    /// Latitude in decimal degrees
    pub latitude: f64,
    /// Longitude in decimal degrees
    pub longitude: f64,
    /// Altitude in meters, when the camera recorded one
    pub elevation: Option<f64>,
    /// Capture time as naive local time
    pub time: NaiveDateTime,
}

/// Skip accounting produced alongside the filtered records.
#[derive(Debug, Default)]
pub struct SkipStats {
    /// Number of records dropped
    pub skipped: usize,
    /// First few human-readable skip reasons
    pub reasons: Vec<String>,
}

impl SkipStats {
    fn record(&mut self, filename: &str, reason: &str) {
        self.skipped += 1;
        if self.reasons.len() < MAX_SKIP_REASONS {
            self.reasons.push(format!("{filename}: {reason}"));
        }
    }
}

/// Filters raw records down to the ones with complete GPS and time data.
///
/// A record missing latitude, longitude, or timestamp — or whose
/// timestamp does not parse — is silently dropped and counted. An
/// unparseable timestamp is treated identically to a missing one.
pub fn filter_records(records: &[PhotoRecord]) -> (Vec<GpsPhoto>, SkipStats) {
    let mut photos = Vec::new();
    let mut skips = SkipStats::default();

    for record in records {
        let (latitude, longitude) = match (record.latitude, record.longitude) {
            (Some(lat), Some(lon)) => (lat, lon),
            _ => {
                skips.record(&record.filename, "missing GPS coordinates");
                continue;
            }
        };

        let Some(raw_time) = record.timestamp.as_deref() else {
            skips.record(&record.filename, "missing capture time");
            continue;
        };

        let time = match NaiveDateTime::parse_from_str(raw_time, EXIF_TIME_FORMAT) {
            Ok(time) => time,
            Err(_) => {
                skips.record(
                    &record.filename,
                    &format!("unparseable capture time {raw_time:?}"),
                );
                continue;
            }
        };

        photos.push(GpsPhoto {
            filename: record.filename.clone(),
            latitude,
            longitude,
            elevation: record.elevation,
            time,
        });
    }

    debug!(
        "filter kept {} of {} records ({} skipped)",
        photos.len(),
        records.len(),
        skips.skipped
    );

    (photos, skips)
}
