//! Photo metadata extraction for phototrack.
//!
//! This module shells out to `exiftool` to read GPS coordinates and the
//! original capture time from every photo under a directory. exiftool is
//! treated as an external collaborator: it hands back a flat JSON array
//! of records, and anything beyond running it and deserializing its
//! output belongs to the downstream pipeline stages.

use anyhow::{Context, Result};
use log::debug;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::process::Command;

use crate::error::PipelineError;

/// File extensions passed to exiftool. Matches what phone cameras and
/// photo exports actually produce.
const PHOTO_EXTENSIONS: &[&str] = &["jpg", "jpeg", "heic", "HEIC", "JPG"];

/// A single photo record as emitted by `exiftool -json -n`.
///
/// Every field except the filename may be absent: screenshots have no
/// GPS block, scans have no capture time. The timestamp stays a string
/// here; parsing it is the record filter's job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhotoRecord {
    /// Original filename (e.g., "IMG_4211.jpg")
    #[serde(rename = "FileName", default)]
    pub filename: String,
    /// Latitude in decimal degrees, positive north
    #[serde(rename = "GPSLatitude", skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    /// Longitude in decimal degrees, positive east
    #[serde(rename = "GPSLongitude", skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    /// Altitude in meters above sea level
    #[serde(rename = "GPSAltitude", skip_serializing_if = "Option::is_none")]
    pub elevation: Option<f64>,
    /// Capture time as recorded by the camera, `YYYY:MM:DD HH:MM:SS`
    #[serde(rename = "DateTimeOriginal", skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

impl PhotoRecord {
    /// True when the record carries both GPS coordinates.
    pub fn has_gps(&self) -> bool {
        self.latitude.is_some() && self.longitude.is_some()
    }
}

/// Counts reported after a scan.
#[derive(Debug, Clone, Copy)]
pub struct ExtractStats {
    /// Total photos exiftool found
    pub total: usize,
    /// Photos carrying GPS coordinates
    pub with_gps: usize,
}

impl ExtractStats {
    /// Photos without GPS coordinates.
    pub fn without_gps(&self) -> usize {
        self.total - self.with_gps
    }
}

/// Result of scanning a photo folder.
#[derive(Debug)]
pub struct ExtractOutput {
    /// All records exiftool produced, GPS-bearing or not
    pub records: Vec<PhotoRecord>,
    /// Scan counts for reporting
    pub stats: ExtractStats,
    /// exiftool's raw JSON output, kept verbatim for the diagnostic dump
    pub raw_json: String,
}

/// Runs exiftool over `photo_folder` and collects one record per photo.
///
/// A non-zero exiftool exit, unparseable output, or a scan where no
/// photo has GPS coordinates at all is fatal to the run.
pub fn scan_photos(photo_folder: &Path) -> Result<ExtractOutput> {
    let mut cmd = Command::new("exiftool");
    cmd.args(["-json", "-n", "-r"]);
    for ext in PHOTO_EXTENSIONS {
        cmd.args(["-ext", ext]);
    }
    cmd.args([
        "-FileName",
        "-GPSLatitude",
        "-GPSLongitude",
        "-GPSAltitude",
        "-DateTimeOriginal",
    ]);
    cmd.arg(photo_folder);

    debug!("running exiftool over {}", photo_folder.display());
    let output = cmd
        .output()
        .context("Failed to run exiftool. Is it installed and on PATH?")?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        return Err(PipelineError::ExiftoolFailed(stderr).into());
    }

    let raw_json = String::from_utf8(output.stdout).context("exiftool output was not UTF-8")?;
    // exiftool prints nothing at all when no file matched.
    let records: Vec<PhotoRecord> = if raw_json.trim().is_empty() {
        Vec::new()
    } else {
        serde_json::from_str(&raw_json)
            .map_err(|e| PipelineError::ExiftoolFailed(format!("unparseable JSON output: {e}")))?
    };

    let stats = ExtractStats {
        total: records.len(),
        with_gps: records.iter().filter(|r| r.has_gps()).count(),
    };

    if stats.with_gps == 0 {
        return Err(PipelineError::NoGpsPhotos(photo_folder.display().to_string()).into());
    }

    Ok(ExtractOutput {
        records,
        stats,
        raw_json,
    })
}
