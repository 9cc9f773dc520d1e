//! # phototrack
//!
//! A command-line tool that turns a folder of geotagged photos into a
//! GPX travel track plus a per-day trip summary.
//!
//! The tool scans photo metadata with exiftool, groups the GPS-bearing
//! photos into calendar days, validates the date coverage against an
//! optional expected travel range, resolves a representative city per
//! day through reverse geocoding (Nominatim, with a grid cache and
//! manual `--day` overrides), and only once every day has a usable
//! label writes a time-sorted GPX track and a JSON summary.
//!
//! ## Features
//!
//! - Recursive metadata scan via exiftool (JPEG and HEIC)
//! - Calendar-day grouping with naive local timestamps
//! - Gap detection against an expected start/end date
//! - Rate-limited reverse geocoding with a coordinate-grid cache
//! - Per-day manual city overrides for days the geocoder cannot label
//! - GPX 1.1 track output ready for Lightroom geotagging

pub mod config;
pub mod coverage;
pub mod error;
pub mod extract;
pub mod filter;
pub mod geocode;
pub mod group;
pub mod pipeline;
pub mod range;
pub mod resolve;
pub mod summary;
pub mod track;
