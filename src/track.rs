//! Track assembly and GPX output for phototrack.
//!
//! Flattens all day buckets into one chronological sequence of track
//! points and serializes it as a GPX 1.1 document with a single track
//! segment, ready for Lightroom's track-log geotagging.

use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveDateTime};
use geo_types::Point;
use gpx::{Gpx, GpxVersion, Track, TrackSegment, Waypoint};
use std::io::Write;
use time::OffsetDateTime;

use crate::group::TripDays;

/// One point of the output track. Derived 1:1 from a filtered photo.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackPoint {
    pub latitude: f64,
    pub longitude: f64,
    pub elevation: Option<f64>,
    pub time: NaiveDateTime,
}

/// Flattens every bucket and stable-sorts ascending by timestamp.
/// Equal timestamps keep their original relative order; there is no
/// secondary key.
pub fn assemble_track(trip: &TripDays) -> Vec<TrackPoint> {
    let mut points: Vec<TrackPoint> = trip
        .buckets
        .values()
        .flat_map(|bucket| bucket.photos.iter())
        .map(|photo| TrackPoint {
            latitude: photo.latitude,
            longitude: photo.longitude,
            elevation: photo.elevation,
            time: photo.time,
        })
        .collect();

    points.sort_by_key(|p| p.time);
    points
}

/// The display name for a trip's track.
pub fn track_name(first: NaiveDate, last: NaiveDate) -> String {
    format!("Trip {first} to {last}")
}

/// Builds the GPX document: one track, one segment, all points.
pub fn build_gpx(points: &[TrackPoint], creator: &str, name: &str) -> Result<Gpx> {
    let mut segment = TrackSegment::new();
    for point in points {
        let mut waypoint = Waypoint::new(Point::new(point.longitude, point.latitude));
        waypoint.elevation = point.elevation;
        waypoint.time = Some(to_gpx_time(point.time)?);
        segment.points.push(waypoint);
    }

    let track = Track {
        name: Some(name.to_string()),
        segments: vec![segment],
        ..Track::default()
    };

    Ok(Gpx {
        version: GpxVersion::Gpx11,
        creator: Some(creator.to_string()),
        tracks: vec![track],
        ..Gpx::default()
    })
}

/// Serializes the track to GPX XML.
pub fn write_gpx<W: Write>(gpx: &Gpx, writer: W) -> Result<()> {
    gpx::write(gpx, writer).context("Failed to serialize GPX document")
}

/// Photo times are naive local wall-clock values; GPX wants an absolute
/// timestamp, so they are written as-is with a UTC offset.
fn to_gpx_time(time: NaiveDateTime) -> Result<gpx::Time> {
    let odt = OffsetDateTime::from_unix_timestamp(time.and_utc().timestamp())
        .context("Capture time is outside the representable range")?;
    Ok(gpx::Time::from(odt))
}
