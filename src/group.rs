//! Day grouping for phototrack.
//!
//! Buckets filtered photos by the calendar date of their capture time.
//! The date is the naive local date exactly as parsed from EXIF — no
//! timezone conversion. Within a bucket, photos keep their arrival
//! order; time-sorting happens later in the track assembler.

use chrono::NaiveDate;
use std::collections::BTreeMap;

use crate::error::PipelineError;
use crate::filter::GpsPhoto;

/// All photos taken on a single calendar day, in arrival order.
#[derive(Debug, Clone)]
pub struct DayBucket {
    /// The day's date
    pub date: NaiveDate,
    /// Photos in input order, not necessarily time-sorted
    pub photos: Vec<GpsPhoto>,
}

/// The trip's photos, bucketed by day. Iterating `buckets` visits days
/// in ascending date order; the struct is never empty.
#[derive(Debug, Clone)]
pub struct TripDays {
    pub buckets: BTreeMap<NaiveDate, DayBucket>,
}

impl TripDays {
    /// The ascending date sequence.
    pub fn dates(&self) -> Vec<NaiveDate> {
        self.buckets.keys().copied().collect()
    }

    /// First and last date of the trip.
    pub fn span(&self) -> Option<(NaiveDate, NaiveDate)> {
        let first = self.buckets.keys().next()?;
        let last = self.buckets.keys().next_back()?;
        Some((*first, *last))
    }

    /// Number of distinct days.
    pub fn total_days(&self) -> usize {
        self.buckets.len()
    }

    /// Number of photos across all days.
    pub fn photo_count(&self) -> usize {
        self.buckets.values().map(|b| b.photos.len()).sum()
    }
}

/// Groups filtered photos into per-day buckets.
///
/// Zero valid photos means no track can be produced, which is a
/// distinct hard failure from "some records were invalid".
pub fn group_by_date(photos: Vec<GpsPhoto>) -> Result<TripDays, PipelineError> {
    if photos.is_empty() {
        return Err(PipelineError::NoValidRecords);
    }

    let mut buckets: BTreeMap<NaiveDate, DayBucket> = BTreeMap::new();
    for photo in photos {
        let date = photo.time.date();
        buckets
            .entry(date)
            .or_insert_with(|| DayBucket {
                date,
                photos: Vec::new(),
            })
            .photos
            .push(photo);
    }

    Ok(TripDays { buckets })
}
