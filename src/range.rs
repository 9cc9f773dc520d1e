//! Expected-range validation for phototrack.
//!
//! Given the trip's actual first and last photo dates and an optional
//! expected start/end, this reports every calendar day the photos fail
//! to cover *outside* the actual range. Gaps between two days that both
//! have photos are deliberately not reported: a day without photos in
//! the middle of a trip is legitimate, and downstream consumers rely on
//! that boundary.

use chrono::NaiveDate;

/// Computes the dates missing from the actual range relative to the
/// expected bounds.
///
/// With an expected start earlier than the first photo date, every day
/// in `[expected_start, actual_first)` is missing; with an expected end
/// later than the last photo date, every day in `(actual_last,
/// expected_end]` is missing. No bounds, no missing dates. The result
/// is ascending.
pub fn missing_dates(
    actual_first: NaiveDate,
    actual_last: NaiveDate,
    expected_start: Option<NaiveDate>,
    expected_end: Option<NaiveDate>,
) -> Vec<NaiveDate> {
    let mut missing = Vec::new();

    if let Some(start) = expected_start {
        missing.extend(start.iter_days().take_while(|d| *d < actual_first));
    }

    if let Some(end) = expected_end {
        if let Some(after_last) = actual_last.succ_opt() {
            missing.extend(after_last.iter_days().take_while(|d| *d <= end));
        }
    }

    missing
}
