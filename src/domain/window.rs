//! Date window generation.

use chrono::{Duration, NaiveDate};

/// `days` consecutive dates ending at `reference_day`, newest first.
///
/// A zero-length window is allowed and simply yields nothing.
pub fn date_window(reference_day: NaiveDate, days: usize) -> Vec<NaiveDate> {
    (0..days)
        .map_while(|offset| {
            let offset = i64::try_from(offset).ok()?;
            reference_day.checked_sub_signed(Duration::days(offset))
        })
        .collect()
}
