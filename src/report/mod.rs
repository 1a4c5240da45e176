//! Reporting utilities: window statistics and formatted terminal output.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::domain::{RateRecord, TieBreak};
use crate::error::NoData;

pub mod format;

pub use format::*;

/// Mean rate of one series over the window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeriesMean {
    pub mean: f64,
    pub samples: usize,
}

/// Max/min/mean summary of a record batch.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateReport {
    pub max: RateRecord,
    pub min: RateRecord,
    /// Keyed by series name; iteration order is lexicographic.
    pub mean_by_series: BTreeMap<String, SeriesMean>,
    pub record_count: usize,
}

/// Summarize `records`, breaking max/min ties by first appearance.
pub fn aggregate(records: &[RateRecord]) -> Result<AggregateReport, NoData> {
    aggregate_with(records, TieBreak::FirstSeen)
}

/// Summarize `records` with an explicit tie-break rule.
///
/// Returns [`NoData`] for an empty batch instead of inventing a report.
pub fn aggregate_with(records: &[RateRecord], tie_break: TieBreak) -> Result<AggregateReport, NoData> {
    let (first, rest) = records.split_first().ok_or(NoData)?;

    let mut max = first;
    let mut min = first;
    for r in rest {
        if replaces(r, max, Ordering::Greater, tie_break) {
            max = r;
        }
        if replaces(r, min, Ordering::Less, tie_break) {
            min = r;
        }
    }

    let mut sums: BTreeMap<&str, (f64, usize)> = BTreeMap::new();
    for r in records {
        let entry = sums.entry(r.series_name()).or_insert((0.0, 0));
        entry.0 += r.value();
        entry.1 += 1;
    }
    let mean_by_series = sums
        .into_iter()
        .map(|(name, (sum, n))| {
            (
                name.to_string(),
                SeriesMean {
                    mean: sum / n as f64,
                    samples: n,
                },
            )
        })
        .collect();

    Ok(AggregateReport {
        max: max.clone(),
        min: min.clone(),
        mean_by_series,
        record_count: records.len(),
    })
}

/// Whether `candidate` should take the place of `current` when looking for
/// the extreme in direction `wanted`.
fn replaces(candidate: &RateRecord, current: &RateRecord, wanted: Ordering, tie_break: TieBreak) -> bool {
    match candidate.value().total_cmp(&current.value()) {
        Ordering::Equal => match tie_break {
            TieBreak::FirstSeen => false,
            TieBreak::Stable => stable_key(candidate) < stable_key(current),
        },
        ord => ord == wanted,
    }
}

fn stable_key(r: &RateRecord) -> (chrono::NaiveDate, &str) {
    (r.date(), r.series_name())
}
