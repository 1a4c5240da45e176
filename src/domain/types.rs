//! Shared domain types.
//!
//! Dates stay as `NaiveDate` all the way through the pipeline. Only the fetcher
//! turns them into the wire format and only the report code prints them.

use std::time::Duration;

use chrono::NaiveDate;
use clap::ValueEnum;

use crate::error::{DayFailure, FetchFailure};

/// Default number of days queried, counting back from today.
pub const DEFAULT_WINDOW_DAYS: usize = 90;

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Daily rates endpoint of the Central Bank of Russia (English names).
pub const DEFAULT_BASE_URL: &str = "http://www.cbr.ru/scripts/XML_daily_eng.asp";

/// One observation: the per-unit rate of a currency on a given day.
///
/// Construct through [`RateRecord::new`], which rejects non-positive and
/// non-finite values.
#[derive(Debug, Clone, PartialEq)]
pub struct RateRecord {
    date: NaiveDate,
    series_name: String,
    value: f64,
}

impl RateRecord {
    pub fn new(date: NaiveDate, series_name: impl Into<String>, value: f64) -> Option<Self> {
        if !(value.is_finite() && value > 0.0) {
            return None;
        }
        Some(Self {
            date,
            series_name: series_name.into(),
            value,
        })
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn series_name(&self) -> &str {
        &self.series_name
    }

    pub fn value(&self) -> f64 {
        self.value
    }
}

/// Body of a response, or the reason there is none.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    Body(String),
    Absent(FetchFailure),
}

/// Raw answer for one date, before parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawSnapshot {
    pub date: NaiveDate,
    pub payload: Payload,
}

impl RawSnapshot {
    pub fn body(date: NaiveDate, text: impl Into<String>) -> Self {
        Self {
            date,
            payload: Payload::Body(text.into()),
        }
    }

    pub fn absent(date: NaiveDate, reason: FetchFailure) -> Self {
        Self {
            date,
            payload: Payload::Absent(reason),
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self.payload, Payload::Absent(_))
    }
}

/// Terminal state of one fetch+parse pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct DayOutcome {
    pub date: NaiveDate,
    pub result: Result<Vec<RateRecord>, DayFailure>,
}

impl DayOutcome {
    pub fn record_count(&self) -> usize {
        self.result.as_ref().map(Vec::len).unwrap_or(0)
    }
}

/// How max/min pick between records with equal values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum TieBreak {
    /// Keep the record that appeared first in the batch (arrival order).
    #[default]
    FirstSeen,
    /// Prefer the earliest date, then the lexicographically smaller series.
    Stable,
}

/// Settings for the HTTP side of the pipeline.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub base_url: String,
    pub timeout: Duration,
}

/// Everything one run needs, resolved from CLI/env.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub reference_day: NaiveDate,
    pub window_days: usize,
    pub fetch: FetchConfig,
    /// `None` launches every request at once.
    pub max_in_flight: Option<usize>,
    pub tie_break: TieBreak,
    pub pause_on_exit: bool,
    pub show_failures: bool,
}
