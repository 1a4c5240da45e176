//! Formatted terminal output.
//!
//! We keep formatting code in one place so the aggregation code stays clean and
//! output changes are localized.

use std::time::Duration;

use chrono::NaiveDate;

use crate::data::QUOTE_CURRENCY;
use crate::domain::RateRecord;
use crate::error::DayFailure;
use crate::report::AggregateReport;

/// Elapsed-time line printed once every pipeline has finished.
pub fn format_elapsed(days: usize, elapsed: Duration) -> String {
    format!("Data for {days} days processed in {:.2} s.", elapsed.as_secs_f64())
}

/// Max/min records followed by the per-series means, series in name order.
pub fn format_report(report: &AggregateReport) -> String {
    let mut out = String::new();

    out.push_str(&format!(
        "Maximum rate over the period: {}\n",
        fmt_record(&report.max)
    ));
    out.push_str(&format!(
        "Minimum rate over the period: {}\n",
        fmt_record(&report.min)
    ));

    out.push_str("\nAverage rate over the period for each currency:\n");
    for (name, mean) in &report.mean_by_series {
        out.push_str(&format!("- {name}: {:.4} {QUOTE_CURRENCY}\n", mean.mean));
    }

    out
}

/// Notice printed when the window produced no records at all.
pub fn format_no_data() -> String {
    "Failed to retrieve any data.".to_string()
}

/// List of dates that contributed nothing, oldest first.
pub fn format_failures(failures: &[(NaiveDate, DayFailure)]) -> String {
    let mut sorted: Vec<_> = failures.iter().collect();
    sorted.sort_by_key(|(date, _)| *date);

    let mut out = format!("Dates without data ({}):\n", sorted.len());
    for (date, reason) in sorted {
        out.push_str(&format!("- {}: {reason}\n", date.format("%Y-%m-%d")));
    }
    out
}

fn fmt_record(r: &RateRecord) -> String {
    format!(
        "{:.4} {QUOTE_CURRENCY} per {} ({})",
        r.value(),
        r.series_name(),
        r.date().format("%Y-%m-%d")
    )
}
