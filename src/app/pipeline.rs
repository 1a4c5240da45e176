//! Concurrent fetch -> parse fan-out over a date window.
//!
//! Every date gets its own fetch+parse pipeline. Pipelines are driven on the
//! calling task and observed in completion order; the batch and the progress
//! counter are owned by this task alone, so no locking is involved.

use std::future::Future;
use std::time::{Duration, Instant};

use chrono::NaiveDate;
use futures::stream::{self, StreamExt};

use crate::data::{CbrClient, parse_snapshot};
use crate::domain::{DayOutcome, RateRecord, RawSnapshot, RunConfig, TieBreak, date_window};
use crate::error::{AppError, DayFailure, NoData};
use crate::report::{AggregateReport, aggregate_with};

/// Completion counter handed to the progress observer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub done: usize,
    pub total: usize,
}

/// Everything collected over one window.
#[derive(Debug, Clone)]
pub struct WindowRun {
    pub days: usize,
    /// Records in the order their pipelines finished.
    pub batch: Vec<RateRecord>,
    pub failures: Vec<(NaiveDate, DayFailure)>,
    pub elapsed: Duration,
}

impl WindowRun {
    pub fn report(&self, tie_break: TieBreak) -> Result<AggregateReport, NoData> {
        aggregate_with(&self.batch, tie_break)
    }
}

/// Fetch and parse every date in the configured window.
pub async fn run_window<P>(config: &RunConfig, on_complete: P) -> Result<WindowRun, AppError>
where
    P: FnMut(&DayOutcome, Progress),
{
    let client = CbrClient::new(&config.fetch)?;
    let dates = date_window(config.reference_day, config.window_days);

    log::info!(
        "querying {} days ending {} from {}",
        dates.len(),
        config.reference_day,
        config.fetch.base_url
    );

    Ok(collect_window(dates, config.max_in_flight, |date| client.fetch(date), on_complete).await)
}

/// Run `fetch` for every date and fold the parsed results into one batch.
///
/// `max_in_flight = None` starts every request at once. `on_complete` sees each
/// pipeline's outcome as soon as it finishes.
pub async fn collect_window<F, Fut, P>(
    dates: Vec<NaiveDate>,
    max_in_flight: Option<usize>,
    fetch: F,
    mut on_complete: P,
) -> WindowRun
where
    F: Fn(NaiveDate) -> Fut,
    Fut: Future<Output = RawSnapshot>,
    P: FnMut(&DayOutcome, Progress),
{
    let started = Instant::now();
    let total = dates.len();
    let limit = max_in_flight.unwrap_or(total).max(1);

    let mut outcomes = stream::iter(dates)
        .map(|date| {
            let snapshot = fetch(date);
            async move {
                let snapshot = snapshot.await;
                DayOutcome {
                    date,
                    result: parse_snapshot(&snapshot),
                }
            }
        })
        .buffer_unordered(limit);

    let mut batch = Vec::new();
    let mut failures = Vec::new();
    let mut done = 0;

    while let Some(outcome) = outcomes.next().await {
        done += 1;
        log::debug!("{}: {} records", outcome.date, outcome.record_count());
        on_complete(&outcome, Progress { done, total });

        match outcome.result {
            Ok(records) => batch.extend(records),
            Err(reason) => failures.push((outcome.date, reason)),
        }
    }

    log::info!(
        "window done: {} records, {} of {total} dates failed",
        batch.len(),
        failures.len()
    );

    WindowRun {
        days: total,
        batch,
        failures,
        elapsed: started.elapsed(),
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::collections::HashSet;

    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    use super::*;
    use crate::domain::FetchConfig;
    use crate::error::FetchFailure;

    fn doc(name: &str, rate: &str) -> String {
        format!("<ValCurs><Valute><Name>{name}</Name><VunitRate>{rate}</VunitRate></Valute></ValCurs>")
    }

    #[tokio::test]
    async fn absent_and_malformed_days_are_skipped() {
        let today = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        let dates = date_window(today, 4);
        let fetch = |date: NaiveDate| {
            let offset = (today - date).num_days();
            async move {
                match offset {
                    0 => RawSnapshot::body(date, doc("Euro", "90,0")),
                    1 => RawSnapshot::absent(date, FetchFailure::Timeout),
                    2 => RawSnapshot::body(date, "<broken"),
                    _ => RawSnapshot::body(date, doc("Euro", "95,0")),
                }
            }
        };

        let run = collect_window(dates, None, fetch, |_, _| {}).await;
        assert_eq!(run.days, 4);
        assert_eq!(run.batch.len(), 2);
        assert_eq!(run.failures.len(), 2);

        let failed: HashSet<_> = run.failures.iter().map(|(d, _)| (today - *d).num_days()).collect();
        assert_eq!(failed, HashSet::from([1, 2]));
        assert!(run
            .failures
            .iter()
            .any(|(_, reason)| *reason == DayFailure::Fetch(FetchFailure::Timeout)));
    }

    #[tokio::test]
    async fn progress_reaches_total_once_per_date() {
        let today = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        let seen = Cell::new(0usize);
        let last = Cell::new(Progress { done: 0, total: 0 });

        let run = collect_window(
            date_window(today, 5),
            Some(2),
            |date| async move { RawSnapshot::body(date, doc("Euro", "1,5")) },
            |_, progress| {
                seen.set(seen.get() + 1);
                last.set(progress);
            },
        )
        .await;

        assert_eq!(seen.get(), 5);
        assert_eq!(last.get(), Progress { done: 5, total: 5 });
        assert_eq!(run.batch.len(), 5);
        assert!(run.failures.is_empty());
    }

    #[tokio::test]
    async fn empty_window_reports_no_data() {
        let today = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        let run = collect_window(
            date_window(today, 0),
            None,
            |date| async move { RawSnapshot::body(date, doc("Euro", "1,5")) },
            |_, _| {},
        )
        .await;

        assert_eq!(run.days, 0);
        assert_eq!(run.report(TieBreak::FirstSeen), Err(NoData));
    }

    /// Serve every connection: 200 with a one-entry document for 15/01/2024,
    /// 500 for any other date.
    async fn serve_by_date() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                tokio::spawn(async move {
                    let mut buf = vec![0u8; 4096];
                    let n = socket.read(&mut buf).await.unwrap_or(0);
                    let head = String::from_utf8_lossy(&buf[..n]).into_owned();
                    let (status, body) = if head.contains("date_req=15%2F01%2F2024") {
                        ("200 OK", doc("Euro", "93,4409"))
                    } else {
                        ("500 Internal Server Error", String::new())
                    };
                    let response = format!(
                        "HTTP/1.1 {status}\r\nContent-Type: text/xml; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                        body.len()
                    );
                    let _ = socket.write_all(response.as_bytes()).await;
                    let _ = socket.shutdown().await;
                });
            }
        });
        format!("http://{addr}/scripts/daily.asp")
    }

    #[tokio::test]
    async fn run_window_fetches_through_the_http_client() {
        let today = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        let config = RunConfig {
            reference_day: today,
            window_days: 2,
            fetch: FetchConfig {
                base_url: serve_by_date().await,
                timeout: Duration::from_secs(5),
            },
            max_in_flight: None,
            tie_break: TieBreak::FirstSeen,
            pause_on_exit: false,
            show_failures: false,
        };

        let completed = Cell::new(0usize);
        let run = run_window(&config, |_, _| completed.set(completed.get() + 1))
            .await
            .unwrap();

        assert_eq!(completed.get(), 2);
        assert_eq!(run.batch, vec![RateRecord::new(today, "Euro", 93.4409).unwrap()]);
        assert_eq!(
            run.failures,
            vec![(
                NaiveDate::from_ymd_opt(2024, 1, 14).unwrap(),
                DayFailure::Fetch(FetchFailure::Status(500))
            )]
        );
    }
}
