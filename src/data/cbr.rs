//! Daily rates snapshot fetcher for the Central Bank of Russia endpoint.
//!
//! One GET per date, one attempt, bounded by the client timeout. Every failure
//! is folded into [`RawSnapshot::absent`] so the caller never sees an error.

use chrono::NaiveDate;
use reqwest::Client;

use crate::domain::{FetchConfig, RawSnapshot};
use crate::error::{AppError, FetchFailure};

/// Currency the source quotes every rate in.
pub const QUOTE_CURRENCY: &str = "RUB";

const DATE_PARAM: &str = "date_req";

/// Level for per-date fetch failures; sits below the driver's default filter.
pub const FAILURE_LOG_LEVEL: log::Level = log::Level::Info;

/// Format a date the way the endpoint expects it (`dd/mm/yyyy`).
pub fn wire_date(date: NaiveDate) -> String {
    date.format("%d/%m/%Y").to_string()
}

pub struct CbrClient {
    client: Client,
    base_url: String,
}

impl CbrClient {
    pub fn new(config: &FetchConfig) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AppError::new(2, format!("Failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: config.base_url.clone(),
        })
    }

    /// Fetch the snapshot for `date`. Never fails; see [`RawSnapshot::is_absent`].
    pub async fn fetch(&self, date: NaiveDate) -> RawSnapshot {
        match self.fetch_body(date).await {
            Ok(text) => RawSnapshot::body(date, text),
            Err(reason) => {
                log::log!(FAILURE_LOG_LEVEL, "no snapshot for {date}: {reason}");
                RawSnapshot::absent(date, reason)
            }
        }
    }

    async fn fetch_body(&self, date: NaiveDate) -> Result<String, FetchFailure> {
        let resp = self
            .client
            .get(&self.base_url)
            .query(&[(DATE_PARAM, wire_date(date))])
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(FetchFailure::Status(resp.status().as_u16()));
        }

        Ok(resp.text().await?)
    }
}
