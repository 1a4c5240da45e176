//! Command-line parsing for the exchange-rate window summarizer.
//!
//! Every option can also come from the environment (or a `.env` file), which
//! is loaded before parsing.

use clap::Parser;

use crate::domain::{DEFAULT_BASE_URL, DEFAULT_TIMEOUT_SECS, DEFAULT_WINDOW_DAYS, TieBreak};

/// Top-level CLI.
#[derive(Debug, Parser, Clone)]
#[command(
    name = "fx-window",
    version,
    about = "Summarize daily exchange rates over a window of recent days"
)]
pub struct Cli {
    /// Number of days to query, counting back from today (inclusive).
    #[arg(short = 'd', long, env = "FX_WINDOW_DAYS", default_value_t = DEFAULT_WINDOW_DAYS)]
    pub days: usize,

    /// Daily rates endpoint; the date is sent as `date_req=dd/mm/yyyy`.
    #[arg(long, env = "FX_WINDOW_BASE_URL", default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Per-request timeout in seconds.
    #[arg(long, env = "FX_WINDOW_TIMEOUT_SECS", default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub timeout_secs: u64,

    /// Cap on requests in flight at once (default: all at once).
    #[arg(long, env = "FX_WINDOW_MAX_IN_FLIGHT")]
    pub max_in_flight: Option<usize>,

    /// How to choose between records with equal max/min values.
    #[arg(long, value_enum, default_value_t = TieBreak::FirstSeen)]
    pub tie_break: TieBreak,

    /// Exit without waiting for Enter.
    #[arg(long)]
    pub no_pause: bool,

    /// List the dates that produced no data and why.
    #[arg(long)]
    pub show_failures: bool,
}
