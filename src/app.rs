//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - loads `.env` and parses CLI arguments
//! - runs the fetch/parse fan-out on a single-threaded runtime
//! - shows progress while dates complete
//! - prints the summary (or a no-data notice)
//! - optionally waits for Enter before exiting

use std::io::{self, BufRead, IsTerminal, Write};
use std::time::Duration;

use chrono::{Local, NaiveDate};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};

use crate::cli::Cli;
use crate::domain::{FetchConfig, RunConfig};
use crate::error::AppError;
use crate::report::{format_elapsed, format_failures, format_no_data, format_report};

pub mod pipeline;

const DEFAULT_LOG_FILTER: &str = "warn";

/// Entry point for the `fx-window` binary.
pub fn run() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_logging();

    let config = run_config_from_args(&cli, Local::now().date_naive());

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| AppError::new(2, format!("Failed to start async runtime: {e}")))?;

    let progress = progress_bar(config.window_days);
    let run = runtime.block_on(pipeline::run_window(&config, |_, p| {
        progress.set_position(p.done as u64);
    }))?;
    progress.finish();

    println!("{}", format_elapsed(run.days, run.elapsed));

    match run.report(config.tie_break) {
        Ok(report) => println!("\n{}", format_report(&report)),
        Err(_) => println!("{}", format_no_data()),
    }

    if config.show_failures && !run.failures.is_empty() {
        println!("{}", format_failures(&run.failures));
    }

    if config.pause_on_exit {
        wait_for_enter()?;
    }
    Ok(())
}

pub fn run_config_from_args(cli: &Cli, reference_day: NaiveDate) -> RunConfig {
    RunConfig {
        reference_day,
        window_days: cli.days,
        fetch: FetchConfig {
            base_url: cli.base_url.clone(),
            timeout: Duration::from_secs(cli.timeout_secs),
        },
        max_in_flight: cli.max_in_flight,
        tie_break: cli.tie_break,
        pause_on_exit: !cli.no_pause && io::stdin().is_terminal(),
        show_failures: cli.show_failures,
    }
}

fn init_logging() {
    // Progress bar owns stderr; keep library chatter to warnings unless asked.
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(DEFAULT_LOG_FILTER))
        .init();
}

fn progress_bar(days: usize) -> ProgressBar {
    let pb = ProgressBar::new(days as u64);
    let template = format!("Processing data for the last {days} days: {{pos}}/{{len}}");
    if let Ok(style) = ProgressStyle::with_template(&template) {
        pb.set_style(style);
    }
    pb
}

fn wait_for_enter() -> Result<(), AppError> {
    print!("\nPress Enter to exit.");
    io::stdout()
        .flush()
        .map_err(|e| AppError::new(4, format!("Failed to write to stdout: {e}")))?;
    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .map_err(|e| AppError::new(4, format!("Failed to read from stdin: {e}")))?;
    Ok(())
}
