//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - rate observations and raw snapshots (`RateRecord`, `RawSnapshot`)
//! - per-date pipeline outcomes (`DayOutcome`)
//! - run configuration (`RunConfig`, `FetchConfig`, `TieBreak`)
//! - the date window generator (`date_window`)

pub mod types;
pub mod window;

pub use types::*;
pub use window::date_window;
