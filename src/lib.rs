//! `fx-window` library crate.
//!
//! The binary (`fx-window`) is a thin wrapper around this library so that:
//!
//! - the fetch/parse/aggregate pipeline is testable without spawning processes
//! - the fetcher can be swapped for canned snapshots in tests

pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod report;
