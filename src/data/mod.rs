//! Remote rates source: fetching and parsing daily snapshots.

pub mod cbr;
pub mod parse;

pub use cbr::{CbrClient, QUOTE_CURRENCY, wire_date};
pub use parse::{parse, parse_snapshot};
