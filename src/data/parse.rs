//! Snapshot parsing: XML document -> `RateRecord`s.
//!
//! The document looks like:
//!
//! ```xml
//! <ValCurs Date="15.01.2024" name="Foreign Currency Market">
//!   <Valute ID="R01239">
//!     <NumCode>978</NumCode>
//!     <CharCode>EUR</CharCode>
//!     <Nominal>1</Nominal>
//!     <Name>Euro</Name>
//!     <Value>93,4409</Value>
//!     <VunitRate>93,4409</VunitRate>
//!   </Valute>
//! </ValCurs>
//! ```
//!
//! Only `Name` and `VunitRate` are read; if a field repeats, the first one wins.
//! Bad entries are dropped one by one. A document that is not well-formed XML
//! yields no records.

use std::borrow::Cow;

use chrono::NaiveDate;
use quick_xml::Reader;
use quick_xml::events::Event;

use crate::domain::{Payload, RateRecord, RawSnapshot};
use crate::error::DayFailure;

/// `<ValCurs>` is depth 1, each `<Valute>` depth 2, its fields depth 3.
const ENTRY_DEPTH: usize = 2;
const FIELD_DEPTH: usize = ENTRY_DEPTH + 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Name,
    UnitRate,
}

impl Field {
    fn from_tag(tag: &[u8]) -> Option<Self> {
        match tag {
            b"Name" => Some(Field::Name),
            b"VunitRate" => Some(Field::UnitRate),
            _ => None,
        }
    }
}

/// Content of one field inside an entry.
#[derive(Debug, Default)]
enum Slot {
    #[default]
    Unset,
    Text(String),
    /// Held markup instead of plain text.
    Bad,
}

impl Slot {
    fn into_text(self) -> Option<String> {
        match self {
            Slot::Text(text) => Some(text),
            Slot::Unset | Slot::Bad => None,
        }
    }
}

#[derive(Debug, Default)]
struct Entry {
    name: Slot,
    unit_rate: Slot,
}

impl Entry {
    fn slot(&mut self, field: Field) -> &mut Slot {
        match field {
            Field::Name => &mut self.name,
            Field::UnitRate => &mut self.unit_rate,
        }
    }
}

/// The field currently being read. Only the first occurrence of a field is
/// captured; repeats are skipped.
#[derive(Debug, Clone, Copy)]
struct OpenField {
    field: Field,
    capture: bool,
}

/// Records contained in `snapshot`; empty for an absent or unreadable snapshot.
pub fn parse(snapshot: &RawSnapshot) -> Vec<RateRecord> {
    parse_snapshot(snapshot).unwrap_or_default()
}

/// Like [`parse`], but says why a snapshot produced nothing.
pub fn parse_snapshot(snapshot: &RawSnapshot) -> Result<Vec<RateRecord>, DayFailure> {
    let text = match &snapshot.payload {
        Payload::Body(text) => text,
        Payload::Absent(reason) => return Err(DayFailure::Fetch(reason.clone())),
    };

    let records = parse_document(text, snapshot.date)?;
    if records.is_empty() {
        return Err(DayFailure::Empty);
    }
    Ok(records)
}

fn parse_document(text: &str, date: NaiveDate) -> Result<Vec<RateRecord>, DayFailure> {
    let entries = read_entries(text)?;

    let total = entries.len();
    let records: Vec<RateRecord> = entries
        .into_iter()
        .filter_map(|entry| entry_to_record(entry, date))
        .collect();

    if records.len() < total {
        log::debug!("{date}: dropped {} of {total} entries", total - records.len());
    }
    Ok(records)
}

/// Collect the `<Valute>` children of the root element.
///
/// Only broken XML fails the whole document. An entry whose fields hold
/// unexpected markup is still returned, with those fields marked bad.
fn read_entries(text: &str) -> Result<Vec<Entry>, DayFailure> {
    let mut reader = Reader::from_str(text);
    let mut depth = 0usize;
    let mut saw_root = false;
    let mut entries = Vec::new();
    let mut entry: Option<Entry> = None;
    let mut open: Option<OpenField> = None;

    loop {
        match reader.read_event().map_err(malformed)? {
            Event::Start(tag) => {
                depth += 1;
                saw_root = true;
                open_element(tag.local_name().as_ref(), depth, &mut entry, &mut open);
            }
            Event::Empty(tag) => {
                saw_root = true;
                open_element(tag.local_name().as_ref(), depth + 1, &mut entry, &mut open);
                close_element(depth + 1, &mut entries, &mut entry, &mut open);
            }
            Event::End(_) => {
                close_element(depth, &mut entries, &mut entry, &mut open);
                depth = depth.saturating_sub(1);
            }
            Event::Text(t) if depth == FIELD_DEPTH => {
                let text = t.unescape().map_err(malformed)?;
                append_text(&text, &mut entry, open);
            }
            Event::CData(c) if depth == FIELD_DEPTH => match std::str::from_utf8(&c) {
                Ok(text) => append_text(text, &mut entry, open),
                Err(e) => return Err(malformed(e)),
            },
            Event::Eof => break,
            _ => {}
        }
    }

    if depth != 0 {
        return Err(malformed("document ended inside an element"));
    }
    if !saw_root {
        return Err(malformed("no root element"));
    }
    Ok(entries)
}

fn malformed(err: impl std::fmt::Display) -> DayFailure {
    DayFailure::Malformed(err.to_string())
}

/// Handle an element that opens at `depth`.
fn open_element(tag: &[u8], depth: usize, entry: &mut Option<Entry>, open: &mut Option<OpenField>) {
    if entry.is_none() {
        if depth == ENTRY_DEPTH && tag == b"Valute" {
            *entry = Some(Entry::default());
        }
        return;
    }
    let Some(current) = entry.as_mut() else {
        return;
    };

    if let Some(field) = *open {
        if field.capture && depth > FIELD_DEPTH {
            *current.slot(field.field) = Slot::Bad;
        }
        return;
    }

    if depth == FIELD_DEPTH {
        if let Some(field) = Field::from_tag(tag) {
            let slot = current.slot(field);
            let capture = matches!(slot, Slot::Unset);
            if capture {
                *slot = Slot::Text(String::new());
            }
            *open = Some(OpenField { field, capture });
        }
    }
}

/// Handle an element that closes at `depth`.
fn close_element(
    depth: usize,
    entries: &mut Vec<Entry>,
    entry: &mut Option<Entry>,
    open: &mut Option<OpenField>,
) {
    if depth == FIELD_DEPTH {
        *open = None;
    } else if depth == ENTRY_DEPTH {
        if let Some(done) = entry.take() {
            entries.push(done);
        }
    }
}

fn append_text(text: &str, entry: &mut Option<Entry>, open: Option<OpenField>) {
    let (Some(current), Some(field)) = (entry.as_mut(), open) else {
        return;
    };
    if !field.capture {
        return;
    }
    if let Slot::Text(buf) = current.slot(field.field) {
        buf.push_str(text);
    }
}

fn entry_to_record(entry: Entry, date: NaiveDate) -> Option<RateRecord> {
    let name = entry.name.into_text()?;
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    let value = parse_decimal(&entry.unit_rate.into_text()?)?;
    RateRecord::new(date, name, value)
}

/// Parse a rate written with a comma decimal separator (`93,4409`).
///
/// A value already using a point passes through untouched. More than one
/// separator is rejected.
pub fn parse_decimal(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    let normalized: Cow<'_, str> = match (trimmed.matches(',').count(), trimmed.contains('.')) {
        (0, _) => Cow::Borrowed(trimmed),
        (1, false) => Cow::Owned(trimmed.replacen(',', ".", 1)),
        _ => return None,
    };
    let v = normalized.parse::<f64>().ok()?;
    if v.is_finite() { Some(v) } else { None }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FetchFailure;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()
    }

    #[test]
    fn absent_snapshot_parses_to_nothing() {
        let snapshot = RawSnapshot::absent(day(), FetchFailure::Timeout);
        assert!(parse(&snapshot).is_empty());
        assert_eq!(
            parse_snapshot(&snapshot),
            Err(DayFailure::Fetch(FetchFailure::Timeout))
        );
    }

    #[test]
    fn single_entry_with_comma_separator() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<ValCurs Date="15.01.2024" name="Foreign Currency Market">
  <Valute ID="R01239">
    <NumCode>978</NumCode>
    <CharCode>EUR</CharCode>
    <Nominal>1</Nominal>
    <Name>Euro</Name>
    <Value>93,4409</Value>
    <VunitRate>93,4409</VunitRate>
  </Valute>
</ValCurs>"#;
        let records = parse(&RawSnapshot::body(day(), xml));
        assert_eq!(records, vec![RateRecord::new(day(), "Euro", 93.4409).unwrap()]);
    }

    #[test]
    fn entry_missing_rate_is_dropped() {
        let xml = "<ValCurs>\
            <Valute><Name>Euro</Name><VunitRate>93,4409</VunitRate></Valute>\
            <Valute><Name>US Dollar</Name><Value>89,6883</Value></Valute>\
            </ValCurs>";
        let records = parse(&RawSnapshot::body(day(), xml));
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].series_name(), "Euro");
    }

    #[test]
    fn entries_with_bad_name_or_rate_are_dropped() {
        let xml = "<ValCurs>\
            <Valute><VunitRate>1,0</VunitRate></Valute>\
            <Valute><Name>Yen</Name><VunitRate>n/a</VunitRate></Valute>\
            <Valute><Name>Won</Name><VunitRate>0</VunitRate></Valute>\
            <Valute><Name>Pound</Name><VunitRate>113,7251</VunitRate></Valute>\
            </ValCurs>";
        let records = parse(&RawSnapshot::body(day(), xml));
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].series_name(), "Pound");
        assert!((records[0].value() - 113.7251).abs() < 1e-12);
    }

    #[test]
    fn markup_inside_a_field_drops_only_that_entry() {
        let xml = "<ValCurs>\
            <Valute><Name><b>x</b></Name><VunitRate>1,0</VunitRate></Valute>\
            <Valute><Name>B</Name><VunitRate>2,0</VunitRate></Valute>\
            <Valute><Name>C</Name><VunitRate>3,<i/>0</VunitRate></Valute>\
            </ValCurs>";
        let records = parse_snapshot(&RawSnapshot::body(day(), xml)).unwrap();
        assert_eq!(records, vec![RateRecord::new(day(), "B", 2.0).unwrap()]);
    }

    #[test]
    fn repeated_field_keeps_the_first_occurrence() {
        let xml = "<ValCurs>\
            <Valute><Name>Euro</Name><Name>Other</Name><VunitRate>93,4409</VunitRate></Valute>\
            <Valute><Name>Yuan</Name><VunitRate>12,5</VunitRate><VunitRate>x</VunitRate></Valute>\
            </ValCurs>";
        let records = parse_snapshot(&RawSnapshot::body(day(), xml)).unwrap();
        assert_eq!(
            records,
            vec![
                RateRecord::new(day(), "Euro", 93.4409).unwrap(),
                RateRecord::new(day(), "Yuan", 12.5).unwrap(),
            ]
        );
    }

    #[test]
    fn markup_in_ignored_fields_is_harmless() {
        let xml = "<ValCurs>\
            <Valute ID=\"R01239\"><CharCode><x>EUR</x></CharCode><Name>Euro</Name>\
            <Nominal/><VunitRate><![CDATA[93,4409]]></VunitRate></Valute>\
            </ValCurs>";
        let records = parse(&RawSnapshot::body(day(), xml));
        assert_eq!(records, vec![RateRecord::new(day(), "Euro", 93.4409).unwrap()]);
    }

    #[test]
    fn unreadable_document_yields_nothing() {
        for text in ["", "not xml at all", "<ValCurs><Valute><Name>Euro</Name>"] {
            let snapshot = RawSnapshot::body(day(), text);
            assert!(parse(&snapshot).is_empty(), "{text:?}");
            assert!(parse_snapshot(&snapshot).is_err(), "{text:?}");
        }
    }

    #[test]
    fn document_without_entries_is_reported_empty() {
        let snapshot = RawSnapshot::body(day(), "<ValCurs Date=\"15.01.2024\"></ValCurs>");
        assert_eq!(parse_snapshot(&snapshot), Err(DayFailure::Empty));
    }

    #[test]
    fn decimal_normalization_is_applied_once() {
        assert_eq!(parse_decimal("93,4409"), Some(93.4409));
        assert_eq!(parse_decimal(" 93,4409 "), Some(93.4409));
        assert_eq!(parse_decimal("93.4409"), Some(93.4409));
        assert_eq!(parse_decimal("1,234,5"), None);
        assert_eq!(parse_decimal("1.234,5"), None);
        assert_eq!(parse_decimal(""), None);
        assert_eq!(parse_decimal("inf"), None);
    }
}
