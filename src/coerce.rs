//! Type coercion from resolved values to typed cells.
//!
//! Every conversion here is total: bad input yields a sentinel [`Cell`]
//! (`Null`, NaN, `InvalidTimestamp`) instead of an error, so a table always
//! keeps one cell per declared column.
//!
//! Numeric and integer parsing follow script-runtime rules, because the
//! documents this crate reads are usually produced by (and compared against)
//! web tooling: `" 42 "` is 42, `"0x1F"` is 31, `"12px"` is NaN as a number
//! but 12 as an epoch prefix.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Serialize, Serializer};

use crate::types::{ColumnSpec, ColumnType};
use crate::value::NestedValue;

/// Largest absolute epoch-millisecond value accepted as a valid timestamp.
pub const MAX_TIMESTAMP_MILLIS: i64 = 8_640_000_000_000_000;

const ZONED_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%d %H:%M:%S%.f%z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
];

const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S%.f",
    "%m/%d/%Y %H:%M:%S",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"];

// ============================================================================
// Cell
// ============================================================================

/// One typed table cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    /// A value kept as resolved (string columns and uncoerced paths).
    Value(NestedValue),
    /// A numeric value; NaN when the input was not numeric.
    Number(f64),
    /// The empty-number sentinel.
    Null,
    /// Milliseconds since the Unix epoch.
    Timestamp(i64),
    /// The invalid-date sentinel.
    InvalidTimestamp,
}

impl Cell {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<i64> {
        match self {
            Self::Timestamp(ms) => Some(*ms),
            _ => None,
        }
    }

    pub fn as_value(&self) -> Option<&NestedValue> {
        match self {
            Self::Value(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

impl Serialize for Cell {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Value(v) => v.serialize(serializer),
            Self::Number(n) => serializer.serialize_f64(*n),
            Self::Timestamp(ms) => serializer.serialize_i64(*ms),
            Self::Null | Self::InvalidTimestamp => serializer.serialize_unit(),
        }
    }
}

// ============================================================================
// Coercion table
// ============================================================================

/// Signature shared by every entry of the coercion table. The second
/// argument is the column's optional timestamp format.
pub type CoerceFn = fn(&NestedValue, Option<&str>) -> Cell;

/// Look up the coercion for a column type.
pub fn coercer(column_type: ColumnType) -> CoerceFn {
    match column_type {
        ColumnType::String => keep_value,
        ColumnType::Number => number_cell,
        ColumnType::Timestamp => calendar_cell,
        ColumnType::TimestampEpoch => epoch_cell,
    }
}

/// Coerce a resolved value according to its column declaration.
pub fn coerce(value: &NestedValue, column: &ColumnSpec) -> Cell {
    coercer(column.column_type)(value, column.timestamp_format.as_deref())
}

fn keep_value(value: &NestedValue, _format: Option<&str>) -> Cell {
    Cell::Value(value.clone())
}

fn number_cell(value: &NestedValue, _format: Option<&str>) -> Cell {
    if value.is_empty_string() {
        Cell::Null
    } else {
        Cell::Number(to_number(value))
    }
}

fn calendar_cell(value: &NestedValue, format: Option<&str>) -> Cell {
    timestamp_cell(parse_calendar(&value.to_text(), format))
}

fn epoch_cell(value: &NestedValue, _format: Option<&str>) -> Cell {
    timestamp_cell(parse_epoch(value))
}

fn timestamp_cell(millis: Option<i64>) -> Cell {
    millis.map_or(Cell::InvalidTimestamp, Cell::Timestamp)
}

/// Epoch milliseconds for a time column value, `None` when invalid.
///
/// Non-time column types never produce a timestamp.
pub fn timestamp_millis(value: &NestedValue, column: &ColumnSpec) -> Option<i64> {
    match column.column_type {
        ColumnType::Timestamp => {
            parse_calendar(&value.to_text(), column.timestamp_format.as_deref())
        }
        ColumnType::TimestampEpoch => parse_epoch(value),
        ColumnType::String | ColumnType::Number => None,
    }
}

// ============================================================================
// Numbers
// ============================================================================

/// Numeric value of a resolved node. Never fails; non-numeric input is NaN.
///
/// Null and the empty string are 0, booleans are 0/1, sequences convert
/// through their joined text, and mappings are NaN.
pub fn to_number(value: &NestedValue) -> f64 {
    match value {
        NestedValue::Null => 0.0,
        NestedValue::Bool(b) => f64::from(u8::from(*b)),
        NestedValue::Number(n) => *n,
        NestedValue::String(s) => parse_number(s),
        NestedValue::Sequence(_) => parse_number(&value.to_text()),
        NestedValue::Mapping(_) => f64::NAN,
    }
}

/// Parse numeric text with script-runtime rules.
pub fn parse_number(text: &str) -> f64 {
    let t = text.trim();
    if t.is_empty() {
        return 0.0;
    }

    match t {
        "Infinity" | "+Infinity" => return f64::INFINITY,
        "-Infinity" => return f64::NEG_INFINITY,
        _ => {}
    }

    for (prefix, radix) in [("0x", 16), ("0X", 16), ("0o", 8), ("0O", 8), ("0b", 2), ("0B", 2)] {
        if let Some(digits) = t.strip_prefix(prefix) {
            return u64::from_str_radix(digits, radix).map_or(f64::NAN, |n| n as f64);
        }
    }

    // Rust also accepts "inf"/"nan" spellings; plain decimal syntax only.
    let decimal_only = t
        .bytes()
        .all(|b| b.is_ascii_digit() || matches!(b, b'.' | b'e' | b'E' | b'+' | b'-'));
    if !decimal_only {
        return f64::NAN;
    }
    t.parse::<f64>().unwrap_or(f64::NAN)
}

/// Leading base-10 integer of `text`, ignoring leading whitespace and any
/// trailing garbage. `None` when no digits lead the text.
pub fn parse_int_prefix(text: &str) -> Option<i64> {
    let t = text.trim_start();
    let (negative, rest) = match t.as_bytes().first() {
        Some(b'-') => (true, &t[1..]),
        Some(b'+') => (false, &t[1..]),
        _ => (false, t),
    };
    let end = rest
        .bytes()
        .position(|b| !b.is_ascii_digit())
        .unwrap_or(rest.len());
    if end == 0 {
        return None;
    }
    let magnitude = rest[..end].parse::<i64>().ok()?;
    Some(if negative { -magnitude } else { magnitude })
}

// ============================================================================
// Timestamps
// ============================================================================

/// Epoch milliseconds from an integer-like value.
pub fn parse_epoch(value: &NestedValue) -> Option<i64> {
    parse_int_prefix(&value.to_text()).filter(|ms| in_range(*ms))
}

/// Epoch milliseconds from calendar text.
///
/// A caller-supplied chrono `format` is tried first. Then RFC 3339, RFC 2822
/// and a handful of common layouts. Layouts without an offset are read as
/// UTC; a bare date is midnight UTC, as is the first day of a bare year
/// (`2023`) or year-month (`2023-11`).
pub fn parse_calendar(text: &str, format: Option<&str>) -> Option<i64> {
    let t = text.trim();
    if t.is_empty() {
        return None;
    }

    let parsed = format
        .and_then(|f| parse_with_format(t, f))
        .or_else(|| parse_default_layouts(t))?;
    in_range(parsed).then_some(parsed)
}

fn parse_with_format(text: &str, format: &str) -> Option<i64> {
    if let Ok(dt) = DateTime::parse_from_str(text, format) {
        return Some(dt.timestamp_millis());
    }
    if let Ok(ndt) = NaiveDateTime::parse_from_str(text, format) {
        return Some(ndt.and_utc().timestamp_millis());
    }
    NaiveDate::parse_from_str(text, format)
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|ndt| ndt.and_utc().timestamp_millis())
}

fn parse_default_layouts(text: &str) -> Option<i64> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.timestamp_millis());
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(text) {
        return Some(dt.timestamp_millis());
    }
    for fmt in ZONED_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(text, fmt) {
            return Some(dt.timestamp_millis());
        }
    }
    for fmt in NAIVE_DATETIME_FORMATS {
        if let Ok(ndt) = NaiveDateTime::parse_from_str(text, fmt) {
            return Some(ndt.and_utc().timestamp_millis());
        }
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
        .or_else(|| parse_partial_date(text))
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|ndt| ndt.and_utc().timestamp_millis())
}

/// `YYYY` and `YYYY-MM`: the first day of the period. chrono's format
/// parser needs a full date, so these are split by hand.
fn parse_partial_date(text: &str) -> Option<NaiveDate> {
    let (year, month) = match text.split_once('-') {
        Some((y, m)) if m.len() == 2 => (y, m),
        Some(_) => return None,
        None => (text, "01"),
    };
    let all_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    if year.len() != 4 || !all_digits(year) || !all_digits(month) {
        return None;
    }
    NaiveDate::from_ymd_opt(year.parse().ok()?, month.parse().ok()?, 1)
}

fn in_range(millis: i64) -> bool {
    millis.unsigned_abs() <= MAX_TIMESTAMP_MILLIS as u64
}
