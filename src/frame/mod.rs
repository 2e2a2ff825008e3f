//! Document-to-frame conversion.
//!
//! [`FrameBuilder`] turns one decoded document into a [`Frame`]: a [`Table`]
//! (always) and a list of [`TimeSeries`] (only for sequence documents).
//!
//! 1. **Narrow** to `root_selector`, when set. An absent root produces an
//!    empty table and no series.
//! 2. **Dispatch** on shape: a sequence builds coerced rows plus series;
//!    anything else builds one raw row.
//!
//! Building is pure and infallible. Compile the builder once and reuse it
//! across documents; it holds no per-call state.

pub mod series;
pub mod table;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::coerce::{coercer, CoerceFn};
use crate::pipeline::errors::PipelineSpecError;
use crate::selector::Selector;
use crate::types::{ColumnSpec, FrameConfig, DEFAULT_FRAME_NAME};
use crate::value::NestedValue;

pub use series::{Datapoint, TimeSeries};
pub use table::{Table, TableColumn};

// ============================================================================
// Frame: the build output
// ============================================================================

/// A named table plus its derived time series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Frame {
    pub name: String,
    pub table: Table,
    pub series: Vec<TimeSeries>,
    /// Non-fatal findings about the query that produced this frame.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub notices: Vec<PipelineSpecError>,
}

impl Frame {
    /// An empty frame with only the table header.
    pub fn empty(name: impl Into<String>, columns: &[ColumnSpec]) -> Self {
        let compiled = compile_columns(columns);
        Self {
            name: name.into(),
            table: Table::with_header(&compiled),
            series: Vec::new(),
            notices: Vec::new(),
        }
    }
}

// ============================================================================
// Compiled columns and row views
// ============================================================================

/// A column declaration with its selector parsed and coercion looked up.
#[derive(Debug, Clone)]
pub(crate) struct CompiledColumn<'a> {
    pub(crate) spec: &'a ColumnSpec,
    pub(crate) selector: Selector,
    pub(crate) coerce: CoerceFn,
}

pub(crate) fn compile_columns(columns: &[ColumnSpec]) -> Vec<CompiledColumn<'_>> {
    columns
        .iter()
        .map(|spec| CompiledColumn {
            spec,
            selector: Selector::parse(&spec.selector),
            coerce: coercer(spec.column_type),
        })
        .collect()
}

/// How a sequence element is read.
#[derive(Debug, Clone, Copy)]
pub(crate) enum RowView<'a> {
    /// A plain value rather than a record.
    Scalar(&'a NestedValue),
    /// A mapping; selectors resolve against it.
    Record(&'a NestedValue),
    /// A nested sequence; every selector is absent.
    Opaque,
}

impl<'a> RowView<'a> {
    pub(crate) fn of(row: &'a NestedValue) -> Self {
        match row {
            NestedValue::Mapping(_) => Self::Record(row),
            NestedValue::Sequence(_) => {
                tracing::debug!("sequence row treated as a record with no values");
                Self::Opaque
            }
            _ => Self::Scalar(row),
        }
    }

    pub(crate) fn resolve(&self, selector: &Selector) -> Option<&'a NestedValue> {
        match self {
            Self::Scalar(v) | Self::Record(v) => selector.resolve(v),
            Self::Opaque => None,
        }
    }

    pub(crate) fn resolve_or_empty(&self, selector: &Selector) -> NestedValue {
        self.resolve(selector)
            .cloned()
            .unwrap_or_else(|| NestedValue::String(String::new()))
    }
}

// ============================================================================
// FrameBuilder
// ============================================================================

/// The document shape after root narrowing.
#[derive(Debug, Clone, Copy)]
pub enum Shape<'d> {
    /// The root selector did not resolve.
    Absent,
    /// A sequence of rows.
    Rows(&'d [NestedValue]),
    /// Anything else, read as one record.
    Single(&'d NestedValue),
}

/// Reusable builder compiled from a [`FrameConfig`].
#[derive(Debug, Clone)]
pub struct FrameBuilder<'a> {
    name: String,
    root: Option<Selector>,
    columns: Vec<CompiledColumn<'a>>,
    reference_time: Option<DateTime<Utc>>,
}

impl<'a> FrameBuilder<'a> {
    pub fn new(columns: &'a [ColumnSpec]) -> Self {
        Self {
            name: DEFAULT_FRAME_NAME.to_string(),
            root: None,
            columns: compile_columns(columns),
            reference_time: None,
        }
    }

    pub fn from_config(cfg: &'a FrameConfig) -> Self {
        let mut builder = Self::new(&cfg.columns).with_name(cfg.name.clone());
        builder.root = cfg.effective_root_selector().map(Selector::parse);
        builder.reference_time = cfg.reference_time;
        builder
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Narrow documents to `selector` before building. Empty means none.
    pub fn with_root_selector(mut self, selector: &str) -> Self {
        self.root = (!selector.is_empty()).then(|| Selector::parse(selector));
        self
    }

    pub fn with_reference_time(mut self, time: Option<DateTime<Utc>>) -> Self {
        self.reference_time = time;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Apply root narrowing and classify the result.
    pub fn narrow<'d>(&self, doc: &'d NestedValue) -> Shape<'d> {
        let target = match &self.root {
            Some(root) => match root.resolve(doc) {
                Some(v) => v,
                None => {
                    tracing::debug!(root = root.as_str(), "root selector did not resolve");
                    return Shape::Absent;
                }
            },
            None => doc,
        };
        match target {
            NestedValue::Sequence(rows) => Shape::Rows(rows),
            other => Shape::Single(other),
        }
    }

    /// Build the table for an already narrowed document.
    pub fn build_table(&self, shape: Shape<'_>) -> Table {
        let mut out = Table::with_header(&self.columns);
        match shape {
            Shape::Absent => {}
            Shape::Rows(rows) => out.rows = table::sequence_rows(rows, &self.columns),
            Shape::Single(doc) => {
                tracing::debug!("document is not a sequence, building a single row");
                out.rows.push(table::single_row(doc, &self.columns));
            }
        }
        out
    }

    /// Build the series for an already narrowed document. Only sequences
    /// produce series.
    pub fn build_series(&self, shape: Shape<'_>) -> Vec<TimeSeries> {
        match shape {
            Shape::Rows(rows) => {
                // Sampled once so every fallback datapoint shares one instant.
                let fallback = self.reference_time.unwrap_or_else(Utc::now);
                series::build_series(rows, &self.columns, fallback.timestamp_millis())
            }
            Shape::Absent | Shape::Single(_) => Vec::new(),
        }
    }

    /// Build the full frame for one document.
    pub fn build(&self, doc: &NestedValue) -> Frame {
        let shape = self.narrow(doc);
        Frame {
            name: self.name.clone(),
            table: self.build_table(shape),
            series: self.build_series(shape),
            notices: Vec::new(),
        }
    }
}

/// One-shot build: narrow `doc`, then produce its table and series.
pub fn build(
    doc: &NestedValue,
    root_selector: Option<&str>,
    columns: &[ColumnSpec],
    reference_time: Option<DateTime<Utc>>,
) -> Frame {
    FrameBuilder::new(columns)
        .with_root_selector(root_selector.unwrap_or(""))
        .with_reference_time(reference_time)
        .build(doc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coerce::Cell;
    use serde_json::json;

    fn reference() -> DateTime<Utc> {
        DateTime::from_timestamp_millis(1_700_000_000_000).unwrap()
    }

    fn doc() -> NestedValue {
        json!({
            "data": {
                "servers": [
                    { "name": "a", "load": "0.5" },
                    { "name": "b", "load": "0.7" }
                ]
            }
        })
        .into()
    }

    fn columns() -> Vec<ColumnSpec> {
        vec![
            ColumnSpec::string("name", "Server"),
            ColumnSpec::number("load", "Load"),
        ]
    }

    #[test]
    fn test_root_narrowing_to_sequence() {
        let cols = columns();
        let frame = build(&doc(), Some("data.servers"), &cols, Some(reference()));
        assert_eq!(frame.name, "response");
        assert_eq!(frame.table.row_count(), 2);
        assert_eq!(frame.table.rows[1][1], Cell::Number(0.7));
        assert_eq!(frame.series.len(), 2);
        assert_eq!(frame.series[0].target, "a");
        assert_eq!(frame.series[0].datapoints[0].timestamp, Some(1_700_000_000_000));
    }

    #[test]
    fn test_absent_root_yields_empty_frame() {
        let cols = columns();
        let frame = build(&doc(), Some("data.missing"), &cols, None);
        assert!(frame.table.is_empty());
        assert_eq!(frame.table.columns.len(), 2);
        assert!(frame.series.is_empty());
    }

    #[test]
    fn test_record_builds_single_raw_row() {
        let cols = columns();
        let frame = build(&doc(), Some("data.servers.0"), &cols, None);
        assert_eq!(frame.table.row_count(), 1);
        // No coercion on the single-record path.
        assert_eq!(frame.table.rows[0][1], Cell::Value("0.5".into()));
        assert!(frame.series.is_empty());
    }

    #[test]
    fn test_empty_root_selector_means_no_narrowing() {
        let cols = columns();
        let seq: NestedValue = json!([{ "name": "x", "load": 1 }]).into();
        let frame = build(&seq, Some(""), &cols, Some(reference()));
        assert_eq!(frame.table.row_count(), 1);
        assert_eq!(frame.series.len(), 1);
    }

    #[test]
    fn test_builder_from_config_is_reusable() {
        let cfg = FrameConfig::new()
            .with_name("A")
            .with_root_selector("data.servers")
            .with_columns(columns())
            .with_reference_time(reference());
        let builder = FrameBuilder::from_config(&cfg);
        let first = builder.build(&doc());
        let second = builder.build(&doc());
        assert_eq!(first.name, "A");
        assert_eq!(first, second);
    }

    #[test]
    fn test_null_document_is_single_row() {
        let cols = columns();
        let frame = build(&NestedValue::Null, None, &cols, None);
        assert_eq!(
            frame.table.rows,
            vec![vec![Cell::Value("".into()), Cell::Value("".into())]]
        );
    }

    #[test]
    fn test_empty_frame_has_header_only() {
        let frame = Frame::empty("B", &columns());
        assert_eq!(frame.name, "B");
        assert!(frame.table.is_empty());
        assert_eq!(frame.table.columns[0].text, "Server");
    }
}
