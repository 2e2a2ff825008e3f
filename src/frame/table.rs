//! Table construction.
//!
//! A sequence document yields one row per element with coerced cells; any
//! other document yields a single row of raw resolved values.

use serde::Serialize;

use crate::coerce::Cell;
use crate::types::ColumnType;
use crate::value::NestedValue;

use super::{CompiledColumn, RowView};

/// Header entry for one table column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableColumn {
    pub text: String,
    #[serde(rename = "type")]
    pub column_type: ColumnType,
}

/// Row-oriented table aligned to the column declarations.
///
/// Invariant: every row holds exactly `columns.len()` cells.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Table {
    pub columns: Vec<TableColumn>,
    pub rows: Vec<Vec<Cell>>,
}

impl Table {
    /// An empty table carrying only the header.
    pub(crate) fn with_header(columns: &[CompiledColumn<'_>]) -> Self {
        Self {
            columns: columns
                .iter()
                .map(|c| TableColumn {
                    text: c.spec.text.clone(),
                    column_type: c.spec.column_type,
                })
                .collect(),
            rows: Vec::new(),
        }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Cells of column `idx`, top to bottom.
    pub fn column(&self, idx: usize) -> impl Iterator<Item = &Cell> {
        self.rows.iter().filter_map(move |row| row.get(idx))
    }
}

/// One coerced row per sequence element.
pub(crate) fn sequence_rows(rows: &[NestedValue], columns: &[CompiledColumn<'_>]) -> Vec<Vec<Cell>> {
    rows.iter()
        .map(|r| match RowView::of(r) {
            // Plain values fill every cell unmodified.
            RowView::Scalar(v) => vec![Cell::Value(v.clone()); columns.len()],
            view => columns
                .iter()
                .map(|c| {
                    let value = view.resolve_or_empty(&c.selector);
                    (c.coerce)(&value, c.spec.timestamp_format.as_deref())
                })
                .collect(),
        })
        .collect()
}

/// The single row of a non-sequence document, uncoerced.
pub(crate) fn single_row(doc: &NestedValue, columns: &[CompiledColumn<'_>]) -> Vec<Cell> {
    columns
        .iter()
        .map(|c| Cell::Value(c.selector.resolve_or(doc, NestedValue::String(String::new()))))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::compile_columns;
    use crate::types::ColumnSpec;
    use serde_json::json;

    fn columns() -> Vec<ColumnSpec> {
        vec![
            ColumnSpec::string("host", "Host"),
            ColumnSpec::number("cpu", "CPU"),
            ColumnSpec::timestamp_epoch("ts", "Time"),
        ]
    }

    #[test]
    fn test_sequence_rows_coerce_cells() {
        let specs = columns();
        let cols = compile_columns(&specs);
        let doc: NestedValue = json!([
            { "host": "a", "cpu": "12", "ts": "1700000000000" },
            { "host": "b", "cpu": "" }
        ])
        .into();
        let rows = sequence_rows(doc.as_sequence().unwrap(), &cols);
        assert_eq!(rows.len(), 2);
        assert_eq!(
            rows[0],
            vec![
                Cell::Value("a".into()),
                Cell::Number(12.0),
                Cell::Timestamp(1_700_000_000_000)
            ]
        );
        assert_eq!(
            rows[1],
            vec![Cell::Value("b".into()), Cell::Null, Cell::InvalidTimestamp]
        );
    }

    #[test]
    fn test_scalar_rows_repeat_the_value() {
        let specs = columns();
        let cols = compile_columns(&specs);
        let doc: NestedValue = json!(["x", 5]).into();
        let rows = sequence_rows(doc.as_sequence().unwrap(), &cols);
        assert_eq!(rows[0], vec![Cell::Value("x".into()); 3]);
        assert_eq!(rows[1], vec![Cell::Value(NestedValue::Number(5.0)); 3]);
    }

    #[test]
    fn test_sequence_rows_resolve_as_absent() {
        let specs = columns();
        let cols = compile_columns(&specs);
        let doc: NestedValue = json!([["a", 1]]).into();
        let rows = sequence_rows(doc.as_sequence().unwrap(), &cols);
        assert_eq!(
            rows[0],
            vec![Cell::Value("".into()), Cell::Null, Cell::InvalidTimestamp]
        );
    }

    #[test]
    fn test_single_row_is_raw() {
        let specs = columns();
        let cols = compile_columns(&specs);
        let doc: NestedValue = json!({ "host": "a", "cpu": "12" }).into();
        let row = single_row(&doc, &cols);
        assert_eq!(
            row,
            vec![
                Cell::Value("a".into()),
                Cell::Value("12".into()),
                Cell::Value("".into())
            ]
        );
    }

    #[test]
    fn test_table_column_access() {
        let specs = columns();
        let cols = compile_columns(&specs);
        let mut table = Table::with_header(&cols);
        assert!(table.is_empty());
        table.rows.push(vec![Cell::Null; 3]);
        assert_eq!(table.row_count(), 1);
        assert_eq!(table.column(1).count(), 1);
        assert_eq!(table.columns[2].column_type, ColumnType::TimestampEpoch);
    }
}
