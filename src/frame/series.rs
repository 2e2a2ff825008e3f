//! Time-series synthesis.
//!
//! Rows are pivoted against the declared columns: every number column yields
//! one single-datapoint series per row, named from the row's string columns
//! and stamped by the first time column. Series are emitted metric-major
//! (all rows of the first number column, then the next) and are never
//! merged, even when two rows derive the same name.

use serde::ser::SerializeTuple;
use serde::{Serialize, Serializer};

use crate::coerce::{timestamp_millis, to_number};
use crate::types::ColumnRole;
use crate::value::NestedValue;

use super::{CompiledColumn, RowView};

/// A `[value, timestamp]` pair. A `None` timestamp is the invalid-date
/// sentinel and serializes as `null`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Datapoint {
    pub value: f64,
    pub timestamp: Option<i64>,
}

impl Serialize for Datapoint {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut tup = serializer.serialize_tuple(2)?;
        tup.serialize_element(&self.value)?;
        tup.serialize_element(&self.timestamp)?;
        tup.end()
    }
}

/// A named sequence of datapoints.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeSeries {
    pub target: String,
    pub datapoints: Vec<Datapoint>,
}

/// Build the series for a sequence document.
///
/// `fallback_millis` stamps every datapoint when no time column exists.
pub(crate) fn build_series(
    rows: &[NestedValue],
    columns: &[CompiledColumn<'_>],
    fallback_millis: i64,
) -> Vec<TimeSeries> {
    let metrics: Vec<&CompiledColumn<'_>> = columns
        .iter()
        .filter(|c| c.spec.role() == ColumnRole::Metric)
        .collect();
    let labels: Vec<&CompiledColumn<'_>> = columns
        .iter()
        .filter(|c| c.spec.role() == ColumnRole::Label)
        .collect();
    let time = columns.iter().find(|c| c.spec.role() == ColumnRole::Time);

    let mut out = Vec::with_capacity(metrics.len() * rows.len());
    for metric in &metrics {
        for row in rows {
            let view = RowView::of(row);

            let target = series_name(&view, &labels, metric, metrics.len());
            let timestamp = match time {
                Some(tc) => view
                    .resolve(&tc.selector)
                    .and_then(|v| timestamp_millis(v, tc.spec)),
                None => Some(fallback_millis),
            };
            let value = view.resolve(&metric.selector).map_or(f64::NAN, to_number);

            out.push(TimeSeries {
                target,
                datapoints: vec![Datapoint { value, timestamp }],
            });
        }
    }
    out
}

fn series_name(
    view: &RowView<'_>,
    labels: &[&CompiledColumn<'_>],
    metric: &CompiledColumn<'_>,
    metric_count: usize,
) -> String {
    let mut name = labels
        .iter()
        .map(|c| view.resolve(&c.selector).map(NestedValue::to_text).unwrap_or_default())
        .collect::<Vec<_>>()
        .join(" ");

    if metric_count > 1 {
        name.push(' ');
        name.push_str(&metric.spec.text);
    }
    // Checked before trimming: whitespace-only label text still counts.
    if metric_count == 1 && name.is_empty() {
        name = metric.spec.text.clone();
    }
    name.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::compile_columns;
    use crate::types::ColumnSpec;
    use serde_json::json;

    const NOW: i64 = 1_000;

    fn rows(v: serde_json::Value) -> Vec<NestedValue> {
        match NestedValue::from(v) {
            NestedValue::Sequence(items) => items,
            other => vec![other],
        }
    }

    fn names(series: &[TimeSeries]) -> Vec<&str> {
        series.iter().map(|s| s.target.as_str()).collect()
    }

    #[test]
    fn test_two_metrics_without_labels_use_metric_text() {
        let specs = vec![ColumnSpec::number("c", "cpu"), ColumnSpec::number("m", "mem")];
        let cols = compile_columns(&specs);
        let series = build_series(&rows(json!([{ "c": 1, "m": 2 }])), &cols, NOW);
        assert_eq!(names(&series), vec!["cpu", "mem"]);
        assert_eq!(series[0].datapoints[0].value, 1.0);
        assert_eq!(series[1].datapoints[0].value, 2.0);
    }

    #[test]
    fn test_single_metric_without_labels_is_named_by_metric() {
        let specs = vec![ColumnSpec::number("v", "value")];
        let cols = compile_columns(&specs);
        let series = build_series(&rows(json!([{ "v": 1 }, { "v": 2 }])), &cols, NOW);
        assert_eq!(names(&series), vec!["value", "value"]);
    }

    #[test]
    fn test_labels_join_in_column_order() {
        let specs = vec![
            ColumnSpec::string("dc", "DC"),
            ColumnSpec::number("v", "value"),
            ColumnSpec::string("host", "Host"),
        ];
        let cols = compile_columns(&specs);
        let series = build_series(
            &rows(json!([{ "dc": "eu", "host": "a", "v": 1 }])),
            &cols,
            NOW,
        );
        assert_eq!(names(&series), vec!["eu a"]);
    }

    #[test]
    fn test_labels_plus_metric_suffix_when_several_metrics() {
        let specs = vec![
            ColumnSpec::string("host", "Host"),
            ColumnSpec::number("c", "cpu"),
            ColumnSpec::number("m", "mem"),
        ];
        let cols = compile_columns(&specs);
        let series = build_series(
            &rows(json!([{ "host": "a", "c": 1, "m": 2 }, { "host": "b", "c": 3, "m": 4 }])),
            &cols,
            NOW,
        );
        // Metric-major ordering.
        assert_eq!(names(&series), vec!["a cpu", "b cpu", "a mem", "b mem"]);
    }

    #[test]
    fn test_whitespace_label_is_trimmed_to_empty() {
        let specs = vec![
            ColumnSpec::string("a", "A"),
            ColumnSpec::string("b", "B"),
            ColumnSpec::number("v", "value"),
        ];
        let cols = compile_columns(&specs);
        // Two absent labels join to " ", which is not empty before trimming.
        let series = build_series(&rows(json!([{ "v": 1 }])), &cols, NOW);
        assert_eq!(names(&series), vec![""]);
    }

    #[test]
    fn test_first_time_column_only() {
        let specs = vec![
            ColumnSpec::timestamp_epoch("t1", "T1"),
            ColumnSpec::timestamp("t2", "T2"),
            ColumnSpec::number("v", "value"),
        ];
        let cols = compile_columns(&specs);
        let series = build_series(
            &rows(json!([{ "t1": "5000", "t2": "2023-11-14", "v": 1 }])),
            &cols,
            NOW,
        );
        assert_eq!(series[0].datapoints[0].timestamp, Some(5000));
    }

    #[test]
    fn test_absent_or_bad_time_is_invalid() {
        let specs = vec![ColumnSpec::timestamp("t", "T"), ColumnSpec::number("v", "value")];
        let cols = compile_columns(&specs);
        let series = build_series(
            &rows(json!([{ "v": 1 }, { "t": "never", "v": 2 }])),
            &cols,
            NOW,
        );
        assert_eq!(series[0].datapoints[0].timestamp, None);
        assert_eq!(series[1].datapoints[0].timestamp, None);
    }

    #[test]
    fn test_fallback_time_without_time_column() {
        let specs = vec![ColumnSpec::number("v", "value")];
        let cols = compile_columns(&specs);
        let series = build_series(&rows(json!([{ "v": 1 }, { "v": 2 }])), &cols, 42);
        assert!(series.iter().all(|s| s.datapoints[0].timestamp == Some(42)));
    }

    #[test]
    fn test_absent_and_non_numeric_values_are_nan() {
        let specs = vec![ColumnSpec::number("v", "value")];
        let cols = compile_columns(&specs);
        let series = build_series(
            &rows(json!([{}, { "v": "n/a" }, { "v": "" }, "plain"])),
            &cols,
            NOW,
        );
        assert!(series[0].datapoints[0].value.is_nan());
        assert!(series[1].datapoints[0].value.is_nan());
        // An empty string is present, and numerically zero.
        assert_eq!(series[2].datapoints[0].value, 0.0);
        assert!(series[3].datapoints[0].value.is_nan());
    }

    #[test]
    fn test_no_metric_columns_no_series() {
        let specs = vec![ColumnSpec::string("host", "Host")];
        let cols = compile_columns(&specs);
        assert!(build_series(&rows(json!([{ "host": "a" }])), &cols, NOW).is_empty());
    }

    #[test]
    fn test_datapoint_serializes_as_pair() {
        let ts = TimeSeries {
            target: "cpu".into(),
            datapoints: vec![
                Datapoint { value: 1.5, timestamp: Some(10) },
                Datapoint { value: f64::NAN, timestamp: None },
            ],
        };
        assert_eq!(
            serde_json::to_string(&ts).unwrap(),
            r#"{"target":"cpu","datapoints":[[1.5,10],[null,null]]}"#
        );
    }
}
