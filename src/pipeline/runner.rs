//! Pipeline runner: decode, narrow, and build frames.
//!
//! [`FramePipeline`] pairs a [`DocumentDecoder`] with the frame builder.
//! Calling [`FramePipeline::run`] decodes raw bytes completely, then narrows
//! the tree and builds the table and series, notifying a [`FrameObserver`]
//! at each stage boundary.
//!
//! [`run_spec`] is the one-call entry for a serialized [`QuerySpec`]: it
//! validates the spec, picks the decoder by source type, and attaches any
//! validation warnings to the resulting frame.
//!
//! # Static dispatch
//!
//! `FramePipeline` is generic over its decoder, so the common case compiles
//! to a direct call. [`decoder_for`] returns a boxed decoder when the format
//! is only known at runtime; `Box<D>` implements [`DocumentDecoder`] too.

use chrono::{DateTime, Utc};

use crate::errors::{FramerError, Result};
use crate::frame::{Frame, FrameBuilder};
use crate::pipeline::error_code::ErrorCode;
use crate::pipeline::observer::{
    FrameObserver, NoopObserver, StageClock, StageReport, StageReportBuilder, STAGE_DECODE,
    STAGE_NARROW, STAGE_SERIES, STAGE_TABLE,
};
use crate::pipeline::spec::QuerySpec;
use crate::pipeline::traits::{
    decoder_for, CsvDecoder, DocumentDecoder, GraphQlDecoder, JsonDecoder, XmlDecoder,
};
use crate::pipeline::validation::ValidationEngine;
use crate::types::FrameConfig;
use crate::value::NestedValue;

// ---------------------------------------------------------------------------
// Tracing support
// ---------------------------------------------------------------------------

/// Enter a tracing span for a frame stage. The span closes with the
/// enclosing block.
macro_rules! trace_stage {
    ($name:expr) => {
        let _span = tracing::info_span!("frame_stage", stage = $name).entered();
    };
}

// ============================================================================
// FramePipeline
// ============================================================================

/// A decoder plus the frame build stages.
#[derive(Debug, Clone, Default)]
pub struct FramePipeline<D> {
    pub decoder: D,
}

impl FramePipeline<JsonDecoder> {
    pub fn json() -> Self {
        Self::new(JsonDecoder)
    }
}

impl FramePipeline<GraphQlDecoder> {
    pub fn graphql() -> Self {
        Self::new(GraphQlDecoder)
    }
}

impl FramePipeline<CsvDecoder> {
    pub fn csv() -> Self {
        Self::new(CsvDecoder::csv())
    }

    pub fn tsv() -> Self {
        Self::new(CsvDecoder::tsv())
    }
}

impl FramePipeline<XmlDecoder> {
    pub fn xml() -> Self {
        Self::new(XmlDecoder)
    }
}

impl<D> FramePipeline<D> {
    pub fn new(decoder: D) -> Self {
        Self { decoder }
    }
}

impl<D: DocumentDecoder> FramePipeline<D> {
    /// Decode `raw` and build its frame.
    ///
    /// Stages run in order:
    /// 1. Decode (fails on malformed input)
    /// 2. Narrow to the root selector
    /// 3. Build the table
    /// 4. Build the series
    ///
    /// Only the decode stage can fail; building degrades to sentinels.
    pub fn run(
        &self,
        raw: &[u8],
        cfg: &FrameConfig,
        observer: &mut impl FrameObserver,
    ) -> Result<Frame> {
        let builder = FrameBuilder::from_config(cfg);
        self.run_with_builder(raw, &builder, observer)
    }

    /// Build the frame for an already decoded document.
    pub fn run_document(
        &self,
        doc: &NestedValue,
        cfg: &FrameConfig,
        observer: &mut impl FrameObserver,
    ) -> Frame {
        let builder = FrameBuilder::from_config(cfg);
        build_stages(doc, &builder, observer)
    }

    /// Decode and build several documents with one compiled builder.
    ///
    /// Each document gets its own result; one malformed input does not stop
    /// the rest.
    pub fn run_batch<I>(
        &self,
        docs: I,
        cfg: &FrameConfig,
        observer: &mut impl FrameObserver,
    ) -> Vec<Result<Frame>>
    where
        I: IntoIterator,
        I::Item: AsRef<[u8]>,
    {
        let builder = FrameBuilder::from_config(cfg);
        docs.into_iter()
            .map(|raw| self.run_with_builder(raw.as_ref(), &builder, observer))
            .collect()
    }

    fn run_with_builder(
        &self,
        raw: &[u8],
        builder: &FrameBuilder<'_>,
        observer: &mut impl FrameObserver,
    ) -> Result<Frame> {
        let doc = {
            trace_stage!(STAGE_DECODE);
            observer.on_stage_start(STAGE_DECODE);
            let clock = StageClock::start();
            let doc = self.decoder.decode(raw);
            let report = StageReport::new(clock.elapsed());
            observer.on_stage_end(STAGE_DECODE, &report);
            doc?
        };
        observer.on_document(&doc);
        Ok(build_stages(&doc, builder, observer))
    }
}

/// Narrow, table, and series stages shared by every entry point.
fn build_stages(
    doc: &NestedValue,
    builder: &FrameBuilder<'_>,
    observer: &mut impl FrameObserver,
) -> Frame {
    // Stage 1: Narrow
    let shape = {
        trace_stage!(STAGE_NARROW);
        observer.on_stage_start(STAGE_NARROW);
        let clock = StageClock::start();
        let shape = builder.narrow(doc);
        let report = StageReport::new(clock.elapsed());
        observer.on_stage_end(STAGE_NARROW, &report);
        shape
    };
    observer.on_shape(&shape);

    // Stage 2: Table
    let table = {
        trace_stage!(STAGE_TABLE);
        observer.on_stage_start(STAGE_TABLE);
        let clock = StageClock::start();
        let table = builder.build_table(shape);
        let report = StageReportBuilder::new(clock.elapsed())
            .rows(table.row_count())
            .build();
        observer.on_stage_end(STAGE_TABLE, &report);
        table
    };

    // Stage 3: Series
    let series = {
        trace_stage!(STAGE_SERIES);
        observer.on_stage_start(STAGE_SERIES);
        let clock = StageClock::start();
        let series = builder.build_series(shape);
        let report = StageReportBuilder::new(clock.elapsed())
            .series(series.len())
            .build();
        observer.on_stage_end(STAGE_SERIES, &report);
        series
    };

    let frame = Frame {
        name: builder.name().to_string(),
        table,
        series,
        notices: Vec::new(),
    };
    observer.on_frame(&frame);
    frame
}

// ============================================================================
// Spec entry point
// ============================================================================

/// Validate `spec`, decode its inline data, and build the frame.
///
/// Validation errors reject the spec with [`FramerError::InvalidSpec`],
/// tagged `validation_failed` and listing every error.
/// Warnings are logged and returned as frame notices. A spec without inline
/// data yields an empty frame carrying only the header.
pub fn run_spec(spec: &QuerySpec, reference_time: Option<DateTime<Utc>>) -> Result<Frame> {
    run_spec_with(&ValidationEngine::with_defaults(), spec, reference_time, &mut NoopObserver)
}

/// [`run_spec`] with a caller-supplied engine and observer.
pub fn run_spec_with(
    engine: &ValidationEngine,
    spec: &QuerySpec,
    reference_time: Option<DateTime<Utc>>,
    observer: &mut impl FrameObserver,
) -> Result<Frame> {
    let report = engine.validate(spec);
    if report.has_errors() {
        let errors = report
            .errors()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ");
        return Err(FramerError::invalid_spec(format!(
            "[{}] {errors}",
            ErrorCode::ValidationFailed
        )));
    }

    let notices: Vec<_> = report.warnings().cloned().collect();
    for notice in &notices {
        tracing::warn!(code = %notice.code, path = %notice.path, "{}", notice.message);
    }

    let mut cfg = spec.to_config()?;
    cfg.reference_time = reference_time;

    let mut frame = match &spec.data {
        Some(data) => {
            let pipeline = FramePipeline::new(decoder_for(spec.source)?);
            pipeline.run(data.as_bytes(), &cfg, observer)?
        }
        None => {
            tracing::debug!(ref_id = spec.frame_name(), "spec has no inline data");
            Frame::empty(cfg.name.clone(), &cfg.columns)
        }
    };
    frame.notices = notices;
    Ok(frame)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coerce::Cell;
    use crate::frame::Shape;
    use crate::types::ColumnSpec;

    const REFERENCE_MS: i64 = 1_700_000_000_000;

    fn cfg() -> FrameConfig {
        FrameConfig::new()
            .with_root_selector("items")
            .with_columns(vec![
                ColumnSpec::string("host", "Host"),
                ColumnSpec::number("cpu", "CPU"),
            ])
            .with_reference_millis(REFERENCE_MS)
    }

    const DOC: &[u8] = br#"{"items":[{"host":"a","cpu":1},{"host":"b","cpu":"2"}]}"#;

    #[test]
    fn test_run_builds_table_and_series() {
        let frame = FramePipeline::json().run(DOC, &cfg(), &mut NoopObserver).unwrap();
        assert_eq!(frame.name, "response");
        assert_eq!(frame.table.row_count(), 2);
        assert_eq!(frame.table.rows[1][1], Cell::Number(2.0));
        assert_eq!(frame.series.len(), 2);
        assert_eq!(frame.series[1].target, "b");
        assert_eq!(frame.series[1].datapoints[0].timestamp, Some(REFERENCE_MS));
    }

    #[test]
    fn test_run_propagates_decode_errors() {
        let err = FramePipeline::json()
            .run(b"{", &cfg(), &mut NoopObserver)
            .unwrap_err();
        assert!(err.is_decode_error());
    }

    #[test]
    fn test_run_with_timing_observer() {
        let mut obs = crate::pipeline::observer::StageTimingObserver::new();
        let _frame = FramePipeline::json().run(DOC, &cfg(), &mut obs).unwrap();

        let stage_names: Vec<&str> = obs.reports().iter().map(|(name, _)| *name).collect();
        assert_eq!(
            stage_names,
            vec![STAGE_DECODE, STAGE_NARROW, STAGE_TABLE, STAGE_SERIES]
        );
        assert_eq!(obs.reports()[2].1.rows(), Some(2));
        assert_eq!(obs.reports()[3].1.series(), Some(2));
    }

    #[test]
    fn test_decode_failure_still_reports_stage() {
        let mut obs = crate::pipeline::observer::StageTimingObserver::new();
        let _ = FramePipeline::json().run(b"nope", &cfg(), &mut obs);
        assert_eq!(obs.reports().len(), 1);
        assert_eq!(obs.reports()[0].0, STAGE_DECODE);
    }

    /// Observer that captures which artifact hooks fired.
    #[derive(Default)]
    struct ArtifactObserver {
        saw_document: bool,
        saw_rows: Option<usize>,
        saw_frame: bool,
    }

    impl FrameObserver for ArtifactObserver {
        fn on_document(&mut self, _doc: &NestedValue) {
            self.saw_document = true;
        }
        fn on_shape(&mut self, shape: &Shape<'_>) {
            if let Shape::Rows(rows) = shape {
                self.saw_rows = Some(rows.len());
            }
        }
        fn on_frame(&mut self, _frame: &Frame) {
            self.saw_frame = true;
        }
    }

    #[test]
    fn test_run_calls_artifact_hooks() {
        let mut obs = ArtifactObserver::default();
        let _frame = FramePipeline::json().run(DOC, &cfg(), &mut obs).unwrap();
        assert!(obs.saw_document, "on_document not called");
        assert_eq!(obs.saw_rows, Some(2));
        assert!(obs.saw_frame, "on_frame not called");
    }

    #[test]
    fn test_run_document_skips_decode() {
        let mut obs = crate::pipeline::observer::StageTimingObserver::new();
        let doc: NestedValue = serde_json::json!({ "items": [{ "host": "x", "cpu": 3 }] }).into();
        let frame = FramePipeline::json().run_document(&doc, &cfg(), &mut obs);
        assert_eq!(frame.table.row_count(), 1);
        assert_eq!(obs.reports()[0].0, STAGE_NARROW);
    }

    #[test]
    fn test_run_batch_isolates_failures() {
        let docs: Vec<&[u8]> = vec![DOC, &b"{"[..], &br#"{"items":[]}"#[..]];
        let frames = FramePipeline::json().run_batch(docs, &cfg(), &mut NoopObserver);
        assert_eq!(frames.len(), 3);
        assert_eq!(frames[0].as_ref().unwrap().table.row_count(), 2);
        assert!(frames[1].is_err());
        assert!(frames[2].as_ref().unwrap().table.is_empty());
    }

    #[test]
    fn test_csv_pipeline() {
        let cfg = FrameConfig::new()
            .with_columns(vec![
                ColumnSpec::string("host", "Host"),
                ColumnSpec::number("cpu", "CPU"),
            ])
            .with_reference_millis(REFERENCE_MS);
        let frame = FramePipeline::csv()
            .run(b"host,cpu\nweb,0.25\n", &cfg, &mut NoopObserver)
            .unwrap();
        assert_eq!(frame.table.rows[0][1], Cell::Number(0.25));
        assert_eq!(frame.series[0].target, "web");
    }

    // ─── run_spec ───────────────────────────────────────────────────────

    fn reference() -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(REFERENCE_MS)
    }

    #[test]
    fn test_run_spec_builds_inline_data() {
        let spec = QuerySpec::from_json(
            r#"{
                "refId": "A",
                "type": "csv",
                "columns": [
                    { "selector": "ts", "text": "Time", "type": "timestamp", "timestampFormat": "%d/%m/%Y" },
                    { "selector": "v", "text": "Value", "type": "number" }
                ],
                "data": "ts,v\n14/11/2023,3\n"
            }"#,
        )
        .unwrap();
        let frame = run_spec(&spec, reference()).unwrap();
        assert_eq!(frame.name, "A");
        assert_eq!(frame.table.rows[0][0], Cell::Timestamp(1_699_920_000_000));
        assert_eq!(frame.series[0].target, "Value");
        assert_eq!(frame.series[0].datapoints[0].timestamp, Some(1_699_920_000_000));
        assert!(frame.notices.is_empty());
    }

    #[test]
    fn test_run_spec_attaches_warnings() {
        let spec = QuerySpec::from_json(
            r#"{ "columns": [{ "selector": "a", "text": "A", "type": "guid" }], "data": "[]" }"#,
        )
        .unwrap();
        let frame = run_spec(&spec, reference()).unwrap();
        assert_eq!(frame.notices.len(), 1);
        assert_eq!(frame.notices[0].code, ErrorCode::UnknownColumnType);
    }

    #[test]
    fn test_run_spec_rejects_html_data() {
        let spec = QuerySpec::from_json(r#"{ "type": "html", "data": "<p/>" }"#).unwrap();
        let err = run_spec(&spec, None).unwrap_err();
        assert!(matches!(err, FramerError::InvalidSpec { .. }));
        assert!(err.to_string().contains("unsupported_format"));
    }

    #[test]
    fn test_run_spec_rejection_is_tagged_validation_failed() {
        let spec = QuerySpec::from_json(r#"{ "v": 9, "type": "html", "data": "<p/>" }"#).unwrap();
        let FramerError::InvalidSpec { message } = run_spec(&spec, None).unwrap_err() else {
            panic!("expected an invalid spec error");
        };
        assert!(message.starts_with("[validation_failed] "));
        assert!(message.contains("unsupported_version"));
        assert_eq!(message.matches("; ").count(), 1);
    }

    #[test]
    fn test_run_spec_decodes_inline_xml() {
        let spec = QuerySpec::from_json(
            r#"{
                "type": "xml",
                "root_selector": "rows.row",
                "columns": [
                    { "selector": "$.id", "text": "Id" },
                    { "selector": "v", "text": "V", "type": "number" }
                ],
                "data": "<rows><row id=\"a\"><v>3</v></row><row id=\"b\"><v>4.5</v></row></rows>"
            }"#,
        )
        .unwrap();
        let frame = run_spec(&spec, reference()).unwrap();
        assert_eq!(frame.table.row_count(), 2);
        assert_eq!(frame.table.rows[1][0], Cell::Value(NestedValue::from("b")));
        assert_eq!(frame.table.rows[1][1], Cell::Number(4.5));
        assert_eq!(frame.series[0].target, "a");
    }

    #[test]
    fn test_run_spec_without_data_is_header_only() {
        let spec = QuerySpec::from_json(
            r#"{ "type": "xml", "columns": [{ "selector": "a", "text": "A" }] }"#,
        )
        .unwrap();
        let frame = run_spec(&spec, None).unwrap();
        assert!(frame.table.is_empty());
        assert_eq!(frame.table.columns.len(), 1);
    }

    #[test]
    fn test_run_spec_reports_decode_errors() {
        let spec = QuerySpec::from_json(r#"{ "type": "graphql", "data": "{\"errors\":[{\"message\":\"boom\"}]}" }"#)
            .unwrap();
        let err = run_spec(&spec, None).unwrap_err();
        assert_eq!(err, FramerError::decode("graphql", "boom"));
    }
}
