//! Stage hooks for timing and inspecting a frame run.
//!
//! The runner calls [`FrameObserver::on_stage_start`] and
//! [`FrameObserver::on_stage_end`] around each stage, then hands the stage
//! output to the matching artifact hook. Every method has an empty default,
//! so an observer only implements what it cares about.

use std::time::{Duration, Instant};

use crate::frame::{Frame, Shape};
use crate::value::NestedValue;

/// Raw bytes decoded into a document.
pub const STAGE_DECODE: &str = "decode";
/// Root selector applied.
pub const STAGE_NARROW: &str = "narrow";
/// Table rows built.
pub const STAGE_TABLE: &str = "table";
/// Time series built.
pub const STAGE_SERIES: &str = "series";

// ============================================================================
// StageReport
// ============================================================================

/// Timing and size facts for one finished stage.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StageReport {
    duration: Duration,
    rows: Option<usize>,
    series: Option<usize>,
}

impl StageReport {
    pub fn new(duration: Duration) -> Self {
        Self {
            duration,
            rows: None,
            series: None,
        }
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn duration_ms(&self) -> f64 {
        self.duration.as_secs_f64() * 1000.0
    }

    /// Rows produced, for the table stage.
    pub fn rows(&self) -> Option<usize> {
        self.rows
    }

    /// Series produced, for the series stage.
    pub fn series(&self) -> Option<usize> {
        self.series
    }
}

/// Builder for reports that carry size facts.
#[derive(Debug, Clone, Copy)]
pub struct StageReportBuilder {
    report: StageReport,
}

impl StageReportBuilder {
    pub fn new(duration: Duration) -> Self {
        Self {
            report: StageReport::new(duration),
        }
    }

    pub fn rows(mut self, rows: usize) -> Self {
        self.report.rows = Some(rows);
        self
    }

    pub fn series(mut self, series: usize) -> Self {
        self.report.series = Some(series);
        self
    }

    pub fn build(self) -> StageReport {
        self.report
    }
}

/// Wall-clock stopwatch for one stage.
#[derive(Debug, Clone, Copy)]
pub struct StageClock {
    started: Instant,
}

impl StageClock {
    pub fn start() -> Self {
        Self {
            started: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}

// ============================================================================
// FrameObserver
// ============================================================================

/// Callbacks fired while a frame is produced.
pub trait FrameObserver {
    fn on_stage_start(&mut self, _stage: &'static str) {}

    fn on_stage_end(&mut self, _stage: &'static str, _report: &StageReport) {}

    /// The decoded document, before narrowing.
    fn on_document(&mut self, _doc: &NestedValue) {}

    /// The narrowed shape that table and series are built from.
    fn on_shape(&mut self, _shape: &Shape<'_>) {}

    /// The finished frame.
    fn on_frame(&mut self, _frame: &Frame) {}
}

/// Observer that ignores everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl FrameObserver for NoopObserver {}

/// Observer that records every stage report in order.
#[derive(Debug, Clone, Default)]
pub struct StageTimingObserver {
    reports: Vec<(&'static str, StageReport)>,
}

impl StageTimingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reports(&self) -> &[(&'static str, StageReport)] {
        &self.reports
    }

    /// Sum of all recorded stage durations.
    pub fn total(&self) -> Duration {
        self.reports.iter().map(|(_, r)| r.duration()).sum()
    }

    pub fn clear(&mut self) {
        self.reports.clear();
    }
}

impl FrameObserver for StageTimingObserver {
    fn on_stage_end(&mut self, stage: &'static str, report: &StageReport) {
        self.reports.push((stage, *report));
    }
}
