//! Validation engine for query specifications.
//!
//! The engine runs all registered [`ValidationRule`]s against a
//! [`QuerySpec`] and collects every diagnostic into a [`ValidationReport`].
//! It never short-circuits on the first error, so users see all problems at
//! once.
//!
//! Building a frame tolerates almost anything, so most findings are
//! warnings: they point at specs that will build, but probably not into what
//! the author meant.
//!
//! # Quick start
//!
//! ```rust
//! use rapid_docframe::pipeline::spec::QuerySpec;
//! use rapid_docframe::pipeline::validation::ValidationEngine;
//!
//! let spec = QuerySpec::from_json(r#"{ "columns": [{ "selector": "", "type": "number" }] }"#).unwrap();
//! let report = ValidationEngine::with_defaults().validate(&spec);
//! assert!(report.is_valid());
//! assert_eq!(report.warnings().count(), 1);
//! ```

use std::collections::HashMap;

use rustc_hash::FxHashSet;
use serde::Serialize;

use super::error_code::ErrorCode;
use super::errors::PipelineSpecError;
use super::spec::{QuerySpec, SPEC_VERSION};
use crate::types::{ColumnRole, ColumnType};

// ─── Severity ───────────────────────────────────────────────────────────────

/// Whether a diagnostic is a hard error or a soft warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Error,
    Warning,
}

// ─── Diagnostic ─────────────────────────────────────────────────────────────

/// A single validation finding, an error or warning attached to a
/// [`PipelineSpecError`] that carries the code, path, message, and hint.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationDiagnostic {
    pub severity: Severity,
    #[serde(flatten)]
    pub error: PipelineSpecError,
}

impl ValidationDiagnostic {
    pub fn error(err: PipelineSpecError) -> Self {
        Self {
            severity: Severity::Error,
            error: err,
        }
    }

    pub fn warning(err: PipelineSpecError) -> Self {
        Self {
            severity: Severity::Warning,
            error: err,
        }
    }
}

// ─── Report ─────────────────────────────────────────────────────────────────

/// Collected diagnostics from running all validation rules.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationReport {
    pub diagnostics: Vec<ValidationDiagnostic>,
}

impl ValidationReport {
    /// Iterate over error-severity diagnostics.
    pub fn errors(&self) -> impl Iterator<Item = &PipelineSpecError> {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Error)
            .map(|d| &d.error)
    }

    /// Iterate over warning-severity diagnostics.
    pub fn warnings(&self) -> impl Iterator<Item = &PipelineSpecError> {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Warning)
            .map(|d| &d.error)
    }

    /// Returns `true` if any diagnostic is an error.
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    /// Returns `true` if there are no errors (warnings are acceptable).
    pub fn is_valid(&self) -> bool {
        !self.has_errors()
    }

    /// Total number of diagnostics (errors + warnings).
    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    /// Returns `true` if there are no diagnostics at all.
    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }
}

// ─── Rule trait ─────────────────────────────────────────────────────────────

/// A single validation rule that inspects a [`QuerySpec`] and returns zero
/// or more diagnostics.
///
/// Rules are stateless and must be `Send + Sync` so they can be shared
/// across threads (e.g., in a long-lived validation engine).
pub trait ValidationRule: Send + Sync {
    /// Short, stable identifier for this rule (e.g., `"empty_selector"`).
    fn name(&self) -> &str;

    /// Inspect `spec` and return any findings.
    fn validate(&self, spec: &QuerySpec) -> Vec<ValidationDiagnostic>;
}

// ─── Engine ─────────────────────────────────────────────────────────────────

/// Runs a set of [`ValidationRule`]s against a [`QuerySpec`] and collects all
/// diagnostics into a [`ValidationReport`].
pub struct ValidationEngine {
    rules: Vec<Box<dyn ValidationRule>>,
}

impl ValidationEngine {
    /// Create an empty engine with no rules.
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    /// Create an engine pre-loaded with the default rule set.
    pub fn with_defaults() -> Self {
        let mut engine = Self::new();
        engine.add_rule(Box::new(SpecVersionRule));
        engine.add_rule(Box::new(ColumnTypeRule));
        engine.add_rule(Box::new(EmptySelectorRule));
        engine.add_rule(Box::new(DuplicateTextRule));
        engine.add_rule(Box::new(TimeColumnsRule));
        engine.add_rule(Box::new(TimestampFormatRule));
        engine.add_rule(Box::new(DecoderAvailableRule));
        engine.add_rule(Box::new(UnknownFieldsRule));
        engine
    }

    /// Register an additional rule.
    pub fn add_rule(&mut self, rule: Box<dyn ValidationRule>) {
        self.rules.push(rule);
    }

    /// Names of the registered rules, in run order.
    pub fn rule_names(&self) -> impl Iterator<Item = &str> {
        self.rules.iter().map(|r| r.name())
    }

    /// Run all rules against `spec` and return the collected report.
    pub fn validate(&self, spec: &QuerySpec) -> ValidationReport {
        let mut report = ValidationReport::default();
        for rule in &self.rules {
            report.diagnostics.extend(rule.validate(spec));
        }
        report
    }
}

impl Default for ValidationEngine {
    fn default() -> Self {
        Self::with_defaults()
    }
}

// ═══════════════════════════════════════════════════════════════════════════
//  Concrete rules
// ═══════════════════════════════════════════════════════════════════════════

// ─── 1. Spec version ────────────────────────────────────────────────────────

struct SpecVersionRule;

impl ValidationRule for SpecVersionRule {
    fn name(&self) -> &str {
        "spec_version"
    }

    fn validate(&self, spec: &QuerySpec) -> Vec<ValidationDiagnostic> {
        if spec.v == SPEC_VERSION {
            return vec![];
        }
        vec![ValidationDiagnostic::error(
            PipelineSpecError::new(
                ErrorCode::UnsupportedVersion,
                "/v",
                format!("spec version {} is not supported", spec.v),
            )
            .with_hint(format!("Set v to {SPEC_VERSION}")),
        )]
    }
}

// ─── 2. Column types outside the known set read as string ──────────────────

struct ColumnTypeRule;

impl ValidationRule for ColumnTypeRule {
    fn name(&self) -> &str {
        "unknown_column_type"
    }

    fn validate(&self, spec: &QuerySpec) -> Vec<ValidationDiagnostic> {
        spec.columns
            .iter()
            .enumerate()
            .filter(|(_, c)| !c.column_type.is_empty() && ColumnType::parse(&c.column_type).is_none())
            .map(|(idx, c)| {
                ValidationDiagnostic::warning(
                    PipelineSpecError::new(
                        ErrorCode::UnknownColumnType,
                        format!("/columns/{idx}/type"),
                        format!("unknown column type \"{}\", treated as string", c.column_type),
                    )
                    .with_hint("Use one of: string, number, timestamp, timestamp_epoch"),
                )
            })
            .collect()
    }
}

// ─── 3. Empty selectors ─────────────────────────────────────────────────────

struct EmptySelectorRule;

impl ValidationRule for EmptySelectorRule {
    fn name(&self) -> &str {
        "empty_selector"
    }

    fn validate(&self, spec: &QuerySpec) -> Vec<ValidationDiagnostic> {
        spec.columns
            .iter()
            .enumerate()
            .filter(|(_, c)| c.selector.is_empty())
            .map(|(idx, _)| {
                ValidationDiagnostic::warning(
                    PipelineSpecError::new(
                        ErrorCode::EmptySelector,
                        format!("/columns/{idx}/selector"),
                        "column selector is empty",
                    )
                    .with_hint("Set the selector to a key or path such as \"a.b.0\""),
                )
            })
            .collect()
    }
}

// ─── 4. Duplicate column text ───────────────────────────────────────────────

struct DuplicateTextRule;

impl ValidationRule for DuplicateTextRule {
    fn name(&self) -> &str {
        "duplicate_column_text"
    }

    fn validate(&self, spec: &QuerySpec) -> Vec<ValidationDiagnostic> {
        let mut seen = FxHashSet::default();
        let mut out = Vec::new();
        for (idx, c) in spec.columns.iter().enumerate() {
            if c.text.is_empty() || seen.insert(c.text.as_str()) {
                continue;
            }
            out.push(ValidationDiagnostic::warning(
                PipelineSpecError::new(
                    ErrorCode::DuplicateColumn,
                    format!("/columns/{idx}/text"),
                    format!("column text \"{}\" is used more than once", c.text),
                )
                .with_hint("Give every column a distinct text; series names may collide"),
            ));
        }
        out
    }
}

// ─── 5. Only the first time column stamps datapoints ────────────────────────

struct TimeColumnsRule;

impl ValidationRule for TimeColumnsRule {
    fn name(&self) -> &str {
        "multiple_time_columns"
    }

    fn validate(&self, spec: &QuerySpec) -> Vec<ValidationDiagnostic> {
        spec.columns
            .iter()
            .enumerate()
            .filter(|(_, c)| c.parsed_type().role() == ColumnRole::Time)
            .skip(1)
            .map(|(idx, _)| {
                ValidationDiagnostic::warning(
                    PipelineSpecError::new(
                        ErrorCode::AmbiguousTimeColumn,
                        format!("/columns/{idx}"),
                        "only the first time column stamps series datapoints",
                    )
                    .with_hint("Move the intended time column before the others"),
                )
            })
            .collect()
    }
}

// ─── 6. timestampFormat only applies to timestamp columns ───────────────────

struct TimestampFormatRule;

impl ValidationRule for TimestampFormatRule {
    fn name(&self) -> &str {
        "timestamp_format_scope"
    }

    fn validate(&self, spec: &QuerySpec) -> Vec<ValidationDiagnostic> {
        spec.columns
            .iter()
            .enumerate()
            .filter(|(_, c)| {
                c.timestamp_format.is_some() && c.parsed_type() != ColumnType::Timestamp
            })
            .map(|(idx, c)| {
                ValidationDiagnostic::warning(
                    PipelineSpecError::new(
                        ErrorCode::InvalidValue,
                        format!("/columns/{idx}/timestampFormat"),
                        format!(
                            "timestampFormat is ignored for {} columns",
                            c.parsed_type()
                        ),
                    )
                    .with_hint("Remove timestampFormat or set the type to \"timestamp\""),
                )
            })
            .collect()
    }
}

// ─── 7. Inline data needs a built-in decoder ────────────────────────────────

struct DecoderAvailableRule;

impl ValidationRule for DecoderAvailableRule {
    fn name(&self) -> &str {
        "decoder_available"
    }

    fn validate(&self, spec: &QuerySpec) -> Vec<ValidationDiagnostic> {
        if spec.data.is_none() || spec.source.has_builtin_decoder() {
            return vec![];
        }
        vec![ValidationDiagnostic::error(
            PipelineSpecError::new(
                ErrorCode::UnsupportedFormat,
                "/type",
                format!("no built-in decoder for {} documents", spec.source.as_str()),
            )
            .with_hint("Decode the document into a NestedValue and build it directly"),
        )]
    }
}

// ─── 8. Unknown fields (strict → error, non-strict → warning) ──────────────

struct UnknownFieldsRule;

impl UnknownFieldsRule {
    /// Collect unknown-field diagnostics at the given JSON pointer `path`
    /// from a `HashMap` of extra fields captured by `#[serde(flatten)]`.
    fn check_unknowns(
        path: &str,
        unknowns: &HashMap<String, serde_json::Value>,
        strict: bool,
    ) -> Vec<ValidationDiagnostic> {
        let mut keys: Vec<&String> = unknowns.keys().collect();
        keys.sort();
        keys.into_iter()
            .map(|key| {
                let diag_fn = if strict {
                    ValidationDiagnostic::error
                } else {
                    ValidationDiagnostic::warning
                };
                diag_fn(
                    PipelineSpecError::new(
                        ErrorCode::UnknownField,
                        format!("{path}/{key}"),
                        format!("unrecognized field \"{key}\""),
                    )
                    .with_hint("Check spelling or remove this field"),
                )
            })
            .collect()
    }
}

impl ValidationRule for UnknownFieldsRule {
    fn name(&self) -> &str {
        "unknown_fields"
    }

    fn validate(&self, spec: &QuerySpec) -> Vec<ValidationDiagnostic> {
        let mut out = Self::check_unknowns("", &spec.unknown_fields, spec.strict);
        for (idx, c) in spec.columns.iter().enumerate() {
            out.extend(Self::check_unknowns(
                &format!("/columns/{idx}"),
                &c.unknown_fields,
                spec.strict,
            ));
        }
        out
    }
}

// ═══════════════════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════════════════
