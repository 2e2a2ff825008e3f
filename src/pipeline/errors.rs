//! Spec diagnostics.
//!
//! [`PipelineSpecError`] describes one problem found in a query spec before
//! anything is decoded or built. It carries a stable [`ErrorCode`] for
//! programmatic matching, a JSON pointer `path` into the spec, a
//! human-readable `message`, and an optional `hint` suggesting a fix.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::error_code::ErrorCode;

/// A validation finding for a query spec.
///
/// # Display format
///
/// ```text
/// [duplicate_column] /columns/2/text: column text "cpu" is used more than once
/// ```
///
/// # JSON format
///
/// ```json
/// {
///   "code": "duplicate_column",
///   "path": "/columns/2/text",
///   "message": "column text \"cpu\" is used more than once",
///   "hint": "Give every column a distinct text"
/// }
/// ```
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("[{code}] {path}: {message}")]
pub struct PipelineSpecError {
    /// Stable error code for programmatic matching.
    pub code: ErrorCode,

    /// JSON pointer into the spec identifying the problematic location.
    ///
    /// Examples: `"/columns/0/type"`, `"/type"`, `""` (root).
    pub path: String,

    /// Human-readable description of the problem.
    pub message: String,

    /// Optional suggestion for how to fix the problem.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl PipelineSpecError {
    /// Create a new spec error.
    pub fn new(code: ErrorCode, path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code,
            path: path.into(),
            message: message.into(),
            hint: None,
        }
    }

    /// Attach a hint suggesting how to fix the problem.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}
