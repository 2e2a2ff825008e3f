//! Stable, machine-readable error codes.
//!
//! Codes serialize as snake_case strings and never change meaning once
//! published, so hosts can match on them.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// A field the schema does not recognize.
    UnknownField,
    /// A value outside its allowed set or range.
    InvalidValue,
    /// The spec version is not supported.
    UnsupportedVersion,
    /// A column type name outside the known set.
    UnknownColumnType,
    /// Two columns share the same display text.
    DuplicateColumn,
    /// More than one time column is declared.
    AmbiguousTimeColumn,
    /// A column selector is empty.
    EmptySelector,
    /// The source type has no built-in decoder.
    UnsupportedFormat,
    /// Catch-all for a spec rejected as a whole.
    ValidationFailed,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UnknownField => "unknown_field",
            Self::InvalidValue => "invalid_value",
            Self::UnsupportedVersion => "unsupported_version",
            Self::UnknownColumnType => "unknown_column_type",
            Self::DuplicateColumn => "duplicate_column",
            Self::AmbiguousTimeColumn => "ambiguous_time_column",
            Self::EmptySelector => "empty_selector",
            Self::UnsupportedFormat => "unsupported_format",
            Self::ValidationFailed => "validation_failed",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
