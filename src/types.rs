//! Core types for rapid_docframe
//!
//! Column declarations, their roles, and the per-invocation [`FrameConfig`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::{FramerError, Result};

/// Frame name used when a query carries no reference id.
pub const DEFAULT_FRAME_NAME: &str = "response";

// ============================================================================
// ColumnType / ColumnRole
// ============================================================================

/// Declared type of a column.
///
/// Unrecognized names map to [`ColumnType::String`], the pass-through type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ColumnType {
    #[default]
    String,
    Number,
    /// Calendar date/time text.
    Timestamp,
    /// Integer milliseconds since the Unix epoch.
    TimestampEpoch,
}

impl ColumnType {
    /// Parse a type name. Returns `None` for names outside the known set.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "string" => Some(Self::String),
            "number" => Some(Self::Number),
            "timestamp" => Some(Self::Timestamp),
            "timestamp_epoch" => Some(Self::TimestampEpoch),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Timestamp => "timestamp",
            Self::TimestampEpoch => "timestamp_epoch",
        }
    }

    /// The role this column plays when pivoting rows into time series.
    pub fn role(&self) -> ColumnRole {
        match self {
            Self::String => ColumnRole::Label,
            Self::Number => ColumnRole::Metric,
            Self::Timestamp | Self::TimestampEpoch => ColumnRole::Time,
        }
    }
}

impl From<String> for ColumnType {
    fn from(name: String) -> Self {
        Self::parse(&name).unwrap_or_default()
    }
}

impl From<ColumnType> for String {
    fn from(t: ColumnType) -> Self {
        t.as_str().to_string()
    }
}

impl std::fmt::Display for ColumnType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Role of a column in time-series synthesis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnRole {
    /// String columns: contribute to the series name.
    Label,
    /// Number columns: each one yields a series per row.
    Metric,
    /// Timestamp columns: the first one stamps each datapoint.
    Time,
}

// ============================================================================
// ColumnSpec
// ============================================================================

/// A single column declaration: where to find the value and how to type it.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ColumnSpec {
    /// Path selector evaluated against each row.
    pub selector: String,
    /// Display name; also the series suffix for number columns.
    #[serde(default)]
    pub text: String,
    #[serde(rename = "type", default)]
    pub column_type: ColumnType,
    /// Optional chrono format tried first for `timestamp` columns.
    #[serde(
        rename = "timestampFormat",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub timestamp_format: Option<String>,
}

impl ColumnSpec {
    pub fn new(selector: impl Into<String>, text: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            selector: selector.into(),
            text: text.into(),
            column_type,
            timestamp_format: None,
        }
    }

    pub fn string(selector: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(selector, text, ColumnType::String)
    }

    pub fn number(selector: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(selector, text, ColumnType::Number)
    }

    pub fn timestamp(selector: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(selector, text, ColumnType::Timestamp)
    }

    pub fn timestamp_epoch(selector: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(selector, text, ColumnType::TimestampEpoch)
    }

    /// Set a chrono format string for calendar timestamp parsing.
    pub fn with_timestamp_format(mut self, format: impl Into<String>) -> Self {
        self.timestamp_format = Some(format.into());
        self
    }

    pub fn role(&self) -> ColumnRole {
        self.column_type.role()
    }
}

// ============================================================================
// FrameConfig
// ============================================================================

/// Everything one build invocation needs besides the document itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameConfig {
    /// Name of the produced frame.
    pub name: String,
    /// Narrow the document to this path before building. Empty means none.
    #[serde(default)]
    pub root_selector: Option<String>,
    /// Ordered column declarations.
    #[serde(default)]
    pub columns: Vec<ColumnSpec>,
    /// Datapoint time when no time column exists. Defaults to "now".
    #[serde(default)]
    pub reference_time: Option<DateTime<Utc>>,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_FRAME_NAME.to_string(),
            root_selector: None,
            columns: Vec::new(),
            reference_time: None,
        }
    }
}

impl FrameConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_root_selector(mut self, selector: impl Into<String>) -> Self {
        self.root_selector = Some(selector.into());
        self
    }

    pub fn with_columns(mut self, columns: Vec<ColumnSpec>) -> Self {
        self.columns = columns;
        self
    }

    pub fn with_column(mut self, column: ColumnSpec) -> Self {
        self.columns.push(column);
        self
    }

    pub fn with_reference_time(mut self, time: DateTime<Utc>) -> Self {
        self.reference_time = Some(time);
        self
    }

    /// Set the reference time from epoch milliseconds. Out-of-range values
    /// leave the reference time unset.
    pub fn with_reference_millis(mut self, millis: i64) -> Self {
        self.reference_time = DateTime::from_timestamp_millis(millis);
        self
    }

    /// The root selector, if one is set and non-empty.
    pub fn effective_root_selector(&self) -> Option<&str> {
        self.root_selector.as_deref().filter(|s| !s.is_empty())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(FramerError::invalid_config("frame name must not be empty"));
        }

        for (idx, col) in self.columns.iter().enumerate() {
            if matches!(col.timestamp_format.as_deref(), Some(f) if f.trim().is_empty()) {
                return Err(FramerError::invalid_config(format!(
                    "columns[{idx}]: timestamp_format must not be empty when set"
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_type_parse_and_roles() {
        assert_eq!(ColumnType::parse("number"), Some(ColumnType::Number));
        assert_eq!(ColumnType::parse("bogus"), None);
        assert_eq!(ColumnType::from("bogus".to_string()), ColumnType::String);
        assert_eq!(ColumnType::Timestamp.role(), ColumnRole::Time);
        assert_eq!(ColumnType::TimestampEpoch.role(), ColumnRole::Time);
        assert_eq!(ColumnType::Number.role(), ColumnRole::Metric);
        assert_eq!(ColumnType::String.role(), ColumnRole::Label);
    }

    #[test]
    fn test_column_spec_json_shape() {
        let col: ColumnSpec = serde_json::from_str(
            r#"{ "selector": "ts", "text": "Time", "type": "timestamp", "timestampFormat": "%d/%m/%Y" }"#,
        )
        .unwrap();
        assert_eq!(col.column_type, ColumnType::Timestamp);
        assert_eq!(col.timestamp_format.as_deref(), Some("%d/%m/%Y"));

        let value = serde_json::to_value(ColumnSpec::number("v", "Value")).unwrap();
        assert_eq!(value["type"], "number");
        assert!(value.get("timestampFormat").is_none());
    }

    #[test]
    fn test_unknown_type_defaults_to_string() {
        let col: ColumnSpec =
            serde_json::from_str(r#"{ "selector": "a", "type": "guid" }"#).unwrap();
        assert_eq!(col.column_type, ColumnType::String);
        assert_eq!(col.text, "");
    }

    #[test]
    fn test_config_builder() {
        let cfg = FrameConfig::new()
            .with_name("A")
            .with_root_selector("data.items")
            .with_column(ColumnSpec::string("host", "Host"))
            .with_reference_millis(1_700_000_000_000);
        assert_eq!(cfg.name, "A");
        assert_eq!(cfg.effective_root_selector(), Some("data.items"));
        assert_eq!(cfg.columns.len(), 1);
        assert_eq!(
            cfg.reference_time.map(|t| t.timestamp_millis()),
            Some(1_700_000_000_000)
        );
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_empty_root_selector_is_ignored() {
        let cfg = FrameConfig::new().with_root_selector("");
        assert_eq!(cfg.effective_root_selector(), None);
    }

    #[test]
    fn test_config_validation() {
        assert!(FrameConfig::default().validate().is_ok());
        let err = FrameConfig::new().with_name("  ").validate().unwrap_err();
        assert!(err.to_string().contains("frame name"));

        let err = FrameConfig::new()
            .with_column(ColumnSpec::timestamp("ts", "Time").with_timestamp_format(""))
            .validate()
            .unwrap_err();
        assert!(err.to_string().contains("columns[0]"));
    }
}
