//! Query specification types.
//!
//! A [`QuerySpec`] is the serialized form of one query: which decoder to use,
//! where the rows live, which columns to extract, and optionally the raw
//! document itself. These types are the input to the
//! [`super::validation::ValidationEngine`] and map onto a [`FrameConfig`].
//!
//! # JSON shape
//!
//! ```json
//! {
//!   "v": 1,
//!   "refId": "A",
//!   "type": "json",
//!   "root_selector": "data.items",
//!   "columns": [
//!     { "selector": "ts", "text": "Time", "type": "timestamp_epoch" },
//!     { "selector": "host", "text": "Host", "type": "string" },
//!     { "selector": "cpu", "text": "CPU", "type": "number" }
//!   ],
//!   "data": "{\"data\":{\"items\":[]}}",
//!   "strict": false
//! }
//! ```

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::errors::{FramerError, Result};
use crate::types::{ColumnSpec, ColumnType, FrameConfig, DEFAULT_FRAME_NAME};

/// The only spec version understood by this crate.
pub const SPEC_VERSION: u32 = 1;

fn default_version() -> u32 {
    SPEC_VERSION
}

/// Top-level query specification (v1).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuerySpec {
    /// Spec version (currently `1`).
    #[serde(default = "default_version")]
    pub v: u32,

    /// Reference id; becomes the frame name.
    #[serde(rename = "refId", default, skip_serializing_if = "Option::is_none")]
    pub ref_id: Option<String>,

    /// Source format of `data`.
    #[serde(rename = "type", default)]
    pub source: SourceType,

    /// Path to the rows inside the decoded document. Empty means none.
    #[serde(default)]
    pub root_selector: String,

    #[serde(default)]
    pub columns: Vec<ColumnEntry>,

    /// Inline raw document.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,

    /// If `true`, unrecognized fields are errors; if `false`, warnings.
    #[serde(default)]
    pub strict: bool,

    /// Captures any fields not recognized by the schema.
    /// Used by the strict-mode validation rule.
    #[serde(flatten)]
    pub unknown_fields: HashMap<String, serde_json::Value>,
}

/// One column as written in a spec. The type stays a raw string here so the
/// validator can report names outside the known set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ColumnEntry {
    #[serde(default)]
    pub selector: String,

    #[serde(default)]
    pub text: String,

    #[serde(rename = "type", default)]
    pub column_type: String,

    #[serde(rename = "timestampFormat", default, skip_serializing_if = "Option::is_none")]
    pub timestamp_format: Option<String>,

    #[serde(flatten)]
    pub unknown_fields: HashMap<String, serde_json::Value>,
}

impl ColumnEntry {
    /// The parsed column type; unknown or missing names read as `string`.
    pub fn parsed_type(&self) -> ColumnType {
        ColumnType::parse(&self.column_type).unwrap_or_default()
    }

    pub fn to_column_spec(&self) -> ColumnSpec {
        ColumnSpec {
            selector: self.selector.clone(),
            text: self.text.clone(),
            column_type: self.parsed_type(),
            timestamp_format: self.timestamp_format.clone(),
        }
    }
}

/// Format of the raw document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    #[default]
    Json,
    GraphQl,
    Csv,
    Tsv,
    Xml,
    Html,
}

impl SourceType {
    /// Returns the user-facing name used in JSON and error messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::GraphQl => "graphql",
            Self::Csv => "csv",
            Self::Tsv => "tsv",
            Self::Xml => "xml",
            Self::Html => "html",
        }
    }

    /// Whether this crate ships a decoder for the format.
    pub fn has_builtin_decoder(&self) -> bool {
        !matches!(self, Self::Html)
    }
}

impl QuerySpec {
    /// Parse a spec from JSON text.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// The frame name: the reference id, or the default name.
    pub fn frame_name(&self) -> &str {
        self.ref_id
            .as_deref()
            .filter(|id| !id.is_empty())
            .unwrap_or(DEFAULT_FRAME_NAME)
    }

    /// Map the spec onto a validated [`FrameConfig`].
    pub fn to_config(&self) -> Result<FrameConfig> {
        if self.v != SPEC_VERSION {
            return Err(FramerError::invalid_config(format!(
                "unsupported spec version {}, expected {SPEC_VERSION}",
                self.v
            )));
        }

        let mut cfg = FrameConfig::new()
            .with_name(self.frame_name())
            .with_columns(self.columns.iter().map(ColumnEntry::to_column_spec).collect());
        if !self.root_selector.is_empty() {
            cfg = cfg.with_root_selector(self.root_selector.clone());
        }
        cfg.validate()?;
        Ok(cfg)
    }
}
