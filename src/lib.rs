//! # rapid_docframe
//!
//! Turns decoded documents into tables and time series.
//!
//! A document is any nested tree of mappings, sequences, and scalars
//! ([`NestedValue`]). A list of column declarations says where each value
//! lives (a [selector](selector::Selector) such as `"a.b[0].c"`) and what
//! type it has. Building produces a [`Frame`]: a row-oriented [`Table`] and
//! one single-point [`TimeSeries`] per row and numeric column.
//!
//! ## Features
//!
//! - **Total**: building never fails; absent or malformed values degrade to
//!   sentinels (`NaN`, null cells, missing timestamps)
//! - **Decoders**: JSON, GraphQL responses, and CSV/TSV
//! - **Declarative**: serde query specs with a validation engine
//!
//! ```rust
//! use rapid_docframe::{build, ColumnSpec, NestedValue};
//!
//! let doc: NestedValue = serde_json::json!([
//!     { "host": "web1", "cpu": 0.5 },
//!     { "host": "web2", "cpu": 0.9 }
//! ])
//! .into();
//! let columns = vec![ColumnSpec::string("host", "Host"), ColumnSpec::number("cpu", "CPU")];
//!
//! let frame = build(&doc, None, &columns, None);
//! assert_eq!(frame.table.row_count(), 2);
//! assert_eq!(frame.series[1].target, "web2");
//! ```

pub mod coerce;
pub mod errors;
pub mod frame;
pub mod pipeline;
pub mod selector;
pub mod types;
pub mod value;

// Re-export commonly used types
pub use coerce::Cell;
pub use errors::{FramerError, Result};
pub use frame::{build, Datapoint, Frame, FrameBuilder, Table, TableColumn, TimeSeries};
pub use selector::Selector;
pub use types::{ColumnRole, ColumnSpec, ColumnType, FrameConfig};
pub use value::{Mapping, NestedValue};

pub use pipeline::error_code::ErrorCode;
pub use pipeline::errors::PipelineSpecError;
pub use pipeline::spec::QuerySpec;
pub use pipeline::validation::{ValidationEngine, ValidationReport};
pub use pipeline::{run_spec, FramePipeline};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
