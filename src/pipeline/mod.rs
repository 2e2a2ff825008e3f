//! Query specs, validation, decoding, and execution.
//!
//! ## Submodules
//!
//! - [`spec`]: serde shape of one query
//! - [`validation`]: advisory checks over a spec
//! - [`traits`]: document decoders (JSON, GraphQL, CSV/TSV, XML)
//! - [`runner`]: decode-then-build orchestration
//! - [`observer`]: stage timing and inspection hooks

pub mod error_code;
pub mod errors;
pub mod observer;
pub mod runner;
pub mod spec;
pub mod traits;
pub mod validation;

pub use observer::{FrameObserver, NoopObserver, StageReport, StageTimingObserver};
pub use runner::{run_spec, run_spec_with, FramePipeline};
pub use spec::{ColumnEntry, QuerySpec, SourceType};
pub use traits::{
    decoder_for, CsvDecoder, DocumentDecoder, GraphQlDecoder, JsonDecoder, XmlDecoder,
};
