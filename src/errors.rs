//! Error types for rapid_docframe
//!
//! Building a frame never fails: absent values and coercion failures degrade
//! to sentinels. Errors only arise at the fallible edges around the builder:
//! decoding raw bytes, choosing a decoder, and accepting a query spec.

use thiserror::Error;

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, FramerError>;

/// Main error type for rapid_docframe
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FramerError {
    /// Raw input could not be decoded into a document tree
    #[error("Failed to decode {format} document: {message}")]
    Decode { format: String, message: String },

    /// No built-in decoder exists for the requested source type
    #[error("Unsupported format: {format}")]
    UnsupportedFormat { format: String },

    /// The query spec has validation errors
    #[error("Invalid spec: {message}")]
    InvalidSpec { message: String },

    /// Configuration validation failed
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// JSON serialization/deserialization error
    #[error("Serialization error: {message}")]
    Serialization { message: String },
}

impl FramerError {
    /// Create a decode error
    pub fn decode(format: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            format: format.into(),
            message: message.into(),
        }
    }

    /// Create an unsupported format error
    pub fn unsupported_format(format: impl Into<String>) -> Self {
        Self::UnsupportedFormat {
            format: format.into(),
        }
    }

    /// Create an invalid spec error
    pub fn invalid_spec(message: impl Into<String>) -> Self {
        Self::InvalidSpec {
            message: message.into(),
        }
    }

    /// Create an invalid config error
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Create a serialization error
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    /// Check if this error came from decoding the input bytes
    pub fn is_decode_error(&self) -> bool {
        matches!(self, Self::Decode { .. })
    }
}

impl From<serde_json::Error> for FramerError {
    fn from(err: serde_json::Error) -> Self {
        Self::serialization(err.to_string())
    }
}
