//! Error types for the animation models

use serde::{Deserialize, Serialize};

/// Error type for model mutations, persistence and loading
#[derive(thiserror::Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum AnimError {
    /// Track, frame, panel or position index outside the valid range
    #[error("{what} {index} is out of range (length {len})")]
    OutOfRange {
        what: String,
        index: usize,
        len: usize,
    },

    /// Attempt to delete the only remaining track
    #[error("cannot delete the last remaining track")]
    LastTrack,

    /// Framerate that is not a positive finite number
    #[error("Invalid framerate: {framerate}")]
    InvalidFramerate { framerate: f64 },

    /// Proxy ratio outside (0, 1]
    #[error("Invalid proxy ratio: {ratio}")]
    InvalidProxyRatio { ratio: f64 },

    /// Malformed document or unexpected element
    #[error("Parse error: {reason}")]
    Parse { reason: String },

    /// Document describes the other animation variant
    #[error("Unknown animation type: {found}")]
    UnknownAnimationType { found: String },

    /// Allocation failure while building panels or caches
    #[error("Out of memory while allocating {what}")]
    OutOfMemory { what: String },
}

impl AnimError {
    pub fn out_of_range(what: impl Into<String>, index: usize, len: usize) -> Self {
        Self::OutOfRange {
            what: what.into(),
            index,
            len,
        }
    }

    pub fn parse(reason: impl Into<String>) -> Self {
        Self::Parse {
            reason: reason.into(),
        }
    }

    /// Check if this is a recoverable error
    #[inline]
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::OutOfMemory { .. })
    }

    /// Get error category for logging
    #[inline]
    pub fn category(&self) -> &'static str {
        match self {
            Self::OutOfRange { .. } | Self::LastTrack => "range",
            Self::InvalidFramerate { .. } | Self::InvalidProxyRatio { .. } => "validation",
            Self::Parse { .. } | Self::UnknownAnimationType { .. } => "parse",
            Self::OutOfMemory { .. } => "resource",
        }
    }
}

impl From<quick_xml::Error> for AnimError {
    fn from(err: quick_xml::Error) -> Self {
        Self::Parse {
            reason: err.to_string(),
        }
    }
}

impl From<std::collections::TryReserveError> for AnimError {
    fn from(err: std::collections::TryReserveError) -> Self {
        Self::OutOfMemory {
            what: err.to_string(),
        }
    }
}

/// Result type for model operations
pub type Result<T> = std::result::Result<T, AnimError>;
