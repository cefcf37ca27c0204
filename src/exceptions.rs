//! Error types for whisper

use crate::exit_codes::{
    EXIT_CONFIG_ERROR, EXIT_INTERRUPTED, EXIT_IO_ERROR, EXIT_LAYOUT_ERROR, EXIT_TOOL_ERROR,
    EXIT_TOOL_OUTPUT_ERROR,
};
use std::fmt;

/// Main error type for whisper operations
#[derive(Debug)]
pub enum WhisperError {
    /// Missing or inconsistent run configuration (e.g. no `--binary` for pack)
    Configuration(String),

    /// Source image ends before a partition's declared end
    TruncatedRead {
        partition: String,
        offset: u64,
        expected: u64,
        available: u64,
    },

    /// Processed partition file no longer fits its slot in the image
    PartitionTooLarge {
        partition: String,
        size: u64,
        actual: u64,
    },

    /// Partition table is out of order or has overlapping entries
    InvalidLayout(String),

    /// One or more external tools failed (launch error or non-zero exit)
    ExternalToolFailure(Vec<String>),

    /// An external tool printed something we could not make sense of
    UnrecognizedToolOutput(String),

    /// The run was cancelled by a signal
    Interrupted,

    /// IO error
    IoError(std::io::Error),
}

impl WhisperError {
    /// Process exit code the binary reports for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            WhisperError::Configuration(_) => EXIT_CONFIG_ERROR,
            WhisperError::TruncatedRead { .. }
            | WhisperError::PartitionTooLarge { .. }
            | WhisperError::InvalidLayout(_) => EXIT_LAYOUT_ERROR,
            WhisperError::ExternalToolFailure(_) => EXIT_TOOL_ERROR,
            WhisperError::UnrecognizedToolOutput(_) => EXIT_TOOL_OUTPUT_ERROR,
            WhisperError::Interrupted => EXIT_INTERRUPTED,
            WhisperError::IoError(_) => EXIT_IO_ERROR,
        }
    }
}

impl fmt::Display for WhisperError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WhisperError::Configuration(msg) => write!(f, "Configuration error: {msg}"),
            WhisperError::TruncatedRead {
                partition,
                offset,
                expected,
                available,
            } => write!(
                f,
                "Truncated read: partition '{partition}' needs {expected:#x} bytes at offset {offset:#x}, only {available:#x} available"
            ),
            WhisperError::PartitionTooLarge {
                partition,
                size,
                actual,
            } => write!(
                f,
                "Partition too large: '{partition}' holds at most {size:#x} bytes, file has at least {actual:#x}"
            ),
            WhisperError::InvalidLayout(msg) => write!(f, "Invalid layout: {msg}"),
            WhisperError::ExternalToolFailure(failures) => {
                write!(f, "External tool failure: {}", failures.join("; "))
            }
            WhisperError::UnrecognizedToolOutput(msg) => {
                write!(f, "Unrecognized tool output: {msg}")
            }
            WhisperError::Interrupted => write!(f, "Interrupted"),
            WhisperError::IoError(err) => write!(f, "IO error: {err}"),
        }
    }
}

impl std::error::Error for WhisperError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            WhisperError::IoError(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for WhisperError {
    fn from(err: std::io::Error) -> Self {
        WhisperError::IoError(err)
    }
}

/// Result type for whisper operations
pub type Result<T> = std::result::Result<T, WhisperError>;
