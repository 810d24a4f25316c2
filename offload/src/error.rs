//! Error types for the offloading pipeline

use thiserror::Error;

/// Result type alias for the offloading library
pub type Result<T> = std::result::Result<T, OffloadError>;

/// Errors surfaced to callers of the offloading pipeline.
///
/// Malformed frames and invalid boxes are not errors: they are skipped and
/// logged where they occur.
#[derive(Error, Debug)]
pub enum OffloadError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Frame {got} presented after frame {last}; frames must arrive in increasing order")]
    SequenceViolation { last: u64, got: u64 },

    #[error("Filter stage already finished; no frames accepted after epilogue")]
    StageFinished,

    #[error("Detector failed: {0}")]
    DetectorError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Evaluation error: {0}")]
    EvalError(#[from] ioueval::EvalError),
}

impl OffloadError {
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn detector<S: Into<String>>(msg: S) -> Self {
        Self::DetectorError(msg.into())
    }
}
