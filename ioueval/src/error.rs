//! Error types for the evaluation library

use thiserror::Error;

/// Result type alias for the evaluation library
pub type Result<T> = std::result::Result<T, EvalError>;

/// Errors that can occur while reading, evaluating or writing boxes
#[derive(Error, Debug)]
pub enum EvalError {
    #[error("Parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl EvalError {
    pub fn parse<S: Into<String>>(line: usize, msg: S) -> Self {
        Self::Parse {
            line,
            message: msg.into(),
        }
    }

    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::ConfigError(msg.into())
    }
}
