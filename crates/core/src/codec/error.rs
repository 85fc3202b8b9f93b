//! Error types for the codec module.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while running a codec operation.
#[derive(Debug, Error)]
pub enum CodecError {
    /// A libwebp tool binary is missing.
    #[error("{tool} not found at path: {path}")]
    ToolNotFound { tool: &'static str, path: PathBuf },

    /// The tool ran and exited unsuccessfully.
    #[error("{tool} failed: {reason}")]
    ToolFailed {
        tool: &'static str,
        reason: String,
        stderr: Option<String>,
    },

    /// The tool did not finish in time.
    #[error("{tool} timed out after {timeout_secs} seconds")]
    Timeout { tool: &'static str, timeout_secs: u64 },

    /// Probe output could not be understood.
    #[error("Failed to parse probe output: {reason}")]
    ParseError { reason: String },

    /// Caller passed something the operation cannot handle.
    #[error("Invalid input: {reason}")]
    InvalidInput { reason: String },

    /// I/O error around the scratch directory.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CodecError {
    /// Creates a tool failure with captured stderr.
    pub fn tool_failed(tool: &'static str, reason: impl Into<String>, stderr: Option<String>) -> Self {
        Self::ToolFailed {
            tool,
            reason: reason.into(),
            stderr,
        }
    }

    /// Creates a parse error.
    pub fn parse(reason: impl Into<String>) -> Self {
        Self::ParseError {
            reason: reason.into(),
        }
    }

    /// Creates an invalid input error.
    pub fn invalid_input(reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            reason: reason.into(),
        }
    }

    /// Whether this error is retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::Io(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let err = CodecError::tool_failed("cwebp", "exit status 1", Some("bad header".into()));
        assert_eq!(err.to_string(), "cwebp failed: exit status 1");

        let err = CodecError::ToolNotFound {
            tool: "webpmux",
            path: PathBuf::from("/nope/webpmux"),
        };
        assert!(err.to_string().contains("/nope/webpmux"));
    }

    #[test]
    fn test_is_retryable() {
        assert!(CodecError::Timeout {
            tool: "cwebp",
            timeout_secs: 1
        }
        .is_retryable());
        assert!(!CodecError::parse("garbage").is_retryable());
    }
}
