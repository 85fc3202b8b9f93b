use thiserror::Error;

use crate::codec::CodecError;

/// Per-asset and per-tray transcoding failures.
#[derive(Debug, Error)]
pub enum TranscodeError {
    /// The downloaded source is not a well-formed PNG or WebP.
    #[error("Corrupt source: {reason}")]
    CorruptSource { reason: String },

    /// An encode, mux or decode tool failed.
    #[error("Codec failure: {0}")]
    Codec(#[from] CodecError),

    /// Output still over budget after the reduced-quality retry.
    #[error("Output is {size} bytes, budget is {budget} bytes")]
    OverBudget { size: usize, budget: usize },

    /// Tray icon over its budget. Trays are not retried.
    #[error("Tray is {size} bytes, budget is {budget} bytes")]
    TrayOverBudget { size: usize, budget: usize },
}

impl TranscodeError {
    pub fn corrupt(reason: impl Into<String>) -> Self {
        Self::CorruptSource {
            reason: reason.into(),
        }
    }

    /// Short label used for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::CorruptSource { .. } => "corrupt",
            Self::Codec(_) => "codec",
            Self::OverBudget { .. } => "over_budget",
            Self::TrayOverBudget { .. } => "tray_over_budget",
        }
    }
}
