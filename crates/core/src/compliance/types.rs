use serde::{Deserialize, Serialize};
use std::fmt;

/// Why a pack failed compliance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum RejectReason {
    TooFewAssets { count: usize, min: usize },
    TooManyAssets { count: usize, max: usize },
    EmptyName,
    EmptyPublisher,
    MissingUrlPrefix,
    MissingAssets,
    UnsupportedExtension { file: String },
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooFewAssets { count, min } => {
                write!(f, "{} assets, need at least {}", count, min)
            }
            Self::TooManyAssets { count, max } => {
                write!(f, "{} assets, at most {} allowed", count, max)
            }
            Self::EmptyName => write!(f, "pack name is empty"),
            Self::EmptyPublisher => write!(f, "publisher is empty"),
            Self::MissingUrlPrefix => write!(f, "resource URL prefix is missing"),
            Self::MissingAssets => write!(f, "asset list is missing"),
            Self::UnsupportedExtension { file } => {
                write!(f, "unsupported asset extension: {}", file)
            }
        }
    }
}

/// Result of validating a single pack.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ComplianceReport {
    pub reasons: Vec<RejectReason>,
}

impl ComplianceReport {
    pub fn is_accepted(&self) -> bool {
        self.reasons.is_empty()
    }

    /// Human-readable summary, used in logs.
    pub fn summary(&self) -> String {
        self.reasons
            .iter()
            .map(|r| r.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }
}
