use crate::compliance::RejectReason;

use super::PipelineError;

/// Why a pack was not ingested without being an error.
#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    /// Already committed, or already attempted this run.
    Duplicate,
    /// Failed compliance validation.
    Rejected(Vec<RejectReason>),
    /// Fewer valid assets than the minimum survived transcoding.
    TooFewAssets { valid: usize },
}

impl SkipReason {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Duplicate => "duplicate",
            Self::Rejected(_) => "rejected",
            Self::TooFewAssets { .. } => "too_few_assets",
        }
    }
}

/// Result of running one pack through the pipeline.
#[derive(Debug)]
pub enum PackOutcome {
    Committed { assets: usize, failed_assets: usize },
    Skipped(SkipReason),
    Failed(PipelineError),
}

impl PackOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Committed { .. } => "committed",
            Self::Skipped(reason) => reason.label(),
            Self::Failed(_) => "failed",
        }
    }

    pub fn is_committed(&self) -> bool {
        matches!(self, Self::Committed { .. })
    }
}

/// Per-asset counters gathered while processing one pack.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AssetTally {
    pub downloads: usize,
    pub transcoded: usize,
    pub failed: usize,
}

/// A pack outcome with its asset counters.
#[derive(Debug)]
pub struct PackReport {
    pub identifier: String,
    pub outcome: PackOutcome,
    pub tally: AssetTally,
}
