use thiserror::Error;

use crate::store::StoreError;
use crate::transcoder::TranscodeError;
use crate::upload::UploadError;
use crate::upstream::UpstreamError;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("No asset of the pack could be transcoded")]
    NoValidAssets,

    #[error("Tray derivation failed: {0}")]
    Tray(#[source] TranscodeError),

    #[error("Upload failed: {0}")]
    Upload(#[from] UploadError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Upstream error: {0}")]
    Upstream(#[from] UpstreamError),
}

impl PipelineError {
    /// Short label used for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NoValidAssets => "no_valid_assets",
            Self::Tray(_) => "tray",
            Self::Upload(_) => "upload",
            Self::Store(_) => "store",
            Self::Upstream(_) => "upstream",
        }
    }
}
