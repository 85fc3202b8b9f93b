use thiserror::Error;

use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("failed to prepare namespace for {pack}: {source}")]
    Namespace { pack: String, source: StoreError },

    #[error("failed to upload {path}: {source}")]
    Asset { path: String, source: StoreError },

    #[error("failed to create pack record for {pack}: {source}")]
    PackRecord { pack: String, source: StoreError },
}

impl UploadError {
    /// The step that failed, for logs and metrics.
    pub fn step(&self) -> &'static str {
        match self {
            Self::Namespace { .. } => "namespace",
            Self::Asset { .. } => "asset",
            Self::PackRecord { .. } => "pack_record",
        }
    }
}
