use serde::{Deserialize, Serialize};

/// Result of an asset write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    Uploaded { url: String },
    /// The object was already there; nothing was written.
    AlreadyPresent { url: String },
}

impl UploadOutcome {
    pub fn url(&self) -> &str {
        match self {
            Self::Uploaded { url } | Self::AlreadyPresent { url } => url,
        }
    }

    pub fn was_written(&self) -> bool {
        matches!(self, Self::Uploaded { .. })
    }
}

/// Metadata row for a committed pack.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackRecord {
    pub identifier: String,
    pub name: String,
    pub publisher: String,
    /// Discovery-time claim, stored as announced.
    pub is_animated: bool,
    pub lang: String,
    pub tray_image_file: String,
    pub sticker_count: usize,
}

/// Metadata row for one sticker of a committed pack.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StickerRecord {
    /// Record id returned by `create_pack_record`.
    pub pack_record_id: String,
    pub pack_identifier: String,
    /// Output filename inside the pack namespace.
    pub name: String,
    pub emojis: Vec<String>,
    pub size_bytes: usize,
}

/// Totals reported by the stats command.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    pub packs: u64,
    pub animated_packs: u64,
    pub stickers: u64,
}
