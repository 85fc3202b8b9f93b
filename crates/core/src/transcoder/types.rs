use serde::Serialize;

/// Object name of the tray icon inside a pack namespace.
pub const TRAY_FILENAME: &str = "tray.png";

/// Container of a downloaded source asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceFormat {
    Png,
    Webp,
}

/// One sticker after successful transcoding.
#[derive(Debug, Clone)]
pub struct StickerAsset {
    pub original_filename: String,
    /// Always the source stem with a `.webp` extension.
    pub output_filename: String,
    /// Downloaded source bytes.
    pub source: Vec<u8>,
    pub source_format: SourceFormat,
    /// Frame count detected by probing the source.
    pub frame_count: u32,
    /// Transcoded output.
    pub output: Vec<u8>,
    /// Emoji tags; never empty.
    pub emojis: Vec<String>,
    /// Whether the animated encoding path was taken.
    pub animated: bool,
    /// Quality of the attempt that fit the budget.
    pub quality: u8,
}

impl StickerAsset {
    pub fn size_bytes(&self) -> usize {
        self.output.len()
    }
}

/// How the tray was derived from the first sticker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TraySource {
    /// First frame of the animated first sticker.
    AnimatedFrame,
    /// Downscaled copy of the static first sticker's source.
    StaticCopy,
}

/// The pack's tray icon.
#[derive(Debug, Clone)]
pub struct TrayAsset {
    pub bytes: Vec<u8>,
    pub source: TraySource,
}

impl TrayAsset {
    pub fn size_bytes(&self) -> usize {
        self.bytes.len()
    }
}
