//! Testing utilities and mock implementations.
//!
//! This module provides mock implementations of every external seam of the
//! pipeline, so the whole harvest loop can run in tests without the network,
//! the libwebp tools or a real store.
//!
//! # Example
//!
//! ```rust,ignore
//! use packharvest_core::testing::{fixtures, MockCodec, MockPackStore, MockStickerApi};
//!
//! let api = MockStickerApi::new();
//! let store = MockPackStore::new();
//!
//! // Configure upstream pages and existing packs
//! api.set_search_page("memes", 0, vec![fixtures::pack("A", 3)]).await;
//! store.seed_pack("B").await;
//!
//! // Build a PipelineDriver with them...
//! ```

mod mock_codec;
mod mock_pack_store;
mod mock_sticker_api;

pub use mock_codec::{CodecCall, CodecOp, MockCodec};
pub use mock_pack_store::{MockPackStore, StoreOp};
pub use mock_sticker_api::{ApiCall, MockStickerApi};

/// Test fixtures and helper functions.
pub mod fixtures {
    use crate::codec::FrameInfo;
    use crate::pack::{emoji_tags_for, output_filename, Pack, PackSource};
    use crate::transcoder::{SourceFormat, StickerAsset, TrayAsset, TraySource};

    const PNG_SIGNATURE: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
    const PNG_IEND: [u8; 12] = [
        0x00, 0x00, 0x00, 0x00, 0x49, 0x45, 0x4E, 0x44, 0xAE, 0x42, 0x60, 0x82,
    ];

    /// A valid pack with `assets` WebP files named `0.webp`, `1.webp`, ...
    pub fn pack(identifier: &str, assets: usize) -> Pack {
        Pack {
            identifier: identifier.to_string(),
            name: format!("Pack {}", identifier),
            publisher: "tester".to_string(),
            locale: "pt-BR".to_string(),
            is_animated: false,
            resource_url_prefix: Some(format!("https://cdn.test/{}/", identifier)),
            resource_files: (0..assets).map(|i| format!("{}.webp", i)).collect(),
            source: PackSource::Search {
                keyword: "memes".to_string(),
                page: 0,
            },
        }
    }

    /// A well-formed 512x512 PNG of exactly `len` bytes (at least 45).
    pub fn png_bytes(len: usize) -> Vec<u8> {
        let mut bytes = PNG_SIGNATURE.to_vec();
        bytes.extend_from_slice(&13u32.to_be_bytes());
        bytes.extend_from_slice(b"IHDR");
        bytes.extend_from_slice(&512u32.to_be_bytes());
        bytes.extend_from_slice(&512u32.to_be_bytes());
        bytes.extend_from_slice(&[8, 6, 0, 0, 0]);
        let body = len.saturating_sub(bytes.len() + PNG_IEND.len());
        bytes.extend(std::iter::repeat(0u8).take(body));
        bytes.extend_from_slice(&PNG_IEND);
        bytes
    }

    /// A RIFF/WEBP container of exactly `len` bytes (at least 12).
    pub fn webp_bytes(len: usize) -> Vec<u8> {
        let len = len.max(12);
        let mut bytes = b"RIFF".to_vec();
        bytes.extend_from_slice(&((len - 8) as u32).to_le_bytes());
        bytes.extend_from_slice(b"WEBP");
        bytes.resize(len, 0);
        bytes
    }

    /// Probe result of an animation with evenly split duration.
    pub fn animated_info(frames: u32, total_ms: u32) -> FrameInfo {
        let each = total_ms / frames.max(1);
        FrameInfo {
            frame_count: frames,
            width: 512,
            height: 512,
            frame_durations_ms: vec![each; frames as usize],
        }
    }

    /// A static sticker as the transcoder would produce it.
    pub fn sticker_asset(filename: &str) -> StickerAsset {
        StickerAsset {
            original_filename: filename.to_string(),
            output_filename: output_filename(filename),
            source: webp_bytes(4_000),
            source_format: SourceFormat::Webp,
            frame_count: 1,
            output: vec![b'E'; 10_000],
            emojis: emoji_tags_for(filename),
            animated: false,
            quality: 80,
        }
    }

    pub fn tray_asset() -> TrayAsset {
        TrayAsset {
            bytes: vec![b'P'; 8_000],
            source: TraySource::StaticCopy,
        }
    }
}
