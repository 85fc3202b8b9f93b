//! Transcoding engine: raw downloaded assets to platform-compliant stickers.
//!
//! Every sticker comes out as an exactly square WebP within its byte budget
//! (static or animated), and every pack gets one square PNG tray icon. The
//! engine never touches the filesystem or the network itself; all image work
//! goes through a [`Codec`](crate::codec::Codec).

mod config;
mod engine;
mod error;
mod inspect;
mod types;

pub use config::TranscodeConfig;
pub use engine::Transcoder;
pub use error::TranscodeError;
pub use inspect::{detect_format, png_dimensions, png_trailer_intact};
pub use types::{SourceFormat, StickerAsset, TrayAsset, TraySource, TRAY_FILENAME};
