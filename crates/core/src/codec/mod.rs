//! Codec seam for WebP image operations.
//!
//! The transcoding engine only talks to the [`Codec`] trait: probe frame
//! metadata, encode to WebP, pull a single frame out of an animation, stitch
//! frames back together, and render a PNG. [`WebpToolsCodec`] implements it
//! on top of the libwebp command line tools (`cwebp`, `dwebp`, `webpmux`);
//! tests use [`MockCodec`](crate::testing::MockCodec).
//!
//! # Example
//!
//! ```ignore
//! use packharvest_core::codec::{Codec, CodecConfig, EncodeOptions, WebpToolsCodec};
//!
//! let codec = WebpToolsCodec::new(CodecConfig::default());
//! codec.validate().await?;
//!
//! let info = codec.probe(&bytes).await?;
//! let sticker = codec.encode(&bytes, &EncodeOptions::resized(80, 512)).await?;
//! ```

mod config;
mod error;
mod traits;
mod types;
mod webp_tools;

pub use config::CodecConfig;
pub use error::CodecError;
pub use traits::Codec;
pub use types::{EncodeOptions, FrameInfo};
pub use webp_tools::{parse_webpmux_info, WebpToolsCodec};
