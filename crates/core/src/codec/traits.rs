//! Trait definitions for the codec module.

use async_trait::async_trait;

use super::error::CodecError;
use super::types::{EncodeOptions, FrameInfo};

/// Image operations needed to produce platform-compliant stickers.
///
/// Every method takes and returns whole in-memory images. Implementations
/// must not leave files behind once a call returns, successfully or not.
#[async_trait]
pub trait Codec: Send + Sync {
    /// Returns the name of this codec implementation.
    fn name(&self) -> &str;

    /// Reads frame count, canvas size and frame durations of a WebP image.
    async fn probe(&self, bytes: &[u8]) -> Result<FrameInfo, CodecError>;

    /// Encodes a still image (WebP, PNG or GIF input) to WebP.
    async fn encode(&self, bytes: &[u8], options: &EncodeOptions) -> Result<Vec<u8>, CodecError>;

    /// Extracts frame `index` (1-based) of an animated WebP as a still WebP.
    async fn extract_frame(&self, bytes: &[u8], index: u32) -> Result<Vec<u8>, CodecError>;

    /// Muxes still WebP frames into a looping animated WebP.
    ///
    /// `durations_ms` must have one entry per frame.
    async fn remux(&self, frames: &[Vec<u8>], durations_ms: &[u32]) -> Result<Vec<u8>, CodecError>;

    /// Decodes a WebP image to a square PNG of the given size.
    async fn to_png(&self, webp: &[u8], dimension: u32) -> Result<Vec<u8>, CodecError>;

    /// Validates that the codec is properly configured and ready.
    async fn validate(&self) -> Result<(), CodecError>;
}
