//! Per-asset transcoding state machine.

use std::sync::Arc;
use tracing::{debug, info, warn};

use super::config::TranscodeConfig;
use super::error::TranscodeError;
use super::inspect::{detect_format, png_dimensions, png_trailer_intact};
use super::types::{SourceFormat, StickerAsset, TrayAsset, TraySource};
use crate::codec::{Codec, EncodeOptions, FrameInfo};
use crate::pack::{emoji_tags_for, output_filename};

/// Converts downloaded sources into stickers and trays.
pub struct Transcoder {
    codec: Arc<dyn Codec>,
    config: TranscodeConfig,
}

impl Transcoder {
    pub fn new(codec: Arc<dyn Codec>, config: TranscodeConfig) -> Self {
        Self { codec, config }
    }

    pub fn config(&self) -> &TranscodeConfig {
        &self.config
    }

    /// Checks the source container and reads its frame metadata.
    ///
    /// PNG sources must end with an intact IEND chunk and are always a
    /// single frame. WebP sources are considered well-formed iff the codec
    /// can probe them.
    pub async fn inspect_source(
        &self,
        bytes: &[u8],
    ) -> Result<(SourceFormat, FrameInfo), TranscodeError> {
        if bytes.len() < self.config.min_source_bytes {
            return Err(TranscodeError::corrupt(format!(
                "{} bytes is below the {} byte minimum",
                bytes.len(),
                self.config.min_source_bytes
            )));
        }

        match detect_format(bytes) {
            Some(SourceFormat::Png) => {
                if !png_trailer_intact(bytes) {
                    return Err(TranscodeError::corrupt("PNG is truncated (no IEND trailer)"));
                }
                let (w, h) = png_dimensions(bytes).unwrap_or((0, 0));
                Ok((SourceFormat::Png, FrameInfo::still(w, h)))
            }
            Some(SourceFormat::Webp) => {
                let info = self
                    .codec
                    .probe(bytes)
                    .await
                    .map_err(|e| TranscodeError::corrupt(format!("WebP probe failed: {}", e)))?;
                Ok((SourceFormat::Webp, info))
            }
            None => Err(TranscodeError::corrupt("neither PNG nor WebP")),
        }
    }

    /// Transcodes one sticker.
    ///
    /// `claimed_animated` is the pack's discovery-time flag. The animated
    /// path is taken only when the probe also finds more than one frame;
    /// the claim itself is left untouched.
    pub async fn transcode_sticker(
        &self,
        filename: &str,
        source: Vec<u8>,
        claimed_animated: bool,
    ) -> Result<StickerAsset, TranscodeError> {
        let (source_format, info) = self.inspect_source(&source).await?;
        let animated = info.is_animated() && claimed_animated;
        let budget = self.config.sticker_budget(animated);

        debug!(
            filename,
            frames = info.frame_count,
            claimed_animated,
            animated,
            "Transcoding sticker"
        );

        let mut quality = self.config.quality;
        let mut output = self.encode(&source, &info, animated, quality).await?;

        if output.len() > budget {
            let first_size = output.len();
            quality = if animated {
                self.config.animated_retry_quality
            } else {
                self.config.static_retry_quality()
            };
            warn!(
                filename,
                size = first_size,
                budget,
                retry_quality = quality,
                "Sticker over budget, re-encoding at lower quality"
            );

            output = self.encode(&source, &info, animated, quality).await?;
            if output.len() > budget {
                return Err(TranscodeError::OverBudget {
                    size: output.len(),
                    budget,
                });
            }
            info!(filename, size = output.len(), "Sticker recompressed");
        }

        Ok(StickerAsset {
            original_filename: filename.to_string(),
            output_filename: output_filename(filename),
            source,
            source_format,
            frame_count: info.frame_count,
            output,
            emojis: emoji_tags_for(filename),
            animated,
            quality,
        })
    }

    async fn encode(
        &self,
        source: &[u8],
        info: &FrameInfo,
        animated: bool,
        quality: u8,
    ) -> Result<Vec<u8>, TranscodeError> {
        let dim = self.config.sticker_dimension;
        if !animated {
            return Ok(self
                .codec
                .encode(source, &EncodeOptions::resized(quality, dim))
                .await?);
        }

        let frame_duration = self
            .config
            .frame_duration_ms(info.total_duration_ms(), info.frame_count);

        let mut frames = Vec::with_capacity(info.frame_count as usize);
        for index in 1..=info.frame_count {
            let frame = self.codec.extract_frame(source, index).await?;
            let resized = self
                .codec
                .encode(&frame, &EncodeOptions::resized(quality, dim))
                .await?;
            frames.push(resized);
        }
        let durations = vec![frame_duration; frames.len()];

        Ok(self.codec.remux(&frames, &durations).await?)
    }

    /// Builds the pack's tray icon from its first valid sticker.
    ///
    /// Animated packs use frame 1 of the already transcoded sticker. Static
    /// packs downscale the original source, going through WebP first when
    /// the source was a PNG. A tray over budget is not retried.
    pub async fn derive_tray(&self, first: &StickerAsset) -> Result<TrayAsset, TranscodeError> {
        let dim = self.config.tray_dimension;

        let (webp, source) = if first.animated {
            let frame = self.codec.extract_frame(&first.output, 1).await?;
            (frame, TraySource::AnimatedFrame)
        } else {
            let webp = match first.source_format {
                SourceFormat::Png => {
                    self.codec
                        .encode(&first.source, &EncodeOptions::keep_size(self.config.quality))
                        .await?
                }
                SourceFormat::Webp => first.source.clone(),
            };
            (webp, TraySource::StaticCopy)
        };

        let bytes = self.codec.to_png(&webp, dim).await?;
        if bytes.len() > self.config.max_tray_bytes {
            return Err(TranscodeError::TrayOverBudget {
                size: bytes.len(),
                budget: self.config.max_tray_bytes,
            });
        }

        Ok(TrayAsset { bytes, source })
    }
}
