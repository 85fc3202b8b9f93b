//! Output constraints for transcoded assets.

use serde::{Deserialize, Serialize};

/// Dimensions, qualities and byte budgets for transcoded output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscodeConfig {
    /// Square edge of every sticker, in pixels.
    #[serde(default = "default_sticker_dimension")]
    pub sticker_dimension: u32,

    /// Square edge of the tray icon, in pixels.
    #[serde(default = "default_tray_dimension")]
    pub tray_dimension: u32,

    /// Encoder quality for the first attempt.
    #[serde(default = "default_quality")]
    pub quality: u8,

    /// How much a static retry lowers quality.
    #[serde(default = "default_retry_quality_step")]
    pub retry_quality_step: u8,

    /// Floor for the static retry quality.
    #[serde(default = "default_min_retry_quality")]
    pub min_retry_quality: u8,

    /// Quality for the animated retry.
    #[serde(default = "default_animated_retry_quality")]
    pub animated_retry_quality: u8,

    /// Lower bound for the per-frame duration of remuxed animations.
    #[serde(default = "default_min_frame_duration_ms")]
    pub min_frame_duration_ms: u32,

    #[serde(default = "default_max_static_bytes")]
    pub max_static_bytes: usize,

    #[serde(default = "default_max_animated_bytes")]
    pub max_animated_bytes: usize,

    #[serde(default = "default_max_tray_bytes")]
    pub max_tray_bytes: usize,

    /// Sources smaller than this are treated as corrupt.
    #[serde(default = "default_min_source_bytes")]
    pub min_source_bytes: usize,
}

fn default_sticker_dimension() -> u32 {
    512
}

fn default_tray_dimension() -> u32 {
    96
}

fn default_quality() -> u8 {
    80
}

fn default_retry_quality_step() -> u8 {
    20
}

fn default_min_retry_quality() -> u8 {
    50
}

fn default_animated_retry_quality() -> u8 {
    60
}

fn default_min_frame_duration_ms() -> u32 {
    100
}

fn default_max_static_bytes() -> usize {
    100 * 1024
}

fn default_max_animated_bytes() -> usize {
    500 * 1024
}

fn default_max_tray_bytes() -> usize {
    50 * 1024
}

fn default_min_source_bytes() -> usize {
    100
}

impl Default for TranscodeConfig {
    fn default() -> Self {
        Self {
            sticker_dimension: default_sticker_dimension(),
            tray_dimension: default_tray_dimension(),
            quality: default_quality(),
            retry_quality_step: default_retry_quality_step(),
            min_retry_quality: default_min_retry_quality(),
            animated_retry_quality: default_animated_retry_quality(),
            min_frame_duration_ms: default_min_frame_duration_ms(),
            max_static_bytes: default_max_static_bytes(),
            max_animated_bytes: default_max_animated_bytes(),
            max_tray_bytes: default_max_tray_bytes(),
            min_source_bytes: default_min_source_bytes(),
        }
    }
}

impl TranscodeConfig {
    /// Quality for the single static re-encode after a budget miss.
    pub fn static_retry_quality(&self) -> u8 {
        self.quality
            .saturating_sub(self.retry_quality_step)
            .max(self.min_retry_quality)
    }

    /// Byte budget for a sticker on the given path.
    pub fn sticker_budget(&self, animated: bool) -> usize {
        if animated {
            self.max_animated_bytes
        } else {
            self.max_static_bytes
        }
    }

    /// Per-frame duration used when remuxing `frames` frames spanning `total_ms`.
    pub fn frame_duration_ms(&self, total_ms: u64, frames: u32) -> u32 {
        if frames == 0 {
            return self.min_frame_duration_ms;
        }
        let even = (total_ms / frames as u64).min(u32::MAX as u64) as u32;
        even.max(self.min_frame_duration_ms)
    }

    /// Sets the byte budgets.
    pub fn with_budgets(mut self, static_bytes: usize, animated_bytes: usize, tray_bytes: usize) -> Self {
        self.max_static_bytes = static_bytes;
        self.max_animated_bytes = animated_bytes;
        self.max_tray_bytes = tray_bytes;
        self
    }
}
