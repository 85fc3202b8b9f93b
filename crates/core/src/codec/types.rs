//! Types exchanged with a [`Codec`](super::Codec).

use serde::{Deserialize, Serialize};

/// Frame metadata returned by a probe.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameInfo {
    /// Number of frames; 1 for still images.
    pub frame_count: u32,
    pub width: u32,
    pub height: u32,
    /// Per-frame display durations in milliseconds (empty for stills).
    pub frame_durations_ms: Vec<u32>,
}

impl FrameInfo {
    /// A single still frame of the given size.
    pub fn still(width: u32, height: u32) -> Self {
        Self {
            frame_count: 1,
            width,
            height,
            frame_durations_ms: Vec::new(),
        }
    }

    pub fn is_animated(&self) -> bool {
        self.frame_count > 1
    }

    /// Sum of all frame durations.
    pub fn total_duration_ms(&self) -> u64 {
        self.frame_durations_ms.iter().map(|d| *d as u64).sum()
    }
}

/// Options for a WebP encode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodeOptions {
    /// Encoder quality, 0-100.
    pub quality: u8,
    /// Square target size; `None` keeps the source dimensions.
    pub resize: Option<u32>,
}

impl EncodeOptions {
    pub fn resized(quality: u8, dimension: u32) -> Self {
        Self {
            quality,
            resize: Some(dimension),
        }
    }

    pub fn keep_size(quality: u8) -> Self {
        Self {
            quality,
            resize: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_duration() {
        let info = FrameInfo {
            frame_count: 3,
            width: 512,
            height: 512,
            frame_durations_ms: vec![100, 120, 80],
        };
        assert!(info.is_animated());
        assert_eq!(info.total_duration_ms(), 300);
        assert!(!FrameInfo::still(10, 10).is_animated());
    }
}
