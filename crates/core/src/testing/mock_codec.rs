//! Mock codec for testing.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::codec::{Codec, CodecError, EncodeOptions, FrameInfo};

const DEFAULT_ENCODE_SIZE: usize = 10_000;
const DEFAULT_FRAME_SIZE: usize = 5_000;
const DEFAULT_PNG_SIZE: usize = 8_000;

/// A recorded codec call for test assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodecCall {
    Probe,
    Encode { quality: u8, resize: Option<u32> },
    ExtractFrame { index: u32 },
    Remux { frames: usize, durations_ms: Vec<u32> },
    ToPng { dimension: u32 },
}

/// Operations that can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CodecOp {
    Probe,
    Encode,
    ExtractFrame,
    Remux,
    ToPng,
}

/// Mock implementation of the Codec trait.
///
/// Output sizes are controllable so byte budgets can be exercised:
/// - `encode` returns `set_encode_size(quality, ..)` bytes (10 000 by default)
/// - `extract_frame` returns 5 000 bytes
/// - `remux` concatenates its frames
/// - `to_png` returns `set_png_size(..)` bytes (8 000 by default)
///
/// Unknown sources probe as a single 512x512 frame.
#[derive(Debug)]
pub struct MockCodec {
    calls: Arc<RwLock<Vec<CodecCall>>>,
    frame_info: Arc<RwLock<HashMap<Vec<u8>, FrameInfo>>>,
    encode_sizes: Arc<RwLock<HashMap<u8, usize>>>,
    png_size: Arc<RwLock<usize>>,
    failing: Arc<RwLock<HashSet<CodecOp>>>,
}

impl Default for MockCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl MockCodec {
    pub fn new() -> Self {
        Self {
            calls: Arc::new(RwLock::new(Vec::new())),
            frame_info: Arc::new(RwLock::new(HashMap::new())),
            encode_sizes: Arc::new(RwLock::new(HashMap::new())),
            png_size: Arc::new(RwLock::new(DEFAULT_PNG_SIZE)),
            failing: Arc::new(RwLock::new(HashSet::new())),
        }
    }

    /// Sets what a probe of exactly these bytes returns.
    pub async fn set_frame_info(&self, bytes: &[u8], info: FrameInfo) {
        self.frame_info.write().await.insert(bytes.to_vec(), info);
    }

    /// Sets the output size of encodes at the given quality.
    pub async fn set_encode_size(&self, quality: u8, size: usize) {
        self.encode_sizes.write().await.insert(quality, size);
    }

    pub async fn set_png_size(&self, size: usize) {
        *self.png_size.write().await = size;
    }

    /// Makes every call of the given operation fail.
    pub async fn fail_on(&self, op: CodecOp) {
        self.failing.write().await.insert(op);
    }

    pub async fn calls(&self) -> Vec<CodecCall> {
        self.calls.read().await.clone()
    }

    pub async fn clear_calls(&self) {
        self.calls.write().await.clear();
    }

    /// Qualities of all encode calls, in order.
    pub async fn encode_qualities(&self) -> Vec<u8> {
        self.calls
            .read()
            .await
            .iter()
            .filter_map(|c| match c {
                CodecCall::Encode { quality, .. } => Some(*quality),
                _ => None,
            })
            .collect()
    }

    async fn record(&self, call: CodecCall, op: CodecOp) -> Result<(), CodecError> {
        self.calls.write().await.push(call);
        if self.failing.read().await.contains(&op) {
            return Err(CodecError::tool_failed(
                "mock",
                format!("{:?} configured to fail", op),
                None,
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl Codec for MockCodec {
    fn name(&self) -> &str {
        "mock"
    }

    async fn probe(&self, bytes: &[u8]) -> Result<FrameInfo, CodecError> {
        self.record(CodecCall::Probe, CodecOp::Probe).await?;
        Ok(self
            .frame_info
            .read()
            .await
            .get(bytes)
            .cloned()
            .unwrap_or_else(|| FrameInfo::still(512, 512)))
    }

    async fn encode(&self, _bytes: &[u8], options: &EncodeOptions) -> Result<Vec<u8>, CodecError> {
        self.record(
            CodecCall::Encode {
                quality: options.quality,
                resize: options.resize,
            },
            CodecOp::Encode,
        )
        .await?;
        let size = self
            .encode_sizes
            .read()
            .await
            .get(&options.quality)
            .copied()
            .unwrap_or(DEFAULT_ENCODE_SIZE);
        Ok(vec![b'E'; size])
    }

    async fn extract_frame(&self, _bytes: &[u8], index: u32) -> Result<Vec<u8>, CodecError> {
        self.record(CodecCall::ExtractFrame { index }, CodecOp::ExtractFrame)
            .await?;
        Ok(vec![b'F'; DEFAULT_FRAME_SIZE])
    }

    async fn remux(&self, frames: &[Vec<u8>], durations_ms: &[u32]) -> Result<Vec<u8>, CodecError> {
        self.record(
            CodecCall::Remux {
                frames: frames.len(),
                durations_ms: durations_ms.to_vec(),
            },
            CodecOp::Remux,
        )
        .await?;
        Ok(frames.concat())
    }

    async fn to_png(&self, _webp: &[u8], dimension: u32) -> Result<Vec<u8>, CodecError> {
        self.record(CodecCall::ToPng { dimension }, CodecOp::ToPng)
            .await?;
        Ok(vec![b'P'; *self.png_size.read().await])
    }

    async fn validate(&self) -> Result<(), CodecError> {
        Ok(())
    }
}
