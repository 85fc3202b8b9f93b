//! libwebp command line tools codec implementation.

use async_trait::async_trait;
use regex_lite::Regex;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tokio::process::Command;
use tokio::time::{timeout, Duration};
use tracing::debug;

use super::config::CodecConfig;
use super::error::CodecError;
use super::traits::Codec;
use super::types::{EncodeOptions, FrameInfo};

/// Codec backed by `cwebp`, `dwebp` and `webpmux` subprocesses.
///
/// Each call works inside its own scratch directory which is removed when
/// the call returns, on success and on every error path.
pub struct WebpToolsCodec {
    config: CodecConfig,
}

impl WebpToolsCodec {
    /// Creates a new codec with the given configuration.
    pub fn new(config: CodecConfig) -> Self {
        Self { config }
    }

    /// Creates a codec with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(CodecConfig::default())
    }

    async fn scratch(&self) -> Result<TempDir, CodecError> {
        tokio::fs::create_dir_all(&self.config.temp_dir).await?;
        let dir = tempfile::Builder::new()
            .prefix("op-")
            .tempdir_in(&self.config.temp_dir)?;
        Ok(dir)
    }

    /// Runs one tool invocation and returns its stdout.
    async fn run(
        &self,
        tool: &'static str,
        program: &Path,
        args: &[String],
    ) -> Result<String, CodecError> {
        debug!(tool, args = ?args, "Running codec tool");

        let mut command = Command::new(program);
        command.args(args).kill_on_drop(true);

        let output = match timeout(
            Duration::from_secs(self.config.timeout_secs),
            command.output(),
        )
        .await
        {
            Ok(Ok(output)) => output,
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(CodecError::ToolNotFound {
                    tool,
                    path: program.to_path_buf(),
                });
            }
            Ok(Err(e)) => return Err(CodecError::Io(e)),
            Err(_) => {
                return Err(CodecError::Timeout {
                    tool,
                    timeout_secs: self.config.timeout_secs,
                });
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(CodecError::tool_failed(
                tool,
                format!("exited with {}", output.status),
                (!stderr.is_empty()).then_some(stderr),
            ));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    async fn read_output(path: &Path, tool: &'static str) -> Result<Vec<u8>, CodecError> {
        match tokio::fs::read(path).await {
            Ok(bytes) if !bytes.is_empty() => Ok(bytes),
            Ok(_) => Err(CodecError::tool_failed(tool, "produced an empty file", None)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(CodecError::tool_failed(
                tool,
                "did not produce an output file",
                None,
            )),
            Err(e) => Err(CodecError::Io(e)),
        }
    }
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().to_string()
}

/// Arguments for `cwebp`.
pub(crate) fn cwebp_args(options: &EncodeOptions, input: &Path, output: &Path) -> Vec<String> {
    let mut args = vec!["-quiet".to_string(), "-q".to_string(), options.quality.to_string()];
    if let Some(dim) = options.resize {
        args.extend(["-resize".to_string(), dim.to_string(), dim.to_string()]);
    }
    args.extend([path_arg(input), "-o".to_string(), path_arg(output)]);
    args
}

/// Arguments for `webpmux` when assembling an animation.
pub(crate) fn remux_args(frames: &[PathBuf], durations_ms: &[u32], output: &Path) -> Vec<String> {
    let mut args = Vec::with_capacity(frames.len() * 3 + 4);
    for (frame, duration) in frames.iter().zip(durations_ms) {
        args.push("-frame".to_string());
        args.push(path_arg(frame));
        args.push(format!("+{}", duration));
    }
    args.extend([
        "-loop".to_string(),
        "0".to_string(),
        "-o".to_string(),
        path_arg(output),
    ]);
    args
}

/// Parses the text printed by `webpmux -info`.
///
/// Still images print no frame count; they are reported as a single frame.
pub fn parse_webpmux_info(output: &str) -> Result<FrameInfo, CodecError> {
    let canvas_re = Regex::new(r"Canvas size:\s*(\d+)\s*x\s*(\d+)")
        .map_err(|e| CodecError::parse(e.to_string()))?;
    let frames_re =
        Regex::new(r"Number of frames:\s*(\d+)").map_err(|e| CodecError::parse(e.to_string()))?;

    let canvas = canvas_re
        .captures(output)
        .ok_or_else(|| CodecError::parse("missing canvas size"))?;
    let width: u32 = canvas[1]
        .parse()
        .map_err(|_| CodecError::parse("invalid canvas width"))?;
    let height: u32 = canvas[2]
        .parse()
        .map_err(|_| CodecError::parse("invalid canvas height"))?;

    let frame_count = frames_re
        .captures(output)
        .and_then(|c| c[1].parse::<u32>().ok())
        .unwrap_or(0)
        .max(1);

    // Frame table: "No.: width height alpha x_offset y_offset duration ..."
    let mut frame_durations_ms = Vec::new();
    let mut in_table = false;
    for line in output.lines() {
        let trimmed = line.trim_start();
        if trimmed.starts_with("No.:") {
            in_table = true;
            continue;
        }
        if !in_table {
            continue;
        }
        let columns: Vec<&str> = trimmed.split_whitespace().collect();
        if let Some(duration) = columns.get(6).and_then(|c| c.parse::<u32>().ok()) {
            frame_durations_ms.push(duration);
        }
    }

    Ok(FrameInfo {
        frame_count,
        width,
        height,
        frame_durations_ms,
    })
}

#[async_trait]
impl Codec for WebpToolsCodec {
    fn name(&self) -> &str {
        "webp-tools"
    }

    async fn probe(&self, bytes: &[u8]) -> Result<FrameInfo, CodecError> {
        let dir = self.scratch().await?;
        let input = dir.path().join("probe.webp");
        tokio::fs::write(&input, bytes).await?;

        let stdout = self
            .run(
                "webpmux",
                &self.config.webpmux_path,
                &["-info".to_string(), path_arg(&input)],
            )
            .await?;

        parse_webpmux_info(&stdout)
    }

    async fn encode(&self, bytes: &[u8], options: &EncodeOptions) -> Result<Vec<u8>, CodecError> {
        if options.quality > 100 {
            return Err(CodecError::invalid_input(format!(
                "quality {} out of range",
                options.quality
            )));
        }

        let dir = self.scratch().await?;
        let input = dir.path().join("source");
        let output = dir.path().join("encoded.webp");
        tokio::fs::write(&input, bytes).await?;

        self.run(
            "cwebp",
            &self.config.cwebp_path,
            &cwebp_args(options, &input, &output),
        )
        .await?;

        Self::read_output(&output, "cwebp").await
    }

    async fn extract_frame(&self, bytes: &[u8], index: u32) -> Result<Vec<u8>, CodecError> {
        if index == 0 {
            return Err(CodecError::invalid_input("frame index is 1-based"));
        }

        let dir = self.scratch().await?;
        let input = dir.path().join("animated.webp");
        let output = dir.path().join("frame.webp");
        tokio::fs::write(&input, bytes).await?;

        self.run(
            "webpmux",
            &self.config.webpmux_path,
            &[
                "-get".to_string(),
                "frame".to_string(),
                index.to_string(),
                path_arg(&input),
                "-o".to_string(),
                path_arg(&output),
            ],
        )
        .await?;

        Self::read_output(&output, "webpmux").await
    }

    async fn remux(&self, frames: &[Vec<u8>], durations_ms: &[u32]) -> Result<Vec<u8>, CodecError> {
        if frames.is_empty() {
            return Err(CodecError::invalid_input("no frames to mux"));
        }
        if frames.len() != durations_ms.len() {
            return Err(CodecError::invalid_input(format!(
                "{} frames but {} durations",
                frames.len(),
                durations_ms.len()
            )));
        }

        let dir = self.scratch().await?;
        let mut frame_paths = Vec::with_capacity(frames.len());
        for (i, frame) in frames.iter().enumerate() {
            let path = dir.path().join(format!("frame_{}.webp", i + 1));
            tokio::fs::write(&path, frame).await?;
            frame_paths.push(path);
        }
        let output = dir.path().join("animated.webp");

        self.run(
            "webpmux",
            &self.config.webpmux_path,
            &remux_args(&frame_paths, durations_ms, &output),
        )
        .await?;

        Self::read_output(&output, "webpmux").await
    }

    async fn to_png(&self, webp: &[u8], dimension: u32) -> Result<Vec<u8>, CodecError> {
        let dir = self.scratch().await?;
        let input = dir.path().join("source.webp");
        let output = dir.path().join("tray.png");
        tokio::fs::write(&input, webp).await?;

        self.run(
            "dwebp",
            &self.config.dwebp_path,
            &[
                path_arg(&input),
                "-resize".to_string(),
                dimension.to_string(),
                dimension.to_string(),
                "-o".to_string(),
                path_arg(&output),
            ],
        )
        .await?;

        Self::read_output(&output, "dwebp").await
    }

    async fn validate(&self) -> Result<(), CodecError> {
        for (tool, path) in [
            ("cwebp", &self.config.cwebp_path),
            ("dwebp", &self.config.dwebp_path),
            ("webpmux", &self.config.webpmux_path),
        ] {
            self.run(tool, path, &["-version".to_string()]).await?;
        }

        tokio::fs::create_dir_all(&self.config.temp_dir).await?;

        Ok(())
    }
}
