//! Configuration for the codec module.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Locations of the libwebp tools and limits for running them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodecConfig {
    /// Path to the `cwebp` encoder.
    #[serde(default = "default_cwebp_path")]
    pub cwebp_path: PathBuf,

    /// Path to the `dwebp` decoder.
    #[serde(default = "default_dwebp_path")]
    pub dwebp_path: PathBuf,

    /// Path to the `webpmux` muxer.
    #[serde(default = "default_webpmux_path")]
    pub webpmux_path: PathBuf,

    /// Parent directory for per-call scratch directories.
    #[serde(default = "default_temp_dir")]
    pub temp_dir: PathBuf,

    /// Timeout for a single tool invocation in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_cwebp_path() -> PathBuf {
    PathBuf::from("cwebp")
}

fn default_dwebp_path() -> PathBuf {
    PathBuf::from("dwebp")
}

fn default_webpmux_path() -> PathBuf {
    PathBuf::from("webpmux")
}

fn default_temp_dir() -> PathBuf {
    std::env::temp_dir().join("packharvest-codec")
}

fn default_timeout() -> u64 {
    60
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            cwebp_path: default_cwebp_path(),
            dwebp_path: default_dwebp_path(),
            webpmux_path: default_webpmux_path(),
            temp_dir: default_temp_dir(),
            timeout_secs: default_timeout(),
        }
    }
}

impl CodecConfig {
    /// Uses tools from a single directory (e.g. a bundled libwebp build).
    pub fn with_tool_dir(dir: PathBuf) -> Self {
        Self {
            cwebp_path: dir.join("cwebp"),
            dwebp_path: dir.join("dwebp"),
            webpmux_path: dir.join("webpmux"),
            ..Default::default()
        }
    }

    /// Sets the scratch directory parent.
    pub fn with_temp_dir(mut self, temp_dir: PathBuf) -> Self {
        self.temp_dir = temp_dir;
        self
    }

    /// Sets the per-invocation timeout in seconds.
    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CodecConfig::default();
        assert_eq!(config.cwebp_path, PathBuf::from("cwebp"));
        assert_eq!(config.webpmux_path, PathBuf::from("webpmux"));
        assert_eq!(config.timeout_secs, 60);
    }

    #[test]
    fn test_config_builder() {
        let config = CodecConfig::with_tool_dir(PathBuf::from("/opt/libwebp/bin"))
            .with_temp_dir(PathBuf::from("/tmp/test"))
            .with_timeout(5);

        assert_eq!(config.dwebp_path, PathBuf::from("/opt/libwebp/bin/dwebp"));
        assert_eq!(config.temp_dir, PathBuf::from("/tmp/test"));
        assert_eq!(config.timeout_secs, 5);
    }

    #[test]
    fn test_partial_toml() {
        let config: CodecConfig = toml::from_str(r#"cwebp_path = "/usr/bin/cwebp""#).unwrap();
        assert_eq!(config.cwebp_path, PathBuf::from("/usr/bin/cwebp"));
        assert_eq!(config.dwebp_path, PathBuf::from("dwebp"));
    }
}
