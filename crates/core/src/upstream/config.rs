use serde::{Deserialize, Serialize};

use super::retry::RetryConfig;

/// Upstream API client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// App version advertised in the User-Agent.
    #[serde(default = "default_app_version")]
    pub app_version: String,

    /// Device description advertised in the User-Agent.
    #[serde(default = "default_device")]
    pub device: String,

    /// Number of device identifiers rotated across requests.
    #[serde(default = "default_device_pool_size")]
    pub device_pool_size: usize,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Pause before each API call after the first.
    #[serde(default = "default_request_delay_ms")]
    pub request_delay_ms: u64,

    /// Pause between consecutive asset downloads.
    #[serde(default = "default_download_delay_ms")]
    pub download_delay_ms: u64,

    #[serde(default)]
    pub retry: RetryConfig,
}

fn default_base_url() -> String {
    "http://api.sticker.ly".to_string()
}

fn default_app_version() -> String {
    "1.17.3".to_string()
}

fn default_device() -> String {
    "Redmi 7; U; Android 29".to_string()
}

fn default_device_pool_size() -> usize {
    8
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_request_delay_ms() -> u64 {
    2000
}

fn default_download_delay_ms() -> u64 {
    500
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            app_version: default_app_version(),
            device: default_device(),
            device_pool_size: default_device_pool_size(),
            timeout_secs: default_timeout_secs(),
            request_delay_ms: default_request_delay_ms(),
            download_delay_ms: default_download_delay_ms(),
            retry: RetryConfig::default(),
        }
    }
}

impl UpstreamConfig {
    /// User-Agent string for a given locale.
    pub fn user_agent(&self, locale: &str) -> String {
        format!(
            "androidapp.stickerly/{} ({}; {}; {};)",
            self.app_version, self.device, locale, locale
        )
    }

    /// Points the client at another host, e.g. a local test server.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Disables all pacing delays.
    pub fn without_delays(mut self) -> Self {
        self.request_delay_ms = 0;
        self.download_delay_ms = 0;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_agent() {
        let config = UpstreamConfig::default();
        assert_eq!(
            config.user_agent("pt-BR"),
            "androidapp.stickerly/1.17.3 (Redmi 7; U; Android 29; pt-BR; pt-BR;)"
        );
    }

    #[test]
    fn test_toml_overrides() {
        let config: UpstreamConfig = toml::from_str(
            r#"
request_delay_ms = 0

[retry]
max_retries = 5
"#,
        )
        .unwrap();
        assert_eq!(config.request_delay_ms, 0);
        assert_eq!(config.download_delay_ms, 500);
        assert_eq!(config.retry.max_retries, 5);
    }
}
