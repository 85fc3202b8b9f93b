use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;

use crate::codec::CodecConfig;
use crate::compliance::ComplianceRules;
use crate::dedup::DedupConfig;
use crate::discovery::DiscoveryConfig;
use crate::pipeline::PipelineConfig;
use crate::store::{LocalStoreConfig, StoreBackend, StoreConfig};
use crate::transcoder::TranscodeConfig;
use crate::upstream::UpstreamConfig;

/// Root configuration. Every section is optional.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub discovery: DiscoveryConfig,
    #[serde(default)]
    pub dedup: DedupConfig,
    #[serde(default)]
    pub codec: CodecConfig,
    #[serde(default)]
    pub transcode: TranscodeConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub compliance: ComplianceRules,
}

/// Log output configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset (e.g. "info", "packharvest=debug").
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
    /// Also write logs to this file.
    #[serde(default)]
    pub file: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
            file: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Status endpoint configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Serve health, stats and metrics during `continuous`.
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

fn default_port() -> u16 {
    8080
}

/// Sanitized config for stats output (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub server: ServerConfig,
    pub store: SanitizedStoreConfig,
    pub upstream: SanitizedUpstreamConfig,
    pub discovery: DiscoveryConfig,
    pub dedup: DedupConfig,
    pub transcode: TranscodeConfig,
    pub pipeline: PipelineConfig,
    pub compliance: ComplianceRules,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedStoreConfig {
    pub backend: StoreBackend,
    pub local: LocalStoreConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supabase: Option<SanitizedSupabaseConfig>,
}

/// Sanitized Supabase config (service key hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedSupabaseConfig {
    pub url: String,
    pub bucket: String,
    pub service_key_configured: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedUpstreamConfig {
    pub base_url: String,
    pub app_version: String,
    pub request_delay_ms: u64,
    pub download_delay_ms: u64,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            server: config.server.clone(),
            store: SanitizedStoreConfig {
                backend: config.store.backend,
                local: config.store.local.clone(),
                supabase: config
                    .store
                    .supabase
                    .as_ref()
                    .map(|s| SanitizedSupabaseConfig {
                        url: s.url.clone(),
                        bucket: s.bucket.clone(),
                        service_key_configured: !s.service_key.is_empty(),
                    }),
            },
            upstream: SanitizedUpstreamConfig {
                base_url: config.upstream.base_url.clone(),
                app_version: config.upstream.app_version.clone(),
                request_delay_ms: config.upstream.request_delay_ms,
                download_delay_ms: config.upstream.download_delay_ms,
            },
            discovery: config.discovery.clone(),
            dedup: config.dedup.clone(),
            transcode: config.transcode.clone(),
            pipeline: config.pipeline.clone(),
            compliance: config.compliance.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SupabaseConfig;

    #[test]
    fn test_empty_document_is_all_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert!(!config.server.enabled);
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.store.backend, StoreBackend::Local);
        assert_eq!(config.logging.format, LogFormat::Pretty);
        assert_eq!(config.pipeline.batch_size, 3);
        assert_eq!(config.dedup.freshness_secs, 3600);
        assert_eq!(config.transcode.sticker_dimension, 512);
    }

    #[test]
    fn test_deserialize_sections() {
        let toml = r#"
[logging]
level = "debug"
format = "json"

[server]
enabled = true
host = "127.0.0.1"
port = 9000

[store]
backend = "supabase"

[store.supabase]
url = "https://example.supabase.co"
service_key = "secret"

[discovery]
locales = ["pt-BR", "en-US"]
keywords = ["memes"]
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.logging.format, LogFormat::Json);
        assert!(config.server.enabled);
        assert_eq!(config.server.host.to_string(), "127.0.0.1");
        assert_eq!(config.store.backend, StoreBackend::Supabase);
        assert_eq!(config.store.supabase.as_ref().unwrap().bucket, "stickers");
        assert_eq!(config.discovery.locales.len(), 2);
        assert_eq!(config.discovery.keywords, vec!["memes"]);
    }

    #[test]
    fn test_sanitized_config_hides_service_key() {
        let mut config = Config::default();
        config.store.backend = StoreBackend::Supabase;
        config.store.supabase = Some(SupabaseConfig {
            url: "https://example.supabase.co".to_string(),
            service_key: "secret-key".to_string(),
            bucket: "stickers".to_string(),
            timeout_secs: 30,
        });

        let sanitized = SanitizedConfig::from(&config);
        let supabase = sanitized.store.supabase.as_ref().unwrap();
        assert!(supabase.service_key_configured);

        let json = serde_json::to_string(&sanitized).unwrap();
        assert!(!json.contains("secret-key"));
    }
}
