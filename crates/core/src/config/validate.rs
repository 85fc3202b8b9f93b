use super::{types::Config, ConfigError};
use crate::store::StoreBackend;

/// Validate configuration before any work begins.
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.store.backend == StoreBackend::Supabase {
        let supabase = config.store.supabase.as_ref().ok_or_else(|| {
            ConfigError::MissingRequired("store.supabase (url and service_key)".to_string())
        })?;
        if supabase.url.trim().is_empty() {
            return Err(ConfigError::MissingRequired("store.supabase.url".to_string()));
        }
        if supabase.service_key.trim().is_empty() {
            return Err(ConfigError::MissingRequired(
                "store.supabase.service_key".to_string(),
            ));
        }
    }

    if config.discovery.locales.is_empty() {
        return Err(ConfigError::ValidationError(
            "discovery.locales cannot be empty".to_string(),
        ));
    }
    if config.discovery.keywords.is_empty() {
        return Err(ConfigError::ValidationError(
            "discovery.keywords cannot be empty".to_string(),
        ));
    }
    if !(0.0..=1.0).contains(&config.discovery.category_probability) {
        return Err(ConfigError::ValidationError(
            "discovery.category_probability must be between 0 and 1".to_string(),
        ));
    }

    if config.compliance.min_assets == 0 || config.compliance.min_assets > config.compliance.max_assets {
        return Err(ConfigError::ValidationError(
            "compliance.min_assets must be between 1 and compliance.max_assets".to_string(),
        ));
    }

    if config.transcode.quality == 0 || config.transcode.quality > 100 {
        return Err(ConfigError::ValidationError(
            "transcode.quality must be between 1 and 100".to_string(),
        ));
    }

    if config.pipeline.batch_size == 0 || config.pipeline.efficiency_batch_size == 0 {
        return Err(ConfigError::ValidationError(
            "pipeline batch sizes cannot be 0".to_string(),
        ));
    }

    if config.server.enabled && config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    Ok(())
}
