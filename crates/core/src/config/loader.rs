use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use std::path::Path;
use tracing::debug;

use super::{types::Config, ConfigError};

/// Environment prefix for overrides, e.g. `PACKHARVEST_STORE__BACKEND=supabase`.
pub const ENV_PREFIX: &str = "PACKHARVEST_";

/// Load configuration from file with environment variable overrides.
///
/// A missing file is not an error: every section has defaults.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let mut figment = Figment::new();
    if path.exists() {
        figment = figment.merge(Toml::file(path));
    } else {
        debug!(path = %path.display(), "Config file not found, using defaults");
    }

    figment
        .merge(Env::prefixed(ENV_PREFIX).split("__"))
        .extract()
        .map_err(|e| ConfigError::ParseError(e.to_string()))
}

/// Load configuration from TOML string (useful for testing)
pub fn load_config_from_str(toml_str: &str) -> Result<Config, ConfigError> {
    toml::from_str(toml_str).map_err(|e| ConfigError::ParseError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StoreBackend;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_config_from_str_valid() {
        let toml = r#"
[pipeline]
batch_size = 4
"#;
        let config = load_config_from_str(toml).unwrap();
        assert_eq!(config.pipeline.batch_size, 4);
    }

    #[test]
    fn test_load_config_from_str_bad_type() {
        let toml = r#"
[server]
port = "eighty"
"#;
        let err = load_config_from_str(toml).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        figment::Jail::expect_with(|_jail| {
            let config = load_config(Path::new("/nonexistent/config.toml")).unwrap();
            assert_eq!(config.store.backend, StoreBackend::Local);
            Ok(())
        });
    }

    #[test]
    fn test_load_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(
            temp_file,
            r#"
[server]
host = "127.0.0.1"
port = 3000

[upstream]
request_delay_ms = 100
"#
        )
        .unwrap();

        let config = load_config(temp_file.path()).unwrap();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.server.host.to_string(), "127.0.0.1");
        assert_eq!(config.upstream.request_delay_ms, 100);
    }

    #[test]
    fn test_env_overrides_file() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "config.toml",
                r#"
[store]
backend = "local"

[pipeline]
batch_size = 2
"#,
            )?;
            jail.set_env("PACKHARVEST_PIPELINE__BATCH_SIZE", "7");
            jail.set_env("PACKHARVEST_STORE__BACKEND", "supabase");

            let config = load_config(Path::new("config.toml")).unwrap();
            assert_eq!(config.pipeline.batch_size, 7);
            assert_eq!(config.store.backend, StoreBackend::Supabase);
            Ok(())
        });
    }
}
