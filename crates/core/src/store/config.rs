use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Which storage backend to use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    #[default]
    Local,
    Supabase,
}

/// Storage configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,
    #[serde(default)]
    pub local: LocalStoreConfig,
    /// Required when backend = "supabase".
    #[serde(default)]
    pub supabase: Option<SupabaseConfig>,
}

/// Filesystem + SQLite backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalStoreConfig {
    /// Root directory for pack assets.
    #[serde(default = "default_root")]
    pub root: PathBuf,
    /// SQLite database for metadata and cursor.
    #[serde(default = "default_database")]
    pub database: PathBuf,
}

fn default_root() -> PathBuf {
    PathBuf::from("stickers")
}

fn default_database() -> PathBuf {
    PathBuf::from("packharvest.db")
}

impl Default for LocalStoreConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            database: default_database(),
        }
    }
}

/// Supabase backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupabaseConfig {
    /// Project URL, e.g. "https://xyz.supabase.co".
    pub url: String,
    /// Service role key.
    pub service_key: String,
    #[serde(default = "default_bucket")]
    pub bucket: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_bucket() -> String {
    "stickers".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}
