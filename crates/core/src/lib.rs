//! Sticker pack ingestion pipeline.
//!
//! Discovers packs on the upstream sticker API, drops the ones already
//! ingested, validates and transcodes the rest into platform-compliant WebP
//! stickers and commits them to a store, resuming across restarts from a
//! persisted cursor.

pub mod codec;
pub mod compliance;
pub mod config;
pub mod cursor;
pub mod dedup;
pub mod discovery;
pub mod metrics;
pub mod pack;
pub mod pipeline;
pub mod store;
pub mod testing;
pub mod transcoder;
pub mod upload;
pub mod upstream;

pub use codec::{Codec, CodecConfig, CodecError, WebpToolsCodec};
pub use compliance::{validate_pack, ComplianceReport, ComplianceRules, RejectReason};
pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, LogFormat,
    SanitizedConfig,
};
pub use cursor::{CursorMachine, CursorState, Transition};
pub use dedup::{DedupConfig, DuplicateIndex};
pub use discovery::{DiscoveryConfig, DiscoveryController, Mode};
pub use pack::{Pack, PackSource};
pub use pipeline::{
    collect_stats, HarvestStatus, PackOutcome, PipelineConfig, PipelineDriver, PipelineError,
    SessionStats, SkipReason, StatsReport,
};
pub use store::{
    CursorStore, LocalStore, PackStore, StoreBackend, StoreConfig, StoreError, SupabaseStore,
};
pub use transcoder::{TranscodeConfig, TranscodeError, Transcoder};
pub use upload::{UploadError, UploadReport, Uploader};
pub use upstream::{StickerApi, StickerlyClient, UpstreamConfig, UpstreamError};
