//! Pipeline driver.
//!
//! Ties discovery, deduplication, compliance, transcoding and upload into
//! the one-shot commands and the resumable continuous loop.

mod config;
mod context;
mod driver;
mod error;
mod processor;
mod report;
mod stats;
mod types;

pub use config::PipelineConfig;
pub use context::{HarvestContext, HarvestStatus};
pub use driver::PipelineDriver;
pub use error::PipelineError;
pub use processor::PackProcessor;
pub use report::{collect_stats, StatsReport};
pub use stats::{LocaleTally, SessionStats};
pub use types::{AssetTally, PackOutcome, PackReport, SkipReason};
