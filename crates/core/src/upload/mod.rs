//! Upload orchestrator.
//!
//! Writes a transcoded pack to the store in commit order: namespace, tray,
//! stickers, pack record, sticker records. Asset writes are idempotent, so a
//! pack that failed half way is resumed on the next run without rewriting
//! what is already there.

mod error;
mod orchestrator;

pub use error::UploadError;
pub use orchestrator::{UploadReport, Uploader};
