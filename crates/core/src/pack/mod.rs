//! Pack model shared by every pipeline stage.
//!
//! Both upstream feed shapes are normalized into [`Pack`] at the discovery
//! boundary, so nothing downstream ever sees a raw payload.

mod emoji;
mod types;

pub use emoji::emoji_tags_for;
pub use types::{lang_for_locale, output_filename, Pack, PackSource};
