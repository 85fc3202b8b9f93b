//! Crash-resumable iteration cursor.
//!
//! The cursor walks `locale x keyword x page` and is persisted after every
//! transition, so a restarted process resumes exactly where the last one
//! stopped.

mod machine;
mod state;

pub use machine::{CursorMachine, Transition};
pub use state::CursorState;
