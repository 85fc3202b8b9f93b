//! Discovery controller.
//!
//! Pages through the recommended feed and keyword search, switching between
//! a broad "discovery" strategy and a narrow "efficiency" strategy as the
//! duplicate rate of fetched pages rises and falls.

mod config;
mod controller;
mod pacer;
mod strategy;
mod walk;

pub use config::{DiscoveryConfig, StrategyConfig};
pub use controller::DiscoveryController;
pub use pacer::Pacer;
pub use strategy::{Mode, Strategy, StrategySnapshot};
pub use walk::{PageWalk, StopReason};
