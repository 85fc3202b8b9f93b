use serde::Serialize;
use tracing::info;

use super::StrategyConfig;
use crate::metrics;

/// Fetch strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Broad exploration with full page limits.
    #[default]
    Discovery,
    /// Light feed, high-yield keywords and short walks.
    Efficiency,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Discovery => "discovery",
            Self::Efficiency => "efficiency",
        }
    }
}

/// Duplicate tracking with hysteresis between the two modes.
#[derive(Debug, Clone)]
pub struct Strategy {
    config: StrategyConfig,
    mode: Mode,
    consecutive_duplicates: u64,
    consecutive_new: u64,
    /// Observations since the last switch; feeds the ratio check.
    window_new: u64,
    window_duplicates: u64,
    switches: u64,
}

/// Point-in-time view for stats output.
#[derive(Debug, Clone, Serialize)]
pub struct StrategySnapshot {
    pub mode: Mode,
    pub consecutive_duplicates: u64,
    pub consecutive_new: u64,
    pub duplicate_ratio: f64,
    pub switches: u64,
}

impl Strategy {
    pub fn new(config: StrategyConfig) -> Self {
        Self {
            config,
            mode: Mode::Discovery,
            consecutive_duplicates: 0,
            consecutive_new: 0,
            window_new: 0,
            window_duplicates: 0,
            switches: 0,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn is_efficient(&self) -> bool {
        self.mode == Mode::Efficiency
    }

    pub fn switches(&self) -> u64 {
        self.switches
    }

    /// Folds one filtered page into the streaks.
    ///
    /// Duplicates are applied before new packs, so any new pack on a page
    /// breaks the duplicate streak.
    pub fn record(&mut self, new: usize, duplicates: usize) {
        let (new, duplicates) = (new as u64, duplicates as u64);

        if duplicates > 0 {
            self.consecutive_duplicates += duplicates;
            self.consecutive_new = 0;
        }
        if new > 0 {
            self.consecutive_new += new;
            self.consecutive_duplicates = 0;
        }

        self.window_new += new;
        self.window_duplicates += duplicates;
    }

    /// Duplicate share of the observations since the last switch.
    pub fn duplicate_ratio(&self) -> f64 {
        let total = self.window_new + self.window_duplicates;
        if total == 0 {
            0.0
        } else {
            self.window_duplicates as f64 / total as f64
        }
    }

    fn should_enter(&self) -> bool {
        let samples = self.window_new + self.window_duplicates;
        self.consecutive_duplicates >= self.config.enter_consecutive_duplicates
            || (samples >= self.config.min_ratio_samples
                && self.duplicate_ratio() > self.config.enter_duplicate_ratio)
    }

    fn should_exit(&self) -> bool {
        self.consecutive_new >= self.config.exit_consecutive_new
            && self.consecutive_duplicates < self.config.exit_max_consecutive_duplicates
    }

    /// Evaluates the switch conditions. Returns the new mode on a switch.
    pub fn decide(&mut self) -> Option<Mode> {
        let next = match self.mode {
            Mode::Discovery if self.should_enter() => Mode::Efficiency,
            Mode::Efficiency if self.should_exit() => Mode::Discovery,
            _ => return None,
        };

        info!(
            from = self.mode.as_str(),
            to = next.as_str(),
            consecutive_duplicates = self.consecutive_duplicates,
            consecutive_new = self.consecutive_new,
            duplicate_ratio = format!("{:.1}%", self.duplicate_ratio() * 100.0),
            "Switching discovery strategy"
        );

        self.mode = next;
        self.switches += 1;
        self.window_new = 0;
        self.window_duplicates = 0;
        metrics::record_mode_switch(next == Mode::Efficiency);
        Some(next)
    }

    pub fn snapshot(&self) -> StrategySnapshot {
        StrategySnapshot {
            mode: self.mode,
            consecutive_duplicates: self.consecutive_duplicates,
            consecutive_new: self.consecutive_new,
            duplicate_ratio: self.duplicate_ratio(),
            switches: self.switches,
        }
    }
}
