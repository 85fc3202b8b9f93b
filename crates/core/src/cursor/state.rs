use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The single persisted cursor record.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CursorState {
    pub locale_index: usize,
    pub keyword_index: usize,
    pub page: u32,
    pub last_processed_pack_id: Option<String>,
    /// Runtime accumulated over completed cycles.
    pub total_runtime_hours: f64,
    pub cycles_completed: u64,
    pub last_cycle_at: Option<DateTime<Utc>>,
}

impl CursorState {
    /// Resets out-of-range indices to the start.
    ///
    /// Needed when the configured locale or keyword list shrank since the
    /// record was written. Returns true if anything changed.
    pub fn clamp(&mut self, locales: usize, keywords: usize) -> bool {
        let mut changed = false;
        if self.locale_index >= locales {
            self.locale_index = 0;
            self.keyword_index = 0;
            self.page = 0;
            changed = true;
        }
        if self.keyword_index >= keywords {
            self.keyword_index = 0;
            self.page = 0;
            changed = true;
        }
        changed
    }

    /// Percentage of the current cycle already walked.
    pub fn cycle_progress(&self, locales: usize, keywords: usize) -> f64 {
        let total = locales * keywords;
        if total == 0 {
            return 0.0;
        }
        let done = self.locale_index * keywords + self.keyword_index;
        done as f64 * 100.0 / total as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_origin() {
        let state = CursorState::default();
        assert_eq!((state.locale_index, state.keyword_index, state.page), (0, 0, 0));
        assert_eq!(state.cycles_completed, 0);
        assert!(state.last_cycle_at.is_none());
    }

    #[test]
    fn test_clamp_out_of_range_locale() {
        let mut state = CursorState {
            locale_index: 4,
            keyword_index: 2,
            page: 3,
            ..Default::default()
        };
        assert!(state.clamp(2, 10));
        assert_eq!((state.locale_index, state.keyword_index, state.page), (0, 0, 0));
    }

    #[test]
    fn test_clamp_out_of_range_keyword() {
        let mut state = CursorState {
            locale_index: 1,
            keyword_index: 25,
            page: 1,
            ..Default::default()
        };
        assert!(state.clamp(2, 20));
        assert_eq!((state.locale_index, state.keyword_index, state.page), (1, 0, 0));
    }

    #[test]
    fn test_clamp_in_range_untouched() {
        let mut state = CursorState {
            locale_index: 1,
            keyword_index: 3,
            page: 2,
            ..Default::default()
        };
        assert!(!state.clamp(2, 20));
        assert_eq!((state.locale_index, state.keyword_index, state.page), (1, 3, 2));
    }

    #[test]
    fn test_cycle_progress() {
        let state = CursorState {
            locale_index: 1,
            keyword_index: 5,
            ..Default::default()
        };
        assert!((state.cycle_progress(2, 10) - 75.0).abs() < f64::EPSILON);
        assert_eq!(state.cycle_progress(0, 10), 0.0);
    }
}
