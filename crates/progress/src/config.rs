//! Sequencer thresholds and windows.

use serde::{Deserialize, Serialize};

/// Thresholds and windows used by the progress sequencer.
///
/// Day windows are calendar based and cover the cutoff date `today - N`
/// through today. The repair window is wall-clock hours.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SequencerConfig {
    /// Calendar days scanned for recent mood and missed turns
    pub mood_window_days: u32,

    /// Records needed in the mood window before climate can trigger
    pub mood_min_records: usize,

    /// Climate rating at or below which the latest record triggers
    pub low_climate_max: u8,

    /// How many recent records are inspected for missed turns
    pub missed_sample: usize,

    /// Missed turns among the sample that trigger
    pub missed_min: usize,

    /// Hours a partner's repair request stays urgent
    pub repair_window_hours: i64,

    /// Calendar days counted for activity density
    pub density_window_days: u32,

    /// Records in the density window that mark a user as active
    pub active_density: usize,

    /// Pool prefix sampled for active users
    pub deep_pool: usize,

    /// Pool prefix sampled for everyone else
    pub simple_pool: usize,

    /// Run all pending milestone checks concurrently before scanning
    pub prefetch: bool,
}

impl Default for SequencerConfig {
    fn default() -> Self {
        Self {
            mood_window_days: 3,
            mood_min_records: 2,
            low_climate_max: 2,
            missed_sample: 3,
            missed_min: 2,
            repair_window_hours: 48,
            density_window_days: 7,
            active_density: 4,
            deep_pool: 4,
            simple_pool: 3,
            prefetch: true,
        }
    }
}

impl SequencerConfig {
    /// Toggle concurrent prefetch of milestone checks.
    pub fn with_prefetch(mut self, prefetch: bool) -> Self {
        self.prefetch = prefetch;
        self
    }

    /// Set the repair urgency window.
    pub fn with_repair_window_hours(mut self, hours: i64) -> Self {
        self.repair_window_hours = hours.max(0);
        self
    }

    /// Set the mood window.
    pub fn with_mood_window_days(mut self, days: u32) -> Self {
        self.mood_window_days = days;
        self
    }
}
