//! Score model parameters.

use serde::{Deserialize, Serialize};

/// Parameters of the exponential smoothing model.
///
/// The defaults give a half-life of roughly 13.5 days and a resting level
/// of 25 when nothing is logged.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreConfig {
    /// Share of yesterday's score carried into today
    pub decay: f64,

    /// Deposit ratio assumed for days without a record
    pub neutral_deposit: f64,

    /// Score before the first day of the range
    pub initial_score: f64,
}

impl Default for ScoreConfig {
    fn default() -> Self {
        Self {
            decay: 0.95,
            neutral_deposit: 0.25,
            initial_score: 0.0,
        }
    }
}

impl ScoreConfig {
    /// Set the decay factor.
    pub fn with_decay(mut self, decay: f64) -> Self {
        self.decay = decay.clamp(0.0, 1.0);
        self
    }

    /// Set the neutral deposit ratio.
    pub fn with_neutral_deposit(mut self, ratio: f64) -> Self {
        self.neutral_deposit = ratio.clamp(0.0, 1.0);
        self
    }

    /// Set the starting score.
    pub fn with_initial_score(mut self, score: f64) -> Self {
        self.initial_score = score.clamp(0.0, 100.0);
        self
    }

    /// Weight given to today's deposit.
    pub fn deposit_weight(&self) -> f64 {
        1.0 - self.decay
    }

    /// Level the score settles at when every day is neutral.
    pub fn resting_level(&self) -> f64 {
        100.0 * self.neutral_deposit
    }
}
