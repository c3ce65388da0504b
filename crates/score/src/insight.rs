//! Trend insights derived from a score series.

use serde::{Deserialize, Serialize};
use tandem_core::ScorePoint;
use crate::aggregator::{latest_value, seven_day_delta};

/// Weekly direction of the score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    /// Up by at least one point over the week
    Rising,
    /// Within one point either way
    Steady,
    /// Down by at least one point over the week
    Falling,
}

impl Trend {
    /// Classify a seven-day delta.
    pub fn classify(delta: f64) -> Self {
        if delta >= 1.0 {
            Self::Rising
        } else if delta <= -1.0 {
            Self::Falling
        } else {
            Self::Steady
        }
    }

    /// Display label.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Rising => "rising",
            Self::Steady => "steady",
            Self::Falling => "falling",
        }
    }
}

/// Headline numbers for a score series.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreSummary {
    /// Latest score
    pub latest: f64,
    /// Seven-day change
    pub delta: f64,
    /// Direction of the change
    pub trend: Trend,
    /// Days covered
    pub days: usize,
}

/// Summarize a series.
pub fn summarize(series: &[ScorePoint]) -> ScoreSummary {
    let delta = seven_day_delta(series);
    ScoreSummary {
        latest: latest_value(series),
        delta,
        trend: Trend::classify(delta),
        days: series.len(),
    }
}
