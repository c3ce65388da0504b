//! Derived score points.

use serde::{Deserialize, Serialize};
use crate::Date;

/// One day of the relationship account score.
///
/// Produced fresh on every query and never persisted by the core.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScorePoint {
    /// Calendar date
    pub date: Date,

    /// Score in [0, 100], rounded to one decimal
    pub value: f64,

    /// Climate rating logged that day, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub climate: Option<u8>,
}
