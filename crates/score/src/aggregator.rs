//! Exponential smoothing over sparse daily records.

use std::collections::HashMap;
use tandem_core::{DailyActivityRecord, Date, ScorePoint, DEPOSIT_INDICATORS};
use crate::config::ScoreConfig;

/// Value reported by [`latest_value`] for an empty series.
pub const DEFAULT_LATEST_VALUE: f64 = 50.0;

/// Upper bound on up-front allocation; longer ranges grow as they go.
const PREALLOCATED_DAYS: usize = 366;

/// Compute the daily score series for `[start, end]` with default parameters.
///
/// See [`compute_score_series_with`].
pub fn compute_score_series(
    records: &[DailyActivityRecord],
    start: Date,
    end: Date,
) -> Vec<ScorePoint> {
    compute_score_series_with(&ScoreConfig::default(), records, start, end)
}

/// Compute one [`ScorePoint`] per calendar day in `[start, end]`, ascending.
///
/// Each day the running score becomes
/// `clamp(score * decay + 100 * deposit * (1 - decay), 0, 100)`, where
/// `deposit` is the share of satisfied indicators on that day's record, or
/// the neutral ratio when no record exists.
///
/// Records should be unique per date. When two share a date the one later in
/// `records` wins. An inverted range yields an empty series; validate with
/// [`DateRange`](crate::DateRange) at the boundary to reject it instead.
///
/// The output holds one point per day, so its size grows with the range.
/// Callers taking ranges from untrusted input should bound the span before
/// calling.
pub fn compute_score_series_with(
    config: &ScoreConfig,
    records: &[DailyActivityRecord],
    start: Date,
    end: Date,
) -> Vec<ScorePoint> {
    if start > end {
        return Vec::new();
    }

    let by_date: HashMap<Date, &DailyActivityRecord> =
        records.iter().map(|r| (r.date, r)).collect();
    let days = (end - start).num_days() as usize + 1;
    let mut points = Vec::with_capacity(days.min(PREALLOCATED_DAYS));
    let mut score = config.initial_score;

    for date in start.iter_days().take(days) {
        let (deposit, climate) = match by_date.get(&date) {
            Some(record) => (
                record.deposit_count() as f64 / DEPOSIT_INDICATORS as f64,
                record.valid_climate(),
            ),
            None => (config.neutral_deposit, None),
        };

        score = (score * config.decay + 100.0 * deposit * config.deposit_weight())
            .clamp(0.0, 100.0);
        points.push(ScorePoint {
            date,
            value: round_tenth(score),
            climate,
        });
    }

    points
}

/// Last value of the series, or [`DEFAULT_LATEST_VALUE`] when empty.
pub fn latest_value(series: &[ScorePoint]) -> f64 {
    series.last().map_or(DEFAULT_LATEST_VALUE, |p| p.value)
}

/// Change over the last seven points, rounded to one decimal.
///
/// Compares the last point with the one seven positions earlier, or with the
/// first point when the series is shorter. Fewer than two points give 0.
pub fn seven_day_delta(series: &[ScorePoint]) -> f64 {
    if series.len() < 2 {
        return 0.0;
    }
    let latest = series[series.len() - 1].value;
    let base = series[series.len().saturating_sub(8)].value;
    round_tenth(latest - base)
}

fn round_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tandem_core::{TurnTowardOutcome, UserId};

    fn day(offset: u64) -> Date {
        NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .checked_add_days(chrono::Days::new(offset))
            .unwrap()
    }

    fn full_record(date: Date) -> DailyActivityRecord {
        DailyActivityRecord::new(UserId::from("alice"), date)
            .with_reflection(true)
            .with_appreciation(true)
            .with_turn_toward(TurnTowardOutcome::Initiated)
            .with_adjustment(true)
    }

    fn series_of(values: &[f64]) -> Vec<ScorePoint> {
        values
            .iter()
            .enumerate()
            .map(|(i, v)| ScorePoint { date: day(i as u64), value: *v, climate: None })
            .collect()
    }

    #[test]
    fn test_series_is_dense_and_ordered() {
        let records = vec![full_record(day(3)), full_record(day(10))];
        let series = compute_score_series(&records, day(0), day(29));

        assert_eq!(series.len(), 30);
        for (i, point) in series.iter().enumerate() {
            assert_eq!(point.date, day(i as u64));
            assert!((0.0..=100.0).contains(&point.value));
        }
    }

    #[test]
    fn test_full_deposit_first_day() {
        let series = compute_score_series(&[full_record(day(0))], day(0), day(0));
        assert_eq!(series[0].value, 5.0);
    }

    #[test]
    fn test_neutral_first_day() {
        let series = compute_score_series(&[], day(0), day(0));
        assert_eq!(series[0].value, 1.3);
    }

    #[test]
    fn test_empty_records_converge_to_resting_level() {
        let series = compute_score_series(&[], day(0), day(89));
        let last = latest_value(&series);
        assert!((last - 25.0).abs() < 0.5, "got {last}");

        for pair in series.windows(2) {
            assert!(pair[1].value >= pair[0].value);
        }
    }

    #[test]
    fn test_empty_record_scores_zero_deposit() {
        let bare = DailyActivityRecord::new(UserId::from("alice"), day(1));
        let series = compute_score_series(&[bare], day(0), day(1));
        // day 0 neutral (1.25), day 1 zero deposit: 1.25 * 0.95
        assert_eq!(series[1].value, 1.2);
    }

    #[test]
    fn test_inverted_range_is_empty() {
        assert!(compute_score_series(&[], day(5), day(1)).is_empty());
    }

    #[test]
    fn test_deterministic() {
        let records = vec![full_record(day(2)), full_record(day(4))];
        let a = compute_score_series(&records, day(0), day(20));
        let b = compute_score_series(&records, day(0), day(20));
        assert_eq!(a, b);
    }

    #[test]
    fn test_duplicate_date_last_wins() {
        let bare = DailyActivityRecord::new(UserId::from("alice"), day(0));
        let records = [full_record(day(0)), bare.clone()];
        let full_then_bare = compute_score_series(&records, day(0), day(0));
        let bare_then_full = compute_score_series(&[bare, full_record(day(0))], day(0), day(0));
        assert_eq!(full_then_bare[0].value, 0.0);
        assert_eq!(bare_then_full[0].value, 5.0);
    }

    #[test]
    fn test_climate_companion_metric() {
        let record = full_record(day(1)).with_climate(3);
        let series = compute_score_series(&[record], day(0), day(2));
        assert_eq!(series[0].climate, None);
        assert_eq!(series[1].climate, Some(3));
    }

    #[test]
    fn test_sustained_deposits_stay_bounded() {
        let records: Vec<_> = (0..400).map(|i| full_record(day(i))).collect();
        let series = compute_score_series(&records, day(0), day(399));
        let last = latest_value(&series);
        assert!(last <= 100.0 && last > 99.0);
    }

    #[test]
    fn test_latest_value_default() {
        assert_eq!(latest_value(&[]), DEFAULT_LATEST_VALUE);
        assert_eq!(latest_value(&series_of(&[10.0, 12.5])), 12.5);
    }

    #[test]
    fn test_seven_day_delta_short_series() {
        assert_eq!(seven_day_delta(&[]), 0.0);
        assert_eq!(seven_day_delta(&series_of(&[40.0])), 0.0);
        assert_eq!(seven_day_delta(&series_of(&[40.0, 42.0, 45.5])), 5.5);
    }

    #[test]
    fn test_seven_day_delta_uses_seven_back() {
        let series = series_of(&[0.0, 10.0, 11.0, 12.0, 13.0, 14.0, 15.0, 16.0, 20.3]);
        // index 8 vs index 1
        assert_eq!(seven_day_delta(&series), 10.3);
    }

    #[test]
    fn test_multi_year_range_is_complete() {
        let start = day(0);
        let end = day(30 * 365);
        let series = compute_score_series(&[], start, end);

        assert_eq!(series.len() as i64, (end - start).num_days() + 1);
        assert_eq!(series.last().unwrap().date, end);
        assert_eq!(latest_value(&series), 25.0);
    }
}
