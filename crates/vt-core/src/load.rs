//! Per-day occupancy aggregation for heatmap rendering.

use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::interval::OccupancyInterval;

const SECONDS_OF_24_HOURS: f64 = 86_400.0;

/// Aggregates intervals into per-day occupancy load.
///
/// Each interval's full duration is attributed to the calendar day (UTC) of
/// its `start`, normalized to 24-hour units, so a day fully occupied by one
/// channel sums to 1.0. Intervals spanning midnight are not split; the whole
/// duration lands on the start day, matching how the heatmap consumer
/// interprets the data.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn daily_load(intervals: &[OccupancyInterval]) -> BTreeMap<NaiveDate, f64> {
    let mut by_day: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for interval in intervals {
        let seconds = interval.duration().num_seconds().max(0) as f64;
        *by_day.entry(interval.start.date_naive()).or_insert(0.0) +=
            seconds / SECONDS_OF_24_HOURS;
    }
    by_day
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ChannelName;
    use chrono::{DateTime, Utc};

    fn interval(start: &str, end: &str) -> OccupancyInterval {
        OccupancyInterval {
            channel: ChannelName::new("general").unwrap(),
            start: start.parse::<DateTime<Utc>>().unwrap(),
            end: end.parse::<DateTime<Utc>>().unwrap(),
        }
    }

    #[test]
    fn empty_input_yields_empty_map() {
        assert!(daily_load(&[]).is_empty());
    }

    #[test]
    fn six_hours_is_a_quarter_day() {
        let by_day = daily_load(&[interval("2025-01-01T00:00:00Z", "2025-01-01T06:00:00Z")]);
        let date = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        assert!((by_day[&date] - 0.25).abs() < 1e-9);
    }

    #[test]
    fn same_day_intervals_accumulate() {
        let by_day = daily_load(&[
            interval("2025-01-01T00:00:00Z", "2025-01-01T06:00:00Z"),
            interval("2025-01-01T12:00:00Z", "2025-01-01T18:00:00Z"),
        ]);
        let date = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        assert_eq!(by_day.len(), 1);
        assert!((by_day[&date] - 0.5).abs() < 1e-9);
    }

    #[test]
    fn midnight_spanning_interval_lands_on_start_day() {
        let by_day = daily_load(&[interval("2025-01-01T22:00:00Z", "2025-01-02T04:00:00Z")]);
        let start_day = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        assert_eq!(by_day.len(), 1);
        assert!((by_day[&start_day] - 0.25).abs() < 1e-9);
    }

    #[test]
    fn days_are_ordered() {
        let by_day = daily_load(&[
            interval("2025-01-03T00:00:00Z", "2025-01-03T01:00:00Z"),
            interval("2025-01-01T00:00:00Z", "2025-01-01T01:00:00Z"),
        ]);
        let days: Vec<_> = by_day.keys().copied().collect();
        assert_eq!(
            days,
            vec![
                NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
                NaiveDate::from_ymd_opt(2025, 1, 3).unwrap(),
            ]
        );
    }
}
