//! Report command: per-day occupancy load for heatmap rendering.

use std::io::Write;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::Serialize;

use vt_core::{ChannelName, daily_load};
use vt_db::Database;

/// One day of aggregated occupancy, for JSON output.
#[derive(Debug, Serialize)]
pub struct DayLoad {
    pub date: NaiveDate,
    /// Fraction of a 24-hour day the channel(s) were occupied.
    pub load: f64,
}

/// Generates a 10-character progress bar.
/// Values <5% of max get a single block for visibility.
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
fn progress_bar(value: f64, max: f64) -> String {
    if max <= 0.0 {
        return "░░░░░░░░░░".to_string();
    }

    let ratio = value / max;
    let filled = if ratio < 0.05 && value > 0.0 {
        1
    } else {
        (ratio * 10.0).round().min(10.0) as usize
    };

    let empty = 10 - filled;
    format!("{}{}", "█".repeat(filled), "░".repeat(empty))
}

/// Runs the report command.
pub fn run<W: Write>(
    writer: &mut W,
    db: &Database,
    channel: Option<&str>,
    json: bool,
) -> Result<()> {
    let channel = channel
        .map(|name| ChannelName::new(name).context("invalid --channel"))
        .transpose()?;

    let intervals = db.list_intervals(channel.as_ref())?;
    let by_day = daily_load(&intervals);

    let days: Vec<DayLoad> = by_day
        .into_iter()
        .map(|(date, load)| DayLoad { date, load })
        .collect();

    if json {
        writeln!(writer, "{}", serde_json::to_string_pretty(&days)?)?;
        return Ok(());
    }

    if days.is_empty() {
        writeln!(writer, "No occupancy recorded.")?;
        return Ok(());
    }

    let max = days.iter().map(|day| day.load).fold(0.0, f64::max);
    for day in days {
        writeln!(
            writer,
            "{}  {:.3}  {}",
            day.date,
            day.load,
            progress_bar(day.load, max)
        )?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::{DateTime, Utc};
    use insta::assert_snapshot;
    use vt_core::OccupancyInterval;

    fn ts(timestamp: &str) -> DateTime<Utc> {
        timestamp.parse::<DateTime<Utc>>().unwrap()
    }

    fn seeded_db() -> Database {
        let db = Database::open_in_memory().unwrap();
        // 6h on Jan 1, 12h on Jan 2
        db.insert_interval(&OccupancyInterval {
            channel: ChannelName::new("general").unwrap(),
            start: ts("2025-01-01T00:00:00Z"),
            end: ts("2025-01-01T06:00:00Z"),
        })
        .unwrap();
        db.insert_interval(&OccupancyInterval {
            channel: ChannelName::new("general").unwrap(),
            start: ts("2025-01-02T00:00:00Z"),
            end: ts("2025-01-02T12:00:00Z"),
        })
        .unwrap();
        db
    }

    #[test]
    fn report_renders_day_rows_with_bars() {
        let db = seeded_db();
        let mut output = Vec::new();
        run(&mut output, &db, None, false).unwrap();

        let output = String::from_utf8(output).unwrap();
        assert_snapshot!(output.trim_end(), @r"
        2025-01-01  0.250  █████░░░░░
        2025-01-02  0.500  ██████████
        ");
    }

    #[test]
    fn report_json_lists_days_in_order() {
        let db = seeded_db();
        let mut output = Vec::new();
        run(&mut output, &db, None, true).unwrap();

        let parsed: Vec<serde_json::Value> = serde_json::from_slice(&output).unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0]["date"], "2025-01-01");
        assert!((parsed[0]["load"].as_f64().unwrap() - 0.25).abs() < 1e-9);
    }

    #[test]
    fn empty_store_prints_placeholder() {
        let db = Database::open_in_memory().unwrap();
        let mut output = Vec::new();
        run(&mut output, &db, None, false).unwrap();
        assert_eq!(String::from_utf8(output).unwrap(), "No occupancy recorded.\n");
    }

    #[test]
    fn progress_bar_minimum_visibility() {
        assert_eq!(progress_bar(0.01, 1.0), "█░░░░░░░░░");
        assert_eq!(progress_bar(0.0, 1.0), "░░░░░░░░░░");
        assert_eq!(progress_bar(1.0, 1.0), "██████████");
        assert_eq!(progress_bar(0.0, 0.0), "░░░░░░░░░░");
    }
}
