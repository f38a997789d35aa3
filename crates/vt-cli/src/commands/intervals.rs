//! Intervals command: the analytics read model over the session store.

use std::io::Write;

use anyhow::{Context, Result};

use vt_core::{ChannelName, format_duration};
use vt_db::Database;

/// Runs the intervals command.
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

    if json {
        writeln!(writer, "{}", serde_json::to_string_pretty(&intervals)?)?;
        return Ok(());
    }

    if intervals.is_empty() {
        writeln!(writer, "No intervals recorded.")?;
        return Ok(());
    }

    for interval in intervals {
        writeln!(
            writer,
            "{}  {}  {}  {}",
            interval.channel,
            interval.start.format("%Y-%m-%dT%H:%M:%SZ"),
            interval.end.format("%Y-%m-%dT%H:%M:%SZ"),
            format_duration(interval.duration()),
        )?;
    }

    Ok(())
}
