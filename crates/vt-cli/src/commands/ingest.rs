//! Ingest command: feed one presence change through the reconciler.
//!
//! This is the gateway boundary. Timezone normalization of naive timestamps
//! happens here, before anything reaches the reconciler.

use std::sync::Mutex;

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDateTime, TimeDelta, Utc};

use vt_core::{ChannelName, ParticipantId, PresenceChange};
use vt_db::Database;
use vt_session::{EpisodeEnded, EpisodeStarted, Notifier, NotifyError, Reconciler};

/// A notifier that prints announcements to stdout.
///
/// Stands in for the real announcement transport; delivery failures would be
/// logged by the reconciler without affecting the stored data.
pub struct StdoutNotifier;

impl Notifier for StdoutNotifier {
    fn episode_started(&self, started: &EpisodeStarted) -> Result<(), NotifyError> {
        println!(
            "Call started in #{} by {} at {}",
            started.channel,
            started.started_by,
            started.start.format("%Y-%m-%d %H:%M:%S")
        );
        Ok(())
    }

    fn episode_ended(&self, ended: &EpisodeEnded) -> Result<(), NotifyError> {
        println!(
            "Call ended in #{} after {}",
            ended.channel,
            ended.formatted_duration()
        );
        Ok(())
    }
}

/// Runs the ingest command.
pub fn run(
    db: Database,
    timezone_offset_hours: i64,
    participant: &str,
    display_name: Option<&str>,
    from: Option<&str>,
    to: Option<&str>,
    at: Option<&str>,
) -> Result<()> {
    let participant = ParticipantId::new(participant).context("invalid --participant")?;
    let change = PresenceChange {
        display_name: display_name.unwrap_or(participant.as_str()).to_string(),
        participant,
        previous_channel: parse_channel(from, "--from")?,
        new_channel: parse_channel(to, "--to")?,
        timestamp: parse_at(at, timezone_offset_hours)?,
    };

    let reconciler = Reconciler::new(Mutex::new(db), StdoutNotifier);
    let outcomes = reconciler.handle_change(&change)?;
    tracing::debug!(?outcomes, "presence change reconciled");
    Ok(())
}

fn parse_channel(channel: Option<&str>, flag: &str) -> Result<Option<ChannelName>> {
    channel
        .map(|name| ChannelName::new(name).with_context(|| format!("invalid {flag} channel")))
        .transpose()
}

/// Parses the `--at` timestamp.
///
/// Accepts RFC 3339, or a naive timestamp which is interpreted as local time
/// at the configured fixed offset. Defaults to the current time.
fn parse_at(at: Option<&str>, timezone_offset_hours: i64) -> Result<DateTime<Utc>> {
    let Some(at) = at else {
        return Ok(Utc::now());
    };
    if let Ok(parsed) = DateTime::parse_from_rfc3339(at) {
        return Ok(parsed.with_timezone(&Utc));
    }
    let naive = NaiveDateTime::parse_from_str(at, "%Y-%m-%dT%H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(at, "%Y-%m-%d %H:%M:%S"))
        .with_context(|| {
            format!("invalid --at timestamp {at}, expected RFC 3339 or YYYY-MM-DDTHH:MM:SS")
        })?;
    Ok(naive.and_utc() - TimeDelta::hours(timezone_offset_hours))
}
