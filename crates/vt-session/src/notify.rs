//! Announcement shapes and the outbound notifier seam.
//!
//! Announcement delivery is best-effort: the reconciler logs a failed
//! delivery and moves on. The session store remains the source of truth, so
//! absence of an announcement never implies absence of the underlying
//! interval.

use chrono::{DateTime, TimeDelta, Utc};

use vt_core::{ChannelName, format_duration};

/// Error type for notifier implementations.
pub type NotifyError = Box<dyn std::error::Error + Send + Sync>;

/// An "episode started" announcement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EpisodeStarted {
    /// The channel that became occupied.
    pub channel: ChannelName,
    /// Display name of the participant whose enter opened the episode.
    pub started_by: String,
    /// When the episode started.
    pub start: DateTime<Utc>,
}

/// An "episode ended" announcement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EpisodeEnded {
    /// The channel that emptied out.
    pub channel: ChannelName,
    /// How long the episode lasted.
    pub duration: TimeDelta,
}

impl EpisodeEnded {
    /// The duration formatted as `HH:MM:SS` (hours not wrapped at 24).
    #[must_use]
    pub fn formatted_duration(&self) -> String {
        format_duration(self.duration)
    }
}

/// Outbound announcement collaborator.
///
/// Implementations deliver "episode started"/"episode ended" announcements
/// to humans. Errors are logged by the reconciler and never roll back the
/// ledger or the session store.
pub trait Notifier {
    fn episode_started(&self, started: &EpisodeStarted) -> Result<(), NotifyError>;
    fn episode_ended(&self, ended: &EpisodeEnded) -> Result<(), NotifyError>;
}

/// A notifier that writes announcements to the tracing log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn episode_started(&self, started: &EpisodeStarted) -> Result<(), NotifyError> {
        tracing::info!(
            channel = %started.channel,
            started_by = %started.started_by,
            start = %started.start,
            "episode started"
        );
        Ok(())
    }

    fn episode_ended(&self, ended: &EpisodeEnded) -> Result<(), NotifyError> {
        tracing::info!(
            channel = %ended.channel,
            duration = %ended.formatted_duration(),
            "episode ended"
        );
        Ok(())
    }
}
