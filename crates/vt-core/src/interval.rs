//! Closed occupancy intervals, the analytics record of an episode.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::types::ChannelName;

/// One continuous episode during which a channel had at least one
/// participant present.
///
/// Created exactly once when the episode closes and never revised, even if
/// later evidence suggests the boundary was imprecise. For a fixed channel,
/// intervals never overlap and are strictly increasing in `start`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OccupancyInterval {
    /// The channel that was occupied.
    pub channel: ChannelName,
    /// Timestamp of the first enter event of the episode.
    pub start: DateTime<Utc>,
    /// Timestamp of the last exit event of the episode.
    pub end: DateTime<Utc>,
}

impl OccupancyInterval {
    /// Returns the episode duration.
    #[must_use]
    pub fn duration(&self) -> TimeDelta {
        self.end - self.start
    }
}

/// Formats a duration as `HH:MM:SS`.
///
/// Hours are not wrapped at 24, so a multi-day episode renders as e.g.
/// `49:10:05`. Negative durations are treated as zero (defensive).
#[must_use]
pub fn format_duration(duration: TimeDelta) -> String {
    let total_seconds = duration.num_seconds().max(0);
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;
    format!("{hours:02}:{minutes:02}:{seconds:02}")
}
