//! Raw presence events from the upstream gateway.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{ChannelName, ParticipantId, ValidationError};

/// Whether a participant entered or exited a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Enter,
    Exit,
}

impl Direction {
    /// String representation for database storage.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Enter => "enter",
            Self::Exit => "exit",
        }
    }

    /// Returns the opposite direction.
    #[must_use]
    pub const fn opposite(&self) -> Self {
        match self {
            Self::Enter => Self::Exit,
            Self::Exit => Self::Enter,
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Direction {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "enter" => Ok(Self::Enter),
            "exit" => Ok(Self::Exit),
            _ => Err(ValidationError::InvalidDirection {
                value: s.to_string(),
            }),
        }
    }
}

/// A committed presence event in the ledger.
///
/// Immutable once committed; the full sequence per (participant, channel)
/// forms that participant's presence history and strictly alternates in
/// direction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceEvent {
    /// Who entered or exited.
    pub participant: ParticipantId,
    /// The channel the event applies to.
    pub channel: ChannelName,
    /// When the event occurred.
    pub timestamp: DateTime<Utc>,
    /// Enter or exit.
    pub direction: Direction,
}

/// A raw presence change as delivered by the upstream gateway.
///
/// One change can describe a move between channels, in which case it derives
/// an exit from the previous channel followed by an enter into the new one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceChange {
    /// Who changed presence.
    pub participant: ParticipantId,
    /// Human-readable name used in "episode started" announcements.
    pub display_name: String,
    /// The channel left, if any.
    pub previous_channel: Option<ChannelName>,
    /// The channel joined, if any.
    pub new_channel: Option<ChannelName>,
    /// When the change occurred.
    pub timestamp: DateTime<Utc>,
}

impl PresenceChange {
    /// Derives the per-channel transitions this change implies.
    ///
    /// The exit comes before the enter so that a move between channels closes
    /// bookkeeping on the old channel first. A change where the previous and
    /// new channels are equal is a no-op (mute/deafen toggles arrive this
    /// way from some gateways).
    #[must_use]
    pub fn transitions(&self) -> Vec<(ChannelName, Direction)> {
        if self.previous_channel == self.new_channel {
            return Vec::new();
        }
        let mut transitions = Vec::with_capacity(2);
        if let Some(previous) = &self.previous_channel {
            transitions.push((previous.clone(), Direction::Exit));
        }
        if let Some(new) = &self.new_channel {
            transitions.push((new.clone(), Direction::Enter));
        }
        transitions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn change(previous: Option<&str>, new: Option<&str>) -> PresenceChange {
        PresenceChange {
            participant: ParticipantId::new("1").unwrap(),
            display_name: "alice".to_string(),
            previous_channel: previous.map(|c| ChannelName::new(c).unwrap()),
            new_channel: new.map(|c| ChannelName::new(c).unwrap()),
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn direction_from_str() {
        assert_eq!("enter".parse::<Direction>().unwrap(), Direction::Enter);
        assert_eq!("exit".parse::<Direction>().unwrap(), Direction::Exit);
        assert!("joined".parse::<Direction>().is_err());
    }

    #[test]
    fn direction_serde_uses_lowercase() {
        let json = serde_json::to_string(&Direction::Enter).unwrap();
        assert_eq!(json, "\"enter\"");
        let parsed: Direction = serde_json::from_str("\"exit\"").unwrap();
        assert_eq!(parsed, Direction::Exit);
    }

    #[test]
    fn join_derives_single_enter() {
        let transitions = change(None, Some("general")).transitions();
        assert_eq!(transitions.len(), 1);
        assert_eq!(transitions[0].0.as_str(), "general");
        assert_eq!(transitions[0].1, Direction::Enter);
    }

    #[test]
    fn leave_derives_single_exit() {
        let transitions = change(Some("general"), None).transitions();
        assert_eq!(transitions.len(), 1);
        assert_eq!(transitions[0].1, Direction::Exit);
    }

    #[test]
    fn move_derives_exit_then_enter() {
        let transitions = change(Some("general"), Some("gaming")).transitions();
        assert_eq!(transitions.len(), 2);
        assert_eq!(transitions[0], (ChannelName::new("general").unwrap(), Direction::Exit));
        assert_eq!(transitions[1], (ChannelName::new("gaming").unwrap(), Direction::Enter));
    }

    #[test]
    fn same_channel_is_noop() {
        assert!(change(Some("general"), Some("general")).transitions().is_empty());
        assert!(change(None, None).transitions().is_empty());
    }

    #[test]
    fn presence_event_serde_roundtrip() {
        let event = PresenceEvent {
            participant: ParticipantId::new("42").unwrap(),
            channel: ChannelName::new("general").unwrap(),
            timestamp: Utc::now(),
            direction: Direction::Enter,
        };

        let json = serde_json::to_string(&event).unwrap();
        let parsed: PresenceEvent = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed.participant, event.participant);
        assert_eq!(parsed.direction, event.direction);
    }
}
