//! Core domain logic for the voice presence tracker.
//!
//! This crate contains the fundamental types and logic for:
//! - Presence events: Enter/Exit signals per participant and channel
//! - Occupancy intervals: closed episodes during which a channel was occupied
//! - Daily load aggregation: per-day occupancy fractions for heatmap rendering

pub mod event;
pub mod interval;
pub mod load;
pub mod types;

pub use event::{Direction, PresenceChange, PresenceEvent};
pub use interval::{OccupancyInterval, format_duration};
pub use load::daily_load;
pub use types::{ChannelName, ParticipantId, ValidationError};
