//! Session reconciler for the voice presence tracker.
//!
//! Turns raw presence changes from the upstream gateway into a durable,
//! de-duplicated ledger of enter/exit events and closed occupancy intervals.
//! Per incoming event the reconciler:
//!
//! 1. Checks the guard: the event's direction must alternate with the last
//!    committed event for the same (participant, channel) key, and a key
//!    with no history only admits an enter. Rejections are logged and
//!    dropped; this is the idempotency boundary against at-least-once
//!    upstream delivery.
//! 2. Commits the event to the ledger.
//! 3. On enter, suppresses the "episode started" announcement when the
//!    participant is merely rejoining a still-open episode.
//! 4. On exit, recounts enters and exits since the channel's cutoff; when
//!    they balance, materializes the episode as an occupancy interval and
//!    announces its duration.
//!
//! The channel state machine (`Idle`/`Open`) is recomputed from stored counts
//! on every exit rather than held in memory, so a process restart loses
//! nothing. The cutoff (the `end` of the channel's last interval) is fetched
//! once per event and passed explicitly through every query.
//!
//! # Concurrency
//!
//! The reconciler holds its [`Database`] behind a `Mutex` and processes each
//! event to completion under the lock. Same-key commits and per-channel
//! materialization therefore serialize, which is what the alternation and
//! at-most-once-materialization invariants require.

mod notify;

pub use notify::{EpisodeEnded, EpisodeStarted, LogNotifier, Notifier, NotifyError};

use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use thiserror::Error;

use vt_core::{ChannelName, Direction, OccupancyInterval, ParticipantId, PresenceChange, PresenceEvent};
use vt_db::{Database, DbError};

/// Reconciler errors.
#[derive(Debug, Error)]
pub enum SessionError {
    /// A durable-store call failed; processing of this event is aborted
    /// without side effects beyond what already committed.
    #[error(transparent)]
    Db(#[from] DbError),
    /// The counter proved closure but the episode bounds lookup came back
    /// empty. Indicates data corruption; the episode is left unmaterialized
    /// for manual inspection.
    #[error("episode closed for channel {channel} but bounds lookup found no events")]
    ConsistencyViolation { channel: ChannelName },
}

/// What the reconciler did with one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The guard rejected the event; nothing was committed.
    Filtered,
    /// The event was committed without an announcement.
    Recorded,
    /// An enter was committed and opened (or was the announced start of) a
    /// new episode.
    EpisodeStarted,
    /// An exit was committed and closed the episode; the interval was
    /// materialized.
    EpisodeClosed(OccupancyInterval),
}

/// Orchestrates the guard, the occupancy counter, and interval
/// materialization over the durable store.
pub struct Reconciler<N: Notifier> {
    db: Mutex<Database>,
    notifier: N,
}

impl<N: Notifier> Reconciler<N> {
    pub const fn new(db: Mutex<Database>, notifier: N) -> Self {
        Self { db, notifier }
    }

    /// Consumes the reconciler, returning the wrapped database.
    pub fn into_database(self) -> Database {
        self.db
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn db(&self) -> MutexGuard<'_, Database> {
        // A poisoned lock means another handler panicked mid-event; the
        // store itself is still consistent (every write is a single insert).
        self.db.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Handles one raw presence change from the gateway.
    ///
    /// Derives at most one exit (from the previous channel) and one enter
    /// (into the new channel), in that order, and reconciles each. A change
    /// where the channels are equal is a no-op.
    pub fn handle_change(&self, change: &PresenceChange) -> Result<Vec<Outcome>, SessionError> {
        let mut outcomes = Vec::new();
        for (channel, direction) in change.transitions() {
            outcomes.push(self.handle_event(
                &change.participant,
                &change.display_name,
                &channel,
                change.timestamp,
                direction,
            )?);
        }
        Ok(outcomes)
    }

    /// Reconciles a single enter/exit event.
    pub fn handle_event(
        &self,
        participant: &ParticipantId,
        display_name: &str,
        channel: &ChannelName,
        timestamp: DateTime<Utc>,
        direction: Direction,
    ) -> Result<Outcome, SessionError> {
        let db = self.db();

        // Guard: enforce per-key alternation before anything is written.
        if !is_committable(&db, participant, channel, direction)? {
            tracing::info!(
                %participant,
                %channel,
                %direction,
                "skipped presence event: alternation violation"
            );
            return Ok(Outcome::Filtered);
        }

        tracing::info!(%participant, %channel, %direction, "presence event");
        db.insert_event(&PresenceEvent {
            participant: participant.clone(),
            channel: channel.clone(),
            timestamp,
            direction,
        })?;

        let cutoff = db.last_interval_end(channel)?;
        match direction {
            Direction::Enter => {
                // The "started" announcement marks the Idle -> Open
                // transition. Suppress it when the episode was already open
                // before this enter, and when the participant is merely
                // rejoining (they have an exit on record inside the open
                // episode).
                let counts = db.counts_since(channel, cutoff)?;
                let was_open = counts.enters - 1 > counts.exits;
                if was_open || db.participant_exited_since(participant, channel, cutoff)? {
                    return Ok(Outcome::Recorded);
                }
                self.announce_started(&EpisodeStarted {
                    channel: channel.clone(),
                    started_by: display_name.to_string(),
                    start: timestamp,
                });
                Ok(Outcome::EpisodeStarted)
            }
            Direction::Exit => {
                if !db.counts_since(channel, cutoff)?.is_closed() {
                    return Ok(Outcome::Recorded);
                }
                let Some((start, end)) = db.episode_bounds(channel, cutoff)? else {
                    return Err(SessionError::ConsistencyViolation {
                        channel: channel.clone(),
                    });
                };
                let interval = OccupancyInterval {
                    channel: channel.clone(),
                    start,
                    end,
                };
                db.insert_interval(&interval)?;
                self.announce_ended(&EpisodeEnded {
                    channel: channel.clone(),
                    duration: interval.duration(),
                });
                Ok(Outcome::EpisodeClosed(interval))
            }
        }
    }

    fn announce_started(&self, started: &EpisodeStarted) {
        if let Err(err) = self.notifier.episode_started(started) {
            tracing::warn!(channel = %started.channel, error = %err, "failed to announce episode start");
        }
    }

    fn announce_ended(&self, ended: &EpisodeEnded) {
        if let Err(err) = self.notifier.episode_ended(ended) {
            tracing::warn!(channel = %ended.channel, error = %err, "failed to announce episode end");
        }
    }
}

/// The participant state guard.
///
/// An event is committable iff the most recently committed direction for the
/// key differs from the candidate. A key with no history only admits an
/// enter, so every committed sequence starts with one. Read-only.
fn is_committable(
    db: &Database,
    participant: &ParticipantId,
    channel: &ChannelName,
    direction: Direction,
) -> Result<bool, SessionError> {
    let last = db.last_direction(participant, channel)?;
    Ok(last.map_or(direction == Direction::Enter, |last| last != direction))
}
