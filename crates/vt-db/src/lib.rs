//! Storage layer for the voice presence tracker.
//!
//! Provides persistence for the presence ledger and the session store using
//! `rusqlite`.
//!
//! # Thread Safety
//!
//! The [`Database`] type wraps a `rusqlite::Connection`, which is `Send` but
//! not `Sync`. A `Database` instance can be moved between threads but cannot
//! be shared across threads without external synchronization. The reconciler
//! in `vt-session` holds it behind a `Mutex`, which also serializes the
//! read-check-write sequences that the alternation and materialization
//! invariants depend on.
//!
//! # Schema
//!
//! ## Timestamp Format
//!
//! Timestamps are stored as TEXT in RFC 3339 format with millisecond
//! precision (e.g., `2025-01-15T10:30:00.000Z`). This ensures:
//! - Lexicographic ordering matches chronological ordering
//! - Human-readable values in the database
//! - Timezone-aware (always UTC)
//!
//! All cutoff comparisons (`timestamp > ?`) rely on this property, so every
//! timestamp written to the database must go through [`format_timestamp`].
//!
//! ## Tables
//!
//! - `presence_events` is the append-only ledger of raw enter/exit events.
//!   Rows are never updated or deleted; they form the audit trail.
//! - `occupancy_intervals` is the session store of closed episodes. Rows are
//!   inserted once at episode closure and never revised.

use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use thiserror::Error;

use vt_core::{ChannelName, Direction, OccupancyInterval, ParticipantId};

/// Timestamp floor used as the cutoff for channels with no stored interval.
const EPOCH_FLOOR: &str = "1970-01-01T00:00:00.000Z";

/// Database errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// An error from the underlying database.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// Failed to parse a stored timestamp.
    #[error("invalid stored timestamp: {timestamp}")]
    TimestampParse {
        timestamp: String,
        #[source]
        source: chrono::ParseError,
    },
    /// A stored row failed domain validation.
    #[error("invalid stored row: {message}")]
    InvalidRow { message: String },
}

/// Database connection wrapper.
///
/// See the [module documentation](self) for thread safety considerations.
pub struct Database {
    conn: Connection,
}

/// Enter/exit counts for a channel since a cutoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventCounts {
    pub enters: i64,
    pub exits: i64,
}

impl EventCounts {
    /// True iff the episode behind these counts is closed: every enter has
    /// been matched by an exit and at least one pair exists.
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        self.enters == self.exits && self.enters > 0
    }

    /// True iff the channel currently has an open episode.
    #[must_use]
    pub const fn is_open(&self) -> bool {
        self.enters > self.exits
    }
}

impl Database {
    /// Opens a database at the given path, creating it if necessary.
    ///
    /// The database schema is automatically initialized on first open.
    pub fn open(path: &Path) -> Result<Self, DbError> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Opens an in-memory database.
    ///
    /// Useful for testing. The database is destroyed when the connection closes.
    pub fn open_in_memory() -> Result<Self, DbError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Initializes the database schema.
    ///
    /// This is idempotent - safe to call on an already-initialized database.
    fn init(&self) -> Result<(), DbError> {
        self.conn.execute_batch(
            "
            -- Presence ledger: append-only raw enter/exit events
            -- timestamp: RFC 3339 format (e.g., '2025-01-15T10:30:00.000Z')
            -- direction: 'enter' or 'exit'
            CREATE TABLE IF NOT EXISTS presence_events (
                participant_id TEXT NOT NULL,
                channel TEXT NOT NULL,
                timestamp TEXT NOT NULL,
                direction TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_events_key
                ON presence_events(participant_id, channel, timestamp);
            CREATE INDEX IF NOT EXISTS idx_events_channel
                ON presence_events(channel, timestamp);

            -- Session store: closed occupancy episodes
            CREATE TABLE IF NOT EXISTS occupancy_intervals (
                channel TEXT NOT NULL,
                start TEXT NOT NULL,
                end TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_intervals_channel_end
                ON occupancy_intervals(channel, end);
            ",
        )?;
        tracing::debug!("database schema initialized");
        Ok(())
    }

    // ========== Ledger ==========

    /// Returns the direction of the most recently committed event for the
    /// given (participant, channel) key, or `None` if no history exists.
    ///
    /// This is the guard's read: the next committable direction must differ
    /// from the returned one.
    pub fn last_direction(
        &self,
        participant: &ParticipantId,
        channel: &ChannelName,
    ) -> Result<Option<Direction>, DbError> {
        let direction: Option<String> = self
            .conn
            .query_row(
                "
                SELECT direction FROM presence_events
                WHERE participant_id = ? AND channel = ?
                ORDER BY timestamp DESC
                LIMIT 1
                ",
                params![participant.as_str(), channel.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        match direction {
            None => Ok(None),
            Some(direction) => direction
                .parse::<Direction>()
                .map(Some)
                .map_err(|err| DbError::InvalidRow {
                    message: err.to_string(),
                }),
        }
    }

    /// Appends a presence event to the ledger.
    pub fn insert_event(&self, event: &vt_core::PresenceEvent) -> Result<(), DbError> {
        self.conn.execute(
            "
            INSERT INTO presence_events (participant_id, channel, timestamp, direction)
            VALUES (?, ?, ?, ?)
            ",
            params![
                event.participant.as_str(),
                event.channel.as_str(),
                format_timestamp(event.timestamp),
                event.direction.as_str(),
            ],
        )?;
        Ok(())
    }

    /// Lists ledger events, optionally scoped to one channel, ordered by
    /// timestamp ascending.
    pub fn list_events(
        &self,
        channel: Option<&ChannelName>,
    ) -> Result<Vec<vt_core::PresenceEvent>, DbError> {
        let mut stmt = self.conn.prepare(
            "
            SELECT participant_id, channel, timestamp, direction
            FROM presence_events
            WHERE (?1 IS NULL OR channel = ?1)
            ORDER BY timestamp ASC, rowid ASC
            ",
        )?;
        let rows = stmt.query_map(params![channel.map(ChannelName::as_str)], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
            ))
        })?;
        let mut events = Vec::new();
        for row in rows {
            let (participant, channel, timestamp, direction) = row?;
            events.push(vt_core::PresenceEvent {
                participant: ParticipantId::new(participant).map_err(invalid_row)?,
                channel: ChannelName::new(channel).map_err(invalid_row)?,
                timestamp: parse_timestamp(&timestamp)?,
                direction: direction.parse().map_err(invalid_row)?,
            });
        }
        Ok(events)
    }

    /// Counts all ledger events.
    pub fn event_count(&self) -> Result<i64, DbError> {
        let count =
            self.conn
                .query_row("SELECT COUNT(*) FROM presence_events", [], |row| row.get(0))?;
        Ok(count)
    }

    // ========== Occupancy queries ==========

    /// Returns the channel's cutoff: the `end` of its most recently stored
    /// interval, or `None` if no interval exists yet.
    pub fn last_interval_end(
        &self,
        channel: &ChannelName,
    ) -> Result<Option<DateTime<Utc>>, DbError> {
        let end: Option<String> = self
            .conn
            .query_row(
                "
                SELECT end FROM occupancy_intervals
                WHERE channel = ?
                ORDER BY end DESC
                LIMIT 1
                ",
                params![channel.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        end.as_deref().map(parse_timestamp).transpose()
    }

    /// Counts enter and exit events for a channel strictly after the cutoff.
    ///
    /// The cutoff is the explicit per-channel value from
    /// [`last_interval_end`](Self::last_interval_end); `None` scopes the
    /// count to the whole ledger.
    pub fn counts_since(
        &self,
        channel: &ChannelName,
        cutoff: Option<DateTime<Utc>>,
    ) -> Result<EventCounts, DbError> {
        let enters = self.count_since(channel, cutoff, Direction::Enter)?;
        let exits = self.count_since(channel, cutoff, Direction::Exit)?;
        Ok(EventCounts { enters, exits })
    }

    fn count_since(
        &self,
        channel: &ChannelName,
        cutoff: Option<DateTime<Utc>>,
        direction: Direction,
    ) -> Result<i64, DbError> {
        let count = self.conn.query_row(
            "
            SELECT COUNT(*) FROM presence_events
            WHERE channel = ? AND timestamp > ? AND direction = ?
            ",
            params![channel.as_str(), cutoff_text(cutoff), direction.as_str()],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// True iff the participant has an exit event in this channel after the
    /// cutoff, meaning they were already counted present in the still-open
    /// episode and are merely re-entering.
    pub fn participant_exited_since(
        &self,
        participant: &ParticipantId,
        channel: &ChannelName,
        cutoff: Option<DateTime<Utc>>,
    ) -> Result<bool, DbError> {
        let exists = self.conn.query_row(
            "
            SELECT EXISTS(
                SELECT 1 FROM presence_events
                WHERE participant_id = ? AND channel = ?
                  AND timestamp > ? AND direction = 'exit'
            )
            ",
            params![
                participant.as_str(),
                channel.as_str(),
                cutoff_text(cutoff)
            ],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    /// Returns the bounds of the episode after the cutoff: the earliest
    /// enter timestamp and the latest exit timestamp.
    ///
    /// Returns `None` if either bound is missing. The reconciler only calls
    /// this after the counter proved closure, so a `None` there indicates a
    /// consistency violation.
    pub fn episode_bounds(
        &self,
        channel: &ChannelName,
        cutoff: Option<DateTime<Utc>>,
    ) -> Result<Option<(DateTime<Utc>, DateTime<Utc>)>, DbError> {
        let bounds: (Option<String>, Option<String>) = self.conn.query_row(
            "
            SELECT
                MIN(CASE WHEN direction = 'enter' THEN timestamp END),
                MAX(CASE WHEN direction = 'exit' THEN timestamp END)
            FROM presence_events
            WHERE channel = ? AND timestamp > ?
            ",
            params![channel.as_str(), cutoff_text(cutoff)],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        match bounds {
            (Some(start), Some(end)) => {
                Ok(Some((parse_timestamp(&start)?, parse_timestamp(&end)?)))
            }
            _ => Ok(None),
        }
    }

    /// Lists channels that currently have an open episode.
    pub fn open_channels(&self) -> Result<Vec<ChannelName>, DbError> {
        let mut stmt = self.conn.prepare(
            "SELECT DISTINCT channel FROM presence_events ORDER BY channel ASC",
        )?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        let mut open = Vec::new();
        for row in rows {
            let channel = ChannelName::new(row?).map_err(invalid_row)?;
            let cutoff = self.last_interval_end(&channel)?;
            if self.counts_since(&channel, cutoff)?.is_open() {
                open.push(channel);
            }
        }
        Ok(open)
    }

    // ========== Session store ==========

    /// Stores a closed occupancy interval.
    pub fn insert_interval(&self, interval: &OccupancyInterval) -> Result<(), DbError> {
        self.conn.execute(
            "INSERT INTO occupancy_intervals (channel, start, end) VALUES (?, ?, ?)",
            params![
                interval.channel.as_str(),
                format_timestamp(interval.start),
                format_timestamp(interval.end),
            ],
        )?;
        Ok(())
    }

    /// Lists stored intervals, optionally scoped to one channel, ordered by
    /// start ascending.
    pub fn list_intervals(
        &self,
        channel: Option<&ChannelName>,
    ) -> Result<Vec<OccupancyInterval>, DbError> {
        let mut stmt = self.conn.prepare(
            "
            SELECT channel, start, end
            FROM occupancy_intervals
            WHERE (?1 IS NULL OR channel = ?1)
            ORDER BY start ASC
            ",
        )?;
        let rows = stmt.query_map(params![channel.map(ChannelName::as_str)], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?;
        let mut intervals = Vec::new();
        for row in rows {
            let (channel, start, end) = row?;
            intervals.push(OccupancyInterval {
                channel: ChannelName::new(channel).map_err(invalid_row)?,
                start: parse_timestamp(&start)?,
                end: parse_timestamp(&end)?,
            });
        }
        Ok(intervals)
    }

    /// Counts all stored intervals.
    pub fn interval_count(&self) -> Result<i64, DbError> {
        let count = self.conn.query_row(
            "SELECT COUNT(*) FROM occupancy_intervals",
            [],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

fn invalid_row(err: impl std::fmt::Display) -> DbError {
    DbError::InvalidRow {
        message: err.to_string(),
    }
}

fn cutoff_text(cutoff: Option<DateTime<Utc>>) -> String {
    cutoff.map_or_else(|| EPOCH_FLOOR.to_string(), format_timestamp)
}

/// Parses a stored RFC 3339 timestamp back into UTC.
pub fn parse_timestamp(timestamp: &str) -> Result<DateTime<Utc>, DbError> {
    DateTime::parse_from_rfc3339(timestamp)
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|source| DbError::TimestampParse {
            timestamp: timestamp.to_string(),
            source,
        })
}

/// Formats a timestamp for storage.
pub fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
}
