//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Voice channel presence tracker.
///
/// Reconciles enter/exit presence events into closed occupancy intervals
/// and announces when a channel's call starts and ends.
#[derive(Debug, Parser)]
#[command(name = "vt", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Feed one presence change from the gateway.
    Ingest {
        /// The participant whose presence changed.
        #[arg(long)]
        participant: String,

        /// Display name used in "episode started" announcements.
        /// Defaults to the participant ID.
        #[arg(long)]
        name: Option<String>,

        /// The channel the participant left, if any.
        #[arg(long)]
        from: Option<String>,

        /// The channel the participant joined, if any.
        #[arg(long)]
        to: Option<String>,

        /// Event timestamp: RFC 3339, or a naive local timestamp normalized
        /// with the configured timezone offset. Defaults to now.
        #[arg(long)]
        at: Option<String>,
    },

    /// List closed occupancy intervals.
    Intervals {
        /// Scope to one channel.
        #[arg(long)]
        channel: Option<String>,

        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Dump the raw presence ledger as JSONL.
    Events {
        /// Scope to one channel.
        #[arg(long)]
        channel: Option<String>,
    },

    /// Show per-day occupancy load (heatmap aggregates).
    Report {
        /// Scope to one channel.
        #[arg(long)]
        channel: Option<String>,

        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Show database path, counts, and channels with open episodes.
    Status,
}
