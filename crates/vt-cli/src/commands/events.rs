//! Events command for dumping the raw presence ledger.
//!
//! This module outputs ledger events as JSONL for auditing and debugging.

use anyhow::{Context, Result};

use vt_core::ChannelName;
use vt_db::Database;

/// Runs the events command, outputting events as JSONL to stdout.
pub fn run(db: &Database, channel: Option<&str>) -> Result<()> {
    let channel = channel
        .map(|name| ChannelName::new(name).context("invalid --channel"))
        .transpose()?;

    let events = db.list_events(channel.as_ref())?;

    for event in events {
        let json = serde_json::to_string(&event)?;
        println!("{json}");
    }

    Ok(())
}
