//! Status command for showing ledger and session-store totals.

use std::io::Write;
use std::path::Path;

use anyhow::Result;

use vt_db::Database;

pub fn run<W: Write>(writer: &mut W, db: &Database, database_path: &Path) -> Result<()> {
    writeln!(writer, "Voice presence tracker status")?;
    writeln!(writer, "Database: {}", database_path.display())?;
    writeln!(writer, "Events: {}", db.event_count()?)?;
    writeln!(writer, "Intervals: {}", db.interval_count()?)?;

    let open = db.open_channels()?;
    if open.is_empty() {
        writeln!(writer, "Open channels: none")?;
    } else {
        writeln!(writer, "Open channels:")?;
        for channel in open {
            writeln!(writer, "- {channel}")?;
        }
    }

    Ok(())
}
