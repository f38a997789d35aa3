//! CLI subcommand implementations.

pub mod events;
pub mod ingest;
pub mod intervals;
pub mod report;
pub mod status;
