//! CLI subcommand implementations.

pub mod format_duration;
pub mod run;
