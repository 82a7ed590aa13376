//! Format duration command.

use std::io::Write;

use anyhow::{Context, Result};
use chrono::Duration;

pub fn run<W: Write>(writer: &mut W, ms: i64) -> Result<()> {
    let duration = Duration::try_milliseconds(ms).context("duration out of range")?;
    writeln!(writer, "{}", vl_core::format_duration(duration))?;
    Ok(())
}
