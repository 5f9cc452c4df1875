//! `wssh history` — recent connections, newest first.

use anyhow::Result;

use crate::history::{format_timestamp, history_path, recent_entries};
use crate::output::OutputContext;

/// How many connections `wssh history` shows.
const HISTORY_LIMIT: usize = 20;

/// Run `wssh history`.
///
/// # Errors
///
/// Returns an error if an existing history file cannot be read.
pub fn run(ctx: &OutputContext) -> Result<()> {
    let path = history_path()?;
    let entries = recent_entries(&path, HISTORY_LIMIT)?;

    if entries.is_empty() {
        ctx.info("no connection history found yet");
        return Ok(());
    }

    ctx.header("Recent Connections");
    for entry in &entries {
        println!("  {} | {}", format_timestamp(&entry.timestamp), entry.alias);
    }
    Ok(())
}
