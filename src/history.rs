//! Append-only connection and push history (`~/.wssh_history`,
//! `~/.wssh_push_history`).

use std::io::Write as _;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Local};

pub const HISTORY_FILE: &str = ".wssh_history";
pub const PUSH_HISTORY_FILE: &str = ".wssh_push_history";

/// `~/.wssh_history`.
///
/// # Errors
///
/// Returns an error if the home directory cannot be determined.
pub fn history_path() -> Result<PathBuf> {
    home_file(HISTORY_FILE)
}

/// `~/.wssh_push_history`.
///
/// # Errors
///
/// Returns an error if the home directory cannot be determined.
pub fn push_history_path() -> Result<PathBuf> {
    home_file(PUSH_HISTORY_FILE)
}

fn home_file(name: &str) -> Result<PathBuf> {
    let home =
        dirs::home_dir().ok_or_else(|| anyhow::anyhow!("cannot determine home directory"))?;
    Ok(home.join(name))
}

/// Append `RFC3339,alias` to the connection log.
///
/// # Errors
///
/// Returns an error if the file cannot be opened or written.
pub fn log_connection(path: &Path, alias: &str) -> Result<()> {
    append_line(path, &format!("{},{alias}", Local::now().to_rfc3339()))
}

/// Append `RFC3339,alias,payload` to the push log.
///
/// # Errors
///
/// Returns an error if the file cannot be opened or written.
pub fn log_push(path: &Path, alias: &str, payload: &str) -> Result<()> {
    append_line(
        path,
        &format!("{},{alias},{payload}", Local::now().to_rfc3339()),
    )
}

fn append_line(path: &Path, line: &str) -> Result<()> {
    let mut file = std::fs::OpenOptions::new()
        .append(true)
        .create(true)
        .open(path)
        .with_context(|| format!("cannot open {}", path.display()))?;
    writeln!(file, "{line}").with_context(|| format!("cannot write {}", path.display()))
}

/// One parsed history line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    pub timestamp: String,
    pub alias: String,
}

/// Parse a `RFC3339,alias[,..]` line. Lines without a comma are ignored.
#[must_use]
pub fn parse_line(line: &str) -> Option<HistoryEntry> {
    let (timestamp, alias) = line.split_once(',')?;
    Some(HistoryEntry {
        timestamp: timestamp.to_string(),
        alias: alias.to_string(),
    })
}

/// The most recent `limit` entries, newest first. A missing file yields an
/// empty list, not an error.
///
/// # Errors
///
/// Returns an error only if an existing file cannot be read.
pub fn recent_entries(path: &Path, limit: usize) -> Result<Vec<HistoryEntry>> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => {
            return Err(err).with_context(|| format!("cannot read {}", path.display()));
        }
    };

    let mut entries: Vec<HistoryEntry> = content.lines().rev().filter_map(parse_line).collect();
    if limit > 0 {
        entries.truncate(limit);
    }
    Ok(entries)
}

/// Deduplicated recent aliases, newest first. Missing history is fine.
#[must_use]
pub fn recent_hosts(path: &Path) -> Vec<String> {
    let Ok(entries) = recent_entries(path, 0) else {
        return Vec::new();
    };
    let mut seen = std::collections::BTreeSet::new();
    entries
        .into_iter()
        .filter(|e| seen.insert(e.alias.clone()))
        .map(|e| e.alias)
        .collect()
}

/// `MM/DD HH:MM` rendering of an RFC3339 timestamp; falls back to the raw
/// string when it does not parse.
#[must_use]
pub fn format_timestamp(raw: &str) -> String {
    DateTime::parse_from_rfc3339(raw)
        .map_or_else(|_| raw.to_string(), |t| t.format("%m/%d %H:%M").to_string())
}
