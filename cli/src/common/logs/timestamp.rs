//! # Log Line Timestamps
//!
//! File: cli/src/common/logs/timestamp.rs
//!
//! With `timestamps=true` the engine prefixes every line with an RFC3339
//! instant followed by one space. Nanosecond precision gives the canonical
//! 30-character form, but trailing zeros of the fraction are trimmed, so the
//! prefix length varies. A line that carries no parseable instant keeps its
//! full text as content and is stamped with the current time.
//!
use crate::common::docker::types::{instant_from_rfc3339, LogEntry, LogStream};
use chrono::{DateTime, Utc};
use tracing::trace;

/// `2006-01-02T15:04:05.000000000Z`
const CANONICAL_LEN: usize = 30;

/// Offset forms with and without nanoseconds, then whole seconds in UTC.
const FALLBACK_LENS: [usize; 3] = [35, 25, 20];

pub fn parse_log_line(line: &str, stream: LogStream) -> LogEntry {
    match split_timestamp(line) {
        Some((timestamp, content)) => LogEntry {
            timestamp,
            stream,
            content: content.to_string(),
        },
        None => {
            trace!("No timestamp on log line, using now");
            LogEntry {
                timestamp: Utc::now(),
                stream,
                content: line.to_string(),
            }
        }
    }
}

fn split_timestamp(line: &str) -> Option<(DateTime<Utc>, &str)> {
    if let Some(found) = try_prefix(line, CANONICAL_LEN) {
        return Some(found);
    }
    if let Some(space) = line.find(' ') {
        if let Some(found) = try_prefix(line, space) {
            return Some(found);
        }
    }
    FALLBACK_LENS.iter().find_map(|&len| try_prefix(line, len))
}

fn try_prefix(line: &str, len: usize) -> Option<(DateTime<Utc>, &str)> {
    let prefix = line.get(..len)?;
    let rest = &line[len..];
    if !(rest.is_empty() || rest.starts_with(' ')) {
        return None;
    }
    let timestamp = instant_from_rfc3339(prefix)?;
    Some((timestamp, rest.strip_prefix(' ').unwrap_or(rest)))
}
