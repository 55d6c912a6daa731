//! # Container Log Retrieval
//!
//! File: cli/src/common/docker/service/logs.rs
//!
//! ## Overview
//!
//! Two ways to read a container's logs, both with engine timestamps on every
//! line and both streams requested:
//!
//! - **`get_container_logs`**: the last `tail` lines, returned at once. The
//!   body is first read as multiplexed frames; if it is not framed (TTY
//!   containers), the request is issued again and the body read as raw
//!   stdout. Entries are merged across streams by timestamp, stable.
//! - **`stream_container_logs`**: a live follow starting at `tail=0`. A worker
//!   task demultiplexes the body, parses lines and sends entries over a
//!   bounded channel. Unframed bodies switch to raw mode in place.
//!
//! ## Cancellation
//!
//! `CancelHandle::cancel` may be called any number of times. The worker
//! observes it both while waiting for engine bytes and while waiting for room
//! in the channel, and on exit closes the log channel before the error
//! channel.
//!
use super::EngineService;
use crate::common::docker::api::{LogBody, LogsRequest};
use crate::common::docker::timeouts::{with_timeout, Timeouts};
use crate::common::docker::types::{LogEntry, LogStream};
use crate::common::logs::{parse_log_line, Demuxer};
use crate::core::error::{OctoError, Result};
use futures_util::StreamExt;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// Capacity of the live log channel.
pub const STREAM_BUFFER: usize = 100;

/// Stops a live log stream. Cloning shares the same stream.
#[derive(Debug, Clone)]
pub struct CancelHandle(CancellationToken);

impl CancelHandle {
    pub fn cancel(&self) {
        if !self.0.is_cancelled() {
            debug!("Cancelling log stream");
            self.0.cancel();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.is_cancelled()
    }
}

/// The receiving side of a live log stream.
pub struct LogStreamHandle {
    pub logs: mpsc::Receiver<LogEntry>,
    /// At most one error; closed after `logs`.
    pub errors: mpsc::Receiver<anyhow::Error>,
    pub cancel: CancelHandle,
}

async fn drain(mut body: LogBody, mut demux: Demuxer) -> Result<(Vec<String>, Vec<String>)> {
    let mut stdout = Vec::new();
    let mut stderr = Vec::new();
    let mut sort = |lines: Vec<(LogStream, String)>| {
        for (stream, line) in lines {
            match stream {
                LogStream::Stdout => stdout.push(line),
                LogStream::Stderr => stderr.push(line),
            }
        }
    };
    while let Some(chunk) = body.next().await {
        sort(demux.feed(&chunk?)?);
    }
    sort(demux.finish()?);
    Ok((stdout, stderr))
}

/// Parses both streams and merges them by timestamp, stdout first on ties.
pub(crate) fn merge_entries(stdout: Vec<String>, stderr: Vec<String>) -> Vec<LogEntry> {
    let mut entries: Vec<LogEntry> = stdout
        .iter()
        .map(|line| parse_log_line(line, LogStream::Stdout))
        .chain(stderr.iter().map(|line| parse_log_line(line, LogStream::Stderr)))
        .collect();
    entries.sort_by_key(|entry| entry.timestamp);
    entries
}

fn is_framing_error(err: &anyhow::Error) -> bool {
    matches!(
        err.downcast_ref::<OctoError>(),
        Some(OctoError::LogFraming(_))
    )
}

impl EngineService {
    /// Fetches the last `tail` lines of both streams.
    #[instrument(skip(self), fields(container = %id))]
    pub async fn get_container_logs(&self, id: &str, tail: u32) -> Result<Vec<LogEntry>> {
        let framed = with_timeout(
            Timeouts::LOGS,
            "fetch logs",
            drain(
                self.api.container_logs(id, LogsRequest::tail(tail)),
                Demuxer::framed(),
            ),
        )
        .await;

        let (stdout, stderr) = match framed {
            Ok(lines) => lines,
            Err(e) if is_framing_error(&e) => {
                debug!("Log body not multiplexed ({}), refetching as raw", e);
                with_timeout(
                    Timeouts::LOGS,
                    "fetch logs",
                    drain(
                        self.api.container_logs(id, LogsRequest::tail(tail)),
                        Demuxer::raw(),
                    ),
                )
                .await?
            }
            Err(e) => return Err(e),
        };
        let entries = merge_entries(stdout, stderr);
        info!("Fetched {} log lines", entries.len());
        Ok(entries)
    }

    /// Follows new log lines until cancelled or the engine closes the body.
    #[instrument(skip(self), fields(container = %id))]
    pub fn stream_container_logs(&self, id: &str) -> LogStreamHandle {
        let body = self.api.container_logs(id, LogsRequest::follow());
        let (log_tx, log_rx) = mpsc::channel(STREAM_BUFFER);
        let (err_tx, err_rx) = mpsc::channel(1);
        let token = CancellationToken::new();
        tokio::spawn(follow(body, log_tx, err_tx, token.clone(), id.to_string()));
        LogStreamHandle {
            logs: log_rx,
            errors: err_rx,
            cancel: CancelHandle(token),
        }
    }
}

async fn follow(
    mut body: LogBody,
    log_tx: mpsc::Sender<LogEntry>,
    err_tx: mpsc::Sender<anyhow::Error>,
    token: CancellationToken,
    id: String,
) {
    let mut demux = Demuxer::auto();
    let failure = 'read: loop {
        let lines = tokio::select! {
            biased;
            _ = token.cancelled() => break 'read None,
            chunk = body.next() => match chunk {
                Some(Ok(bytes)) => demux.feed(&bytes),
                Some(Err(e)) => break 'read Some(e),
                None => match demux.finish() {
                    Ok(rest) => {
                        deliver(&log_tx, &token, rest).await;
                        break 'read None;
                    }
                    Err(e) => break 'read Some(e),
                },
            },
        };
        match lines {
            Ok(lines) => {
                if !deliver(&log_tx, &token, lines).await {
                    break 'read None;
                }
            }
            Err(e) => break 'read Some(e),
        }
    };

    drop(log_tx);
    if let Some(e) = failure {
        warn!("Log stream for {} failed: {:#}", id, e);
        let _ = err_tx.try_send(e);
    } else {
        debug!("Log stream for {} ended", id);
    }
    drop(err_tx);
}

/// Sends parsed entries in order. Returns false once the stream should stop.
async fn deliver(
    log_tx: &mpsc::Sender<LogEntry>,
    token: &CancellationToken,
    lines: Vec<(LogStream, String)>,
) -> bool {
    for (stream, line) in lines {
        let entry = parse_log_line(&line, stream);
        tokio::select! {
            biased;
            _ = token.cancelled() => return false,
            sent = log_tx.send(entry) => {
                if sent.is_err() {
                    return false;
                }
            }
        }
    }
    true
}
