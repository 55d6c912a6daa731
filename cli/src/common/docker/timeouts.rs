//! # Per-Operation Deadlines and In-Flight Requests
//!
//! File: cli/src/common/docker/timeouts.rs
//!
//! Every engine call runs under a fixed deadline for its category. Listing
//! refreshes are additionally registered per `RequestKind`: starting a new
//! refresh cancels the previous one of the same kind, so at most one listing
//! of each kind is ever outstanding.
//!
use crate::core::error::{OctoError, Result};
use anyhow::anyhow;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Deadline table for engine operations.
pub struct Timeouts;

impl Timeouts {
    pub const PING: Duration = Duration::from_secs(5);
    pub const LIST: Duration = Duration::from_secs(30);
    pub const DISK_USAGE: Duration = Duration::from_secs(60);
    pub const REMOVE: Duration = Duration::from_secs(30);
    pub const ACTION: Duration = Duration::from_secs(10);
    pub const PRUNE: Duration = Duration::from_secs(120);
    pub const LOGS: Duration = Duration::from_secs(30);
}

/// Runs `fut` under `limit`, mapping expiry to a transport error.
pub async fn with_timeout<T, F>(limit: Duration, operation: &str, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(anyhow!(OctoError::Transport(format!(
            "{} timed out after {}s",
            operation,
            limit.as_secs()
        )))),
    }
}

/// Refresh categories tracked by `InFlight`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestKind {
    Containers,
    Images,
    Volumes,
    Networks,
    DiskUsage,
}

/// One cancellation token per request kind.
#[derive(Default)]
pub struct InFlight {
    tokens: Mutex<HashMap<RequestKind, CancellationToken>>,
}

impl InFlight {
    /// Registers a new request of `kind`, cancelling the one it replaces.
    pub fn begin(&self, kind: RequestKind) -> CancellationToken {
        let token = CancellationToken::new();
        let previous = self
            .tokens
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(kind, token.clone());
        if let Some(previous) = previous {
            debug!("Superseding in-flight {:?} request", kind);
            previous.cancel();
        }
        token
    }

    pub fn cancel_all(&self) {
        let mut tokens = self.tokens.lock().unwrap_or_else(PoisonError::into_inner);
        for (_, token) in tokens.drain() {
            token.cancel();
        }
    }
}

/// Races `fut` against `token`, then applies the deadline.
pub async fn cancellable<T, F>(
    token: CancellationToken,
    limit: Duration,
    operation: &str,
    fut: F,
) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::select! {
        _ = token.cancelled() => Err(anyhow!(OctoError::Transport(format!(
            "{}: request cancelled",
            operation
        )))),
        result = with_timeout(limit, operation, fut) => result,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_with_timeout_expires() {
        let result: Result<()> = with_timeout(Duration::from_millis(10), "list", async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;
        let err = result.unwrap_err();
        assert!(OctoError::is_transport(&err));
        assert!(err.to_string().contains("list timed out"));
    }

    #[test]
    fn test_begin_cancels_previous_of_same_kind() {
        let inflight = InFlight::default();
        let first = inflight.begin(RequestKind::Containers);
        let other = inflight.begin(RequestKind::Images);
        let second = inflight.begin(RequestKind::Containers);

        assert!(first.is_cancelled());
        assert!(!second.is_cancelled());
        assert!(!other.is_cancelled());
        assert_eq!(inflight.tokens.lock().unwrap().len(), 2);

        inflight.cancel_all();
        assert!(second.is_cancelled() && other.is_cancelled());
        assert!(inflight.tokens.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_cancellable_returns_on_cancel() {
        let token = CancellationToken::new();
        token.cancel();
        let result: Result<()> = cancellable(token, Timeouts::LIST, "list containers", async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;
        assert!(result.unwrap_err().to_string().contains("request cancelled"));
    }
}
