//! # Octo Error Types
//!
//! File: cli/src/core/error.rs
//!
//! ## Overview
//!
//! This module defines the error kinds used throughout Octo. Engine-facing
//! failures (`Transport`, `NotFound`, `StateChanged`, `EngineReject`) are
//! returned to callers. Viewer-local failures (`FilterCompile`, `Export`) are
//! recovered where they happen and surfaced as status messages.
//!
//! ## Architecture
//!
//! - `OctoError`: a `thiserror` enum, one variant per error kind.
//! - `Result<T>`: an alias for `anyhow::Result<T>`. Functions attach context
//!   with `.context(...)` and callers recover the kind with
//!   `downcast_ref::<OctoError>()`.
//!
//! ```rust
//! match service.remove_container("abc123", false).await {
//!     Err(e) if OctoError::is_state_changed(&e) => println!("refusing: {}", e),
//!     Err(e) => return Err(e),
//!     Ok(()) => println!("removed"),
//! }
//! ```
//!
use std::fmt;
use thiserror::Error;

/// The resource family an identifier refers to. Used in `NotFound` messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Container,
    Image,
    Volume,
    Network,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ResourceKind::Container => "Container",
            ResourceKind::Image => "Image",
            ResourceKind::Volume => "Volume",
            ResourceKind::Network => "Network",
        };
        f.write_str(name)
    }
}

/// Custom error type for Octo.
#[derive(Error, Debug)]
pub enum OctoError {
    #[error("Configuration error: {0}")]
    Config(String),

    /// Connect, version negotiation, ping timeout, cancellation or per-operation timeout.
    #[error("Engine transport error: {0}")]
    Transport(String),

    #[error("{kind} '{id}' not found.")]
    NotFound { kind: ResourceKind, id: String },

    #[error("Container '{id}' changed state: {reason}")]
    StateChanged { id: String, reason: String },

    /// `bridge`, `host` and `none` are never deleted, whatever the caller asks.
    #[error("System network '{name}' cannot be deleted.")]
    SystemNetwork { name: String },

    #[error("Engine rejected request (status {status}): {message}")]
    EngineReject { status: u16, message: String },

    #[error("Engine API interaction failed: {source}")]
    DockerApi {
        #[from]
        source: bollard::errors::Error,
    },

    #[error("Log stream framing error: {0}")]
    LogFraming(String),

    #[error("Invalid regex: {0}")]
    FilterCompile(String),

    #[error("Export failed: {0}")]
    Export(String),
}

impl OctoError {
    /// Maps a raw `bollard` error onto the engine-facing kinds.
    ///
    /// 404 becomes `NotFound`, other HTTP statuses become `EngineReject`, and
    /// everything at the connection level becomes `Transport`.
    pub fn from_engine(err: bollard::errors::Error, kind: ResourceKind, id: &str) -> Self {
        use bollard::errors::Error as BollardError;
        match err {
            BollardError::DockerResponseServerError {
                status_code: 404, ..
            } => OctoError::NotFound {
                kind,
                id: id.to_string(),
            },
            BollardError::DockerResponseServerError {
                status_code,
                message,
            } => OctoError::EngineReject {
                status: status_code,
                message,
            },
            BollardError::RequestTimeoutError => {
                OctoError::Transport("engine request timed out".to_string())
            }
            BollardError::HyperResponseError { .. } | BollardError::IOError { .. } => {
                OctoError::Transport(err.to_string())
            }
            other => OctoError::DockerApi { source: other },
        }
    }

    fn kind_of(err: &anyhow::Error) -> Option<&OctoError> {
        err.downcast_ref::<OctoError>()
    }

    pub fn is_not_found(err: &anyhow::Error) -> bool {
        matches!(Self::kind_of(err), Some(OctoError::NotFound { .. }))
    }

    pub fn is_state_changed(err: &anyhow::Error) -> bool {
        matches!(Self::kind_of(err), Some(OctoError::StateChanged { .. }))
    }

    pub fn is_transport(err: &anyhow::Error) -> bool {
        matches!(Self::kind_of(err), Some(OctoError::Transport(_)))
    }
}

/// Type alias for Result using anyhow::Error, as everywhere else in the crate.
pub type Result<T> = anyhow::Result<T>;
