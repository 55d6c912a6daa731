//! # Octo Engine Service
//!
//! File: cli/src/common/docker/service/mod.rs
//!
//! ## Overview
//!
//! `EngineService` is the only surface the rest of Octo uses to talk to the
//! engine. It turns raw engine records into the domain types of
//! `common::docker::types`, attributes reclaimable disk space, and pairs every
//! destructive operation with a dry-run twin that returns a
//! `ConfirmationInfo` without touching engine state.
//!
//! ## Architecture
//!
//! The service holds its backend as `Arc<dyn EngineApi>`: the socket-backed
//! `EngineTransport` in production, `FakeEngine` in tests. Operations are
//! split by concern:
//!
//! - **`listing`**: listings, filtered queries, the aggregate snapshot and engine info.
//! - **`disk`**: disk usage aggregation and reclaimability.
//! - **`actions`**: removals (with the container state re-check), prunes, start/stop/restart.
//! - **`dry_run`**: the `ConfirmationInfo` twins.
//! - **`logs`**: the initial log fetch and the live follow stream.
//!
//! Every call runs under the deadline from `Timeouts`. Listing refreshes are
//! registered in an `InFlight` table so that a new refresh of one kind
//! cancels the one it replaces.
//!
//! ## Usage
//!
//! ```rust
//! let service = EngineService::connect(&cfg).await?;
//! for container in service.list_containers(true).await? {
//!     println!("{} {}", container.short_id, container.name);
//! }
//! service.shutdown();
//! ```
//!
use super::api::EngineApi;
use super::connect::EngineTransport;
use super::timeouts::InFlight;
use crate::core::config::Config;
use crate::core::error::Result;
use std::sync::Arc;
use tracing::{debug, instrument};

pub mod actions;
pub mod disk;
pub mod dry_run;
pub mod listing;
pub mod logs;

pub use listing::{EngineSummary, ResourceSnapshot};
pub use logs::{CancelHandle, LogStreamHandle};

pub struct EngineService {
    api: Arc<dyn EngineApi>,
    inflight: InFlight,
}

impl EngineService {
    pub fn new(api: Arc<dyn EngineApi>) -> Self {
        Self {
            api,
            inflight: InFlight::default(),
        }
    }

    /// Connects to the engine named by the configuration (or the platform default).
    #[instrument(skip_all)]
    pub async fn connect(config: &Config) -> Result<Self> {
        let transport = EngineTransport::connect(config.engine.socket.as_deref()).await?;
        Ok(Self::new(Arc::new(transport)))
    }

    /// Cancels outstanding refreshes and closes the transport. Idempotent.
    pub fn shutdown(&self) {
        debug!("Shutting down engine service");
        self.inflight.cancel_all();
        self.api.close();
    }
}

impl Drop for EngineService {
    fn drop(&mut self) {
        self.shutdown();
    }
}
