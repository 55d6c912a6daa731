//! # Engine Capability Set
//!
//! File: cli/src/common/docker/api.rs
//!
//! ## Overview
//!
//! `EngineApi` is the raw surface the engine service needs: listings,
//! removals, prunes, lifecycle actions, disk usage and log bodies. It speaks
//! the engine SDK's own record types (`bollard::models`), so the service's
//! normalization code is the only place those shapes are interpreted.
//!
//! Two implementations exist:
//! - `connect::EngineTransport`, the real socket-backed client.
//! - `fake::FakeEngine` (tests only), built from per-operation closures.
//!
//! The service holds an `Arc<dyn EngineApi>` and never names either type
//! directly, so backends are swapped at construction time.
//!
use crate::core::error::Result;
use async_trait::async_trait;
use bollard::models::{
    ContainerSummary, ImageSummary, Network, SystemDataUsageResponse, SystemInfo, Volume,
};
use bollard::system::Version;
use bytes::Bytes;
use futures_util::stream::BoxStream;
use std::collections::HashMap;

/// Engine list/prune filters (`key -> values`), as the API expects them.
pub type Filters = HashMap<String, Vec<String>>;

/// A log body exactly as the engine sends it: multiplexed frames for non-TTY
/// containers, raw bytes for TTY containers.
pub type LogBody = BoxStream<'static, Result<Bytes>>;

/// Builds a `Filters` map from `(key, value)` pairs.
pub fn filters<const N: usize>(pairs: [(&str, &str); N]) -> Filters {
    let mut map = Filters::new();
    for (key, value) in pairs {
        map.entry(key.to_string())
            .or_default()
            .push(value.to_string());
    }
    map
}

/// Options for a log request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogsRequest {
    pub follow: bool,
    pub timestamps: bool,
    /// Number of trailing lines, or `"all"`.
    pub tail: String,
}

impl LogsRequest {
    /// Last `tail` lines with timestamps, no follow.
    pub fn tail(tail: u32) -> Self {
        Self {
            follow: false,
            timestamps: true,
            tail: tail.to_string(),
        }
    }

    /// Live follow with timestamps and no backlog.
    pub fn follow() -> Self {
        Self {
            follow: true,
            timestamps: true,
            tail: "0".to_string(),
        }
    }
}

#[async_trait]
pub trait EngineApi: Send + Sync {
    async fn ping(&self) -> Result<()>;
    async fn version(&self) -> Result<Version>;
    async fn info(&self) -> Result<SystemInfo>;

    async fn list_containers(&self, all: bool, filters: Filters) -> Result<Vec<ContainerSummary>>;
    async fn list_images(&self, all: bool, filters: Filters) -> Result<Vec<ImageSummary>>;
    async fn list_volumes(&self, filters: Filters) -> Result<Vec<Volume>>;
    async fn list_networks(&self) -> Result<Vec<Network>>;
    async fn disk_usage(&self) -> Result<SystemDataUsageResponse>;

    async fn remove_container(&self, id: &str, force: bool) -> Result<()>;
    /// Removes an image; untagged parents are pruned with it.
    async fn remove_image(&self, id: &str, force: bool) -> Result<()>;
    async fn remove_volume(&self, name: &str, force: bool) -> Result<()>;
    async fn remove_network(&self, id: &str) -> Result<()>;

    /// Each prune returns the bytes the engine reports as reclaimed.
    async fn prune_containers(&self, filters: Filters) -> Result<u64>;
    async fn prune_images(&self, filters: Filters) -> Result<u64>;
    async fn prune_volumes(&self, filters: Filters) -> Result<u64>;
    async fn prune_networks(&self, filters: Filters) -> Result<()>;
    async fn prune_build_cache(&self, all: bool) -> Result<u64>;

    async fn start_container(&self, id: &str) -> Result<()>;
    async fn stop_container(&self, id: &str) -> Result<()>;
    async fn restart_container(&self, id: &str) -> Result<()>;

    fn container_logs(&self, id: &str, request: LogsRequest) -> LogBody;

    /// Releases the underlying connection. Must be idempotent.
    fn close(&self) {}
}
