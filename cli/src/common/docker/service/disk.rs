//! Disk usage, recomputed from the engine's per-record data.
//!
//! The engine's own top-level totals are ignored so that `reclaimable_bytes`
//! always follows one attribution rule: unreferenced images, non-running
//! containers and idle build cache. Volume bytes count toward the total only.
//!
use super::EngineService;
use crate::common::docker::timeouts::{cancellable, RequestKind, Timeouts};
use crate::common::docker::types::{ContainerState, DiskUsage};
use crate::core::error::Result;
use bollard::models::SystemDataUsageResponse;
use tracing::{debug, instrument};

fn bytes(value: i64) -> u64 {
    value.max(0) as u64
}

pub fn aggregate_disk_usage(raw: &SystemDataUsageResponse) -> DiskUsage {
    let mut usage = DiskUsage::default();

    for image in raw.images.iter().flatten() {
        let size = bytes(image.size);
        usage.images_bytes += size;
        if image.containers <= 0 {
            usage.reclaimable_bytes += size;
        }
    }

    for container in raw.containers.iter().flatten() {
        let size = bytes(container.size_rw.unwrap_or(0));
        usage.containers_bytes += size;
        let state = ContainerState::parse(container.state.as_deref().unwrap_or_default());
        if !state.is_running() {
            usage.reclaimable_bytes += size;
        }
    }

    for volume in raw.volumes.iter().flatten() {
        if let Some(data) = &volume.usage_data {
            usage.volumes_bytes += bytes(data.size);
        }
    }

    for entry in raw.build_cache.iter().flatten() {
        let size = bytes(entry.size.unwrap_or(0));
        usage.build_cache_bytes += size;
        if !entry.in_use.unwrap_or(false) {
            usage.reclaimable_bytes += size;
        }
    }

    usage.total_bytes =
        usage.images_bytes + usage.containers_bytes + usage.volumes_bytes + usage.build_cache_bytes;
    usage
}

impl EngineService {
    #[instrument(skip(self))]
    pub async fn disk_usage(&self) -> Result<DiskUsage> {
        let token = self.inflight.begin(RequestKind::DiskUsage);
        let raw = cancellable(
            token,
            Timeouts::DISK_USAGE,
            "disk usage",
            self.api.disk_usage(),
        )
        .await?;
        let usage = aggregate_disk_usage(&raw);
        debug!(
            "Disk usage: total {} bytes, reclaimable {} bytes",
            usage.total_bytes, usage.reclaimable_bytes
        );
        Ok(usage)
    }
}
