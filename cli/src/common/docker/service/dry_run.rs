//! # Dry-Run Twins
//!
//! File: cli/src/common/docker/service/dry_run.rs
//!
//! ## Overview
//!
//! Every destructive operation of the engine service has a twin here that
//! returns a `ConfirmationInfo` and only ever calls list endpoints. The twin
//! shares its lookup with the real operation (`locate_container`,
//! `locate_image`, `locate_network`, `network_prune_targets`,
//! `image_prune_filters`), so what a user confirms is
//! what the operation targets.
//!
//! ## Safety tiers
//!
//! | Operation                         | Tier            | Reversible |
//! |-----------------------------------|-----------------|------------|
//! | remove stopped container          | LowRisk         | yes        |
//! | remove running container          | Moderate        | yes        |
//! | remove unreferenced image         | LowRisk         | yes        |
//! | remove referenced image           | HighRisk        | yes        |
//! | remove unused volume              | LowRisk         | no         |
//! | remove in-use volume              | HighRisk        | no         |
//! | remove network                    | LowRisk/HighRisk| no         |
//! | remove system network             | BulkDestructive | no         |
//! | any prune                         | BulkDestructive | images, containers, build cache |
//!
//! Tiers drive presentation only; they never change what the engine is asked to do.
//!
use super::actions::{image_prune_filters, network_prune_targets};
use super::listing::mounted_volume_names;
use super::EngineService;
use crate::common::docker::api::Filters;
use crate::common::docker::timeouts::{with_timeout, Timeouts};
use crate::common::docker::types::{
    format_bytes, is_system_network, trim_image_id, ConfirmationInfo, SafetyTier,
    SYSTEM_NETWORKS,
};
use crate::core::error::{OctoError, ResourceKind, Result};
use anyhow::anyhow;
use bollard::models::{ContainerSummary, ImageSummary};
use tracing::instrument;

const SYSTEM_NETWORK_WARNING: &str = "cannot delete system networks";

fn plural(n: usize, word: &str) -> String {
    if n == 1 {
        format!("1 {}", word)
    } else {
        format!("{} {}s", n, word)
    }
}

/// Containers (running or not) created from `image_id`.
fn containers_using(containers: &[ContainerSummary], image_id: &str) -> usize {
    containers
        .iter()
        .filter(|c| c.image_id.as_deref() == Some(image_id))
        .count()
}

fn image_label(image: &ImageSummary) -> String {
    match image.repo_tags.iter().find(|t| t.as_str() != "<none>:<none>") {
        Some(tag) => format!("{} ({})", tag, trim_image_id(&image.id)),
        None => format!("<none> ({})", trim_image_id(&image.id)),
    }
}

impl EngineService {
    #[instrument(skip(self), fields(container = %id))]
    pub async fn remove_container_dry_run(&self, id: &str, force: bool) -> Result<ConfirmationInfo> {
        let container = self.locate_container(id).await?;
        let label = format!("{} ({})", container.name, container.short_id);
        let base = if container.state.is_running() {
            let info = ConfirmationInfo::new(SafetyTier::Moderate, "Remove running container")
                .warn("container is currently running");
            if force {
                info.warn("it will be killed before removal")
            } else {
                info.warn("removal will be refused unless forced")
            }
        } else {
            ConfirmationInfo::new(SafetyTier::LowRisk, "Remove container")
        };
        Ok(base
            .describe(format!(
                "Remove container {} created from {}, freeing {}.",
                label,
                container.image,
                format_bytes(container.size_rw)
            ))
            .resources(vec![label])
            .reversible("recreate from image"))
    }

    #[instrument(skip(self), fields(image = %id))]
    pub async fn remove_image_dry_run(&self, id: &str, force: bool) -> Result<ConfirmationInfo> {
        let (target, containers) = tokio::try_join!(
            self.locate_image(id),
            self.fetch_containers(true, Filters::new())
        )?;
        let image = &target.image;
        let users = containers_using(&containers, &image.id);
        let label = image_label(image);
        let mut info = if users == 0 {
            ConfirmationInfo::new(SafetyTier::LowRisk, "Remove image")
        } else {
            let info = ConfirmationInfo::new(SafetyTier::HighRisk, "Remove image in use")
                .warn(format!("image used by {}", plural(users, "container")));
            if force {
                info
            } else {
                info.warn("the engine will refuse unless forced")
            }
        };
        let tags = image.repo_tags.len();
        if tags > 1 {
            info = info.warn(if target.by_tag() {
                format!(
                    "image has {} tags; only {} is removed and no space is freed",
                    tags, target.reference
                )
            } else {
                format!("image has {} tags; removing by id removes all of them", tags)
            });
        }
        Ok(info
            .describe(format!(
                "Remove image {} ({}). Untagged parent layers are removed too.",
                label,
                format_bytes(image.size.max(0) as u64)
            ))
            .resources(vec![label])
            .reversible("pull or rebuild the image"))
    }

    #[instrument(skip(self), fields(volume = %name))]
    pub async fn remove_volume_dry_run(&self, name: &str) -> Result<ConfirmationInfo> {
        let (volumes, containers) = tokio::try_join!(
            self.fetch_volumes(Filters::new()),
            self.fetch_containers(true, Filters::new())
        )?;
        let volume = volumes
            .into_iter()
            .find(|v| v.name == name)
            .ok_or_else(|| {
                anyhow!(OctoError::NotFound {
                    kind: ResourceKind::Volume,
                    id: name.to_string(),
                })
            })?;
        let info = if mounted_volume_names(&containers).contains(&volume.name) {
            ConfirmationInfo::new(SafetyTier::HighRisk, "Remove volume in use")
                .warn("volume is mounted by a container")
        } else {
            ConfirmationInfo::new(SafetyTier::LowRisk, "Remove volume")
        };
        Ok(info
            .describe(format!(
                "Remove volume {} ({} driver) at {}.",
                volume.name, volume.driver, volume.mountpoint
            ))
            .resources(vec![volume.name])
            .warn("data cannot be recovered"))
    }

    #[instrument(skip(self), fields(network = %id))]
    pub async fn remove_network_dry_run(&self, id: &str) -> Result<ConfirmationInfo> {
        if is_system_network(id) {
            return Ok(system_network_refusal(id));
        }
        let network = self.locate_network(id).await?;
        if network.is_system() {
            return Ok(system_network_refusal(&network.name));
        }
        let info = if network.containers > 0 {
            ConfirmationInfo::new(SafetyTier::HighRisk, "Remove network in use").warn(format!(
                "{} connected",
                plural(network.containers, "container")
            ))
        } else {
            ConfirmationInfo::new(SafetyTier::LowRisk, "Remove network")
        };
        Ok(info
            .describe(format!(
                "Remove network {} ({}, {} driver).",
                network.name, network.short_id, network.driver
            ))
            .resources(vec![network.name]))
    }

    #[instrument(skip(self))]
    pub async fn prune_containers_dry_run(&self) -> Result<ConfirmationInfo> {
        let stopped = self.stopped_containers().await?;
        let bytes: u64 = stopped.iter().map(|c| c.size_rw).sum();
        Ok(
            ConfirmationInfo::new(SafetyTier::BulkDestructive, "Prune stopped containers")
                .describe(format!(
                    "Remove {}, reclaiming about {}.",
                    plural(stopped.len(), "stopped container"),
                    format_bytes(bytes)
                ))
                .resources(
                    stopped
                        .iter()
                        .map(|c| format!("{} ({})", c.name, c.short_id))
                        .collect(),
                )
                .reversible("recreate from image"),
        )
    }

    #[instrument(skip(self))]
    pub async fn prune_images_dry_run(&self, all: bool) -> Result<ConfirmationInfo> {
        let targets: Vec<ImageSummary> = if all {
            let (images, containers) = tokio::try_join!(
                self.fetch_images(),
                self.fetch_containers(true, Filters::new())
            )?;
            images
                .into_iter()
                .filter(|image| containers_using(&containers, &image.id) == 0)
                .collect()
        } else {
            with_timeout(
                Timeouts::LIST,
                "list dangling images",
                self.api.list_images(false, image_prune_filters(false)),
            )
            .await?
        };
        let bytes: u64 = targets.iter().map(|i| i.size.max(0) as u64).sum();
        let scope = if all {
            "dangling and unreferenced image"
        } else {
            "dangling image"
        };
        let title = if all {
            "Prune unused images"
        } else {
            "Prune dangling images"
        };
        let mut info = ConfirmationInfo::new(SafetyTier::BulkDestructive, title)
            .describe(format!(
                "Remove {}, reclaiming about {}.",
                plural(targets.len(), scope),
                format_bytes(bytes)
            ))
            .resources(targets.iter().map(image_label).collect())
            .reversible("pull or rebuild the images");
        if all {
            info = info.warn("tagged images not used by any container are removed too");
        }
        Ok(info)
    }

    #[instrument(skip(self))]
    pub async fn prune_volumes_dry_run(&self) -> Result<ConfirmationInfo> {
        let unused = self.unused_volumes().await?;
        let bytes: u64 = unused.iter().filter_map(|v| v.size).sum();
        Ok(
            ConfirmationInfo::new(SafetyTier::BulkDestructive, "Prune unused volumes")
                .describe(format!(
                    "Remove {}, reclaiming about {}.",
                    plural(unused.len(), "unused volume"),
                    format_bytes(bytes)
                ))
                .resources(unused.into_iter().map(|v| v.name).collect())
                .warn("data cannot be recovered"),
        )
    }

    #[instrument(skip(self))]
    pub async fn prune_networks_dry_run(&self) -> Result<ConfirmationInfo> {
        let networks = self.fetch_networks().await?;
        let system: Vec<String> = networks
            .iter()
            .filter(|n| n.is_system())
            .map(|n| n.name.clone())
            .collect();
        let targets = network_prune_targets(networks);
        let mut info = ConfirmationInfo::new(SafetyTier::BulkDestructive, "Prune unused networks")
            .describe(format!(
                "Remove {} with no connected containers.",
                plural(targets.len(), "network")
            ))
            .resources(targets.into_iter().map(|n| n.name).collect());
        if !system.is_empty() {
            info = info.warn(format!(
                "{} excluded: {}",
                system.join(", "),
                SYSTEM_NETWORK_WARNING
            ));
        }
        Ok(info)
    }

    #[instrument(skip(self))]
    pub async fn prune_build_cache_dry_run(&self, all: bool) -> Result<ConfirmationInfo> {
        let usage = with_timeout(Timeouts::DISK_USAGE, "disk usage", self.api.disk_usage()).await?;
        let idle: Vec<_> = usage
            .build_cache
            .unwrap_or_default()
            .into_iter()
            .filter(|entry| !entry.in_use.unwrap_or(false))
            .collect();
        let bytes: u64 = idle
            .iter()
            .map(|entry| entry.size.unwrap_or(0).max(0) as u64)
            .sum();
        let mut info = ConfirmationInfo::new(SafetyTier::BulkDestructive, "Prune build cache")
            .describe(format!(
                "Remove up to {}, reclaiming up to {}.",
                plural(idle.len(), "idle cache entry"),
                format_bytes(bytes)
            ))
            .resources(idle.into_iter().filter_map(|entry| entry.id).collect())
            .reversible("rebuild to repopulate the cache");
        if !all {
            info = info.warn("recently used entries are kept unless --all is given");
        }
        Ok(info)
    }
}

fn system_network_refusal(name: &str) -> ConfirmationInfo {
    ConfirmationInfo::new(SafetyTier::BulkDestructive, "Remove system network")
        .describe(format!(
            "'{}' is one of the engine's own networks ({}).",
            name,
            SYSTEM_NETWORKS.join(", ")
        ))
        .resources(vec![name.to_string()])
        .warn(SYSTEM_NETWORK_WARNING)
}
