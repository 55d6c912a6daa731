//! # Listings and Filtered Queries
//!
//! File: cli/src/common/docker/service/listing.rs
//!
//! ## Overview
//!
//! Read-only operations of the engine service. Each public listing registers
//! itself in the service's `InFlight` table under its `RequestKind`, so a
//! newer refresh of the same kind cancels an older one still waiting on the
//! engine. Internal lookups (the removal re-check, the volume `in_use` fan-out)
//! go through the unregistered `fetch_*` helpers and never cancel a refresh.
//!
//! Raw engine records are normalized here:
//!
//! - containers: leading `/` stripped from the name, ports formatted, short id applied.
//! - images: `sha256:` stripped, one entry per repository tag, a single
//!   dangling entry (empty repository and tag) for untagged images.
//! - volumes: `in_use` computed from the volume-type mounts of all containers.
//! - networks: connected-container count taken from the containers' own
//!   network settings. The network list endpoint leaves its attachment map
//!   empty on current engines, so it only counts when it is filled in.
//!
use super::EngineService;
use crate::common::docker::api::{filters, Filters};
use crate::common::docker::timeouts::{cancellable, with_timeout, RequestKind, Timeouts};
use crate::common::docker::types::{
    format_ports, instant_from_epoch, instant_from_rfc3339, parse_image_tag, trim_image_id,
    truncate_id, Container, ContainerState, Image, Network, PortMapping, Volume, SHORT_ID_LEN,
};
use crate::core::error::Result;
use bollard::models::{self as engine, MountPointTypeEnum, PortTypeEnum};
use std::collections::{HashMap, HashSet};
use tracing::{debug, instrument, warn};

/// All four resource listings taken together.
#[derive(Debug, Clone, Default)]
pub struct ResourceSnapshot {
    pub containers: Vec<Container>,
    pub images: Vec<Image>,
    pub volumes: Vec<Volume>,
    pub networks: Vec<Network>,
    /// One entry per category that failed to load.
    pub warnings: Vec<String>,
}

/// Engine identity and counts, as shown by `octo info`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineSummary {
    pub version: String,
    pub api_version: String,
    pub os: String,
    pub arch: String,
    pub containers: u64,
    pub containers_running: u64,
    pub images: u64,
}

pub(crate) fn container_from(raw: engine::ContainerSummary) -> Container {
    let id = raw.id.unwrap_or_default();
    let name = raw
        .names
        .and_then(|names| names.into_iter().next())
        .map(|n| n.strip_prefix('/').unwrap_or(&n).to_string())
        .unwrap_or_default();
    let ports: Vec<PortMapping> = raw
        .ports
        .unwrap_or_default()
        .into_iter()
        .map(|p| PortMapping {
            public_port: p.public_port,
            private_port: p.private_port,
            protocol: protocol_name(p.typ),
        })
        .collect();
    Container {
        short_id: truncate_id(&id, SHORT_ID_LEN),
        id,
        name,
        image: raw.image.unwrap_or_default(),
        image_id: raw.image_id.unwrap_or_default(),
        status: raw.status.unwrap_or_default(),
        state: ContainerState::parse(raw.state.as_deref().unwrap_or_default()),
        created: instant_from_epoch(raw.created.unwrap_or_default()),
        ports: format_ports(&ports),
        size_rw: raw.size_rw.unwrap_or(0).max(0) as u64,
        labels: raw.labels.unwrap_or_default(),
    }
}

fn protocol_name(typ: Option<PortTypeEnum>) -> String {
    match typ {
        Some(PortTypeEnum::UDP) => "udp",
        Some(PortTypeEnum::SCTP) => "sctp",
        _ => "tcp",
    }
    .to_string()
}

/// Expands one engine image into one entry per tag.
pub(crate) fn images_from(raw: engine::ImageSummary) -> Vec<Image> {
    let id = trim_image_id(&raw.id);
    let size = raw.size.max(0) as u64;
    let created = instant_from_epoch(raw.created);
    // List endpoints report -1 when the count was not computed.
    let containers = raw.containers.max(0) as u64;

    let tags: Vec<&String> = raw
        .repo_tags
        .iter()
        .filter(|t| t.as_str() != "<none>:<none>")
        .collect();
    if tags.is_empty() {
        return vec![Image {
            id,
            repository: String::new(),
            tag: String::new(),
            size,
            created,
            containers,
            dangling: true,
        }];
    }
    tags.into_iter()
        .map(|reference| {
            let (repository, tag) = parse_image_tag(reference);
            Image {
                id: id.clone(),
                repository,
                tag,
                size,
                created,
                containers,
                dangling: false,
            }
        })
        .collect()
}

fn volume_from(raw: engine::Volume, in_use: bool) -> Volume {
    Volume {
        size: raw
            .usage_data
            .and_then(|usage| u64::try_from(usage.size).ok()),
        created: raw.created_at.as_deref().and_then(instant_from_rfc3339),
        name: raw.name,
        driver: raw.driver,
        mountpoint: raw.mountpoint,
        labels: raw.labels,
        in_use,
    }
}

/// How many containers are attached to each network, by network id and by name.
#[derive(Debug, Default)]
struct Attachments {
    by_id: HashMap<String, usize>,
    by_name: HashMap<String, usize>,
}

impl Attachments {
    fn from_containers(containers: &[engine::ContainerSummary]) -> Self {
        let mut attachments = Self::default();
        let endpoints = containers
            .iter()
            .filter_map(|c| c.network_settings.as_ref())
            .flat_map(|settings| settings.networks.iter().flatten());
        for (name, endpoint) in endpoints {
            *attachments.by_name.entry(name.clone()).or_default() += 1;
            if let Some(id) = endpoint.network_id.as_deref().filter(|id| !id.is_empty()) {
                *attachments.by_id.entry(id.to_string()).or_default() += 1;
            }
        }
        attachments
    }

    fn count(&self, id: &str, name: &str) -> usize {
        self.by_id
            .get(id)
            .or_else(|| self.by_name.get(name))
            .copied()
            .unwrap_or(0)
    }
}

fn network_from(raw: engine::Network, attachments: &Attachments) -> Network {
    let id = raw.id.unwrap_or_default();
    let name = raw.name.unwrap_or_default();
    let listed = raw.containers.map(|c| c.len()).unwrap_or(0);
    Network {
        short_id: truncate_id(&id, SHORT_ID_LEN),
        containers: listed.max(attachments.count(&id, &name)),
        id,
        name,
        driver: raw.driver.unwrap_or_default(),
        scope: raw.scope.unwrap_or_default(),
        internal: raw.internal.unwrap_or(false),
    }
}

/// Names of volumes mounted by any of `containers`.
pub(crate) fn mounted_volume_names(containers: &[engine::ContainerSummary]) -> HashSet<String> {
    containers
        .iter()
        .flat_map(|c| c.mounts.iter().flatten())
        .filter(|m| m.typ == Some(MountPointTypeEnum::VOLUME))
        .filter_map(|m| m.name.clone())
        .collect()
}

impl EngineService {
    pub(crate) async fn fetch_containers(
        &self,
        all: bool,
        filters: Filters,
    ) -> Result<Vec<engine::ContainerSummary>> {
        with_timeout(
            Timeouts::LIST,
            "list containers",
            self.api.list_containers(all, filters),
        )
        .await
    }

    pub(crate) async fn fetch_images(&self) -> Result<Vec<engine::ImageSummary>> {
        with_timeout(
            Timeouts::LIST,
            "list images",
            self.api.list_images(false, Filters::new()),
        )
        .await
    }

    pub(crate) async fn fetch_volumes(&self, filters: Filters) -> Result<Vec<engine::Volume>> {
        with_timeout(Timeouts::LIST, "list volumes", self.api.list_volumes(filters)).await
    }

    /// Networks with their attached-container counts, for lookups and prunes.
    pub(crate) async fn fetch_networks(&self) -> Result<Vec<Network>> {
        let (networks, containers) = with_timeout(Timeouts::LIST, "list networks", async {
            tokio::try_join!(
                self.api.list_networks(),
                self.api.list_containers(true, Filters::new())
            )
        })
        .await?;
        let attachments = Attachments::from_containers(&containers);
        Ok(networks
            .into_iter()
            .map(|n| network_from(n, &attachments))
            .collect())
    }

    #[instrument(skip(self))]
    pub async fn list_containers(&self, all: bool) -> Result<Vec<Container>> {
        let token = self.inflight.begin(RequestKind::Containers);
        let raw = cancellable(
            token,
            Timeouts::LIST,
            "list containers",
            self.api.list_containers(all, Filters::new()),
        )
        .await?;
        debug!("Engine returned {} containers", raw.len());
        Ok(raw.into_iter().map(container_from).collect())
    }

    #[instrument(skip(self))]
    pub async fn list_images(&self, all: bool) -> Result<Vec<Image>> {
        let token = self.inflight.begin(RequestKind::Images);
        let raw = cancellable(
            token,
            Timeouts::LIST,
            "list images",
            self.api.list_images(all, Filters::new()),
        )
        .await?;
        Ok(raw.into_iter().flat_map(images_from).collect())
    }

    /// Lists volumes, marking those mounted by any container as in use.
    #[instrument(skip(self))]
    pub async fn list_volumes(&self) -> Result<Vec<Volume>> {
        let token = self.inflight.begin(RequestKind::Volumes);
        let fetch = async {
            let (volumes, containers) = tokio::try_join!(
                self.api.list_volumes(Filters::new()),
                self.api.list_containers(true, Filters::new())
            )?;
            Ok((volumes, containers))
        };
        let (volumes, containers) = cancellable(token, Timeouts::LIST, "list volumes", fetch).await?;
        let mounted = mounted_volume_names(&containers);
        Ok(volumes
            .into_iter()
            .map(|v| {
                let in_use = mounted.contains(&v.name);
                volume_from(v, in_use)
            })
            .collect())
    }

    /// Lists networks with the number of containers attached to each.
    #[instrument(skip(self))]
    pub async fn list_networks(&self) -> Result<Vec<Network>> {
        let token = self.inflight.begin(RequestKind::Networks);
        let fetch = async {
            tokio::try_join!(
                self.api.list_networks(),
                self.api.list_containers(true, Filters::new())
            )
        };
        let (networks, containers) = cancellable(token, Timeouts::LIST, "list networks", fetch).await?;
        let attachments = Attachments::from_containers(&containers);
        Ok(networks
            .into_iter()
            .map(|n| network_from(n, &attachments))
            .collect())
    }

    /// Images with no repository tag.
    #[instrument(skip(self))]
    pub async fn dangling_images(&self) -> Result<Vec<Image>> {
        let raw = with_timeout(
            Timeouts::LIST,
            "list dangling images",
            self.api.list_images(false, filters([("dangling", "true")])),
        )
        .await?;
        Ok(raw.into_iter().flat_map(images_from).collect())
    }

    /// Containers that are exited, created or dead.
    #[instrument(skip(self))]
    pub async fn stopped_containers(&self) -> Result<Vec<Container>> {
        let raw = self
            .fetch_containers(
                true,
                filters([
                    ("status", "exited"),
                    ("status", "created"),
                    ("status", "dead"),
                ]),
            )
            .await?;
        Ok(raw.into_iter().map(container_from).collect())
    }

    /// Volumes the engine reports as not referenced by any container.
    #[instrument(skip(self))]
    pub async fn unused_volumes(&self) -> Result<Vec<Volume>> {
        let raw = self.fetch_volumes(filters([("dangling", "true")])).await?;
        Ok(raw.into_iter().map(|v| volume_from(v, false)).collect())
    }

    /// Runs the four listings concurrently. A failed category is reported
    /// as a warning and leaves its list empty.
    #[instrument(skip(self))]
    pub async fn snapshot(&self) -> ResourceSnapshot {
        let (containers, images, volumes, networks) = tokio::join!(
            self.list_containers(true),
            self.list_images(false),
            self.list_volumes(),
            self.list_networks()
        );
        let mut snapshot = ResourceSnapshot::default();
        snapshot.containers = keep(containers, "containers", &mut snapshot.warnings);
        snapshot.images = keep(images, "images", &mut snapshot.warnings);
        snapshot.volumes = keep(volumes, "volumes", &mut snapshot.warnings);
        snapshot.networks = keep(networks, "networks", &mut snapshot.warnings);
        snapshot
    }

    #[instrument(skip(self))]
    pub async fn engine_info(&self) -> Result<EngineSummary> {
        let (version, info) = with_timeout(Timeouts::LIST, "engine info", async {
            tokio::try_join!(self.api.version(), self.api.info())
        })
        .await?;
        let count = |n: Option<i64>| n.unwrap_or(0).max(0) as u64;
        Ok(EngineSummary {
            version: version.version.unwrap_or_default(),
            api_version: version.api_version.unwrap_or_default(),
            os: version.os.unwrap_or_default(),
            arch: version.arch.unwrap_or_default(),
            containers: count(info.containers),
            containers_running: count(info.containers_running),
            images: count(info.images),
        })
    }
}

fn keep<T>(result: Result<Vec<T>>, category: &str, warnings: &mut Vec<String>) -> Vec<T> {
    match result {
        Ok(items) => items,
        Err(e) => {
            warn!("Failed to list {}: {:#}", category, e);
            warnings.push(format!("Failed to list {}: {}", category, e));
            Vec::new()
        }
    }
}
