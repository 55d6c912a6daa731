//! # Removals, Prunes and Lifecycle Actions
//!
//! File: cli/src/common/docker/service/actions.rs
//!
//! ## Overview
//!
//! The mutating half of the engine service. Engine errors are returned as-is
//! (already mapped to `OctoError` kinds by the transport) and nothing is
//! retried.
//!
//! ## Container state re-check
//!
//! A user may confirm a removal long after the listing they looked at was
//! taken. `remove_container(id, force=false)` therefore re-lists all
//! containers and locates the target again right before the engine call:
//!
//! - target gone: `OctoError::NotFound`, engine untouched.
//! - target now running: `OctoError::StateChanged`, engine untouched.
//! - otherwise: removal by full id.
//!
//! `force=true` skips the re-check and goes straight to the engine.
//!
//! ## Image references
//!
//! `remove_image` resolves its argument with the same `find_image` lookup as
//! its dry run. A tag is passed to the engine as given, so only that tag is
//! removed; an id or unique id prefix is passed as the full image id. An id
//! prefix matching more than one image is `OctoError::NotFound`.
//!
//! ## System networks
//!
//! `bridge`, `host` and `none` are refused by `remove_network` with
//! `OctoError::SystemNetwork` and never become network prune targets.
//!
use super::listing::container_from;
use super::EngineService;
use crate::common::docker::api::{filters, Filters};
use crate::common::docker::timeouts::{with_timeout, Timeouts};
use crate::common::docker::types::{is_system_network, Container, Network};
use crate::core::error::{OctoError, ResourceKind, Result};
use anyhow::anyhow;
use bollard::models::ImageSummary;
use tracing::{debug, info, instrument, warn};

/// An image a query resolved to, with the reference to hand the engine.
#[derive(Debug, Clone)]
pub(crate) struct ImageTarget {
    pub image: ImageSummary,
    /// The matched tag, or the full image id.
    pub reference: String,
}

impl ImageTarget {
    pub fn by_tag(&self) -> bool {
        self.reference != self.image.id
    }
}

/// Picks the container `query` names: exact id, short id or name first, then
/// a unique id prefix.
pub(crate) fn find_container(containers: Vec<Container>, query: &str) -> Result<Container> {
    let not_found = || {
        anyhow!(OctoError::NotFound {
            kind: ResourceKind::Container,
            id: query.to_string(),
        })
    };
    let name = query.trim_start_matches('/');
    if let Some(exact) = containers
        .iter()
        .find(|c| c.id == query || c.short_id == query || c.name == name)
    {
        return Ok(exact.clone());
    }
    let mut candidates = containers.into_iter().filter(|c| c.matches(query));
    match (candidates.next(), candidates.next()) {
        (Some(only), None) => Ok(only),
        (Some(_), Some(_)) => {
            warn!("Container id prefix '{}' is ambiguous", query);
            Err(not_found())
        }
        _ => Err(not_found()),
    }
}

/// Picks the image `query` names: full id, repository tag (`:latest`
/// implied), then a unique id prefix.
pub(crate) fn find_image(images: Vec<ImageSummary>, query: &str) -> Result<ImageTarget> {
    let not_found = || {
        anyhow!(OctoError::NotFound {
            kind: ResourceKind::Image,
            id: query.to_string(),
        })
    };
    let bare = query.strip_prefix("sha256:").unwrap_or(query);
    let bare_id = |image: &ImageSummary| image.id.trim_start_matches("sha256:").to_string();

    if let Some(image) = images.iter().find(|i| i.id == query || bare_id(i) == bare) {
        return Ok(ImageTarget {
            reference: image.id.clone(),
            image: image.clone(),
        });
    }
    let latest = format!("{}:latest", query);
    for image in &images {
        if let Some(tag) = image.repo_tags.iter().find(|t| **t == query || **t == latest) {
            return Ok(ImageTarget {
                reference: tag.clone(),
                image: image.clone(),
            });
        }
    }
    if bare.is_empty() {
        return Err(not_found());
    }
    let mut candidates = images.into_iter().filter(|i| bare_id(i).starts_with(bare));
    match (candidates.next(), candidates.next()) {
        (Some(only), None) => Ok(ImageTarget {
            reference: only.id.clone(),
            image: only,
        }),
        (Some(_), Some(_)) => {
            warn!("Image id prefix '{}' is ambiguous", query);
            Err(not_found())
        }
        _ => Err(not_found()),
    }
}

pub(crate) fn find_network(networks: Vec<Network>, query: &str) -> Result<Network> {
    let mut candidates: Vec<Network> = networks.into_iter().filter(|n| n.matches(query)).collect();
    if let Some(pos) = candidates.iter().position(|n| n.name == query || n.id == query) {
        return Ok(candidates.swap_remove(pos));
    }
    match candidates.len() {
        1 => Ok(candidates.remove(0)),
        _ => Err(anyhow!(OctoError::NotFound {
            kind: ResourceKind::Network,
            id: query.to_string(),
        })),
    }
}

/// Networks a prune would remove: no attached containers, not a system network.
pub(crate) fn network_prune_targets(networks: Vec<Network>) -> Vec<Network> {
    networks
        .into_iter()
        .filter(|n| !n.is_system() && n.containers == 0)
        .collect()
}

/// Filter for the image prune: `all` removes unreferenced tagged images too.
pub(crate) fn image_prune_filters(all: bool) -> Filters {
    filters([("dangling", if all { "false" } else { "true" })])
}

/// Volume prune scope. `all=true` takes named volumes too, matching the
/// `dangling=true` listing the dry run shows; engines before API 1.42 reject
/// the filter.
pub(crate) fn volume_prune_filters() -> Filters {
    filters([("all", "true")])
}

impl EngineService {
    /// Fresh lookup of one container among all containers, running or not.
    pub(crate) async fn locate_container(&self, query: &str) -> Result<Container> {
        let raw = self.fetch_containers(true, Filters::new()).await?;
        find_container(raw.into_iter().map(container_from).collect(), query)
    }

    pub(crate) async fn locate_image(&self, query: &str) -> Result<ImageTarget> {
        find_image(self.fetch_images().await?, query)
    }

    pub(crate) async fn locate_network(&self, query: &str) -> Result<Network> {
        find_network(self.fetch_networks().await?, query)
    }

    #[instrument(skip(self), fields(container = %id))]
    pub async fn remove_container(&self, id: &str, force: bool) -> Result<()> {
        let target = if force {
            id.to_string()
        } else {
            let container = self.locate_container(id).await?;
            if container.state.is_running() {
                warn!("Refusing to remove running container {}", container.short_id);
                return Err(anyhow!(OctoError::StateChanged {
                    id: id.to_string(),
                    reason: "container is now running; stop it or use force".to_string(),
                }));
            }
            container.id
        };
        with_timeout(
            Timeouts::REMOVE,
            "remove container",
            self.api.remove_container(&target, force),
        )
        .await?;
        info!("Removed container {}", id);
        Ok(())
    }

    /// Removes an image, or one tag of it when `id` is a tag. Untagged
    /// parent layers go with it.
    #[instrument(skip(self), fields(image = %id))]
    pub async fn remove_image(&self, id: &str, force: bool) -> Result<()> {
        let target = self.locate_image(id).await?;
        with_timeout(
            Timeouts::REMOVE,
            "remove image",
            self.api.remove_image(&target.reference, force),
        )
        .await?;
        info!("Removed image {}", target.reference);
        Ok(())
    }

    #[instrument(skip(self), fields(volume = %name))]
    pub async fn remove_volume(&self, name: &str, force: bool) -> Result<()> {
        with_timeout(
            Timeouts::REMOVE,
            "remove volume",
            self.api.remove_volume(name, force),
        )
        .await?;
        info!("Removed volume {}", name);
        Ok(())
    }

    #[instrument(skip(self), fields(network = %id))]
    pub async fn remove_network(&self, id: &str) -> Result<()> {
        if is_system_network(id) {
            return Err(anyhow!(OctoError::SystemNetwork {
                name: id.to_string()
            }));
        }
        let network = self.locate_network(id).await?;
        if network.is_system() {
            return Err(anyhow!(OctoError::SystemNetwork { name: network.name }));
        }
        with_timeout(
            Timeouts::REMOVE,
            "remove network",
            self.api.remove_network(&network.id),
        )
        .await?;
        info!("Removed network {}", network.name);
        Ok(())
    }

    /// Removes all stopped containers. Returns bytes reclaimed.
    #[instrument(skip(self))]
    pub async fn prune_containers(&self) -> Result<u64> {
        let reclaimed = with_timeout(
            Timeouts::PRUNE,
            "prune containers",
            self.api.prune_containers(Filters::new()),
        )
        .await?;
        info!("Container prune reclaimed {} bytes", reclaimed);
        Ok(reclaimed)
    }

    /// `all=false` removes dangling images only; `all=true` also removes
    /// tagged images no container references.
    #[instrument(skip(self))]
    pub async fn prune_images(&self, all: bool) -> Result<u64> {
        let reclaimed = with_timeout(
            Timeouts::PRUNE,
            "prune images",
            self.api.prune_images(image_prune_filters(all)),
        )
        .await?;
        info!("Image prune reclaimed {} bytes", reclaimed);
        Ok(reclaimed)
    }

    /// Removes every volume no container mounts, named or anonymous.
    #[instrument(skip(self))]
    pub async fn prune_volumes(&self) -> Result<u64> {
        let reclaimed = with_timeout(
            Timeouts::PRUNE,
            "prune volumes",
            self.api.prune_volumes(volume_prune_filters()),
        )
        .await?;
        info!("Volume prune reclaimed {} bytes", reclaimed);
        Ok(reclaimed)
    }

    /// Prunes unused networks. System networks are never targets; when no
    /// other network qualifies the engine is not called.
    #[instrument(skip(self))]
    pub async fn prune_networks(&self) -> Result<()> {
        let targets = network_prune_targets(self.fetch_networks().await?);
        if targets.is_empty() {
            debug!("No unused networks to prune");
            return Ok(());
        }
        debug!("Pruning {} unused networks", targets.len());
        with_timeout(
            Timeouts::PRUNE,
            "prune networks",
            self.api.prune_networks(Filters::new()),
        )
        .await?;
        info!("Pruned unused networks");
        Ok(())
    }

    /// `all=false` keeps recently used cache entries; `all=true` clears every idle entry.
    #[instrument(skip(self))]
    pub async fn prune_build_cache(&self, all: bool) -> Result<u64> {
        let reclaimed = with_timeout(
            Timeouts::PRUNE,
            "prune build cache",
            self.api.prune_build_cache(all),
        )
        .await?;
        info!("Build cache prune reclaimed {} bytes", reclaimed);
        Ok(reclaimed)
    }

    #[instrument(skip(self), fields(container = %id))]
    pub async fn start_container(&self, id: &str) -> Result<()> {
        let container = self.locate_container(id).await?;
        with_timeout(
            Timeouts::ACTION,
            "start container",
            self.api.start_container(&container.id),
        )
        .await?;
        info!("Started container {}", container.name);
        Ok(())
    }

    #[instrument(skip(self), fields(container = %id))]
    pub async fn stop_container(&self, id: &str) -> Result<()> {
        let container = self.locate_container(id).await?;
        with_timeout(
            Timeouts::ACTION,
            "stop container",
            self.api.stop_container(&container.id),
        )
        .await?;
        info!("Stopped container {}", container.name);
        Ok(())
    }

    #[instrument(skip(self), fields(container = %id))]
    pub async fn restart_container(&self, id: &str) -> Result<()> {
        let container = self.locate_container(id).await?;
        with_timeout(
            Timeouts::ACTION,
            "restart container",
            self.api.restart_container(&container.id),
        )
        .await?;
        info!("Restarted container {}", container.name);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::docker::fake::{samples, FakeEngine};
    use std::sync::Arc;

    const FULL_ID: &str = "abc123def4567890aaaabbbbccccdddd";

    fn service(fake: FakeEngine) -> (Arc<FakeEngine>, EngineService) {
        let fake = Arc::new(fake);
        (fake.clone(), EngineService::new(fake))
    }

    #[tokio::test]
    async fn test_remove_exited_container_by_short_id() {
        let (fake, service) = service(
            FakeEngine::new().with_containers(vec![samples::container(FULL_ID, "web", "exited")]),
        );
        service.remove_container("abc123", false).await.unwrap();
        assert!(fake
            .calls()
            .contains(&format!("remove_container {} force=false", FULL_ID)));
    }

    #[tokio::test]
    async fn test_remove_refuses_container_that_started_running() {
        let (fake, service) = service(
            FakeEngine::new().with_containers(vec![samples::container(FULL_ID, "web", "running")]),
        );
        let err = service.remove_container("abc123", false).await.unwrap_err();
        assert!(OctoError::is_state_changed(&err));
        assert!(!fake.called("remove_container"));
    }

    #[tokio::test]
    async fn test_remove_vanished_container_is_not_found() {
        let (fake, service) = service(FakeEngine::new().with_containers(vec![]));
        let err = service.remove_container("abc123", false).await.unwrap_err();
        assert!(OctoError::is_not_found(&err));
        assert!(!fake.called("remove_container"));
    }

    #[tokio::test]
    async fn test_force_skips_state_check() {
        let (fake, service) = service(
            FakeEngine::new().with_containers(vec![samples::container(FULL_ID, "web", "running")]),
        );
        service.remove_container("abc123", true).await.unwrap();
        assert!(!fake.called("list_containers"));
        assert!(fake.called("remove_container abc123 force=true"));
    }

    #[test]
    fn test_find_container_prefers_exact_and_rejects_ambiguous_prefix() {
        let containers: Vec<Container> = vec![
            samples::container("abc111", "first", "exited"),
            samples::container("abc222", "abc", "exited"),
        ]
        .into_iter()
        .map(container_from)
        .collect();
        assert_eq!(find_container(containers.clone(), "abc").unwrap().id, "abc222");
        assert_eq!(find_container(containers.clone(), "/first").unwrap().id, "abc111");
        assert_eq!(find_container(containers.clone(), "abc1").unwrap().id, "abc111");
        assert!(find_container(containers, "ab").is_err());
    }

    #[test]
    fn test_find_image_rejects_ambiguous_prefix() {
        let images = vec![
            samples::image("sha256:abc1110000000000", &["one:v1"], 10, 0),
            samples::image("sha256:abc2220000000000", &["two:latest"], 10, 0),
        ];
        let err = find_image(images.clone(), "abc").unwrap_err();
        assert!(OctoError::is_not_found(&err));

        let by_prefix = find_image(images.clone(), "abc1").unwrap();
        assert_eq!(by_prefix.reference, "sha256:abc1110000000000");
        assert!(!by_prefix.by_tag());

        let by_tag = find_image(images.clone(), "two").unwrap();
        assert_eq!(by_tag.reference, "two:latest");
        assert!(by_tag.by_tag());

        let by_full_id = find_image(images, "abc2220000000000").unwrap();
        assert_eq!(by_full_id.image.id, "sha256:abc2220000000000");
    }

    #[tokio::test]
    async fn test_remove_image_resolves_through_lookup() {
        let (fake, service) = service(FakeEngine::new().with_images(vec![
            samples::image("sha256:abc1110000000000", &["one:v1"], 10, 0),
            samples::image("sha256:abc2220000000000", &["two:latest"], 10, 0),
        ]));
        service.remove_image("abc2", false).await.unwrap();
        service.remove_image("one:v1", true).await.unwrap();
        assert!(fake.called("remove_image sha256:abc2220000000000 force=false"));
        assert!(fake.called("remove_image one:v1 force=true"));

        let err = service.remove_image("abc", false).await.unwrap_err();
        assert!(OctoError::is_not_found(&err));
        assert_eq!(
            fake.calls().iter().filter(|c| c.starts_with("remove_image")).count(),
            2
        );
    }

    #[tokio::test]
    async fn test_prune_volumes_includes_named_volumes() {
        let (fake, service) = service(
            FakeEngine::new().with_volumes(vec![samples::volume("data"), samples::volume("cache")]),
        );
        let preview = service.prune_volumes_dry_run().await.unwrap();
        assert_eq!(preview.resources.len(), 2);

        service.prune_volumes().await.unwrap();
        assert!(fake.called(r#"prune_volumes [("all", ["true"])]"#));
    }

    #[tokio::test]
    async fn test_remove_system_network_refused() {
        let (fake, service) = service(
            FakeEngine::new().with_networks(vec![samples::network("n1", "bridge", 0)]),
        );
        for target in ["bridge", "n1"] {
            let err = service.remove_network(target).await.unwrap_err();
            assert!(matches!(
                err.downcast_ref::<OctoError>(),
                Some(OctoError::SystemNetwork { .. })
            ));
        }
        assert!(!fake.called("remove_network"));
    }

    #[tokio::test]
    async fn test_remove_network_by_name_uses_full_id() {
        let (fake, service) = service(
            FakeEngine::new().with_networks(vec![samples::network("f00d1234", "app_default", 0)]),
        );
        service.remove_network("app_default").await.unwrap();
        assert!(fake.called("remove_network f00d1234"));
    }

    #[tokio::test]
    async fn test_image_prune_filter_inversion() {
        let (fake, service) = service(FakeEngine::new().on_prune(|_| Ok(512)));
        assert_eq!(service.prune_images(true).await.unwrap(), 512);
        service.prune_images(false).await.unwrap();
        let calls = fake.calls();
        assert_eq!(calls[0], r#"prune_images [("dangling", ["false"])]"#);
        assert_eq!(calls[1], r#"prune_images [("dangling", ["true"])]"#);
    }

    #[tokio::test]
    async fn test_network_prune_skips_when_only_system_networks() {
        let (fake, service) = service(FakeEngine::new().with_networks(vec![
            samples::network("n1", "bridge", 0),
            samples::network("n2", "host", 0),
            samples::network("n3", "none", 0),
            samples::network("n4", "busy", 2),
        ]));
        service.prune_networks().await.unwrap();
        assert!(!fake.called("prune_networks"));
    }

    #[tokio::test]
    async fn test_network_prune_runs_with_targets() {
        let (fake, service) = service(FakeEngine::new().with_networks(vec![
            samples::network("n1", "bridge", 0),
            samples::network("n5", "stale", 0),
        ]));
        service.prune_networks().await.unwrap();
        assert!(fake.called("prune_networks"));
    }

    #[tokio::test]
    async fn test_lifecycle_resolves_short_id() {
        let (fake, service) = service(
            FakeEngine::new().with_containers(vec![samples::container(FULL_ID, "web", "exited")]),
        );
        service.start_container("abc123").await.unwrap();
        service.stop_container("web").await.unwrap();
        service.restart_container(FULL_ID).await.unwrap();
        assert!(fake.called(&format!("start_container {}", FULL_ID)));
        assert!(fake.called(&format!("stop_container {}", FULL_ID)));
        assert!(fake.called(&format!("restart_container {}", FULL_ID)));

        let err = service.start_container("missing").await.unwrap_err();
        assert!(OctoError::is_not_found(&err));
    }

    #[tokio::test]
    async fn test_engine_errors_pass_through() {
        let (_, service) = service(FakeEngine::new().on_remove(|(_, target, _)| {
            Err(anyhow!(OctoError::EngineReject {
                status: 409,
                message: format!("volume {} is in use", target),
            }))
        }));
        let err = service.remove_volume("data", false).await.unwrap_err();
        assert!(err.to_string().contains("volume data is in use"));
    }
}
