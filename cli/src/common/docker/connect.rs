//! # Octo Engine Transport
//!
//! File: cli/src/common/docker/connect.rs
//!
//! ## Overview
//!
//! Owns the single connection to the local engine socket. Connecting is
//! eager: the client is created, the API version negotiated, and a ping
//! round-trip made before `connect` returns. A transport that fails any of
//! those steps is never handed to the service.
//!
//! `EngineTransport` implements `EngineApi` by delegating to `bollard`, which
//! is safe for concurrent use, so the service can share one transport across
//! parallel requests. The build cache prune, which `bollard` does not wrap,
//! goes through `build_cache` over the same socket.
//!
//! ## Errors
//!
//! - Socket/client creation failure: `OctoError::Transport`.
//! - Version negotiation failure: `OctoError::Transport`.
//! - Ping exceeding the ping timeout: `OctoError::Transport("daemon unresponsive")`.
//!
use super::api::{EngineApi, Filters, LogBody, LogsRequest};
use super::build_cache::{self, DEFAULT_SOCKET_PATH};
use super::timeouts::Timeouts;
use crate::common::logs::framing::encode_frame;
use crate::core::error::{OctoError, ResourceKind, Result};
use anyhow::{anyhow, Context};
use async_trait::async_trait;
use bollard::{
    container::{
        ListContainersOptions, LogOutput, LogsOptions, PruneContainersOptions,
        RemoveContainerOptions, RestartContainerOptions, StartContainerOptions,
        StopContainerOptions,
    },
    image::{ListImagesOptions, PruneImagesOptions, RemoveImageOptions},
    models::{ContainerSummary, ImageSummary, Network, SystemDataUsageResponse, SystemInfo, Volume},
    network::{ListNetworksOptions, PruneNetworksOptions},
    system::Version,
    volume::{ListVolumesOptions, PruneVolumesOptions, RemoveVolumeOptions},
    Docker,
};
use bytes::Bytes;
use futures_util::StreamExt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info, instrument, warn};

/// Client-side request timeout handed to bollard, in seconds. Per-operation
/// limits in `Timeouts` are tighter and apply on top of it.
const CLIENT_TIMEOUT_SECS: u64 = 120;

/// Socket-backed engine connection.
pub struct EngineTransport {
    docker: Docker,
    /// Unix socket path, for the calls made without `bollard`.
    socket_path: PathBuf,
    closed: AtomicBool,
}

impl EngineTransport {
    /// Connects, negotiates the API version and pings the engine.
    ///
    /// `socket` is a path or `unix://` URL; `None` uses the platform default.
    #[instrument(skip_all, fields(socket = ?socket))]
    pub async fn connect(socket: Option<&str>) -> Result<Self> {
        let docker = open_client(socket)?;
        let docker = docker.negotiate_version().await.map_err(|e| {
            anyhow!(OctoError::Transport(format!(
                "API version negotiation failed: {}",
                e
            )))
        })?;
        info!("Connected to engine, API version negotiated");

        let transport = Self {
            docker,
            socket_path: socket_path(socket),
            closed: AtomicBool::new(false),
        };
        match tokio::time::timeout(Timeouts::PING, transport.ping()).await {
            Ok(result) => result.context("Engine ping failed")?,
            Err(_) => {
                warn!("Engine did not answer ping within {:?}", Timeouts::PING);
                return Err(anyhow!(OctoError::Transport(
                    "daemon unresponsive".to_string()
                )));
            }
        }
        Ok(transport)
    }

    fn client(&self) -> Result<&Docker> {
        if self.closed.load(Ordering::Acquire) {
            return Err(anyhow!(OctoError::Transport(
                "engine connection closed".to_string()
            )));
        }
        Ok(&self.docker)
    }
}

fn socket_path(socket: Option<&str>) -> PathBuf {
    let address = socket.unwrap_or(DEFAULT_SOCKET_PATH);
    PathBuf::from(address.strip_prefix("unix://").unwrap_or(address))
}

fn open_client(socket: Option<&str>) -> Result<Docker> {
    let connected = match socket {
        #[cfg(unix)]
        Some(address) => {
            let path = address.strip_prefix("unix://").unwrap_or(address);
            debug!("Connecting to engine socket {}", path);
            Docker::connect_with_unix(path, CLIENT_TIMEOUT_SECS, bollard::API_DEFAULT_VERSION)
        }
        #[cfg(not(unix))]
        Some(address) => {
            debug!("Ignoring socket {} on this platform, using defaults", address);
            Docker::connect_with_local_defaults()
        }
        None => Docker::connect_with_local_defaults(),
    };
    connected.map_err(|e| {
        anyhow!(OctoError::Transport(format!(
            "Failed to connect to engine: {}. Is it running and accessible?",
            e
        )))
    })
}

fn engine_error(kind: ResourceKind, id: &str) -> impl FnOnce(bollard::errors::Error) -> anyhow::Error + '_ {
    move |e| anyhow!(OctoError::from_engine(e, kind, id))
}

fn listing_error(e: bollard::errors::Error) -> anyhow::Error {
    anyhow!(OctoError::from_engine(e, ResourceKind::Container, ""))
}

fn reclaimed(space: Option<i64>) -> u64 {
    space.unwrap_or(0).max(0) as u64
}

/// Re-frames a decoded bollard log chunk into its wire shape.
///
/// bollard already splits multiplexed bodies, so stdout/stderr chunks are
/// re-encoded with their 8-byte header and TTY (`Console`) chunks pass through
/// raw. The log pipeline then demultiplexes one uniform byte stream.
fn wire_bytes(output: LogOutput) -> Bytes {
    match output {
        LogOutput::StdIn { message } => encode_frame(0, &message),
        LogOutput::StdOut { message } => encode_frame(1, &message),
        LogOutput::StdErr { message } => encode_frame(2, &message),
        LogOutput::Console { message } => message,
    }
}

#[async_trait]
impl EngineApi for EngineTransport {
    async fn ping(&self) -> Result<()> {
        self.client()?
            .ping()
            .await
            .map(|_| ())
            .map_err(|e| anyhow!(OctoError::Transport(format!("ping failed: {}", e))))
    }

    async fn version(&self) -> Result<Version> {
        self.client()?.version().await.map_err(listing_error)
    }

    async fn info(&self) -> Result<SystemInfo> {
        self.client()?.info().await.map_err(listing_error)
    }

    async fn list_containers(&self, all: bool, filters: Filters) -> Result<Vec<ContainerSummary>> {
        let options = ListContainersOptions {
            all,
            size: true,
            filters,
            ..Default::default()
        };
        self.client()?
            .list_containers(Some(options))
            .await
            .map_err(listing_error)
    }

    async fn list_images(&self, all: bool, filters: Filters) -> Result<Vec<ImageSummary>> {
        let options = ListImagesOptions {
            all,
            filters,
            ..Default::default()
        };
        self.client()?
            .list_images(Some(options))
            .await
            .map_err(listing_error)
    }

    async fn list_volumes(&self, filters: Filters) -> Result<Vec<Volume>> {
        let response = self
            .client()?
            .list_volumes(Some(ListVolumesOptions { filters }))
            .await
            .map_err(listing_error)?;
        for warning in response.warnings.unwrap_or_default() {
            warn!("Engine volume listing warning: {}", warning);
        }
        Ok(response.volumes.unwrap_or_default())
    }

    async fn list_networks(&self) -> Result<Vec<Network>> {
        self.client()?
            .list_networks(None::<ListNetworksOptions<String>>)
            .await
            .map_err(listing_error)
    }

    async fn disk_usage(&self) -> Result<SystemDataUsageResponse> {
        self.client()?.df().await.map_err(listing_error)
    }

    async fn remove_container(&self, id: &str, force: bool) -> Result<()> {
        let options = RemoveContainerOptions {
            force,
            ..Default::default()
        };
        self.client()?
            .remove_container(id, Some(options))
            .await
            .map_err(engine_error(ResourceKind::Container, id))
    }

    async fn remove_image(&self, id: &str, force: bool) -> Result<()> {
        let options = RemoveImageOptions {
            force,
            noprune: false,
        };
        let results = self
            .client()?
            .remove_image(id, Some(options), None)
            .await
            .map_err(engine_error(ResourceKind::Image, id))?;
        for result in results {
            if let Some(deleted) = result.deleted {
                debug!("Deleted: {}", deleted);
            }
            if let Some(untagged) = result.untagged {
                debug!("Untagged: {}", untagged);
            }
        }
        Ok(())
    }

    async fn remove_volume(&self, name: &str, force: bool) -> Result<()> {
        self.client()?
            .remove_volume(name, Some(RemoveVolumeOptions { force }))
            .await
            .map_err(engine_error(ResourceKind::Volume, name))
    }

    async fn remove_network(&self, id: &str) -> Result<()> {
        self.client()?
            .remove_network(id)
            .await
            .map_err(engine_error(ResourceKind::Network, id))
    }

    async fn prune_containers(&self, filters: Filters) -> Result<u64> {
        let response = self
            .client()?
            .prune_containers(Some(PruneContainersOptions { filters }))
            .await
            .map_err(listing_error)?;
        debug!(
            "Pruned containers: {:?}",
            response.containers_deleted.unwrap_or_default()
        );
        Ok(reclaimed(response.space_reclaimed))
    }

    async fn prune_images(&self, filters: Filters) -> Result<u64> {
        let response = self
            .client()?
            .prune_images(Some(PruneImagesOptions { filters }))
            .await
            .map_err(listing_error)?;
        debug!(
            "Pruned {} image entries",
            response.images_deleted.map(|v| v.len()).unwrap_or(0)
        );
        Ok(reclaimed(response.space_reclaimed))
    }

    async fn prune_volumes(&self, filters: Filters) -> Result<u64> {
        let response = self
            .client()?
            .prune_volumes(Some(PruneVolumesOptions { filters }))
            .await
            .map_err(listing_error)?;
        debug!(
            "Pruned volumes: {:?}",
            response.volumes_deleted.unwrap_or_default()
        );
        Ok(reclaimed(response.space_reclaimed))
    }

    async fn prune_networks(&self, filters: Filters) -> Result<()> {
        let response = self
            .client()?
            .prune_networks(Some(PruneNetworksOptions { filters }))
            .await
            .map_err(listing_error)?;
        debug!(
            "Pruned networks: {:?}",
            response.networks_deleted.unwrap_or_default()
        );
        Ok(())
    }

    async fn prune_build_cache(&self, all: bool) -> Result<u64> {
        let version = self.client()?.client_version();
        build_cache::prune(&self.socket_path, &version, all).await
    }

    async fn start_container(&self, id: &str) -> Result<()> {
        match self
            .client()?
            .start_container(id, None::<StartContainerOptions<String>>)
            .await
        {
            Ok(()) => Ok(()),
            // 304: already running.
            Err(bollard::errors::Error::DockerResponseServerError {
                status_code: 304, ..
            }) => Ok(()),
            Err(e) => Err(engine_error(ResourceKind::Container, id)(e)),
        }
    }

    async fn stop_container(&self, id: &str) -> Result<()> {
        match self
            .client()?
            .stop_container(id, None::<StopContainerOptions>)
            .await
        {
            Ok(()) => Ok(()),
            // 304: already stopped.
            Err(bollard::errors::Error::DockerResponseServerError {
                status_code: 304, ..
            }) => Ok(()),
            Err(e) => Err(engine_error(ResourceKind::Container, id)(e)),
        }
    }

    async fn restart_container(&self, id: &str) -> Result<()> {
        self.client()?
            .restart_container(id, None::<RestartContainerOptions>)
            .await
            .map_err(engine_error(ResourceKind::Container, id))
    }

    fn container_logs(&self, id: &str, request: LogsRequest) -> LogBody {
        let docker = match self.client() {
            Ok(docker) => docker.clone(),
            Err(e) => return futures_util::stream::once(async move { Err(e) }).boxed(),
        };
        let options = LogsOptions::<String> {
            follow: request.follow,
            stdout: true,
            stderr: true,
            timestamps: request.timestamps,
            tail: request.tail,
            ..Default::default()
        };
        let owned_id = id.to_string();
        docker
            .logs(id, Some(options))
            .map(move |chunk| {
                chunk
                    .map(wire_bytes)
                    .map_err(|e| anyhow!(OctoError::from_engine(e, ResourceKind::Container, &owned_id)))
            })
            .boxed()
    }

    fn close(&self) {
        if !self.closed.swap(true, Ordering::AcqRel) {
            info!("Engine connection closed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_bytes_reframes_streams() {
        let out = wire_bytes(LogOutput::StdOut {
            message: Bytes::from_static(b"hi\n"),
        });
        assert_eq!(&out[..8], &[1, 0, 0, 0, 0, 0, 0, 3]);
        assert_eq!(&out[8..], b"hi\n");

        let err = wire_bytes(LogOutput::StdErr {
            message: Bytes::from_static(b"x"),
        });
        assert_eq!(err[0], 2);

        let tty = wire_bytes(LogOutput::Console {
            message: Bytes::from_static(b"2024-01-01T00:00:00Z raw\n"),
        });
        assert_eq!(&tty[..], b"2024-01-01T00:00:00Z raw\n");
    }

    #[test]
    fn test_socket_path_resolution() {
        assert_eq!(socket_path(None), PathBuf::from("/var/run/docker.sock"));
        assert_eq!(
            socket_path(Some("unix:///run/user/1000/docker.sock")),
            PathBuf::from("/run/user/1000/docker.sock")
        );
        assert_eq!(
            socket_path(Some("/tmp/engine.sock")),
            PathBuf::from("/tmp/engine.sock")
        );
    }

    #[test]
    fn test_reclaimed_clamps_negative() {
        assert_eq!(reclaimed(None), 0);
        assert_eq!(reclaimed(Some(-5)), 0);
        assert_eq!(reclaimed(Some(4096)), 4096);
    }

    /// Requires a running engine. Run locally with `cargo test -- --ignored`.
    #[tokio::test]
    #[ignore]
    async fn test_connect_and_close() {
        let transport = EngineTransport::connect(None).await.expect("engine reachable");
        transport.close();
        transport.close();
        assert!(transport.ping().await.is_err());
    }
}
