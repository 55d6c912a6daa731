//! In-memory `EngineApi` for tests.
//!
//! Each operation is a closure that can be replaced per test; unset ones
//! return empty results. Every call is recorded as `"<op> <args>"` so tests
//! can assert on what reached the engine.
//!
use super::api::{EngineApi, Filters, LogBody, LogsRequest};
use crate::core::error::Result;
use async_trait::async_trait;
use bollard::models::{
    ContainerSummary, ImageSummary, Network, SystemDataUsageResponse, SystemInfo, Volume,
};
use bollard::system::Version;
use futures_util::StreamExt;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

type Op<A, T> = Box<dyn Fn(A) -> Result<T> + Send + Sync>;

#[derive(Default)]
pub struct FakeEngine {
    list_containers: Option<Op<(bool, Filters), Vec<ContainerSummary>>>,
    list_images: Option<Op<(bool, Filters), Vec<ImageSummary>>>,
    list_volumes: Option<Op<Filters, Vec<Volume>>>,
    list_networks: Option<Op<(), Vec<Network>>>,
    disk_usage: Option<Op<(), SystemDataUsageResponse>>,
    /// `(op, target, force)` for every removal.
    remove: Option<Op<(&'static str, String, bool), ()>>,
    /// `(op, filters)` for every prune; build-cache prune passes `all` as a filter.
    prune: Option<Op<(&'static str, Filters), u64>>,
    logs: Option<Box<dyn Fn(&str, &LogsRequest) -> LogBody + Send + Sync>>,
    calls: Mutex<Vec<String>>,
    closed: AtomicBool,
}

impl FakeEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_containers(mut self, containers: Vec<ContainerSummary>) -> Self {
        self.list_containers = Some(Box::new(move |_| Ok(containers.clone())));
        self
    }

    pub fn with_images(mut self, images: Vec<ImageSummary>) -> Self {
        self.list_images = Some(Box::new(move |_| Ok(images.clone())));
        self
    }

    pub fn with_volumes(mut self, volumes: Vec<Volume>) -> Self {
        self.list_volumes = Some(Box::new(move |_| Ok(volumes.clone())));
        self
    }

    pub fn with_networks(mut self, networks: Vec<Network>) -> Self {
        self.list_networks = Some(Box::new(move |_| Ok(networks.clone())));
        self
    }

    pub fn on_list_networks(
        mut self,
        op: impl Fn(()) -> Result<Vec<Network>> + Send + Sync + 'static,
    ) -> Self {
        self.list_networks = Some(Box::new(op));
        self
    }

    pub fn with_disk_usage(mut self, usage: SystemDataUsageResponse) -> Self {
        self.disk_usage = Some(Box::new(move |_| Ok(usage.clone())));
        self
    }

    pub fn on_remove(
        mut self,
        op: impl Fn((&'static str, String, bool)) -> Result<()> + Send + Sync + 'static,
    ) -> Self {
        self.remove = Some(Box::new(op));
        self
    }

    pub fn on_prune(
        mut self,
        op: impl Fn((&'static str, Filters)) -> Result<u64> + Send + Sync + 'static,
    ) -> Self {
        self.prune = Some(Box::new(op));
        self
    }

    pub fn on_logs(
        mut self,
        op: impl Fn(&str, &LogsRequest) -> LogBody + Send + Sync + 'static,
    ) -> Self {
        self.logs = Some(Box::new(op));
        self
    }

    /// Calls recorded so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// True if any recorded call starts with `prefix`.
    pub fn called(&self, prefix: &str) -> bool {
        self.calls().iter().any(|c| c.starts_with(prefix))
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn remove_op(&self, op: &'static str, target: &str, force: bool) -> Result<()> {
        self.record(format!("{} {} force={}", op, target, force));
        match &self.remove {
            Some(handler) => handler((op, target.to_string(), force)),
            None => Ok(()),
        }
    }

    fn prune_op(&self, op: &'static str, filters: Filters) -> Result<u64> {
        self.record(format!("{} {:?}", op, sorted(&filters)));
        match &self.prune {
            Some(handler) => handler((op, filters)),
            None => Ok(0),
        }
    }

    fn action_op(&self, op: &'static str, id: &str) -> Result<()> {
        self.record(format!("{} {}", op, id));
        Ok(())
    }
}

fn sorted(filters: &Filters) -> Vec<(String, Vec<String>)> {
    let mut pairs: Vec<_> = filters.clone().into_iter().collect();
    pairs.sort();
    pairs
}

#[async_trait]
impl EngineApi for FakeEngine {
    async fn ping(&self) -> Result<()> {
        self.record("ping".into());
        Ok(())
    }

    async fn version(&self) -> Result<Version> {
        self.record("version".into());
        Ok(Version {
            version: Some("27.3.1".into()),
            api_version: Some("1.47".into()),
            os: Some("linux".into()),
            arch: Some("amd64".into()),
            ..Default::default()
        })
    }

    async fn info(&self) -> Result<SystemInfo> {
        self.record("info".into());
        Ok(SystemInfo {
            containers: Some(3),
            containers_running: Some(1),
            images: Some(5),
            ..Default::default()
        })
    }

    async fn list_containers(&self, all: bool, filters: Filters) -> Result<Vec<ContainerSummary>> {
        self.record(format!("list_containers all={} {:?}", all, sorted(&filters)));
        match &self.list_containers {
            Some(handler) => handler((all, filters)),
            None => Ok(Vec::new()),
        }
    }

    async fn list_images(&self, all: bool, filters: Filters) -> Result<Vec<ImageSummary>> {
        self.record(format!("list_images all={} {:?}", all, sorted(&filters)));
        match &self.list_images {
            Some(handler) => handler((all, filters)),
            None => Ok(Vec::new()),
        }
    }

    async fn list_volumes(&self, filters: Filters) -> Result<Vec<Volume>> {
        self.record(format!("list_volumes {:?}", sorted(&filters)));
        match &self.list_volumes {
            Some(handler) => handler(filters),
            None => Ok(Vec::new()),
        }
    }

    async fn list_networks(&self) -> Result<Vec<Network>> {
        self.record("list_networks".into());
        match &self.list_networks {
            Some(handler) => handler(()),
            None => Ok(Vec::new()),
        }
    }

    async fn disk_usage(&self) -> Result<SystemDataUsageResponse> {
        self.record("disk_usage".into());
        match &self.disk_usage {
            Some(handler) => handler(()),
            None => Ok(SystemDataUsageResponse::default()),
        }
    }

    async fn remove_container(&self, id: &str, force: bool) -> Result<()> {
        self.remove_op("remove_container", id, force)
    }

    async fn remove_image(&self, id: &str, force: bool) -> Result<()> {
        self.remove_op("remove_image", id, force)
    }

    async fn remove_volume(&self, name: &str, force: bool) -> Result<()> {
        self.remove_op("remove_volume", name, force)
    }

    async fn remove_network(&self, id: &str) -> Result<()> {
        self.remove_op("remove_network", id, false)
    }

    async fn prune_containers(&self, filters: Filters) -> Result<u64> {
        self.prune_op("prune_containers", filters)
    }

    async fn prune_images(&self, filters: Filters) -> Result<u64> {
        self.prune_op("prune_images", filters)
    }

    async fn prune_volumes(&self, filters: Filters) -> Result<u64> {
        self.prune_op("prune_volumes", filters)
    }

    async fn prune_networks(&self, filters: Filters) -> Result<()> {
        self.prune_op("prune_networks", filters).map(|_| ())
    }

    async fn prune_build_cache(&self, all: bool) -> Result<u64> {
        let mut filters = HashMap::new();
        filters.insert("all".to_string(), vec![all.to_string()]);
        self.prune_op("prune_build_cache", filters)
    }

    async fn start_container(&self, id: &str) -> Result<()> {
        self.action_op("start_container", id)
    }

    async fn stop_container(&self, id: &str) -> Result<()> {
        self.action_op("stop_container", id)
    }

    async fn restart_container(&self, id: &str) -> Result<()> {
        self.action_op("restart_container", id)
    }

    fn container_logs(&self, id: &str, request: LogsRequest) -> LogBody {
        self.record(format!(
            "container_logs {} follow={} tail={}",
            id, request.follow, request.tail
        ));
        match &self.logs {
            Some(handler) => handler(id, &request),
            None => futures_util::stream::empty().boxed(),
        }
    }

    fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }
}

/// Sample records in the engine's own shapes.
pub mod samples {
    use bollard::models::{
        BuildCache, ContainerSummary, ContainerSummaryNetworkSettings, EndpointSettings,
        ImageSummary, MountPoint, MountPointTypeEnum, Network, NetworkContainer, Volume,
    };
    use std::collections::HashMap;

    pub fn container(id: &str, name: &str, state: &str) -> ContainerSummary {
        ContainerSummary {
            id: Some(id.to_string()),
            names: Some(vec![format!("/{}", name)]),
            image: Some("app:v1".to_string()),
            image_id: Some("sha256:img1".to_string()),
            created: Some(1_700_000_000),
            state: Some(state.to_string()),
            status: Some(format!("{} (sample)", state)),
            ..Default::default()
        }
    }

    pub fn sized_container(id: &str, state: &str, size_rw: i64) -> ContainerSummary {
        ContainerSummary {
            size_rw: Some(size_rw),
            ..container(id, id, state)
        }
    }

    pub fn container_with_volume(id: &str, volume: &str) -> ContainerSummary {
        ContainerSummary {
            mounts: Some(vec![MountPoint {
                typ: Some(MountPointTypeEnum::VOLUME),
                name: Some(volume.to_string()),
                ..Default::default()
            }]),
            ..container(id, id, "running")
        }
    }

    /// A running container attached to `network`. An empty `network_id`
    /// leaves the endpoint's network id unset.
    pub fn container_on_network(id: &str, network: &str, network_id: &str) -> ContainerSummary {
        let endpoint = EndpointSettings {
            network_id: (!network_id.is_empty()).then(|| network_id.to_string()),
            ..Default::default()
        };
        ContainerSummary {
            network_settings: Some(ContainerSummaryNetworkSettings {
                networks: Some(HashMap::from([(network.to_string(), endpoint)])),
            }),
            ..container(id, id, "running")
        }
    }

    pub fn image(id: &str, tags: &[&str], size: i64, containers: i64) -> ImageSummary {
        ImageSummary {
            id: id.to_string(),
            repo_tags: tags.iter().map(|t| t.to_string()).collect(),
            created: 1_700_000_000,
            size,
            containers,
            ..Default::default()
        }
    }

    pub fn volume(name: &str) -> Volume {
        Volume {
            name: name.to_string(),
            driver: "local".to_string(),
            mountpoint: format!("/var/lib/docker/volumes/{}/_data", name),
            created_at: Some("2024-03-01T10:20:30Z".to_string()),
            ..Default::default()
        }
    }

    pub fn network(id: &str, name: &str, attached: usize) -> Network {
        let containers: HashMap<String, NetworkContainer> = (0..attached)
            .map(|i| (format!("c{}", i), NetworkContainer::default()))
            .collect();
        Network {
            id: Some(id.to_string()),
            name: Some(name.to_string()),
            driver: Some("bridge".to_string()),
            scope: Some("local".to_string()),
            internal: Some(false),
            containers: Some(containers),
            ..Default::default()
        }
    }

    pub fn cache(id: &str, size: i64, in_use: bool) -> BuildCache {
        BuildCache {
            id: Some(id.to_string()),
            size: Some(size),
            in_use: Some(in_use),
            ..Default::default()
        }
    }
}
