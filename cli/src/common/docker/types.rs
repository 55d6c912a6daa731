//! # Octo Domain Types
//!
//! File: cli/src/common/docker/types.rs
//!
//! ## Overview
//!
//! Value objects produced by the engine service: containers, images, volumes,
//! networks, disk usage, log entries and dry-run confirmation descriptors.
//! They are plain data, passed by value; label maps are never mutated after
//! construction.
//!
//! The normalization helpers at the top (`truncate_id`, `trim_image_id`,
//! `parse_image_tag`, `format_ports`) are shared by every listing so that
//! identifiers and references look the same everywhere in the UI.
//!
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::fmt;

/// Length of the display form of engine identifiers.
pub const SHORT_ID_LEN: usize = 12;

/// Names of the networks the engine creates itself.
pub const SYSTEM_NETWORKS: [&str; 3] = ["bridge", "host", "none"];

/// Leading `n` characters of `id`, or all of `id` if shorter.
pub fn truncate_id(id: &str, n: usize) -> String {
    id.chars().take(n).collect()
}

/// Strips a leading `sha256:` and shortens to the display length.
pub fn trim_image_id(id: &str) -> String {
    truncate_id(id.strip_prefix("sha256:").unwrap_or(id), SHORT_ID_LEN)
}

/// Splits an image reference into `(repository, tag)`.
///
/// Scans right-to-left: the first `:` seen before any `/` separates the tag.
/// A `:` to the left of a `/` belongs to a registry port and is kept in the
/// repository. References without a tag default to `latest`.
///
/// ```
/// assert_eq!(parse_image_tag("registry.example.com:5000/app:v1"),
///            ("registry.example.com:5000/app".into(), "v1".into()));
/// assert_eq!(parse_image_tag("nginx"), ("nginx".into(), "latest".into()));
/// ```
pub fn parse_image_tag(reference: &str) -> (String, String) {
    for (idx, ch) in reference.char_indices().rev() {
        match ch {
            '/' => break,
            ':' => {
                return (
                    reference[..idx].to_string(),
                    reference[idx + 1..].to_string(),
                )
            }
            _ => {}
        }
    }
    (reference.to_string(), "latest".to_string())
}

/// One published or exposed container port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortMapping {
    pub public_port: Option<u16>,
    pub private_port: u16,
    pub protocol: String,
}

/// Comma-separated `public->private/proto` (or `private/proto` when unpublished).
pub fn format_ports(ports: &[PortMapping]) -> String {
    ports
        .iter()
        .map(|p| match p.public_port {
            Some(public) => format!("{}->{}/{}", public, p.private_port, p.protocol),
            None => format!("{}/{}", p.private_port, p.protocol),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Format bytes as human-readable size
pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2}GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1}MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{}KB", bytes / KB)
    } else {
        format!("{}B", bytes)
    }
}

/// Converts an engine epoch-seconds value, falling back to the epoch itself.
pub(crate) fn instant_from_epoch(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, 0).unwrap_or_default()
}

/// Parses an engine RFC3339 string.
pub(crate) fn instant_from_rfc3339(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Container lifecycle tag as reported by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerState {
    Running,
    Exited,
    Created,
    Dead,
    Paused,
    Restarting,
    Removing,
    Unknown,
}

impl ContainerState {
    pub fn parse(raw: &str) -> Self {
        match raw.to_ascii_lowercase().as_str() {
            "running" => ContainerState::Running,
            "exited" => ContainerState::Exited,
            "created" => ContainerState::Created,
            "dead" => ContainerState::Dead,
            "paused" => ContainerState::Paused,
            "restarting" => ContainerState::Restarting,
            "removing" => ContainerState::Removing,
            _ => ContainerState::Unknown,
        }
    }

    pub fn is_running(self) -> bool {
        self == ContainerState::Running
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ContainerState::Running => "running",
            ContainerState::Exited => "exited",
            ContainerState::Created => "created",
            ContainerState::Dead => "dead",
            ContainerState::Paused => "paused",
            ContainerState::Restarting => "restarting",
            ContainerState::Removing => "removing",
            ContainerState::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ContainerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Container {
    pub id: String,
    pub short_id: String,
    /// First engine name with the leading `/` stripped.
    pub name: String,
    pub image: String,
    /// Full id of the image the container was created from.
    pub image_id: String,
    pub status: String,
    pub state: ContainerState,
    pub created: DateTime<Utc>,
    pub ports: String,
    pub size_rw: u64,
    pub labels: HashMap<String, String>,
}

impl Container {
    /// True when `query` names this container by full id, short id, id prefix or name.
    pub fn matches(&self, query: &str) -> bool {
        !query.is_empty()
            && (self.id == query
                || self.short_id == query
                || self.name == query.trim_start_matches('/')
                || self.id.starts_with(query))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Image {
    /// Short id, `sha256:` stripped.
    pub id: String,
    pub repository: String,
    pub tag: String,
    pub size: u64,
    pub created: DateTime<Utc>,
    pub containers: u64,
    pub dangling: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Volume {
    pub name: String,
    pub driver: String,
    pub mountpoint: String,
    pub size: Option<u64>,
    pub created: Option<DateTime<Utc>>,
    pub labels: HashMap<String, String>,
    pub in_use: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Network {
    /// Full id, used for API calls.
    pub id: String,
    pub short_id: String,
    pub name: String,
    pub driver: String,
    pub scope: String,
    pub internal: bool,
    pub containers: usize,
}

impl Network {
    pub fn is_system(&self) -> bool {
        is_system_network(&self.name)
    }

    pub fn matches(&self, query: &str) -> bool {
        !query.is_empty() && (self.name == query || self.id.starts_with(query))
    }
}

pub fn is_system_network(name: &str) -> bool {
    SYSTEM_NETWORKS.contains(&name)
}

/// Disk consumption per category, recomputed from the engine's records.
///
/// `total_bytes` is the sum of the four categories. `reclaimable_bytes` counts
/// unreferenced images, non-running containers and idle build cache; volume
/// bytes are never reclaimable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiskUsage {
    pub images_bytes: u64,
    pub containers_bytes: u64,
    pub volumes_bytes: u64,
    pub build_cache_bytes: u64,
    pub reclaimable_bytes: u64,
    pub total_bytes: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogStream {
    Stdout,
    Stderr,
}

impl fmt::Display for LogStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogStream::Stdout => f.write_str("stdout"),
            LogStream::Stderr => f.write_str("stderr"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub stream: LogStream,
    pub content: String,
}

impl LogEntry {
    /// `YYYY-MM-DD HH:MM:SS  stream  content`, the form stored in the viewer buffer.
    pub fn formatted(&self) -> String {
        format!(
            "{}  {}  {}",
            self.timestamp.format("%Y-%m-%d %H:%M:%S"),
            self.stream,
            self.content
        )
    }
}

/// How dangerous a destructive operation is. Drives UI emphasis only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SafetyTier {
    Informational,
    LowRisk,
    Moderate,
    HighRisk,
    BulkDestructive,
}

impl fmt::Display for SafetyTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SafetyTier::Informational => "informational",
            SafetyTier::LowRisk => "low risk",
            SafetyTier::Moderate => "moderate",
            SafetyTier::HighRisk => "high risk",
            SafetyTier::BulkDestructive => "bulk destructive",
        };
        f.write_str(label)
    }
}

/// Dry-run output describing what a destructive operation would do.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfirmationInfo {
    pub tier: SafetyTier,
    pub title: String,
    pub description: String,
    pub resources: Vec<String>,
    pub reversible: bool,
    pub undo: String,
    pub warnings: Vec<String>,
}

impl ConfirmationInfo {
    pub fn new(tier: SafetyTier, title: impl Into<String>) -> Self {
        Self {
            tier,
            title: title.into(),
            description: String::new(),
            resources: Vec::new(),
            reversible: false,
            undo: String::new(),
            warnings: Vec::new(),
        }
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn resources(mut self, resources: Vec<String>) -> Self {
        self.resources = resources;
        self
    }

    pub fn reversible(mut self, undo: impl Into<String>) -> Self {
        self.reversible = true;
        self.undo = undo.into();
        self
    }

    pub fn warn(mut self, warning: impl Into<String>) -> Self {
        self.warnings.push(warning.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_id() {
        assert_eq!(truncate_id("0123456789abcdef", 12), "0123456789ab");
        assert_eq!(truncate_id("abc", 12), "abc");
        assert_eq!(truncate_id("", 12), "");
    }

    #[test]
    fn test_trim_image_id_matches_truncate() {
        let raw = "4c0a1f6e2b9d8a7c6e5f4d3c2b1a0f9e";
        assert_eq!(trim_image_id(&format!("sha256:{}", raw)), truncate_id(raw, 12));
        assert_eq!(trim_image_id(raw), truncate_id(raw, 12));
        assert_eq!(trim_image_id("sha256:ab"), "ab");
    }

    #[test]
    fn test_parse_image_tag() {
        assert_eq!(
            parse_image_tag("registry.example.com:5000/app:v1"),
            ("registry.example.com:5000/app".into(), "v1".into())
        );
        assert_eq!(
            parse_image_tag("host:5000/app:v1"),
            ("host:5000/app".into(), "v1".into())
        );
        assert_eq!(parse_image_tag("nginx"), ("nginx".into(), "latest".into()));
        assert_eq!(
            parse_image_tag("host:5000/app"),
            ("host:5000/app".into(), "latest".into())
        );
        assert_eq!(
            parse_image_tag("library/redis:7-alpine"),
            ("library/redis".into(), "7-alpine".into())
        );
    }

    #[test]
    fn test_parse_image_tag_reconstructs_reference() {
        for reference in ["app:v1", "ghcr.io/org/app:sha-1", "localhost:5000/x:y"] {
            let (repo, tag) = parse_image_tag(reference);
            assert_eq!(format!("{}:{}", repo, tag), reference);
        }
        for reference in ["app", "localhost:5000/x"] {
            let (repo, tag) = parse_image_tag(reference);
            assert_eq!(format!("{}:{}", repo, tag), format!("{}:latest", reference));
        }
    }

    #[test]
    fn test_format_ports() {
        let ports = vec![
            PortMapping {
                public_port: Some(8080),
                private_port: 80,
                protocol: "tcp".into(),
            },
            PortMapping {
                public_port: None,
                private_port: 53,
                protocol: "udp".into(),
            },
        ];
        assert_eq!(format_ports(&ports), "8080->80/tcp, 53/udp");
        assert_eq!(format_ports(&[]), "");
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(0), "0B");
        assert_eq!(format_bytes(1023), "1023B");
        assert_eq!(format_bytes(1024), "1KB");
        assert_eq!(format_bytes(1536 * 1024), "1.5MB");
        assert_eq!(format_bytes(1536 * 1024 * 1024), "1.50GB");
    }

    #[test]
    fn test_log_entry_formatted() {
        let entry = LogEntry {
            timestamp: instant_from_rfc3339("2024-03-01T10:20:30.123456789Z").unwrap(),
            stream: LogStream::Stderr,
            content: "boom".into(),
        };
        assert_eq!(entry.formatted(), "2024-03-01 10:20:30  stderr  boom");
    }

    #[test]
    fn test_system_networks() {
        for name in ["bridge", "host", "none"] {
            assert!(is_system_network(name));
        }
        assert!(!is_system_network("app_default"));
    }
}
