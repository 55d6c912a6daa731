//! # Octo Configuration System
//!
//! File: cli/src/core/config.rs
//!
//! ## Overview
//!
//! Loads the optional user configuration and merges it with environment
//! overrides and built-in defaults. Octo only needs a handful of settings:
//! where the engine socket lives, how many log lines the viewer keeps, how
//! many to fetch up front, and where exports go.
//!
//! Configuration sources (in order of precedence):
//! 1. `DOCKER_HOST` environment variable (engine socket only)
//! 2. User-specific `config.toml` in the platform config directory
//! 3. Default values defined in the code
//!
//! ```toml
//! [engine]
//! socket = "unix:///run/user/1000/docker.sock"
//!
//! [logs]
//! buffer_capacity = 5000
//! tail = 1000
//! export_dir = "~/.octo/logs"
//! ```
//!
use crate::core::error::{OctoError, Result};
use anyhow::{anyhow, Context};
use directories::ProjectDirs;
use serde::Deserialize;
use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::{debug, info};

/// Default ring buffer capacity for the log viewer.
pub const DEFAULT_BUFFER_CAPACITY: usize = 5000;

/// Environment variable consulted first for the engine socket address.
pub const SOCKET_ENV_VAR: &str = "DOCKER_HOST";

/// Represents the main configuration structure, loaded from TOML.
#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub logs: LogsConfig,
}

/// How to reach the local engine.
#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    /// Socket path or `unix://` URL. `None` means platform defaults.
    pub socket: Option<String>,
}

/// Log viewer settings.
#[derive(Deserialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct LogsConfig {
    /// Ring buffer capacity. Values <= 0 fall back to the default.
    #[serde(default = "default_buffer_capacity")]
    pub buffer_capacity: i64,
    /// Lines requested by the initial fetch.
    #[serde(default = "default_tail")]
    pub tail: u32,
    /// Directory for `e` exports (can use ~).
    #[serde(default = "default_export_dir")]
    pub export_dir: String,
}

impl Default for LogsConfig {
    fn default() -> Self {
        Self {
            buffer_capacity: default_buffer_capacity(),
            tail: default_tail(),
            export_dir: default_export_dir(),
        }
    }
}

impl LogsConfig {
    pub fn capacity(&self) -> usize {
        if self.buffer_capacity <= 0 {
            DEFAULT_BUFFER_CAPACITY
        } else {
            self.buffer_capacity as usize
        }
    }
}

fn default_buffer_capacity() -> i64 {
    DEFAULT_BUFFER_CAPACITY as i64
}
fn default_tail() -> u32 {
    1000
}
fn default_export_dir() -> String {
    "~/.octo/logs".to_string()
}

/// Loads, overrides, expands and validates the configuration.
pub fn load_config() -> Result<Config> {
    let mut config = load_user_config()?.unwrap_or_default();
    apply_env_overrides(&mut config, std::env::var(SOCKET_ENV_VAR).ok());
    expand_config_paths(&mut config);
    validate_config(&config).context("Configuration validation failed")?;
    debug!("Final loaded configuration: {:?}", config);
    Ok(config)
}

fn load_user_config() -> Result<Option<Config>> {
    let Some(proj_dirs) = ProjectDirs::from("com", "Octo", "octo") else {
        debug!("Could not determine user config directory.");
        return Ok(None);
    };
    let config_path = proj_dirs.config_dir().join("config.toml");
    if config_path.exists() {
        info!("Loading user configuration from: {}", config_path.display());
        load_config_from_path(&config_path).map(Some)
    } else {
        debug!("No configuration file at {}", config_path.display());
        Ok(None)
    }
}

fn load_config_from_path(path: &Path) -> Result<Config> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read configuration file: {}", path.display()))?;
    toml::from_str(&content)
        .with_context(|| format!("Failed to parse TOML from file: {}", path.display()))
}

fn apply_env_overrides(config: &mut Config, docker_host: Option<String>) {
    if let Some(host) = docker_host.filter(|h| !h.trim().is_empty()) {
        debug!("Using engine socket from {}: {}", SOCKET_ENV_VAR, host);
        config.engine.socket = Some(host);
    }
}

fn expand_config_paths(config: &mut Config) {
    config.logs.export_dir = shellexpand::tilde(&config.logs.export_dir).into_owned();
    if let Some(socket) = config.engine.socket.as_mut() {
        if !socket.contains("://") {
            *socket = shellexpand::tilde(socket).into_owned();
        }
    }
}

fn validate_config(config: &Config) -> Result<()> {
    if let Some(socket) = &config.engine.socket {
        if let Some((scheme, _)) = socket.split_once("://") {
            if scheme != "unix" {
                return Err(anyhow!(OctoError::Config(format!(
                    "Unsupported engine address '{}'. Only local unix sockets are supported.",
                    socket
                ))));
            }
        }
    }
    if config.logs.export_dir.trim().is_empty() {
        return Err(anyhow!(OctoError::Config(
            "logs.export_dir cannot be empty".to_string()
        )));
    }
    Ok(())
}

/// Directory that log exports are written to.
pub fn export_dir(config: &Config) -> PathBuf {
    PathBuf::from(&config.logs.export_dir)
}
