//! # Octo Engine Access Layer
//!
//! File: cli/src/common/docker/mod.rs
//!
//! ## Overview
//!
//! Everything that talks to the local container engine lives under this
//! module. Command handlers and the log viewer only ever use
//! `service::EngineService`; the remaining submodules are its building blocks.
//!
//! ## Architecture
//!
//! - **`api`**: the `EngineApi` capability trait the service depends on.
//! - **`build_cache`**: the build cache prune, sent over the socket without `bollard`.
//! - **`connect`**: `EngineTransport`, the socket-backed `EngineApi` built on `bollard`.
//! - **`service`**: domain-typed listings, removals, prunes, dry-runs and logs.
//! - **`timeouts`**: per-operation deadlines and the in-flight request table.
//! - **`types`**: value objects and the id/tag/port normalization helpers.
//!
//! ```rust
//! use crate::common::docker::EngineService;
//! # async fn run_example(cfg: &crate::core::config::Config) -> crate::core::error::Result<()> {
//! let service = EngineService::connect(cfg).await?;
//! let usage = service.disk_usage().await?;
//! println!("{} reclaimable", crate::common::docker::types::format_bytes(usage.reclaimable_bytes));
//! # Ok(())
//! # }
//! ```
//!

/// The raw engine capability set.
pub mod api;
/// Build cache prune over the raw engine socket.
pub mod build_cache;
/// Connection to the local engine socket.
pub mod connect;
/// Domain-typed engine operations.
pub mod service;
/// Deadlines and cancellation of superseded requests.
pub mod timeouts;
/// Domain value objects.
pub mod types;

#[cfg(test)]
pub mod fake;

pub use service::EngineService;
