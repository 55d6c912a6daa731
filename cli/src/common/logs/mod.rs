//! # Octo Log Pipeline Primitives
//!
//! File: cli/src/common/logs/mod.rs
//!
//! ## Overview
//!
//! Byte-level pieces shared by the initial log fetch and the live follow
//! stream:
//!
//! - **`framing`**: the 8-byte multiplex header codec and the `Demuxer` that
//!   detects TTY (unframed) bodies.
//! - **`lines`**: newline assembly across chunk boundaries.
//! - **`timestamp`**: splits the engine's RFC3339 prefix off each line.
//!
//! The engine service drives these over a log body; see
//! `common::docker::service::logs`.
//!
pub mod framing;
pub mod lines;
pub mod timestamp;

pub use framing::Demuxer;
pub use timestamp::parse_log_line;
