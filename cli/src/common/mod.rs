//! # Octo Common Utilities (`common`)
//!
//! File: cli/src/common/mod.rs
//!
//! ## Overview
//!
//! Shared modules used by the command handlers and the log viewer:
//!
//! - **`docker`**: engine access, from the raw capability trait up to `EngineService`.
//! - **`fs`**: filesystem helpers for log export.
//! - **`logs`**: log body framing, line assembly and timestamp parsing.
//! - **`ui`**: plain-text tables and confirmation prompts for the CLI.
//!
//! Command-specific logic stays in `commands::`, configuration and errors in `core::`.
//!

/// Engine access layer.
pub mod docker;
/// Filesystem operations.
pub mod fs;
/// Log pipeline primitives.
pub mod logs;
/// Terminal output helpers for non-interactive commands.
pub mod ui;
