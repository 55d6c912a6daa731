//! # Octo Filesystem Utilities (`common::fs`)
//!
//! File: cli/src/common/fs/mod.rs
//!
//! Filesystem helpers for log export. Callers import the submodule directly
//! (`crate::common::fs::io::write_lines`).
//!
pub mod io;
