//! # Octo Core Infrastructure
//!
//! File: cli/src/core/mod.rs
//!
//! ## Overview
//!
//! Foundational pieces shared by every command and by the log viewer:
//! - `config`: configuration loading, env overrides and validation
//! - `error`: the `OctoError` kinds and the crate-wide `Result` alias
//!
//! ```rust
//! use crate::core::config; // For loading configuration
//! use crate::core::error::{OctoError, Result}; // For error handling
//! ```
//!
pub mod config;
pub mod error;
