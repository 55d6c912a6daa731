//! # Octo UI Utilities (`common::ui`)
//!
//! File: cli/src/common/ui/mod.rs
//!
//! ## Overview
//!
//! Terminal output for the non-interactive commands. The full-screen log
//! viewer lives in `crate::tui`; this module only covers line-oriented output.
//!
//! - **`tables`**: aligned plain-text tables for the listing commands.
//! - **`prompts`**: rendering of dry-run `ConfirmationInfo` and `[y/N]` confirmation.
//!
//! ```rust
//! use crate::common::ui::{prompts, tables};
//! # fn run_example(info: &crate::common::docker::types::ConfirmationInfo) -> crate::core::error::Result<()> {
//! print!("{}", tables::render_table(&["ID", "NAME"], &[vec!["abc123".into(), "web".into()]]));
//! print!("{}", prompts::render_confirmation(info));
//! if prompts::confirm("Proceed?")? {
//!     println!("Proceeding...");
//! }
//! # Ok(())
//! # }
//! ```
//!

/// `[y/N]` prompts and dry-run rendering.
pub mod prompts;
/// Column-aligned text tables.
pub mod tables;
