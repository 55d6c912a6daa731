//! # Octo Command Modules
//!
//! File: cli/src/commands/mod.rs
//!
//! ## Overview
//!
//! Every `octo` subcommand is a thin layer over `EngineService`: parse
//! arguments with `clap`, connect, call the service, print the result.
//!
//! - `resources`: `ps`, `images`, `volumes`, `networks`, `df`
//! - `remove`: `rm`, `rmi`, `volume-rm`, `network-rm`
//! - `prune`: `prune <kind>`
//! - `lifecycle`: `start`, `stop`, `restart`
//! - `logs`: `logs` (interactive viewer or plain dump)
//! - `info`: `info`
//!
//! Destructive commands share one flow through [`should_proceed`]: print the
//! dry-run description, stop there for `--dry-run`, and otherwise require an
//! explicit flag or a `y` at the prompt.
//!
use crate::common::docker::types::ConfirmationInfo;
use crate::common::docker::EngineService;
use crate::common::ui::prompts::render_confirmation;
use crate::core::config::{load_config, Config};
use crate::core::error::Result;
use anyhow::Context;
use tracing::debug;

pub mod info;
pub mod lifecycle;
pub mod logs;
pub mod prune;
pub mod remove;
pub mod resources;

/// Loads the configuration and connects to the engine it names.
pub(crate) async fn connect() -> Result<(Config, EngineService)> {
    let config = load_config().context("Failed to load configuration")?;
    let service = EngineService::connect(&config)
        .await
        .context("Failed to connect to the container engine")?;
    Ok((config, service))
}

/// Prints the dry-run description and decides whether to act.
///
/// Returns `false` for `--dry-run`, when there is nothing to act on, or when
/// the user declines. `assume_yes` skips the question.
pub(crate) fn should_proceed(
    info: &ConfirmationInfo,
    dry_run: bool,
    assume_yes: bool,
    ask: impl FnOnce(&str) -> Result<bool>,
) -> Result<bool> {
    print!("{}", render_confirmation(info));
    if dry_run {
        debug!("Dry run only, nothing changed");
        return Ok(false);
    }
    if info.resources.is_empty() {
        return Ok(false);
    }
    if assume_yes {
        return Ok(true);
    }
    ask("Proceed?")
}
