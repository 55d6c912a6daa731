//! # Prune Command
//!
//! File: cli/src/commands/prune.rs
//!
//! ## Overview
//!
//! `octo prune <kind>` bulk-removes unused resources of one kind. The dry-run
//! description (every target by name, estimated bytes, warnings) is always
//! printed first; the prune runs only with `--yes` or a `y` at the prompt.
//!
//! ```bash
//! octo prune images --dry-run      # list dangling images, change nothing
//! octo prune images --all --yes    # dangling and unreferenced images
//! octo prune networks              # never touches bridge/host/none
//! octo prune build-cache --all
//! ```
//!
use crate::common::docker::types::{format_bytes, ConfirmationInfo};
use crate::common::docker::EngineService;
use crate::common::ui::prompts::confirm;
use crate::core::error::Result;
use clap::{Parser, ValueEnum};
use tracing::info;

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum PruneTarget {
    /// Stopped containers
    Containers,
    /// Dangling images (with --all, every image no container uses)
    Images,
    /// Volumes no container mounts
    Volumes,
    /// Networks with no connected containers, system networks excluded
    Networks,
    /// Idle build cache entries
    BuildCache,
}

#[derive(Parser, Debug)]
#[command(about = "Remove unused resources of one kind")]
pub struct PruneArgs {
    /// What to prune
    #[arg(value_enum)]
    target: PruneTarget,

    /// Widen the prune (images: unreferenced too; build-cache: every idle entry)
    #[arg(short, long)]
    all: bool,

    /// Describe what would be pruned without pruning
    #[arg(long)]
    dry_run: bool,

    /// Do not ask for confirmation
    #[arg(short = 'y', long)]
    yes: bool,
}

pub async fn handle_prune(args: PruneArgs) -> Result<()> {
    let (_, service) = super::connect().await?;
    prune(&service, &args, confirm).await
}

async fn describe(service: &EngineService, target: PruneTarget, all: bool) -> Result<ConfirmationInfo> {
    match target {
        PruneTarget::Containers => service.prune_containers_dry_run().await,
        PruneTarget::Images => service.prune_images_dry_run(all).await,
        PruneTarget::Volumes => service.prune_volumes_dry_run().await,
        PruneTarget::Networks => service.prune_networks_dry_run().await,
        PruneTarget::BuildCache => service.prune_build_cache_dry_run(all).await,
    }
}

/// Runs the prune. Returns bytes reclaimed where the engine reports them.
async fn execute(service: &EngineService, target: PruneTarget, all: bool) -> Result<Option<u64>> {
    Ok(match target {
        PruneTarget::Containers => Some(service.prune_containers().await?),
        PruneTarget::Images => Some(service.prune_images(all).await?),
        PruneTarget::Volumes => Some(service.prune_volumes().await?),
        PruneTarget::Networks => {
            service.prune_networks().await?;
            None
        }
        PruneTarget::BuildCache => Some(service.prune_build_cache(all).await?),
    })
}

async fn prune(
    service: &EngineService,
    args: &PruneArgs,
    ask: impl FnOnce(&str) -> Result<bool>,
) -> Result<()> {
    let info = describe(service, args.target, args.all).await?;
    if !super::should_proceed(&info, args.dry_run, args.yes, ask)? {
        return Ok(());
    }
    match execute(service, args.target, args.all).await? {
        Some(bytes) => {
            info!("Prune of {:?} reclaimed {} bytes", args.target, bytes);
            println!("Reclaimed {}", format_bytes(bytes));
        }
        None => println!("Done"),
    }
    Ok(())
}
