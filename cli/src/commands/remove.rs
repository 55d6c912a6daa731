//! # Targeted Removal Commands
//!
//! File: cli/src/commands/remove.rs
//!
//! ## Overview
//!
//! `rm`, `rmi`, `volume-rm` and `network-rm` remove one named resource. Each
//! one first prints the dry-run description (safety tier, what goes, whether
//! it can be undone), then acts only after confirmation.
//!
//! ```bash
//! octo rm web --dry-run     # describe, change nothing
//! octo rm web               # describe, then ask
//! octo rm web -f            # force-remove even if running, no question
//! octo network-rm backend -y
//! ```
//!
//! `rm` without `--force` re-checks the container's state right before the
//! engine call and refuses if it has started running since it was listed.
//!
use crate::common::docker::EngineService;
use crate::common::ui::prompts::confirm;
use crate::core::error::{OctoError, Result};
use clap::Parser;
use tracing::{info, warn};

/// Shared flags for the removal commands.
#[derive(Parser, Debug)]
pub struct RemoveFlags {
    /// Describe what would be removed without removing anything
    #[arg(long)]
    dry_run: bool,

    /// Do not ask for confirmation
    #[arg(short = 'y', long)]
    yes: bool,
}

#[derive(Parser, Debug)]
#[command(about = "Remove a container")]
pub struct RmArgs {
    /// Container name, id or id prefix
    container: String,

    /// Remove even if running, without asking
    #[arg(short, long)]
    force: bool,

    #[command(flatten)]
    flags: RemoveFlags,
}

#[derive(Parser, Debug)]
#[command(about = "Remove an image")]
pub struct RmiArgs {
    /// Image id or repository:tag
    image: String,

    /// Remove even if referenced, without asking
    #[arg(short, long)]
    force: bool,

    #[command(flatten)]
    flags: RemoveFlags,
}

#[derive(Parser, Debug)]
#[command(about = "Remove a volume")]
pub struct VolumeRmArgs {
    /// Volume name
    volume: String,

    /// Remove even if in use, without asking
    #[arg(short, long)]
    force: bool,

    #[command(flatten)]
    flags: RemoveFlags,
}

#[derive(Parser, Debug)]
#[command(about = "Remove a network")]
pub struct NetworkRmArgs {
    /// Network name or id
    network: String,

    #[command(flatten)]
    flags: RemoveFlags,
}

pub async fn handle_rm(args: RmArgs) -> Result<()> {
    let (_, service) = super::connect().await?;
    remove_container(&service, &args, confirm).await
}

pub async fn handle_rmi(args: RmiArgs) -> Result<()> {
    let (_, service) = super::connect().await?;
    remove_image(&service, &args, confirm).await
}

pub async fn handle_volume_rm(args: VolumeRmArgs) -> Result<()> {
    let (_, service) = super::connect().await?;
    remove_volume(&service, &args, confirm).await
}

pub async fn handle_network_rm(args: NetworkRmArgs) -> Result<()> {
    let (_, service) = super::connect().await?;
    remove_network(&service, &args, confirm).await
}

async fn remove_container(
    service: &EngineService,
    args: &RmArgs,
    ask: impl FnOnce(&str) -> Result<bool>,
) -> Result<()> {
    let info = service
        .remove_container_dry_run(&args.container, args.force)
        .await?;
    let assume_yes = args.force || args.flags.yes;
    if !super::should_proceed(&info, args.flags.dry_run, assume_yes, ask)? {
        return Ok(());
    }
    match service.remove_container(&args.container, args.force).await {
        Ok(()) => {
            println!("Removed container '{}'", args.container);
            Ok(())
        }
        Err(e) if OctoError::is_state_changed(&e) => {
            warn!("Refusing to remove '{}': {}", args.container, e);
            Err(e.context("Use --force to remove a running container"))
        }
        Err(e) => Err(e),
    }
}

async fn remove_image(
    service: &EngineService,
    args: &RmiArgs,
    ask: impl FnOnce(&str) -> Result<bool>,
) -> Result<()> {
    let info = service.remove_image_dry_run(&args.image, args.force).await?;
    let assume_yes = args.force || args.flags.yes;
    if !super::should_proceed(&info, args.flags.dry_run, assume_yes, ask)? {
        return Ok(());
    }
    service.remove_image(&args.image, args.force).await?;
    info!("Image {} removed", args.image);
    println!("Removed image '{}'", args.image);
    Ok(())
}

async fn remove_volume(
    service: &EngineService,
    args: &VolumeRmArgs,
    ask: impl FnOnce(&str) -> Result<bool>,
) -> Result<()> {
    let info = service.remove_volume_dry_run(&args.volume).await?;
    let assume_yes = args.force || args.flags.yes;
    if !super::should_proceed(&info, args.flags.dry_run, assume_yes, ask)? {
        return Ok(());
    }
    service.remove_volume(&args.volume, args.force).await?;
    println!("Removed volume '{}'", args.volume);
    Ok(())
}

async fn remove_network(
    service: &EngineService,
    args: &NetworkRmArgs,
    ask: impl FnOnce(&str) -> Result<bool>,
) -> Result<()> {
    let info = service.remove_network_dry_run(&args.network).await?;
    if !super::should_proceed(&info, args.flags.dry_run, args.flags.yes, ask)? {
        return Ok(());
    }
    service.remove_network(&args.network).await?;
    println!("Removed network '{}'", args.network);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::docker::fake::{samples, FakeEngine};
    use std::sync::Arc;

    fn service(fake: FakeEngine) -> (Arc<FakeEngine>, EngineService) {
        let fake = Arc::new(fake);
        (fake.clone(), EngineService::new(fake))
    }

    fn never_asked(_: &str) -> Result<bool> {
        panic!("should not prompt")
    }

    #[test]
    fn test_rm_args() {
        let args = RmArgs::try_parse_from(["rm", "web", "-f", "--dry-run"]).unwrap();
        assert_eq!(args.container, "web");
        assert!(args.force);
        assert!(args.flags.dry_run);
        assert!(!args.flags.yes);
        assert!(RmArgs::try_parse_from(["rm"]).is_err());
    }

    #[test]
    fn test_network_rm_has_no_force() {
        assert!(NetworkRmArgs::try_parse_from(["network-rm", "backend", "-f"]).is_err());
        assert!(NetworkRmArgs::try_parse_from(["network-rm", "backend", "-y"]).unwrap().flags.yes);
    }

    #[tokio::test]
    async fn test_rm_dry_run_changes_nothing() {
        let (fake, service) = service(
            FakeEngine::new().with_containers(vec![samples::container("abc123def456aa", "web", "exited")]),
        );
        let args = RmArgs::try_parse_from(["rm", "web", "--dry-run"]).unwrap();
        remove_container(&service, &args, never_asked).await.unwrap();
        assert!(!fake.called("remove_container"));
    }

    #[tokio::test]
    async fn test_rm_declined_changes_nothing() {
        let (fake, service) = service(
            FakeEngine::new().with_containers(vec![samples::container("abc123def456aa", "web", "exited")]),
        );
        let args = RmArgs::try_parse_from(["rm", "web"]).unwrap();
        remove_container(&service, &args, |_| Ok(false)).await.unwrap();
        assert!(!fake.called("remove_container"));
    }

    #[tokio::test]
    async fn test_rm_confirmed_removes() {
        let (fake, service) = service(
            FakeEngine::new().with_containers(vec![samples::container("abc123def456aa", "web", "exited")]),
        );
        let args = RmArgs::try_parse_from(["rm", "abc123"]).unwrap();
        remove_container(&service, &args, |_| Ok(true)).await.unwrap();
        assert!(fake.called("remove_container abc123def456aa force=false"));
    }

    #[tokio::test]
    async fn test_rm_running_needs_force() {
        let (fake, service) = service(
            FakeEngine::new().with_containers(vec![samples::container("abc123def456aa", "web", "running")]),
        );
        let args = RmArgs::try_parse_from(["rm", "web", "-y"]).unwrap();
        let err = remove_container(&service, &args, never_asked).await.unwrap_err();
        assert!(OctoError::is_state_changed(&err));
        assert!(err.to_string().contains("--force"));
        assert!(!fake.called("remove_container"));

        let forced = RmArgs::try_parse_from(["rm", "web", "-f"]).unwrap();
        remove_container(&service, &forced, never_asked).await.unwrap();
        assert!(fake.called("remove_container web force=true"));
    }

    #[tokio::test]
    async fn test_network_rm_refuses_system_network() {
        let (fake, service) = service(
            FakeEngine::new().with_networks(vec![samples::network("aaaabbbbccccdddd", "bridge", 0)]),
        );
        let args = NetworkRmArgs::try_parse_from(["network-rm", "bridge", "-y"]).unwrap();
        let err = remove_network(&service, &args, never_asked).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<OctoError>(),
            Some(OctoError::SystemNetwork { .. })
        ));
        assert!(!fake.called("remove_network"));
    }

    #[tokio::test]
    async fn test_volume_rm_confirmed() {
        let (fake, service) = service(FakeEngine::new().with_volumes(vec![samples::volume("data")]));
        let args = VolumeRmArgs::try_parse_from(["volume-rm", "data", "-y"]).unwrap();
        remove_volume(&service, &args, never_asked).await.unwrap();
        assert!(fake.called("remove_volume data force=false"));
    }
}
