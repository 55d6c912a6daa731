//! # Resource Listing Commands
//!
//! File: cli/src/commands/resources.rs
//!
//! ## Overview
//!
//! Read-only views of what the engine holds, printed as plain-text tables:
//!
//! ```bash
//! octo ps -a        # all containers, including stopped ones
//! octo images       # tagged images, one row per tag
//! octo images --dangling   # untagged images only
//! octo volumes      # volumes with an in-use column
//! octo networks     # networks, system ones marked
//! octo df           # disk usage per category and what prune could reclaim
//! ```
//!
//! Each `render_*` function returns the finished text so that the handlers
//! stay one line and the output can be tested against a fake engine.
//!
use crate::common::docker::types::format_bytes;
use crate::common::docker::EngineService;
use crate::common::ui::tables::render_table;
use crate::core::error::Result;
use clap::Parser;
use tracing::info;

#[derive(Parser, Debug)]
#[command(about = "List containers")]
pub struct PsArgs {
    /// Show all containers (default shows just running)
    #[arg(short, long)]
    all: bool,
}

#[derive(Parser, Debug)]
#[command(about = "List images")]
pub struct ImagesArgs {
    /// Include intermediate images
    #[arg(short, long)]
    all: bool,

    /// Only untagged images, the ones `octo prune images` removes
    #[arg(long, conflicts_with = "all")]
    dangling: bool,
}

#[derive(Parser, Debug)]
#[command(about = "List volumes")]
pub struct VolumesArgs {
    /// Only volumes not mounted by any container
    #[arg(long)]
    unused: bool,
}

#[derive(Parser, Debug)]
#[command(about = "List networks")]
pub struct NetworksArgs {}

#[derive(Parser, Debug)]
#[command(about = "Show engine disk usage and reclaimable space")]
pub struct DfArgs {}

pub async fn handle_ps(args: PsArgs) -> Result<()> {
    let (_, service) = super::connect().await?;
    print!("{}", render_ps(&service, args.all).await?);
    Ok(())
}

pub async fn handle_images(args: ImagesArgs) -> Result<()> {
    let (_, service) = super::connect().await?;
    print!("{}", render_images(&service, args.all, args.dangling).await?);
    Ok(())
}

pub async fn handle_volumes(args: VolumesArgs) -> Result<()> {
    let (_, service) = super::connect().await?;
    print!("{}", render_volumes(&service, args.unused).await?);
    Ok(())
}

pub async fn handle_networks(_args: NetworksArgs) -> Result<()> {
    let (_, service) = super::connect().await?;
    print!("{}", render_networks(&service).await?);
    Ok(())
}

pub async fn handle_df(_args: DfArgs) -> Result<()> {
    let (_, service) = super::connect().await?;
    print!("{}", render_df(&service).await?);
    Ok(())
}

async fn render_ps(service: &EngineService, all: bool) -> Result<String> {
    let containers = service.list_containers(all).await?;
    info!("Listing {} containers", containers.len());
    let rows: Vec<Vec<String>> = containers
        .iter()
        .map(|c| {
            vec![
                c.short_id.clone(),
                c.name.clone(),
                c.image.clone(),
                c.state.as_str().to_string(),
                c.status.clone(),
                c.ports.clone(),
            ]
        })
        .collect();
    Ok(render_table(
        &["CONTAINER ID", "NAME", "IMAGE", "STATE", "STATUS", "PORTS"],
        &rows,
    ))
}

async fn render_images(service: &EngineService, all: bool, dangling: bool) -> Result<String> {
    let images = if dangling {
        service.dangling_images().await?
    } else {
        service.list_images(all).await?
    };
    let rows: Vec<Vec<String>> = images
        .iter()
        .map(|i| {
            let (repo, tag) = if i.dangling {
                ("<none>".to_string(), "<none>".to_string())
            } else {
                (i.repository.clone(), i.tag.clone())
            };
            vec![
                repo,
                tag,
                i.id.clone(),
                i.created.format("%Y-%m-%d %H:%M").to_string(),
                format_bytes(i.size),
                i.containers.to_string(),
            ]
        })
        .collect();
    Ok(render_table(
        &["REPOSITORY", "TAG", "IMAGE ID", "CREATED", "SIZE", "CONTAINERS"],
        &rows,
    ))
}

async fn render_volumes(service: &EngineService, unused_only: bool) -> Result<String> {
    let volumes = if unused_only {
        service.unused_volumes().await?
    } else {
        service.list_volumes().await?
    };
    let rows: Vec<Vec<String>> = volumes
        .iter()
        .map(|v| {
            vec![
                v.name.clone(),
                v.driver.clone(),
                if v.in_use { "yes" } else { "no" }.to_string(),
                v.size.map(format_bytes).unwrap_or_else(|| "-".to_string()),
                v.mountpoint.clone(),
            ]
        })
        .collect();
    Ok(render_table(
        &["VOLUME NAME", "DRIVER", "IN USE", "SIZE", "MOUNTPOINT"],
        &rows,
    ))
}

async fn render_networks(service: &EngineService) -> Result<String> {
    let networks = service.list_networks().await?;
    let rows: Vec<Vec<String>> = networks
        .iter()
        .map(|n| {
            let name = if n.is_system() {
                format!("{} (system)", n.name)
            } else {
                n.name.clone()
            };
            vec![
                n.short_id.clone(),
                name,
                n.driver.clone(),
                n.scope.clone(),
                n.containers.to_string(),
            ]
        })
        .collect();
    Ok(render_table(
        &["NETWORK ID", "NAME", "DRIVER", "SCOPE", "CONTAINERS"],
        &rows,
    ))
}

async fn render_df(service: &EngineService) -> Result<String> {
    let usage = service.disk_usage().await?;
    let rows = vec![
        vec!["Images".to_string(), format_bytes(usage.images_bytes)],
        vec!["Containers".to_string(), format_bytes(usage.containers_bytes)],
        vec!["Local Volumes".to_string(), format_bytes(usage.volumes_bytes)],
        vec!["Build Cache".to_string(), format_bytes(usage.build_cache_bytes)],
        vec!["Total".to_string(), format_bytes(usage.total_bytes)],
        vec!["Reclaimable".to_string(), format_bytes(usage.reclaimable_bytes)],
    ];
    Ok(render_table(&["TYPE", "SIZE"], &rows))
}
