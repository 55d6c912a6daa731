//! # Logs Command
//!
//! File: cli/src/commands/logs.rs
//!
//! `octo logs <container>` opens the interactive log viewer: the last `tail`
//! lines first, then new lines as the container writes them. With
//! `--no-tui` the initial lines are printed to stdout and the command exits,
//! which suits pipes and scripts.
//!
//! ```bash
//! octo logs web
//! octo logs web --tail 200 --no-tui | grep ERROR
//! ```
//!
use crate::common::docker::EngineService;
use crate::core::config::{export_dir, Config};
use crate::core::error::Result;
use crate::tui::{run_log_viewer, LogViewer};
use clap::Parser;
use std::io::{self, Write};
use tracing::info;

#[derive(Parser, Debug)]
#[command(about = "Show and follow a container's logs")]
pub struct LogsArgs {
    /// Container name, id or id prefix
    container: String,

    /// Lines to fetch before following (default from config, 1000)
    #[arg(short = 'n', long)]
    tail: Option<u32>,

    /// Print the fetched lines and exit instead of opening the viewer
    #[arg(long)]
    no_tui: bool,
}

pub async fn handle_logs(args: LogsArgs) -> Result<()> {
    let (config, service) = super::connect().await?;
    let tail = args.tail.unwrap_or(config.logs.tail);
    if args.no_tui {
        return print_logs(&service, &args.container, tail, &mut io::stdout().lock()).await;
    }
    open_viewer(&service, &config, &args.container, tail).await
}

async fn open_viewer(service: &EngineService, config: &Config, query: &str, tail: u32) -> Result<()> {
    let container = service.locate_container(query).await?;
    info!(
        "Opening log viewer for {} ({}), tail {}",
        container.name, container.short_id, tail
    );
    let viewer = LogViewer::new(
        container.id.as_str(),
        container.name.as_str(),
        config.logs.capacity(),
        export_dir(config),
    );
    run_log_viewer(service, viewer, &container.id, tail).await
}

async fn print_logs(service: &EngineService, query: &str, tail: u32, out: &mut impl Write) -> Result<()> {
    let container = service.locate_container(query).await?;
    let entries = service.get_container_logs(&container.id, tail).await?;
    for entry in &entries {
        writeln!(out, "{}", entry.formatted())?;
    }
    out.flush()?;
    Ok(())
}
