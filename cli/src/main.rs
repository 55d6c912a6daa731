//! # Octo Main Entry Point
//!
//! File: cli/src/main.rs
//!
//! ## Overview
//!
//! Entry point of the `octo` CLI, an operator tool for inspecting and
//! reclaiming what the local container engine holds. It handles:
//! - Command-line argument parsing using Clap
//! - Setting up the logging system based on verbosity flags
//! - Routing execution to the command handlers
//!
//! ## Architecture
//!
//! - `commands`: one module per group of subcommands, thin glue over the engine service
//! - `common`: the engine access layer, log pipeline primitives and terminal helpers
//! - `core`: configuration and error types
//! - `tui`: the interactive log viewer
//!
//! ## Examples
//!
//! ```bash
//! octo df
//! octo prune images --dry-run
//! octo -vv logs web
//! ```
//!
//! Log output goes to stderr so it never mixes with tables on stdout. Keep the
//! default verbosity (or redirect stderr) while the log viewer is open.
//!
use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

mod commands;
mod common;
mod core;
mod tui;

use commands::{info, lifecycle, logs, prune, remove, resources};

#[derive(Parser, Debug)]
#[command(
    name = "octo",
    about = "Octo: inspect and reclaim local container engine resources",
    long_about = "Lists containers, images, volumes and networks, shows what disk space\n\
                  could be reclaimed, removes and prunes with a dry-run first, and follows\n\
                  container logs in an interactive viewer.",
    propagate_version = true,
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    /// More log output on stderr (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Parser, Debug)]
enum Commands {
    Ps(resources::PsArgs),
    Images(resources::ImagesArgs),
    Volumes(resources::VolumesArgs),
    Networks(resources::NetworksArgs),
    Df(resources::DfArgs),
    Rm(remove::RmArgs),
    Rmi(remove::RmiArgs),
    VolumeRm(remove::VolumeRmArgs),
    NetworkRm(remove::NetworkRmArgs),
    Prune(prune::PruneArgs),
    /// Start one or more containers
    Start(lifecycle::LifecycleArgs),
    /// Stop one or more containers
    Stop(lifecycle::LifecycleArgs),
    /// Restart one or more containers
    Restart(lifecycle::LifecycleArgs),
    Logs(logs::LogsArgs),
    Info(info::InfoArgs),
}

fn log_level(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level(cli.verbose)));
    fmt::Subscriber::builder()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();

    tracing::debug!("Parsed CLI arguments: {:?}", cli);

    let command_result = match cli.command {
        Commands::Ps(args) => resources::handle_ps(args).await,
        Commands::Images(args) => resources::handle_images(args).await,
        Commands::Volumes(args) => resources::handle_volumes(args).await,
        Commands::Networks(args) => resources::handle_networks(args).await,
        Commands::Df(args) => resources::handle_df(args).await,
        Commands::Rm(args) => remove::handle_rm(args).await,
        Commands::Rmi(args) => remove::handle_rmi(args).await,
        Commands::VolumeRm(args) => remove::handle_volume_rm(args).await,
        Commands::NetworkRm(args) => remove::handle_network_rm(args).await,
        Commands::Prune(args) => prune::handle_prune(args).await,
        Commands::Start(args) => lifecycle::handle_start(args).await,
        Commands::Stop(args) => lifecycle::handle_stop(args).await,
        Commands::Restart(args) => lifecycle::handle_restart(args).await,
        Commands::Logs(args) => logs::handle_logs(args).await,
        Commands::Info(args) => info::handle_info(args).await,
    };

    if let Err(e) = command_result {
        tracing::error!("Command execution failed: {:?}", e);
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}
