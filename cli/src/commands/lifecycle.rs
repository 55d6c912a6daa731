//! # Container Lifecycle Commands
//!
//! File: cli/src/commands/lifecycle.rs
//!
//! `octo start|stop|restart <container>...`. Each name, id or id prefix is
//! resolved against the current container list and acted on concurrently;
//! failures are collected and reported together once all have finished.
//!
use crate::common::docker::EngineService;
use crate::core::error::Result;
use anyhow::anyhow;
use clap::Parser;
use futures_util::future::join_all;
use tracing::{error, info};

#[derive(Parser, Debug)]
pub struct LifecycleArgs {
    /// Container names, ids or id prefixes
    #[arg(required = true, num_args = 1..)]
    containers: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Start,
    Stop,
    Restart,
}

impl Action {
    fn past_tense(self) -> &'static str {
        match self {
            Action::Start => "Started",
            Action::Stop => "Stopped",
            Action::Restart => "Restarted",
        }
    }

    async fn apply(self, service: &EngineService, id: &str) -> Result<()> {
        match self {
            Action::Start => service.start_container(id).await,
            Action::Stop => service.stop_container(id).await,
            Action::Restart => service.restart_container(id).await,
        }
    }
}

pub async fn handle_start(args: LifecycleArgs) -> Result<()> {
    let (_, service) = super::connect().await?;
    run(&service, Action::Start, &args.containers).await
}

pub async fn handle_stop(args: LifecycleArgs) -> Result<()> {
    let (_, service) = super::connect().await?;
    run(&service, Action::Stop, &args.containers).await
}

pub async fn handle_restart(args: LifecycleArgs) -> Result<()> {
    let (_, service) = super::connect().await?;
    run(&service, Action::Restart, &args.containers).await
}

async fn run(service: &EngineService, action: Action, containers: &[String]) -> Result<()> {
    info!("{:?} requested for {:?}", action, containers);
    let results = join_all(containers.iter().map(|id| async move {
        (id, action.apply(service, id).await)
    }))
    .await;

    let mut failed = Vec::new();
    for (id, result) in results {
        match result {
            Ok(()) => println!("{} container '{}'", action.past_tense(), id),
            Err(e) => {
                error!("{:?} of '{}' failed: {:#}", action, id, e);
                eprintln!("Error: {}: {:#}", id, e);
                failed.push(id.as_str());
            }
        }
    }
    if failed.is_empty() {
        Ok(())
    } else {
        Err(anyhow!(
            "Failed to {} {} of {} containers: {}",
            format!("{:?}", action).to_lowercase(),
            failed.len(),
            containers.len(),
            failed.join(", ")
        ))
    }
}
