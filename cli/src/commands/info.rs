//! # Info Command
//!
//! File: cli/src/commands/info.rs
//!
//! `octo info` prints what engine Octo is talking to and how much it holds.
//! Resource counts come from a full snapshot; a category that fails to load
//! is reported as a warning instead of failing the command.
//!
use crate::common::docker::service::{EngineSummary, ResourceSnapshot};
use crate::core::error::Result;
use clap::Parser;

#[derive(Parser, Debug)]
#[command(about = "Show engine version and resource counts")]
pub struct InfoArgs {}

pub async fn handle_info(_args: InfoArgs) -> Result<()> {
    let (_, service) = super::connect().await?;
    let (summary, snapshot) = tokio::join!(service.engine_info(), service.snapshot());
    print!("{}", render_info(&summary?, &snapshot));
    Ok(())
}

fn render_info(summary: &EngineSummary, snapshot: &ResourceSnapshot) -> String {
    let mut text = format!(
        "Engine version: {}\n\
         API version:    {}\n\
         Platform:       {}/{}\n\
         Containers:     {} ({} running)\n\
         Images:         {}\n",
        summary.version,
        summary.api_version,
        summary.os,
        summary.arch,
        summary.containers,
        summary.containers_running,
        summary.images
    );
    let volumes_in_use = snapshot.volumes.iter().filter(|v| v.in_use).count();
    text.push_str(&format!(
        "Volumes:        {} ({} in use)\n\
         Networks:       {}\n",
        snapshot.volumes.len(),
        volumes_in_use,
        snapshot.networks.len()
    ));
    for warning in &snapshot.warnings {
        text.push_str(&format!("Warning: {}\n", warning));
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::docker::fake::{samples, FakeEngine};
    use crate::common::docker::EngineService;
    use crate::core::error::OctoError;
    use anyhow::anyhow;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_render_info() {
        let service = EngineService::new(Arc::new(FakeEngine::new()));
        let snapshot = service.snapshot().await;
        let text = render_info(&service.engine_info().await.unwrap(), &snapshot);
        assert!(text.contains("API version:    1.47\n"));
        assert!(text.contains("Containers:     3 (1 running)\n"));
        assert!(text.contains("Images:         5\n"));
        assert!(!text.contains("Warning"));
    }

    #[tokio::test]
    async fn test_render_info_counts_snapshot() {
        let service = EngineService::new(Arc::new(
            FakeEngine::new()
                .with_volumes(vec![samples::volume("data"), samples::volume("scratch")])
                .with_containers(vec![samples::container_with_volume("c1", "data")])
                .on_list_networks(|_| Err(anyhow!(OctoError::Transport("socket reset".into())))),
        ));
        let snapshot = service.snapshot().await;
        let text = render_info(&service.engine_info().await.unwrap(), &snapshot);
        assert!(text.contains("Volumes:        2 (1 in use)\n"));
        assert!(text.contains("Networks:       0\n"));
        assert!(text.contains("Warning: Failed to list networks"));
    }
}
