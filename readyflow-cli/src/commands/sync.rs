//! Sync command - one pass over recently merged pull requests

use std::path::Path;

use anyhow::Context;
use clap::Args;
use readyflow_core::{CliOverrides, Config};
use readyflow_github::GitHubClient;

/// Arguments for the sync command
#[derive(Args, Debug, Default)]
pub struct SyncArgs {
    /// Compute and log every decision without writing anything
    #[arg(long)]
    pub dry_run: bool,

    /// Repository owner
    #[arg(long)]
    pub owner: Option<String>,

    /// Repository name
    #[arg(long)]
    pub repo: Option<String>,

    /// Project board title
    #[arg(long)]
    pub project: Option<String>,

    /// Name of the single-select status field
    #[arg(long)]
    pub status_field: Option<String>,

    /// Status option meaning "ready for verification"
    #[arg(long)]
    pub ready_option: Option<String>,

    /// Integration branch merges are watched on
    #[arg(long)]
    pub base_branch: Option<String>,

    /// Read statuses from the organization board feed
    #[arg(long)]
    pub enterprise: bool,

    /// Print the summary as JSON
    #[arg(long)]
    pub json: bool,
}

impl SyncArgs {
    fn overrides(&self) -> CliOverrides {
        CliOverrides {
            owner: self.owner.clone(),
            repo: self.repo.clone(),
            project: self.project.clone(),
            status_field: self.status_field.clone(),
            ready_option: self.ready_option.clone(),
            base_branch: self.base_branch.clone(),
            dry_run: self.dry_run,
            enterprise: self.enterprise,
        }
    }

    /// Execute the sync command
    ///
    /// Fails when the run could not start or was aborted part way. Failures
    /// of individual issues only show up in the summary.
    pub async fn execute(&self, config_path: Option<&Path>) -> anyhow::Result<()> {
        let config = Config::load_with_overrides(config_path, self.overrides())
            .context("failed to load configuration")?;
        config.validate()?;

        let client = GitHubClient::from_secrets(&config.github)?;

        tracing::info!(
            owner = %config.repository.owner,
            repo = %config.repository.name,
            project = %config.project.title,
            base = %config.sync.base_branch,
            endpoint = %client.endpoint(),
            dry_run = config.sync.dry_run,
            "Starting sync"
        );

        let summary = readyflow_github::run(&client, &config).await.map_err(|e| {
            if readyflow_github::is_configuration_error(&e) {
                anyhow::anyhow!("configuration error: {}", e)
            } else {
                anyhow::anyhow!("sync failed: {}", e)
            }
        })?;

        if self.json {
            println!("{}", summary.to_json()?);
        } else {
            println!("{}", summary);
        }

        if let Some(ref reason) = summary.aborted {
            anyhow::bail!("sync aborted: {}", reason);
        }

        Ok(())
    }
}
