//! One sync pass over recently merged pull requests

use chrono::Utc;
use readyflow_core::{Config, Summary};
use tracing::{error, info, warn};

use crate::board::resolve_board;
use crate::executor::TransitionExecutor;
use crate::pr::merged_pull_requests;
use crate::references::ReferenceResolver;
use crate::status::StatusOracle;
use crate::transport::Transport;
use crate::{Error, Result};

/// Run the sync job once
///
/// Returns an error when the run cannot start: invalid configuration, a
/// board that does not resolve, or an unreachable pull request feed. Once
/// pairs are being processed, failures are counted in the summary instead;
/// a fatal one stops the remaining work and is recorded as the abort reason.
pub async fn run(transport: &dyn Transport, config: &Config) -> Result<Summary> {
    config.validate()?;

    let owner = config.repository.owner.as_str();
    let repo = config.repository.name.as_str();
    let mut summary = Summary::new(config.sync.dry_run);

    if summary.dry_run {
        info!("[dry-run] No status updates or comments will be written");
    }

    let board = resolve_board(transport, owner, &config.project).await?;

    let lookback = chrono::Duration::from_std(config.sync.lookback).map_err(|e| {
        readyflow_core::Error::Config(format!("lookback window out of range: {}", e))
    })?;
    let since = Utc::now() - lookback;

    let prs = merged_pull_requests(transport, owner, repo, &config.sync.base_branch, since).await?;

    let mut oracle = if config.project.enterprise {
        StatusOracle::board_scoped(transport, &board).await?
    } else {
        StatusOracle::issue_scoped(transport, &board)
    };

    let resolver = ReferenceResolver::new(transport, owner, repo);
    let executor = TransitionExecutor::new(transport, &board, &config.sync.notice, config.sync.dry_run);

    'prs: for pr in &prs {
        summary.prs_scanned += 1;
        info!(pr = pr.number, title = %pr.title, merged_at = %pr.merged_at, "Processing pull request");

        let resolution = resolver.resolve(pr).await;
        summary.record_unresolved(resolution.unresolved.len());

        for issue in &resolution.issues {
            match executor.process(&mut oracle, issue, pr).await {
                Ok(outcome) => summary.record(&outcome),
                Err(e) if e.is_fatal() => {
                    error!(pr = pr.number, issue = %issue, error = %e, "Stopping run");
                    summary.abort(e.to_string());
                    break 'prs;
                }
                Err(e) => {
                    warn!(pr = pr.number, issue = %issue, error = %e, "Failed to process issue");
                    summary.record_failure();
                }
            }
        }
    }

    info!(
        prs = summary.prs_scanned,
        transitioned = summary.issues_transitioned,
        comments = summary.comments_posted,
        failures = summary.failures,
        "Sync finished"
    );

    Ok(summary)
}

/// Whether an error returned by [`run`] is a configuration problem
///
/// The operator has to change something before re-running helps.
pub fn is_configuration_error(err: &Error) -> bool {
    matches!(
        err,
        Error::Core(_) | Error::ProjectNotFound(_) | Error::FieldNotFound { .. } | Error::OptionNotFound { .. }
    )
}
