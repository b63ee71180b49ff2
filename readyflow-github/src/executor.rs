//! Applies the transition rule to one (issue, pull request) pair

use readyflow_core::{NotificationMarker, PairOutcome, TransitionState};
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info, warn};

use crate::board::BoardMetadata;
use crate::paginate::paginate_at;
use crate::pr::PullRequest;
use crate::queries::{ADD_COMMENT, ISSUE_COMMENTS, UPDATE_ITEM_STATUS};
use crate::references::ResolvedIssue;
use crate::status::StatusOracle;
use crate::transport::Transport;
use crate::{Error, Result};

#[derive(Debug, Deserialize)]
struct CommentNode {
    #[serde(default)]
    body: String,
}

/// Moves issues to the ready status and posts the notification comment
///
/// The status is always written before the comment, and the comment only
/// after the status write succeeded. A pair whose comment failed is seen as
/// "already at target, not notified" by the next run and finishes then.
pub struct TransitionExecutor<'a> {
    transport: &'a dyn Transport,
    board: &'a BoardMetadata,
    notice: &'a str,
    dry_run: bool,
}

impl<'a> TransitionExecutor<'a> {
    /// Create an executor writing to `board`
    pub fn new(
        transport: &'a dyn Transport,
        board: &'a BoardMetadata,
        notice: &'a str,
        dry_run: bool,
    ) -> Self {
        Self {
            transport,
            board,
            notice,
            dry_run,
        }
    }

    /// Classify a pair and perform whatever writes it needs
    ///
    /// Read failures (status lookup, comment scan) are returned as errors.
    /// Write failures end the pair in [`TransitionState::Failed`], except a
    /// status write rejected because a board id no longer resolves, which is
    /// returned as [`Error::BoardChanged`].
    pub async fn process(
        &self,
        oracle: &mut StatusOracle<'_>,
        issue: &ResolvedIssue,
        pr: &PullRequest,
    ) -> Result<PairOutcome> {
        let ready = &self.board.field.ready;
        let status = oracle.lookup(&issue.id).await?;

        let state = TransitionState::from_board(status.is_linked(), status.is_at(ready));
        if state.is_terminal() {
            warn!(issue = %issue, pr = pr.number, "Issue is not on project '{}', skipping", self.board.project_title);
            return Ok(PairOutcome::skipped(state));
        }

        let marker = NotificationMarker::for_pr(pr.number, &pr.url);
        let state = state.with_notification(self.has_marker(&issue.id, &marker).await?);
        info!(issue = %issue, pr = pr.number, state = %state, "Classified pair");
        if state.is_terminal() {
            return Ok(PairOutcome::skipped(state));
        }

        let status_write = state.requires_status_write();
        let body = marker.comment_body(self.notice, pr.number, &pr.url);

        if status_write {
            if self.dry_run {
                info!(issue = %issue, pr = pr.number, option = %ready.name, "[dry-run] Would update status");
            } else {
                // A linked issue always has an item id
                let item_id = status.item_id.as_deref().unwrap_or_default();
                if let Err(e) = self.update_status(item_id).await {
                    if self.board.is_stale_in(&e) {
                        return Err(Error::BoardChanged(e.to_string()));
                    }
                    error!(issue = %issue, pr = pr.number, error = %e, "Status update failed, not notifying");
                    return Ok(PairOutcome::skipped(state.finish(TransitionState::Failed)?));
                }
                info!(issue = %issue, pr = pr.number, option = %ready.name, "Updated status");
            }
            oracle.record_status(&issue.id, ready);
        }

        if self.dry_run {
            info!(issue = %issue, pr = pr.number, "[dry-run] Would post notification comment");
        } else if let Err(e) = self.add_comment(&issue.id, &body).await {
            error!(issue = %issue, pr = pr.number, error = %e, "Posting notification comment failed");
            return Ok(PairOutcome {
                state: state.finish(TransitionState::Failed)?,
                status_updated: status_write,
                comment_posted: false,
            });
        } else {
            info!(issue = %issue, pr = pr.number, "Posted notification comment");
        }

        Ok(PairOutcome {
            state: state.finish(TransitionState::Done)?,
            status_updated: status_write,
            comment_posted: true,
        })
    }

    /// Whether any comment on the issue carries `marker`
    async fn has_marker(&self, issue_id: &str, marker: &NotificationMarker) -> Result<bool> {
        let comments: Vec<CommentNode> = paginate_at(
            self.transport,
            ISSUE_COMMENTS,
            json!({ "issueId": issue_id }),
            "/node/comments",
        )
        .collect_all()
        .await?;

        Ok(comments.iter().any(|c| marker.is_present_in(&c.body)))
    }

    async fn update_status(&self, item_id: &str) -> Result<()> {
        self.transport
            .execute(
                UPDATE_ITEM_STATUS,
                json!({
                    "projectId": self.board.project_id,
                    "itemId": item_id,
                    "fieldId": self.board.field.id,
                    "optionId": self.board.field.ready.id,
                }),
            )
            .await?;
        Ok(())
    }

    async fn add_comment(&self, issue_id: &str, body: &str) -> Result<()> {
        self.transport
            .execute(ADD_COMMENT, json!({ "subjectId": issue_id, "body": body }))
            .await?;
        Ok(())
    }
}
