//! Merged pull request feed

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

use crate::graphql::{PageInfo, RepositoryNode};
use crate::paginate::paginate_at;
use crate::queries::MERGED_PULL_REQUESTS;
use crate::references::{EvidenceSource, ResolvedIssue};
use crate::transport::Transport;
use crate::Result;

/// A pull request merged into the integration branch
///
/// Fetched once per run and never modified afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequest {
    /// GraphQL node id
    pub id: String,
    /// PR number
    pub number: u64,
    /// PR title
    pub title: String,
    /// PR URL
    pub url: String,
    /// When the PR was merged
    pub merged_at: DateTime<Utc>,
    /// Base branch name
    pub base_branch: String,
    /// Description as plain text
    pub body: String,
    /// Issues GitHub itself links to the PR (first page)
    pub linked_issues: Vec<ResolvedIssue>,
    /// Cursor to continue `linked_issues` from, when more exist
    pub linked_issues_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PullRequestNode {
    id: String,
    number: u64,
    title: String,
    url: String,
    merged_at: Option<DateTime<Utc>>,
    updated_at: DateTime<Utc>,
    base_ref_name: String,
    #[serde(default)]
    body_text: String,
    closing_issues_references: Option<LinkedIssueConnection>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LinkedIssueConnection {
    #[serde(default)]
    nodes: Vec<Option<IssueNode>>,
    #[serde(default)]
    page_info: PageInfo,
}

/// Issue as embedded in link and timeline responses
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct IssueNode {
    pub id: String,
    pub number: u64,
    pub repository: RepositoryNode,
}

impl IssueNode {
    pub(crate) fn into_resolved(self, source: EvidenceSource) -> ResolvedIssue {
        ResolvedIssue {
            id: self.id,
            owner: self.repository.owner.login,
            repo: self.repository.name,
            number: self.number,
            source,
        }
    }
}

impl PullRequestNode {
    fn into_pull_request(self) -> Option<PullRequest> {
        let merged_at = self.merged_at?;
        let (linked_issues, linked_issues_cursor) = match self.closing_issues_references {
            Some(connection) => {
                let cursor = connection
                    .page_info
                    .has_next_page
                    .then_some(connection.page_info.end_cursor)
                    .flatten();
                let issues = connection
                    .nodes
                    .into_iter()
                    .flatten()
                    .map(|n| n.into_resolved(EvidenceSource::Structural))
                    .collect();
                (issues, cursor)
            }
            None => (Vec::new(), None),
        };

        Some(PullRequest {
            id: self.id,
            number: self.number,
            title: self.title,
            url: self.url,
            merged_at,
            base_branch: self.base_ref_name,
            body: self.body_text,
            linked_issues,
            linked_issues_cursor,
        })
    }
}

/// Fetch pull requests merged into `base` at or after `since`
///
/// The feed is ordered by last update, newest first. A PR merged after
/// `since` was also updated after `since`, so the walk stops at the first PR
/// last updated before the cutoff.
pub async fn merged_pull_requests(
    transport: &dyn Transport,
    owner: &str,
    repo: &str,
    base: &str,
    since: DateTime<Utc>,
) -> Result<Vec<PullRequest>> {
    debug!(owner, repo, base, %since, "Fetching merged pull requests");

    let variables = json!({
        "owner": owner,
        "repo": repo,
        "base": base,
    });

    let nodes: Vec<PullRequestNode> = paginate_at(
        transport,
        MERGED_PULL_REQUESTS,
        variables,
        "/repository/pullRequests",
    )
    .collect_while(|node: &PullRequestNode| node.updated_at >= since)
    .await?;

    let prs: Vec<PullRequest> = nodes
        .into_iter()
        .filter_map(PullRequestNode::into_pull_request)
        .filter(|pr| pr.merged_at >= since && pr.base_branch == base)
        .collect();

    info!(count = prs.len(), base, "Fetched merged pull requests");

    Ok(prs)
}
