//! Which issues does a merged pull request touch?
//!
//! Three kinds of evidence are combined, most reliable first:
//!
//! 1. Structural links GitHub maintains itself (`closingIssuesReferences`)
//! 2. Cross-reference and connection events on the PR timeline
//! 3. Issue references written in the PR description: `#123`,
//!    `repo#123` and `owner/repo#123`
//!
//! The layers are merged, not chosen between. An issue found by several
//! layers is reported once, attributed to the most reliable one.

use std::collections::HashSet;
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info, warn};

use crate::graphql::{object_at, RepositoryNode};
use crate::paginate::paginate_at;
use crate::pr::{IssueNode, PullRequest};
use crate::queries::{CLOSING_ISSUES, ISSUE_ID, PULL_REQUEST_TIMELINE};
use crate::transport::Transport;
use crate::{Error, Result};

static ISSUE_REFERENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:(?:(?P<owner>[\w-]+)/)?(?P<repo>[\w-]+))?#(?P<number>\d+)")
        .expect("issue reference pattern is valid")
});

/// An issue mention that has not been looked up yet
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IssueReference {
    /// Repository owner
    pub owner: String,
    /// Repository name
    pub repo: String,
    /// Issue number
    pub number: u64,
}

impl IssueReference {
    /// Create a reference
    pub fn new(owner: impl Into<String>, repo: impl Into<String>, number: u64) -> Self {
        Self {
            owner: owner.into(),
            repo: repo.into(),
            number,
        }
    }

    /// Identity used for deduplication
    ///
    /// GitHub logins and repository names are case-insensitive.
    fn key(&self) -> (String, String, u64) {
        (
            self.owner.to_ascii_lowercase(),
            self.repo.to_ascii_lowercase(),
            self.number,
        )
    }
}

impl fmt::Display for IssueReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}#{}", self.owner, self.repo, self.number)
    }
}

/// Parse issue references out of free text
///
/// `#7` resolves against `owner/repo`, `other#7` against `owner/other`, and
/// `org/other#7` is taken as written. References come back in order of first
/// appearance with repeats removed.
pub fn parse_issue_references(text: &str, owner: &str, repo: &str) -> Vec<IssueReference> {
    let mut seen = HashSet::new();
    let mut refs = Vec::new();

    for caps in ISSUE_REFERENCE.captures_iter(text) {
        let Some(number) = caps
            .name("number")
            .and_then(|m| m.as_str().parse::<u64>().ok())
        else {
            continue;
        };

        let reference = IssueReference::new(
            caps.name("owner").map_or(owner, |m| m.as_str()),
            caps.name("repo").map_or(repo, |m| m.as_str()),
            number,
        );

        if seen.insert(reference.key()) {
            refs.push(reference);
        }
    }

    refs
}

/// Where a resolved issue was found
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EvidenceSource {
    /// GitHub's own PR-to-issue link
    Structural,
    /// PR timeline event
    Timeline,
    /// Mention in the PR description
    Text,
}

impl fmt::Display for EvidenceSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EvidenceSource::Structural => "linked",
            EvidenceSource::Timeline => "timeline",
            EvidenceSource::Text => "description",
        };
        f.write_str(name)
    }
}

/// An issue with a known node id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedIssue {
    /// GraphQL node id
    pub id: String,
    /// Repository owner
    pub owner: String,
    /// Repository name
    pub repo: String,
    /// Issue number
    pub number: u64,
    /// Most reliable evidence the issue was found through
    pub source: EvidenceSource,
}

impl ResolvedIssue {
    /// The reference this issue answers
    pub fn reference(&self) -> IssueReference {
        IssueReference::new(&self.owner, &self.repo, self.number)
    }
}

impl fmt::Display for ResolvedIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}#{}", self.owner, self.repo, self.number)
    }
}

/// Issues found for one pull request
#[derive(Debug, Clone, Default)]
pub struct Resolution {
    /// Distinct issues, most reliable evidence first
    pub issues: Vec<ResolvedIssue>,
    /// Description references that did not resolve to an issue
    pub unresolved: Vec<IssueReference>,
}

impl Resolution {
    /// Add an issue unless one with the same node id is already present
    fn add(&mut self, issue: ResolvedIssue, seen: &mut HashSet<String>) {
        if seen.insert(issue.id.clone()) {
            self.issues.push(issue);
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "__typename")]
enum TimelineNode {
    CrossReferencedEvent { source: Option<LinkedNode> },
    ConnectedEvent { subject: Option<LinkedNode> },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct LinkedNode {
    #[serde(rename = "__typename")]
    typename: String,
    id: Option<String>,
    number: Option<u64>,
    repository: Option<RepositoryNode>,
}

impl TimelineNode {
    /// The issue the event points at, if it points at an issue
    fn into_issue(self) -> Option<IssueNode> {
        let linked = match self {
            TimelineNode::CrossReferencedEvent { source } => source?,
            TimelineNode::ConnectedEvent { subject } => subject?,
            TimelineNode::Other => return None,
        };

        if linked.typename != "Issue" {
            return None;
        }

        Some(IssueNode {
            id: linked.id?,
            number: linked.number?,
            repository: linked.repository?,
        })
    }
}

#[derive(Debug, Deserialize)]
struct IssueIdNode {
    id: String,
}

/// Resolves the issues a pull request references
pub struct ReferenceResolver<'a> {
    transport: &'a dyn Transport,
    owner: &'a str,
    repo: &'a str,
}

impl<'a> ReferenceResolver<'a> {
    /// Create a resolver for PRs of `owner/repo`
    pub fn new(transport: &'a dyn Transport, owner: &'a str, repo: &'a str) -> Self {
        Self {
            transport,
            owner,
            repo,
        }
    }

    /// Collect the distinct issues a pull request references
    ///
    /// Never fails as a whole: a broken evidence feed or a reference that
    /// does not resolve is logged and skipped, and the rest still count.
    pub async fn resolve(&self, pr: &PullRequest) -> Resolution {
        let mut resolution = Resolution::default();
        let mut seen = HashSet::new();

        for issue in self.structural(pr).await {
            resolution.add(issue, &mut seen);
        }

        for issue in self.timeline(pr).await {
            resolution.add(issue, &mut seen);
        }

        let known: HashSet<(String, String, u64)> = resolution
            .issues
            .iter()
            .map(|issue| issue.reference().key())
            .collect();

        for reference in parse_issue_references(&pr.body, self.owner, self.repo) {
            if known.contains(&reference.key()) {
                debug!(pr = pr.number, issue = %reference, "Mention already resolved through links");
                continue;
            }

            match self.lookup(&reference).await {
                Ok(id) => resolution.add(
                    ResolvedIssue {
                        id,
                        owner: reference.owner,
                        repo: reference.repo,
                        number: reference.number,
                        source: EvidenceSource::Text,
                    },
                    &mut seen,
                ),
                Err(e) => {
                    warn!(pr = pr.number, issue = %reference, error = %e, "Dropping unresolved reference");
                    resolution.unresolved.push(reference);
                }
            }
        }

        info!(
            pr = pr.number,
            issues = resolution.issues.len(),
            unresolved = resolution.unresolved.len(),
            "Resolved referenced issues"
        );

        resolution
    }

    /// Issues GitHub links to the PR, continuing past the first page
    async fn structural(&self, pr: &PullRequest) -> Vec<ResolvedIssue> {
        let mut issues = pr.linked_issues.clone();

        if let Some(ref cursor) = pr.linked_issues_cursor {
            let rest: Result<Vec<IssueNode>> = paginate_at(
                self.transport,
                CLOSING_ISSUES,
                json!({ "prId": pr.id }),
                "/node/closingIssuesReferences",
            )
            .starting_at(cursor.clone())
            .collect_all()
            .await;

            match rest {
                Ok(nodes) => issues.extend(
                    nodes
                        .into_iter()
                        .map(|n| n.into_resolved(EvidenceSource::Structural)),
                ),
                Err(e) => {
                    warn!(pr = pr.number, error = %e, "Failed to fetch remaining linked issues");
                }
            }
        }

        issues
    }

    /// Issues named by cross-reference and connection events
    async fn timeline(&self, pr: &PullRequest) -> Vec<ResolvedIssue> {
        let events: Result<Vec<TimelineNode>> = paginate_at(
            self.transport,
            PULL_REQUEST_TIMELINE,
            json!({ "prId": pr.id }),
            "/node/timelineItems",
        )
        .collect_all()
        .await;

        match events {
            Ok(events) => events
                .into_iter()
                .filter_map(TimelineNode::into_issue)
                .map(|n| n.into_resolved(EvidenceSource::Timeline))
                .collect(),
            Err(e) => {
                warn!(pr = pr.number, error = %e, "Failed to read PR timeline");
                Vec::new()
            }
        }
    }

    /// Look up the node id of a referenced issue
    async fn lookup(&self, reference: &IssueReference) -> Result<String> {
        let data = self
            .transport
            .execute(
                ISSUE_ID,
                json!({
                    "owner": reference.owner,
                    "repo": reference.repo,
                    "number": reference.number,
                }),
            )
            .await?;

        object_at::<IssueIdNode>(data, "/repository/issue")?
            .map(|node| node.id)
            .ok_or_else(|| Error::IssueNotFound(reference.to_string()))
    }
}
