//! In-memory transports for tests
//!
//! [`ScriptedTransport`] replays canned responses in order. [`FakeGitHub`]
//! is a small stateful model of the parts of GitHub the sync job touches:
//! it answers every query the crate sends, applies mutations to its own
//! state and logs each operation name in call order.

use std::collections::{HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde_json::{json, Value};

use crate::pr::PullRequest;
use crate::references::{EvidenceSource, ResolvedIssue};
use crate::transport::{operation_name, Transport};
use crate::{Error, Result};

const PROJECT_ID: &str = "PVT_1";
const STATUS_FIELD_ID: &str = "PVTSSF_status";

const STATUS_OPTIONS: [(&str, &str); 3] = [
    ("OPT_todo", "Todo"),
    ("OPT_progress", "In Progress"),
    ("OPT_qa", "QA Testing"),
];

/// Replays a fixed list of responses and records request variables
pub(crate) struct ScriptedTransport {
    responses: Mutex<VecDeque<Result<Value>>>,
    requests: Mutex<Vec<Value>>,
}

impl ScriptedTransport {
    pub(crate) fn new(responses: Vec<Result<Value>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Variables of every request made so far
    pub(crate) fn requests(&self) -> Vec<Value> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn execute(&self, _document: &str, variables: Value) -> Result<Value> {
        self.requests.lock().unwrap().push(variables);
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(Error::Transport("no scripted response left".to_string())))
    }
}

#[derive(Debug, Clone)]
struct FakeItem {
    project_id: String,
    item_id: String,
    status: Option<String>,
}

/// An issue known to [`FakeGitHub`]
#[derive(Debug, Clone)]
pub(crate) struct FakeIssue {
    id: String,
    owner: String,
    repo: String,
    number: u64,
    items: Vec<FakeItem>,
    comments: Vec<String>,
}

impl FakeIssue {
    pub(crate) fn new(id: &str, owner: &str, repo: &str, number: u64) -> Self {
        Self {
            id: id.to_string(),
            owner: owner.to_string(),
            repo: repo.to_string(),
            number,
            items: Vec::new(),
            comments: Vec::new(),
        }
    }

    /// Put the issue on the default board with an optional status
    pub(crate) fn on_board(self, item_id: &str, status: Option<&str>) -> Self {
        self.with_item(PROJECT_ID, item_id, status)
    }

    /// Put the issue on some other board
    pub(crate) fn on_other_board(self, project_id: &str, item_id: &str) -> Self {
        self.with_item(project_id, item_id, Some("Todo"))
    }

    pub(crate) fn with_comment(mut self, body: impl Into<String>) -> Self {
        self.comments.push(body.into());
        self
    }

    fn with_item(mut self, project_id: &str, item_id: &str, status: Option<&str>) -> Self {
        self.items.push(FakeItem {
            project_id: project_id.to_string(),
            item_id: item_id.to_string(),
            status: status.map(str::to_string),
        });
        self
    }

    fn matches(&self, owner: &str, repo: &str, number: u64) -> bool {
        self.owner.eq_ignore_ascii_case(owner)
            && self.repo.eq_ignore_ascii_case(repo)
            && self.number == number
    }

    fn node(&self) -> Value {
        json!({
            "id": self.id,
            "number": self.number,
            "repository": { "name": self.repo, "owner": { "login": self.owner } }
        })
    }
}

/// A merged pull request known to [`FakeGitHub`]
#[derive(Debug, Clone)]
pub(crate) struct FakePr {
    number: u64,
    body: String,
    base: String,
    merged_days_ago: i64,
    closes: Vec<String>,
    cross_references: Vec<String>,
}

impl FakePr {
    pub(crate) fn new(number: u64) -> Self {
        Self {
            number,
            body: String::new(),
            base: "dev".to_string(),
            merged_days_ago: 0,
            closes: Vec::new(),
            cross_references: Vec::new(),
        }
    }

    pub(crate) fn body(mut self, body: &str) -> Self {
        self.body = body.to_string();
        self
    }

    pub(crate) fn base(mut self, base: &str) -> Self {
        self.base = base.to_string();
        self
    }

    pub(crate) fn merged_days_ago(mut self, days: i64) -> Self {
        self.merged_days_ago = days;
        self
    }

    /// Link an issue the way "Fixes #n" in GitHub's UI does
    pub(crate) fn closes(mut self, issue_id: &str) -> Self {
        self.closes.push(issue_id.to_string());
        self
    }

    /// Add a cross-reference event from an issue to the PR timeline
    pub(crate) fn cross_referenced_by(mut self, issue_id: &str) -> Self {
        self.cross_references.push(issue_id.to_string());
        self
    }

    fn id(&self) -> String {
        format!("PR_{}", self.number)
    }
}

struct FakeState {
    project_title: String,
    status_field: bool,
    issues: Vec<FakeIssue>,
    prs: Vec<FakePr>,
    failing: HashSet<String>,
    remove_field_after: Option<String>,
    page_size: Option<usize>,
    calls: Vec<String>,
    writes: Vec<String>,
}

/// Stateful stand-in for the GitHub GraphQL API
///
/// One project ("Delivery", `PVT_1`) with a "Status" single-select field
/// whose options are Todo, In Progress and QA Testing. Board items, project
/// links and comments are served in pages of at most
/// [`with_page_size`](Self::with_page_size) nodes; everything else comes as
/// a single page.
pub(crate) struct FakeGitHub {
    owner: String,
    repo: String,
    now: DateTime<Utc>,
    state: Mutex<FakeState>,
}

impl FakeGitHub {
    pub(crate) fn new(owner: &str, repo: &str) -> Self {
        Self {
            owner: owner.to_string(),
            repo: repo.to_string(),
            now: Utc::now(),
            state: Mutex::new(FakeState {
                project_title: "Delivery".to_string(),
                status_field: true,
                issues: Vec::new(),
                prs: Vec::new(),
                failing: HashSet::new(),
                remove_field_after: None,
                page_size: None,
                calls: Vec::new(),
                writes: Vec::new(),
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap()
    }

    pub(crate) fn with_issue(self, issue: FakeIssue) -> Self {
        self.state().issues.push(issue);
        self
    }

    pub(crate) fn with_pr(self, pr: FakePr) -> Self {
        self.state().prs.push(pr);
        self
    }

    pub(crate) fn with_project_title(self, title: &str) -> Self {
        self.state().project_title = title.to_string();
        self
    }

    /// Make every call of an operation fail with a transport error
    pub(crate) fn failing(self, operation: &str) -> Self {
        self.state().failing.insert(operation.to_string());
        self
    }

    /// Delete the status field right after an operation is first served
    pub(crate) fn removing_status_field_after(self, operation: &str) -> Self {
        self.state().remove_field_after = Some(operation.to_string());
        self
    }

    /// Cap how many nodes a paged collection returns per request
    pub(crate) fn with_page_size(self, size: usize) -> Self {
        self.state().page_size = Some(size);
        self
    }

    /// Let a previously failing operation succeed again
    pub(crate) fn recover(&self, operation: &str) {
        self.state().failing.remove(operation);
    }

    /// Delete the status field from the project
    pub(crate) fn remove_status_field(&self) {
        self.state().status_field = false;
    }

    /// Operation names in call order, failed calls included
    pub(crate) fn calls(&self) -> Vec<String> {
        self.state().calls.clone()
    }

    pub(crate) fn call_count(&self, operation: &str) -> usize {
        self.state().calls.iter().filter(|c| *c == operation).count()
    }

    /// Mutations that were accepted, in order
    pub(crate) fn writes(&self) -> Vec<String> {
        self.state().writes.clone()
    }

    /// Status of an issue on the default board
    pub(crate) fn issue_status(&self, issue_id: &str) -> Option<String> {
        let state = self.state();
        state
            .issues
            .iter()
            .find(|i| i.id == issue_id)?
            .items
            .iter()
            .find(|item| item.project_id == PROJECT_ID)?
            .status
            .clone()
    }

    pub(crate) fn comments(&self, issue_id: &str) -> Vec<String> {
        self.state()
            .issues
            .iter()
            .find(|i| i.id == issue_id)
            .map(|i| i.comments.clone())
            .unwrap_or_default()
    }

    /// The pull request as the merged PR feed would return it
    pub(crate) fn pull_request(&self, number: u64) -> PullRequest {
        let state = self.state();
        let pr = state
            .prs
            .iter()
            .find(|pr| pr.number == number)
            .unwrap_or_else(|| panic!("no fake PR #{}", number));

        PullRequest {
            id: pr.id(),
            number,
            title: format!("Change {}", number),
            url: self.pr_url(number),
            merged_at: self.merged_at(pr),
            base_branch: pr.base.clone(),
            body: pr.body.clone(),
            linked_issues: pr
                .closes
                .iter()
                .filter_map(|id| state.issues.iter().find(|i| i.id == *id))
                .map(|i| ResolvedIssue {
                    id: i.id.clone(),
                    owner: i.owner.clone(),
                    repo: i.repo.clone(),
                    number: i.number,
                    source: EvidenceSource::Structural,
                })
                .collect(),
            linked_issues_cursor: None,
        }
    }

    fn pr_url(&self, number: u64) -> String {
        format!("https://github.com/{}/{}/pull/{}", self.owner, self.repo, number)
    }

    fn merged_at(&self, pr: &FakePr) -> DateTime<Utc> {
        self.now - Duration::hours(1) - Duration::days(pr.merged_days_ago)
    }

    fn handle(&self, state: &mut FakeState, operation: &str, vars: &Value) -> Result<Value> {
        let str_var = |name: &str| vars[name].as_str().unwrap_or_default().to_string();

        match operation {
            "MergedPullRequests" => {
                let state: &FakeState = state;
                let base = str_var("base");
                let mut prs: Vec<&FakePr> = state.prs.iter().filter(|pr| pr.base == base).collect();
                prs.sort_by_key(|pr| (pr.merged_days_ago, std::cmp::Reverse(pr.number)));

                let nodes: Vec<Value> = prs
                    .into_iter()
                    .map(|pr| {
                        let at = self.merged_at(pr).to_rfc3339();
                        json!({
                            "id": pr.id(),
                            "number": pr.number,
                            "title": format!("Change {}", pr.number),
                            "url": self.pr_url(pr.number),
                            "mergedAt": at,
                            "updatedAt": at,
                            "baseRefName": pr.base,
                            "bodyText": pr.body,
                            "closingIssuesReferences": connection(issue_nodes(state, &pr.closes)),
                        })
                    })
                    .collect();

                Ok(json!({ "repository": { "pullRequests": connection(nodes) } }))
            }
            "ClosingIssues" => {
                let pr = find_pr(state, &str_var("prId"))?;
                Ok(json!({ "node": { "closingIssuesReferences": connection(issue_nodes(state, &pr.closes)) } }))
            }
            "PullRequestTimeline" => {
                let state: &FakeState = state;
                let pr = find_pr(state, &str_var("prId"))?;
                let events: Vec<Value> = issue_nodes(state, &pr.cross_references)
                    .into_iter()
                    .map(|mut source| {
                        source["__typename"] = json!("Issue");
                        json!({ "__typename": "CrossReferencedEvent", "source": source })
                    })
                    .collect();
                Ok(json!({ "node": { "timelineItems": connection(events) } }))
            }
            "IssueId" => {
                let number = vars["number"].as_u64().unwrap_or_default();
                state
                    .issues
                    .iter()
                    .find(|i| i.matches(&str_var("owner"), &str_var("repo"), number))
                    .map(|i| json!({ "repository": { "issue": { "id": i.id, "number": i.number } } }))
                    .ok_or_else(|| {
                        Error::GraphQl(vec![format!(
                            "Could not resolve to an issue or pull request with the number of {}.",
                            number
                        )])
                    })
            }
            "OrganizationProjects" | "UserProjects" => {
                let root = if operation == "UserProjects" { "user" } else { "organization" };
                let projects = connection(vec![json!({
                    "id": PROJECT_ID,
                    "title": state.project_title,
                    "number": 1,
                })]);
                let mut data = json!({});
                data[root] = json!({ "projectsV2": projects });
                Ok(data)
            }
            "ProjectFields" => {
                let mut fields = vec![json!({ "__typename": "ProjectV2Field" })];
                if state.status_field {
                    fields.push(json!({
                        "__typename": "ProjectV2SingleSelectField",
                        "id": STATUS_FIELD_ID,
                        "name": "Status",
                        "options": STATUS_OPTIONS
                            .iter()
                            .map(|(id, name)| json!({ "id": id, "name": name }))
                            .collect::<Vec<_>>(),
                    }));
                }
                Ok(json!({ "node": { "fields": connection(fields) } }))
            }
            "IssueProjectItems" => {
                let state: &FakeState = state;
                let issue_id = str_var("issueId");
                let Some(issue) = state.issues.iter().find(|i| i.id == issue_id) else {
                    return Ok(json!({ "node": null }));
                };
                let items: Vec<Value> = issue
                    .items
                    .iter()
                    .map(|item| {
                        json!({
                            "id": item.item_id,
                            "project": { "id": item.project_id },
                            "fieldValueByName": field_value(state, item),
                        })
                    })
                    .collect();
                Ok(json!({ "node": { "projectItems": paged(items, vars, state.page_size) } }))
            }
            "ProjectItems" => {
                let state: &FakeState = state;
                let mut items: Vec<Value> = state
                    .issues
                    .iter()
                    .flat_map(|issue| {
                        issue
                            .items
                            .iter()
                            .filter(|item| item.project_id == PROJECT_ID)
                            .map(|item| {
                                json!({
                                    "id": item.item_id,
                                    "content": { "__typename": "Issue", "id": issue.id },
                                    "fieldValueByName": field_value(state, item),
                                })
                            })
                    })
                    .collect();
                items.push(json!({
                    "id": "PVTI_draft",
                    "content": { "__typename": "DraftIssue" },
                    "fieldValueByName": null,
                }));
                Ok(json!({ "node": { "items": paged(items, vars, state.page_size) } }))
            }
            "IssueComments" => {
                let issue_id = str_var("issueId");
                let Some(issue) = state.issues.iter().find(|i| i.id == issue_id) else {
                    return Ok(json!({ "node": null }));
                };
                let comments: Vec<Value> = issue.comments.iter().map(|body| json!({ "body": body })).collect();
                Ok(json!({ "node": { "comments": paged(comments, vars, state.page_size) } }))
            }
            "UpdateItemStatus" => {
                let (project_id, field_id, option_id) =
                    (str_var("projectId"), str_var("fieldId"), str_var("optionId"));
                if project_id != PROJECT_ID {
                    return Err(unresolved_node(&project_id));
                }
                if !state.status_field || field_id != STATUS_FIELD_ID {
                    return Err(unresolved_node(&field_id));
                }
                let option = STATUS_OPTIONS
                    .iter()
                    .find(|(id, _)| *id == option_id)
                    .ok_or_else(|| unresolved_node(&option_id))?;

                let item_id = str_var("itemId");
                let item = state
                    .issues
                    .iter_mut()
                    .flat_map(|i| i.items.iter_mut())
                    .find(|item| item.item_id == item_id && item.project_id == PROJECT_ID)
                    .ok_or_else(|| unresolved_node(&item_id))?;
                item.status = Some(option.1.to_string());

                state.writes.push(operation.to_string());
                Ok(json!({ "updateProjectV2ItemFieldValue": { "projectV2Item": { "id": item_id } } }))
            }
            "AddComment" => {
                let subject_id = str_var("subjectId");
                let issue = state
                    .issues
                    .iter_mut()
                    .find(|i| i.id == subject_id)
                    .ok_or_else(|| unresolved_node(&subject_id))?;
                issue.comments.push(str_var("body"));
                let comment_id = format!("IC_{}", issue.comments.len());

                state.writes.push(operation.to_string());
                Ok(json!({ "addComment": { "commentEdge": { "node": { "id": comment_id } } } }))
            }
            other => Err(Error::GraphQl(vec![format!("fake does not serve {}", other)])),
        }
    }
}

#[async_trait]
impl Transport for FakeGitHub {
    async fn execute(&self, document: &str, variables: Value) -> Result<Value> {
        let operation = operation_name(document);
        let mut state = self.state();
        state.calls.push(operation.to_string());

        if state.failing.contains(operation) {
            return Err(Error::Transport(format!("{} unavailable", operation)));
        }

        let response = self.handle(&mut state, operation, &variables);

        if state.remove_field_after.as_deref() == Some(operation) {
            state.remove_field_after = None;
            state.status_field = false;
        }

        response
    }
}

fn connection(nodes: Vec<Value>) -> Value {
    json!({
        "nodes": nodes,
        "pageInfo": { "endCursor": null, "hasNextPage": false }
    })
}

/// One page of `nodes`, with offset cursors of the form `cursor:N`
fn paged(nodes: Vec<Value>, vars: &Value, page_size: Option<usize>) -> Value {
    let start = vars["after"]
        .as_str()
        .and_then(|c| c.strip_prefix("cursor:"))
        .and_then(|n| n.parse::<usize>().ok())
        .unwrap_or(0)
        .min(nodes.len());
    let first = vars["first"].as_u64().map_or(nodes.len(), |n| n as usize);
    let size = page_size.map_or(first, |p| p.min(first)).max(1);
    let end = (start + size).min(nodes.len());
    let has_next_page = end < nodes.len();

    json!({
        "nodes": nodes[start..end].to_vec(),
        "pageInfo": {
            "endCursor": format!("cursor:{}", end),
            "hasNextPage": has_next_page,
        }
    })
}

fn issue_nodes(state: &FakeState, ids: &[String]) -> Vec<Value> {
    ids.iter()
        .filter_map(|id| state.issues.iter().find(|i| i.id == *id))
        .map(FakeIssue::node)
        .collect()
}

fn find_pr<'s>(state: &'s FakeState, pr_id: &str) -> Result<&'s FakePr> {
    state
        .prs
        .iter()
        .find(|pr| pr.id() == pr_id)
        .ok_or_else(|| unresolved_node(pr_id))
}

fn field_value(state: &FakeState, item: &FakeItem) -> Value {
    if item.project_id != PROJECT_ID || !state.status_field {
        return Value::Null;
    }
    let Some(ref name) = item.status else {
        return Value::Null;
    };
    let option_id = STATUS_OPTIONS
        .iter()
        .find(|(_, n)| *n == name.as_str())
        .map(|(id, _)| *id);
    json!({
        "__typename": "ProjectV2ItemFieldSingleSelectValue",
        "name": name,
        "optionId": option_id,
    })
}

fn unresolved_node(id: &str) -> Error {
    Error::GraphQl(vec![format!(
        "Could not resolve to a node with the global id of '{}'",
        id
    )])
}
