//! Current board status of an issue
//!
//! Two read paths exist. By default every lookup walks the issue's own
//! project links and picks the one on the target board. For organization
//! boards that track many repositories (`project.enterprise`), the board's
//! item feed is read once at the start of the run and lookups are served
//! from that index.

use std::collections::HashMap;

use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

use crate::board::{BoardMetadata, StatusOption};
use crate::paginate::paginate_at;
use crate::queries::{ISSUE_PROJECT_ITEMS, PROJECT_ITEMS};
use crate::transport::Transport;
use crate::Result;

/// Value of a single-select field on a board item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusValue {
    /// Option name
    pub name: String,
    /// Option id, when GitHub reported one
    pub option_id: Option<String>,
}

/// What the board says about one issue
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IssueStatus {
    /// Board item id; `None` when the issue is not on the board
    pub item_id: Option<String>,
    /// Current status; `None` when the field is unset
    pub value: Option<StatusValue>,
}

impl IssueStatus {
    /// Whether the issue is on the target board
    pub fn is_linked(&self) -> bool {
        self.item_id.is_some()
    }

    /// Whether the current status is `option`
    pub fn is_at(&self, option: &StatusOption) -> bool {
        match self.value {
            Some(StatusValue {
                option_id: Some(ref id),
                ..
            }) => *id == option.id,
            Some(StatusValue { ref name, .. }) => *name == option.name,
            None => false,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "__typename")]
enum FieldValueNode {
    #[serde(rename = "ProjectV2ItemFieldSingleSelectValue", rename_all = "camelCase")]
    SingleSelect {
        name: Option<String>,
        option_id: Option<String>,
    },
    #[serde(other)]
    Other,
}

impl FieldValueNode {
    fn into_value(self) -> Option<StatusValue> {
        match self {
            FieldValueNode::SingleSelect { name, option_id } => Some(StatusValue {
                name: name?,
                option_id,
            }),
            FieldValueNode::Other => None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ProjectRef {
    id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IssueItemNode {
    id: String,
    project: ProjectRef,
    field_value_by_name: Option<FieldValueNode>,
}

#[derive(Debug, Deserialize)]
struct ContentNode {
    id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BoardItemNode {
    id: String,
    content: Option<ContentNode>,
    field_value_by_name: Option<FieldValueNode>,
}

/// Answers "is this issue on the board, and what is its status?"
pub struct StatusOracle<'a> {
    transport: &'a dyn Transport,
    board: &'a BoardMetadata,
    index: Option<HashMap<String, IssueStatus>>,
    recorded: HashMap<String, StatusValue>,
}

impl<'a> StatusOracle<'a> {
    /// Look statuses up per issue through the issue's project links
    pub fn issue_scoped(transport: &'a dyn Transport, board: &'a BoardMetadata) -> Self {
        Self {
            transport,
            board,
            index: None,
            recorded: HashMap::new(),
        }
    }

    /// Read the whole board item feed now and serve lookups from it
    pub async fn board_scoped(transport: &'a dyn Transport, board: &'a BoardMetadata) -> Result<Self> {
        let items: Vec<BoardItemNode> = paginate_at(
            transport,
            PROJECT_ITEMS,
            json!({
                "projectId": board.project_id,
                "statusField": board.field.name,
            }),
            "/node/items",
        )
        .collect_all()
        .await?;

        let index: HashMap<String, IssueStatus> = items
            .into_iter()
            .filter_map(|item| {
                // Draft items and pull requests have no issue id
                let issue_id = item.content?.id?;
                Some((
                    issue_id,
                    IssueStatus {
                        item_id: Some(item.id),
                        value: item.field_value_by_name.and_then(FieldValueNode::into_value),
                    },
                ))
            })
            .collect();

        info!(project = %board.project_title, issues = index.len(), "Indexed project board items");

        Ok(Self {
            transport,
            board,
            index: Some(index),
            recorded: HashMap::new(),
        })
    }

    /// Current board status of an issue
    ///
    /// A status recorded with [`record_status`](Self::record_status) wins
    /// over what the board reports.
    pub async fn lookup(&self, issue_id: &str) -> Result<IssueStatus> {
        let mut status = self.read(issue_id).await?;
        if status.is_linked() {
            if let Some(value) = self.recorded.get(issue_id) {
                status.value = Some(value.clone());
            }
        }
        Ok(status)
    }

    async fn read(&self, issue_id: &str) -> Result<IssueStatus> {
        if let Some(ref index) = self.index {
            return Ok(index.get(issue_id).cloned().unwrap_or_default());
        }

        let items: Vec<IssueItemNode> = paginate_at(
            self.transport,
            ISSUE_PROJECT_ITEMS,
            json!({
                "issueId": issue_id,
                "statusField": self.board.field.name,
            }),
            "/node/projectItems",
        )
        .collect_all()
        .await?;

        let status = items
            .into_iter()
            .find(|item| item.project.id == self.board.project_id)
            .map(|item| IssueStatus {
                item_id: Some(item.id),
                value: item.field_value_by_name.and_then(FieldValueNode::into_value),
            })
            .unwrap_or_default();

        debug!(issue_id, linked = status.is_linked(), value = ?status.value, "Looked up issue status");

        Ok(status)
    }

    /// Record a status this run wrote, or would have written in dry-run
    ///
    /// Later lookups of the issue report it, so a second pull request
    /// touching the same issue is classified the same way with or without
    /// dry-run.
    pub fn record_status(&mut self, issue_id: &str, option: &StatusOption) {
        self.recorded.insert(
            issue_id.to_string(),
            StatusValue {
                name: option.name.clone(),
                option_id: Some(option.id.clone()),
            },
        );
    }
}
