//! Project board metadata resolved once per run

use readyflow_core::{OwnerKind, ProjectConfig};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

use crate::paginate::paginate_at;
use crate::queries::{ORGANIZATION_PROJECTS, PROJECT_FIELDS, USER_PROJECTS};
use crate::transport::Transport;
use crate::{Error, Result};

/// One option of a single-select field
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StatusOption {
    /// Option id (used as `singleSelectOptionId`)
    pub id: String,
    /// Display name
    pub name: String,
}

/// The status field of the target board
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectStatusField {
    /// Field id
    pub id: String,
    /// Field name
    pub name: String,
    /// Every option of the field
    pub options: Vec<StatusOption>,
    /// The "ready for verification" option
    pub ready: StatusOption,
}

/// Target board, status field and target option
///
/// Treated as immutable for the duration of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardMetadata {
    /// Project node id
    pub project_id: String,
    /// Project title
    pub project_title: String,
    /// Status field and target option
    pub field: ProjectStatusField,
}

impl BoardMetadata {
    /// Whether an error says one of this board's ids no longer resolves
    pub fn is_stale_in(&self, err: &Error) -> bool {
        err.mentions(&self.project_id)
            || err.mentions(&self.field.id)
            || err.mentions(&self.field.ready.id)
    }
}

#[derive(Debug, Deserialize)]
struct ProjectNode {
    id: String,
    title: String,
}

#[derive(Debug, Deserialize)]
struct FieldNode {
    #[serde(rename = "__typename")]
    typename: String,
    id: Option<String>,
    name: Option<String>,
    #[serde(default)]
    options: Vec<StatusOption>,
}

/// Resolve the project, status field and target option
///
/// Any of the three missing is a configuration error.
pub async fn resolve_board(
    transport: &dyn Transport,
    owner: &str,
    project: &ProjectConfig,
) -> Result<BoardMetadata> {
    debug!(owner, title = %project.title, "Resolving project board");

    let document = match project.owner_kind {
        OwnerKind::Organization => ORGANIZATION_PROJECTS,
        OwnerKind::User => USER_PROJECTS,
    };
    let pointer = format!("/{}/projectsV2", project.owner_kind.graphql_field());

    // The search is fuzzy; only an exact title counts.
    let projects: Vec<ProjectNode> = paginate_at(
        transport,
        document,
        json!({ "owner": owner, "title": project.title }),
        &pointer,
    )
    .collect_all()
    .await?;

    let project_node = projects
        .into_iter()
        .find(|p| p.title == project.title)
        .ok_or_else(|| Error::ProjectNotFound(project.title.clone()))?;

    let fields: Vec<FieldNode> = paginate_at(
        transport,
        PROJECT_FIELDS,
        json!({ "projectId": project_node.id }),
        "/node/fields",
    )
    .collect_all()
    .await?;

    let field = fields
        .into_iter()
        .filter(|f| f.typename == "ProjectV2SingleSelectField")
        .find(|f| f.name.as_deref() == Some(project.status_field.as_str()))
        .ok_or_else(|| Error::FieldNotFound {
            field: project.status_field.clone(),
            project: project_node.title.clone(),
        })?;

    let field_id = field.id.ok_or_else(|| {
        Error::Parse(format!("field '{}' has no id", project.status_field))
    })?;

    let ready = field
        .options
        .iter()
        .find(|o| o.name == project.ready_option)
        .cloned()
        .ok_or_else(|| Error::OptionNotFound {
            option: project.ready_option.clone(),
            field: project.status_field.clone(),
        })?;

    info!(
        project = %project_node.title,
        field = %project.status_field,
        option = %ready.name,
        "Resolved project board"
    );

    Ok(BoardMetadata {
        project_id: project_node.id,
        project_title: project_node.title,
        field: ProjectStatusField {
            id: field_id,
            name: project.status_field.clone(),
            options: field.options,
            ready,
        },
    })
}
