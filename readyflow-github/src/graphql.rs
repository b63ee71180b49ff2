//! GraphQL response shapes shared by every query

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use crate::{Error, Result};

/// GraphQL response envelope
#[derive(Debug, Deserialize)]
pub(crate) struct GraphQLResponse {
    data: Option<Value>,
    errors: Option<Vec<GraphQLError>>,
}

/// GraphQL error
#[derive(Debug, Deserialize)]
pub(crate) struct GraphQLError {
    message: String,
}

impl GraphQLResponse {
    /// Turn the envelope into the `data` object or an error
    ///
    /// Any entry in `errors` fails the whole call, even when partial data
    /// came back alongside it.
    pub(crate) fn into_data(self) -> Result<Value> {
        if let Some(errors) = self.errors.filter(|e| !e.is_empty()) {
            return Err(Error::GraphQl(
                errors.into_iter().map(|e| e.message).collect(),
            ));
        }

        self.data
            .filter(|d| !d.is_null())
            .ok_or_else(|| Error::Parse("GraphQL response missing data".to_string()))
    }
}

/// Relay-style page information
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    /// Cursor of the last item on the page
    pub end_cursor: Option<String>,
    /// Whether another page follows
    #[serde(default)]
    pub has_next_page: bool,
}

/// Relay-style connection (`nodes` + `pageInfo`)
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Connection<T> {
    #[serde(default = "Vec::new")]
    nodes: Vec<Option<T>>,
    #[serde(default)]
    page_info: PageInfo,
}

/// One page of a paginated collection
#[derive(Debug)]
pub struct Page<T> {
    /// Items in server order
    pub items: Vec<T>,
    /// Where the next page starts
    pub page_info: PageInfo,
}

impl<T> Connection<T> {
    fn into_page(self) -> Page<T> {
        Page {
            items: self.nodes.into_iter().flatten().collect(),
            page_info: self.page_info,
        }
    }
}

/// Decode the connection found at a JSON pointer in a response
///
/// Null nodes (deleted or inaccessible objects) are dropped.
pub(crate) fn page_at<T: DeserializeOwned>(mut data: Value, pointer: &str) -> Result<Page<T>> {
    let connection = data
        .pointer_mut(pointer)
        .map(Value::take)
        .filter(|v| !v.is_null())
        .ok_or_else(|| Error::Parse(format!("response has no connection at {}", pointer)))?;

    let connection: Connection<T> = serde_json::from_value(connection)?;
    Ok(connection.into_page())
}

/// Decode the object found at a JSON pointer, `None` when absent or null
pub(crate) fn object_at<T: DeserializeOwned>(mut data: Value, pointer: &str) -> Result<Option<T>> {
    match data.pointer_mut(pointer).map(Value::take) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => Ok(Some(serde_json::from_value(value)?)),
    }
}

/// `owner/name` of a repository as returned by GraphQL
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RepositoryNode {
    pub name: String,
    pub owner: OwnerNode,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct OwnerNode {
    pub login: String,
}
