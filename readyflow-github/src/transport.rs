//! The seam between the sync engine and the GraphQL wire

use async_trait::async_trait;
use serde_json::Value;

use crate::Result;

/// Executes one GraphQL query or mutation
///
/// Implementations return the `data` object of the response. A response
/// carrying an `errors` array is reported as [`crate::Error::GraphQl`].
/// Callers never retry; a failed call fails the item it was made for.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, document: &str, variables: Value) -> Result<Value>;
}

/// Extract the operation name from a GraphQL document
///
/// `query MergedPullRequests($owner: String!) { ... }` yields
/// `MergedPullRequests`. Anonymous documents yield `"anonymous"`.
pub fn operation_name(document: &str) -> &str {
    let mut words = document.split_whitespace();
    match words.next() {
        Some("query") | Some("mutation") => words
            .next()
            .and_then(|w| w.split(['(', '{']).next())
            .filter(|name| !name.is_empty())
            .unwrap_or("anonymous"),
        _ => "anonymous",
    }
}
