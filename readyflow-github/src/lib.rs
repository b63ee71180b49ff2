//! Readyflow GitHub - GitHub side of the readyflow sync job
//!
//! Everything that talks to GitHub lives here: the GraphQL transport, the
//! cursor paginator, the reference resolver that maps merged pull requests
//! to issues, the board status oracle, and the transition executor that
//! moves issues to the ready status and notifies them. [`run`] wires the
//! pieces into one pass.

mod board;
mod client;
mod error;
mod executor;
mod graphql;
mod paginate;
mod pr;
mod queries;
mod references;
mod status;
mod sync;
mod transport;

#[cfg(test)]
mod testing;

pub use board::{resolve_board, BoardMetadata, ProjectStatusField, StatusOption};
pub use client::GitHubClient;
pub use error::{Error, Result};
pub use executor::TransitionExecutor;
pub use graphql::{Page, PageInfo};
pub use paginate::{Paginator, MAX_PAGE_SIZE};
pub use pr::{merged_pull_requests, PullRequest};
pub use references::{
    parse_issue_references, EvidenceSource, IssueReference, ReferenceResolver, Resolution,
    ResolvedIssue,
};
pub use status::{IssueStatus, StatusOracle, StatusValue};
pub use sync::{is_configuration_error, run};
pub use transport::{operation_name, Transport};
