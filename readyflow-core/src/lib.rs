//! Readyflow Core - shared building blocks for the readyflow sync job
//!
//! This crate holds everything that does not talk to GitHub: run
//! configuration and secrets, the notification marker that makes the job
//! idempotent, the per-(issue, PR) transition state machine, and the run
//! summary reported to the operator.

pub mod config;
pub mod error;
pub mod marker;
pub mod secrets;
pub mod summary;
pub mod transition;

pub use config::{CliOverrides, Config, GitHubConfig, OwnerKind, ProjectConfig, RepositoryConfig, SyncConfig};
pub use error::{Error, Result};
pub use marker::NotificationMarker;
pub use secrets::Secrets;
pub use summary::{SkipCounts, Summary};
pub use transition::{PairOutcome, TransitionState};
