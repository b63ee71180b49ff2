//! Error types for GitHub operations

use thiserror::Error;

/// Result type for GitHub operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during GitHub operations
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration or secrets problem
    #[error(transparent)]
    Core(#[from] readyflow_core::Error),

    /// Network failure, timeout or non-success HTTP status
    #[error("GitHub transport error: {0}")]
    Transport(String),

    /// Authentication error
    #[error("GitHub authentication error: {0}")]
    Auth(String),

    /// Rate limit exceeded
    #[error("GitHub rate limit exceeded, resets at {0}")]
    RateLimited(String),

    /// The GraphQL response carried an `errors` array
    #[error("GraphQL errors: {}", .0.join(", "))]
    GraphQl(Vec<String>),

    /// Response did not have the expected shape
    #[error("Parse error: {0}")]
    Parse(String),

    /// A paginated collection misbehaved (repeated or missing cursor)
    #[error("Pagination protocol error: {0}")]
    Pagination(String),

    /// Referenced issue does not exist or is not accessible
    #[error("Issue {0} not found")]
    IssueNotFound(String),

    /// Target project board not found
    #[error("Project '{0}' not found")]
    ProjectNotFound(String),

    /// Status field not found on the project
    #[error("Single-select field '{field}' not found in project '{project}'")]
    FieldNotFound { field: String, project: String },

    /// Target option not found on the status field
    #[error("Option '{option}' not found in field '{field}'")]
    OptionNotFound { option: String, field: String },

    /// The project, field or option stopped resolving during the run
    #[error("Project board changed during the run: {0}")]
    BoardChanged(String),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Parse(err.to_string())
    }
}

impl Error {
    /// Whether the error makes the rest of the run meaningless
    ///
    /// Fatal errors stop the run; everything else only fails the item being
    /// processed.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::Core(_)
                | Error::Auth(_)
                | Error::ProjectNotFound(_)
                | Error::FieldNotFound { .. }
                | Error::OptionNotFound { .. }
                | Error::BoardChanged(_)
        )
    }

    /// Whether any GraphQL error message mentions `needle`
    pub fn mentions(&self, needle: &str) -> bool {
        match self {
            Error::GraphQl(messages) => messages.iter().any(|m| m.contains(needle)),
            _ => false,
        }
    }
}
