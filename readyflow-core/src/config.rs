//! Configuration management for readyflow
//!
//! Configuration is loaded with the following priority (highest to lowest):
//! 1. CLI flags
//! 2. Environment variables (READYFLOW_*)
//! 3. Config file (~/.config/readyflow/config.toml)
//! 4. Default values
//!
//! The loaded [`Config`] is passed explicitly to every component of a run;
//! nothing reads configuration from process-wide state after loading.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Repository whose merged pull requests are scanned
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct RepositoryConfig {
    /// Repository owner (user or organization login)
    pub owner: String,

    /// Repository name
    pub name: String,
}

/// Kind of account that owns the project board
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OwnerKind {
    #[default]
    Organization,
    User,
}

impl OwnerKind {
    /// GraphQL root field used to look up this kind of owner
    pub fn graphql_field(self) -> &'static str {
        match self {
            OwnerKind::Organization => "organization",
            OwnerKind::User => "user",
        }
    }
}

/// Target project board and status field
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProjectConfig {
    /// Project (v2) title, matched exactly
    pub title: String,

    /// Whether the project belongs to an organization or a user
    pub owner_kind: OwnerKind,

    /// Read statuses from the organization project item feed instead of
    /// per-issue project links
    pub enterprise: bool,

    /// Name of the single-select status field
    pub status_field: String,

    /// Option of the status field meaning "ready for verification"
    pub ready_option: String,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            title: String::new(),
            owner_kind: OwnerKind::Organization,
            enterprise: false,
            status_field: "Status".to_string(),
            ready_option: "QA Testing".to_string(),
        }
    }
}

/// Merge scanning and notification settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Integration branch that merges are watched on
    pub base_branch: String,

    /// How far back (by merge time) pull requests are scanned
    #[serde(with = "humantime_serde")]
    pub lookback: Duration,

    /// Human-readable first line of the notification comment
    pub notice: String,

    /// Compute and log every decision without writing anything
    pub dry_run: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            base_branch: "dev".to_string(),
            lookback: Duration::from_secs(7 * 24 * 60 * 60),
            notice: "Testing will be available in 15 minutes".to_string(),
            dry_run: false,
        }
    }
}

/// GitHub API settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GitHubConfig {
    /// GraphQL endpoint (override for GitHub Enterprise Server)
    pub api_endpoint: String,

    /// Upper bound for a single GraphQL request
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            api_endpoint: "https://api.github.com/graphql".to_string(),
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Repository configuration
    pub repository: RepositoryConfig,

    /// Project board configuration
    pub project: ProjectConfig,

    /// Sync behaviour
    pub sync: SyncConfig,

    /// GitHub API configuration
    pub github: GitHubConfig,
}

/// Values supplied on the command line
///
/// `None` and `false` leave the lower-priority value untouched.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub owner: Option<String>,
    pub repo: Option<String>,
    pub project: Option<String>,
    pub status_field: Option<String>,
    pub ready_option: Option<String>,
    pub base_branch: Option<String>,
    pub dry_run: bool,
    pub enterprise: bool,
}

impl Config {
    /// Load configuration from the default config file location
    ///
    /// Returns default config if file doesn't exist
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path();

        if let Some(path) = config_path {
            if path.exists() {
                return Self::load_from_file(&path);
            }
        }

        Ok(Self::default())
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(Error::Io)?;
        toml::from_str(&contents)
            .map_err(|e| Error::Config(format!("Failed to parse {}: {}", path.display(), e)))
    }

    /// Get the default config file path
    ///
    /// Returns `~/.config/readyflow/config.toml` on Unix
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("readyflow").join("config.toml"))
    }

    /// Apply environment variable overrides
    ///
    /// Supported variables:
    /// - READYFLOW_OWNER, READYFLOW_REPO: repository coordinates
    /// - READYFLOW_PROJECT: project title
    /// - READYFLOW_STATUS_FIELD, READYFLOW_READY_OPTION: status field and target option
    /// - READYFLOW_BASE_BRANCH: integration branch
    /// - READYFLOW_DRY_RUN, READYFLOW_ENTERPRISE: boolean flags ("1", "true", "yes")
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    fn with_overrides_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(owner) = lookup("READYFLOW_OWNER") {
            self.repository.owner = owner;
        }
        if let Some(repo) = lookup("READYFLOW_REPO") {
            self.repository.name = repo;
        }
        if let Some(title) = lookup("READYFLOW_PROJECT") {
            self.project.title = title;
        }
        if let Some(field) = lookup("READYFLOW_STATUS_FIELD") {
            self.project.status_field = field;
        }
        if let Some(option) = lookup("READYFLOW_READY_OPTION") {
            self.project.ready_option = option;
        }
        if let Some(branch) = lookup("READYFLOW_BASE_BRANCH") {
            self.sync.base_branch = branch;
        }
        if let Some(flag) = lookup("READYFLOW_DRY_RUN") {
            self.sync.dry_run = parse_flag(&flag);
        }
        if let Some(flag) = lookup("READYFLOW_ENTERPRISE") {
            self.project.enterprise = parse_flag(&flag);
        }

        self
    }

    /// Apply CLI flag overrides
    pub fn with_cli_overrides(mut self, overrides: CliOverrides) -> Self {
        if let Some(owner) = overrides.owner {
            self.repository.owner = owner;
        }
        if let Some(repo) = overrides.repo {
            self.repository.name = repo;
        }
        if let Some(title) = overrides.project {
            self.project.title = title;
        }
        if let Some(field) = overrides.status_field {
            self.project.status_field = field;
        }
        if let Some(option) = overrides.ready_option {
            self.project.ready_option = option;
        }
        if let Some(branch) = overrides.base_branch {
            self.sync.base_branch = branch;
        }
        if overrides.dry_run {
            self.sync.dry_run = true;
        }
        if overrides.enterprise {
            self.project.enterprise = true;
        }

        self
    }

    /// Load configuration with all overrides applied
    ///
    /// Priority: CLI > env > config file > defaults. An explicit `path`
    /// replaces the default config file location and must exist.
    pub fn load_with_overrides(path: Option<&Path>, overrides: CliOverrides) -> Result<Self> {
        let base = match path {
            Some(path) => Self::load_from_file(path)?,
            None => Self::load()?,
        };

        Ok(base.with_env_overrides().with_cli_overrides(overrides))
    }

    /// Render the configuration in config file form
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))
    }

    /// Check that every value a run depends on is present
    pub fn validate(&self) -> Result<()> {
        let required = [
            ("repository.owner", &self.repository.owner),
            ("repository.name", &self.repository.name),
            ("project.title", &self.project.title),
            ("project.status_field", &self.project.status_field),
            ("project.ready_option", &self.project.ready_option),
            ("sync.base_branch", &self.sync.base_branch),
        ];

        let missing: Vec<&str> = required
            .iter()
            .filter(|(_, value)| value.trim().is_empty())
            .map(|(key, _)| *key)
            .collect();

        if !missing.is_empty() {
            return Err(Error::Config(format!(
                "missing required setting(s): {}",
                missing.join(", ")
            )));
        }

        if self.github.request_timeout.is_zero() {
            return Err(Error::Config(
                "github.request_timeout must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
