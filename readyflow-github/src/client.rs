//! GraphQL client for the GitHub API

use async_trait::async_trait;
use readyflow_core::{GitHubConfig, Secrets};
use reqwest::StatusCode;
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::graphql::GraphQLResponse;
use crate::transport::{operation_name, Transport};
use crate::{Error, Result};

/// GitHub GraphQL client
///
/// Every request is bounded by the configured timeout. Nothing is retried
/// here; a timeout surfaces as a transport error like any other network
/// failure.
pub struct GitHubClient {
    http: reqwest::Client,
    endpoint: url::Url,
    token: String,
}

impl GitHubClient {
    /// Create a client with an explicit token
    pub fn new(config: &GitHubConfig, token: impl Into<String>) -> Result<Self> {
        let endpoint = url::Url::parse(&config.api_endpoint).map_err(|e| {
            Error::Core(readyflow_core::Error::Config(format!(
                "Invalid GitHub API endpoint '{}': {}",
                config.api_endpoint, e
            )))
        })?;

        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .user_agent(concat!("readyflow/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::Transport(format!("Failed to create HTTP client: {}", e)))?;

        info!(endpoint = %endpoint, timeout = ?config.request_timeout, "Created GitHub client");

        Ok(Self {
            http,
            endpoint,
            token: token.into(),
        })
    }

    /// Create a client using the token from the environment or secrets file
    ///
    /// Token is loaded from (in priority order):
    /// 1. GITHUB_TOKEN environment variable
    /// 2. ~/.config/readyflow/secrets.toml
    pub fn from_secrets(config: &GitHubConfig) -> Result<Self> {
        let secrets = Secrets::load()?;

        let token = secrets.github_token().ok_or_else(|| {
            Error::Auth(
                "GitHub token not found. Set GITHUB_TOKEN environment variable \
                 or add token to ~/.config/readyflow/secrets.toml"
                    .to_string(),
            )
        })?;

        Self::new(config, token)
    }

    /// Get the GraphQL endpoint
    pub fn endpoint(&self) -> &url::Url {
        &self.endpoint
    }
}

#[async_trait]
impl Transport for GitHubClient {
    async fn execute(&self, document: &str, variables: Value) -> Result<Value> {
        let operation = operation_name(document);
        debug!(operation, "Executing GraphQL operation");

        let request_body = json!({
            "query": document,
            "variables": variables,
        });

        let response = self
            .http
            .post(self.endpoint.clone())
            .bearer_auth(&self.token)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    Error::Transport(format!("{} timed out: {}", operation, e))
                } else {
                    Error::Transport(format!("{} request failed: {}", operation, e))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let rate_limit_reset = rate_limit_reset(&response);
            let text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read response".to_string());

            return Err(match (status, rate_limit_reset) {
                (StatusCode::UNAUTHORIZED, _) => {
                    Error::Auth(format!("Invalid GitHub token: {}", text))
                }
                (StatusCode::FORBIDDEN | StatusCode::TOO_MANY_REQUESTS, Some(reset)) => {
                    Error::RateLimited(reset)
                }
                _ => Error::Transport(format!(
                    "{} failed with status {}: {}",
                    operation, status, text
                )),
            });
        }

        let graphql_response: GraphQLResponse = response
            .json()
            .await
            .map_err(|e| Error::Parse(format!("Failed to parse GraphQL response: {}", e)))?;

        graphql_response.into_data()
    }
}

/// Reset time when the response says the rate limit is exhausted
fn rate_limit_reset(response: &reqwest::Response) -> Option<String> {
    let headers = response.headers();
    let remaining = headers.get("x-ratelimit-remaining")?.to_str().ok()?;
    if remaining != "0" {
        return None;
    }

    Some(
        headers
            .get("x-ratelimit-reset")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("unknown")
            .to_string(),
    )
}

impl std::fmt::Debug for GitHubClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubClient")
            .field("endpoint", &self.endpoint.as_str())
            .finish_non_exhaustive()
    }
}
