//! Notification markers embedded in issue comments
//!
//! Every notification comment carries an HTML comment block identifying the
//! pull request that triggered it:
//!
//! ```markdown
//! <!-- readyflow:notified pr=42 url=https://github.com/acme/widgets/pull/42 -->
//! ```
//!
//! The block is invisible when GitHub renders the comment. Its presence on an
//! issue is the only record that a (issue, PR) pair has been handled, so the
//! token must be a pure function of the PR number and URL.

use std::fmt;

const MARKER_PREFIX: &str = "<!-- readyflow:notified";
const MARKER_SUFFIX: &str = "-->";

/// Deterministic marker for one triggering pull request
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NotificationMarker {
    token: String,
}

impl NotificationMarker {
    /// Build the marker for a pull request
    pub fn for_pr(number: u64, url: &str) -> Self {
        Self {
            token: format!("{MARKER_PREFIX} pr={number} url={} {MARKER_SUFFIX}", url.trim()),
        }
    }

    /// The exact text searched for in comment bodies
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Whether a comment body already carries this marker
    ///
    /// Only the full token counts. Prose such as "triggered by PR #42" or a
    /// marker for a different PR never matches.
    pub fn is_present_in(&self, body: &str) -> bool {
        body.contains(&self.token)
    }

    /// Render the notification comment for this marker
    pub fn comment_body(&self, notice: &str, pr_number: u64, pr_url: &str) -> String {
        format!(
            "{} (triggered by [PR #{}]({}))\n\n{}",
            notice.trim(),
            pr_number,
            pr_url.trim(),
            self.token
        )
    }
}

impl fmt::Display for NotificationMarker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.token)
    }
}
