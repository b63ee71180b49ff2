//! Run summary reported at the end of a sync

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{PairOutcome, Result, TransitionState};

/// Pairs skipped, by reason
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkipCounts {
    /// Issue not on the target board
    pub unlinked: usize,
    /// Notification for the PR already present
    pub already_notified: usize,
    /// Reference that could not be resolved to an issue
    pub unresolved_reference: usize,
}

/// Counts for one sync run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    /// Whether writes were suppressed
    pub dry_run: bool,
    /// Merged pull requests examined
    pub prs_scanned: usize,
    /// Issues moved to the target status
    pub issues_transitioned: usize,
    /// Notification comments posted
    pub comments_posted: usize,
    /// Skipped pairs and references
    pub skipped: SkipCounts,
    /// Pairs whose processing failed
    pub failures: usize,
    /// Reason the run stopped before finishing, if it did
    pub aborted: Option<String>,
}

impl Summary {
    /// Create an empty summary
    pub fn new(dry_run: bool) -> Self {
        Self {
            dry_run,
            ..Default::default()
        }
    }

    /// Count the outcome of one (issue, PR) pair
    pub fn record(&mut self, outcome: &PairOutcome) {
        if outcome.status_updated {
            self.issues_transitioned += 1;
        }
        if outcome.comment_posted {
            self.comments_posted += 1;
        }

        match outcome.state {
            TransitionState::Unlinked => self.skipped.unlinked += 1,
            TransitionState::AlreadyNotified => self.skipped.already_notified += 1,
            TransitionState::Failed => self.failures += 1,
            TransitionState::Done
            | TransitionState::NeedsTransition
            | TransitionState::NeedsNotificationOnly => {}
        }
    }

    /// Count references dropped because they did not resolve
    pub fn record_unresolved(&mut self, count: usize) {
        self.skipped.unresolved_reference += count;
    }

    /// Count a pair that failed before reaching a state
    pub fn record_failure(&mut self) {
        self.failures += 1;
    }

    /// Mark the run as stopped early
    pub fn abort(&mut self, reason: impl Into<String>) {
        self.aborted = Some(reason.into());
    }

    /// Whether the run completed all of its work
    ///
    /// Per-pair failures do not count against this.
    pub fn is_complete(&self) -> bool {
        self.aborted.is_none()
    }

    /// Serialize the summary for machine consumption
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.dry_run {
            writeln!(f, "Sync summary (dry run, no changes written)")?;
        } else {
            writeln!(f, "Sync summary")?;
        }
        writeln!(f, "  PRs scanned:          {}", self.prs_scanned)?;
        writeln!(f, "  Issues transitioned:  {}", self.issues_transitioned)?;
        writeln!(f, "  Comments posted:      {}", self.comments_posted)?;
        writeln!(f, "  Skipped (unlinked):   {}", self.skipped.unlinked)?;
        writeln!(f, "  Skipped (notified):   {}", self.skipped.already_notified)?;
        writeln!(f, "  Skipped (unresolved): {}", self.skipped.unresolved_reference)?;
        write!(f, "  Failures:             {}", self.failures)?;
        if let Some(ref reason) = self.aborted {
            write!(f, "\n  Aborted:              {}", reason)?;
        }
        Ok(())
    }
}
