//! Status transition state machine for (issue, pull request) pairs
//!
//! A pair is classified in two steps. The board view (is the issue on the
//! board, is it already at the target option) is folded in first; the
//! comment scan is folded in last, right before any write, so the window in
//! which another run could post the same notification stays small.
//!
//! ```text
//!                  +-- not on board -----------------> Unlinked
//!   board view ----+-- status != target --> NeedsTransition -------+
//!                  +-- status == target --> NeedsNotificationOnly -+
//!                                                                  |
//!   comment scan: marker present ----------------> AlreadyNotified |
//!                                                                  v
//!                                                          Done | Failed
//! ```

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// State of one (issue, PR) pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransitionState {
    /// Issue is not attached to the target board
    Unlinked,
    /// A notification for this exact PR is already on the issue
    AlreadyNotified,
    /// Status differs from the target and nobody has notified yet
    NeedsTransition,
    /// Status is already at the target (possibly moved by another PR)
    NeedsNotificationOnly,
    /// Notification posted, status updated when it had to be
    Done,
    /// A write failed; the next run recomputes the pair
    Failed,
}

impl TransitionState {
    /// Classify a pair from its board membership and current status
    pub fn from_board(linked: bool, at_target: bool) -> Self {
        match (linked, at_target) {
            (false, _) => TransitionState::Unlinked,
            (true, true) => TransitionState::NeedsNotificationOnly,
            (true, false) => TransitionState::NeedsTransition,
        }
    }

    /// Fold in the result of the comment scan
    ///
    /// Only pending states are affected; terminal states pass through.
    pub fn with_notification(self, already_notified: bool) -> Self {
        match self {
            TransitionState::NeedsTransition | TransitionState::NeedsNotificationOnly
                if already_notified =>
            {
                TransitionState::AlreadyNotified
            }
            other => other,
        }
    }

    /// Whether no further work happens for the pair
    pub fn is_terminal(&self) -> bool {
        !matches!(
            self,
            TransitionState::NeedsTransition | TransitionState::NeedsNotificationOnly
        )
    }

    /// Whether the board status must be written before notifying
    pub fn requires_status_write(&self) -> bool {
        matches!(self, TransitionState::NeedsTransition)
    }

    /// Get the states reachable from this one
    pub fn valid_transitions(&self) -> &'static [TransitionState] {
        match self {
            TransitionState::NeedsTransition | TransitionState::NeedsNotificationOnly => {
                &[TransitionState::Done, TransitionState::Failed]
            }
            _ => &[],
        }
    }

    /// Check whether moving to `to` is allowed
    pub fn can_transition_to(&self, to: &TransitionState) -> bool {
        self.valid_transitions().contains(to)
    }

    /// Move a pending pair to a terminal state
    pub fn finish(self, to: TransitionState) -> Result<TransitionState> {
        if self.can_transition_to(&to) {
            Ok(to)
        } else {
            Err(Error::InvalidTransition {
                from: self.to_string(),
                to: to.to_string(),
            })
        }
    }

    /// Get a human-readable description
    pub fn description(&self) -> &'static str {
        match self {
            TransitionState::Unlinked => "not linked to the project board",
            TransitionState::AlreadyNotified => "already notified for this pull request",
            TransitionState::NeedsTransition => "needs status update and notification",
            TransitionState::NeedsNotificationOnly => "already at target status, needs notification",
            TransitionState::Done => "done",
            TransitionState::Failed => "failed",
        }
    }
}

impl std::fmt::Display for TransitionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// What happened to one (issue, PR) pair
///
/// In dry-run mode the flags describe the writes that would have been made.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairOutcome {
    /// Final state of the pair
    pub state: TransitionState,
    /// Whether the status was moved to the target option
    pub status_updated: bool,
    /// Whether the notification comment was posted
    pub comment_posted: bool,
}

impl PairOutcome {
    /// Outcome for a pair that ended without any write
    pub fn skipped(state: TransitionState) -> Self {
        Self {
            state,
            status_updated: false,
            comment_posted: false,
        }
    }
}
