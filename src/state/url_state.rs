//! Per-URL fetch state definitions
//!
//! Every URL walks `Pending -> Fetching -> (Success | Retrying -> Fetching | Failed)`.
//! `Skipped` covers pages the server reports as permanently gone. A stop
//! requested during a backoff wait moves `Retrying` straight to `Failed`.

use crate::HarvestError;
use std::fmt;

/// Represents where a single URL is in its fetch lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UrlState {
    // ===== Active States =====
    /// Selected from the frontier, not yet requested
    Pending,

    /// A request is in flight
    Fetching,

    /// The last attempt failed and a backoff wait is in progress
    Retrying,

    // ===== Terminal States =====
    /// The page body was fetched
    Success,

    /// The server says the page does not exist (404/410)
    Skipped,

    /// Every allowed attempt failed
    Failed,
}

impl UrlState {
    /// Returns true if no further transitions are allowed
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Success | Self::Skipped | Self::Failed)
    }

    /// Returns true if `next` is a legal successor of this state
    pub fn can_transition_to(&self, next: UrlState) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Fetching)
                | (Self::Fetching, Self::Success)
                | (Self::Fetching, Self::Retrying)
                | (Self::Fetching, Self::Skipped)
                | (Self::Fetching, Self::Failed)
                | (Self::Retrying, Self::Fetching)
                | (Self::Retrying, Self::Failed)
        )
    }

    /// Moves to `next`, rejecting illegal transitions
    pub fn transition(self, next: UrlState) -> Result<UrlState, HarvestError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(HarvestError::InvalidTransition {
                from: self,
                to: next,
            })
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Fetching => "fetching",
            Self::Retrying => "retrying",
            Self::Success => "success",
            Self::Skipped => "skipped",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for UrlState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
