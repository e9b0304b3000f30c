use std::fmt;

use serde::{Deserialize, Serialize};

/// Moderation state of a listing. Only approved listings reach the public feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListingStatus {
    Pending,
    Approved,
    Rejected,
}

/// Admin verdict on a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModerationDecision {
    Approve,
    Reject,
}

/// Result of applying a decision to a status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Moved {
        from: ListingStatus,
        to: ListingStatus,
    },
    /// The listing already carried the requested verdict.
    Unchanged(ListingStatus),
}

impl Transition {
    pub const fn status(self) -> ListingStatus {
        match self {
            Transition::Moved { to, .. } => to,
            Transition::Unchanged(status) => status,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("listing cannot move from {from} to {to}")]
pub struct InvalidTransition {
    pub from: ListingStatus,
    pub to: ListingStatus,
}

impl ListingStatus {
    pub const fn label(self) -> &'static str {
        match self {
            ListingStatus::Pending => "pending",
            ListingStatus::Approved => "approved",
            ListingStatus::Rejected => "rejected",
        }
    }

    pub const fn is_public(self) -> bool {
        matches!(self, ListingStatus::Approved)
    }

    /// Pending listings take either verdict; a verdict is final once given.
    pub fn apply(self, decision: ModerationDecision) -> Result<Transition, InvalidTransition> {
        let target = decision.target();
        match self {
            ListingStatus::Pending => Ok(Transition::Moved {
                from: self,
                to: target,
            }),
            current if current == target => Ok(Transition::Unchanged(current)),
            current => Err(InvalidTransition {
                from: current,
                to: target,
            }),
        }
    }
}

impl fmt::Display for ListingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl ModerationDecision {
    pub const fn target(self) -> ListingStatus {
        match self {
            ModerationDecision::Approve => ListingStatus::Approved,
            ModerationDecision::Reject => ListingStatus::Rejected,
        }
    }
}
