//! Role-based access rules for listings and accounts.
//!
//! Pure decisions only: no store access, no logging. Callers load whatever resource the action
//! needs and surface a [`Denial`] as an error.

use serde::{Deserialize, Serialize};

use super::domain::{Listing, Role, UserId};

/// Caller identity recovered from a bearer token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: UserId,
    pub role: Role,
}

impl Actor {
    pub const fn new(id: UserId, role: Role) -> Self {
        Self { id, role }
    }

    pub const fn is_admin(&self) -> bool {
        matches!(self.role, Role::Admin)
    }

    fn owns(&self, listing: &Listing) -> bool {
        listing.owner == self.id
    }
}

#[derive(Debug, Clone, Copy)]
pub enum ListingAction<'a> {
    Create,
    Update(&'a Listing),
    Delete(&'a Listing),
    Moderate,
    ReadPublicFeed,
    ReadPendingQueue,
    ReadListing(&'a Listing),
    ListOwn,
    ManageUsers,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Denial {
    /// The action needs a caller and none was presented.
    Unauthenticated,
    /// The caller is known but lacks the privilege.
    Forbidden,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(Denial),
}

impl Decision {
    pub const fn is_allowed(self) -> bool {
        matches!(self, Decision::Allow)
    }

    pub fn into_result(self) -> Result<(), Denial> {
        match self {
            Decision::Allow => Ok(()),
            Decision::Deny(denial) => Err(denial),
        }
    }

    const fn from_rule(allowed: bool) -> Self {
        if allowed {
            Decision::Allow
        } else {
            Decision::Deny(Denial::Forbidden)
        }
    }
}

pub fn authorize(actor: Option<&Actor>, action: ListingAction<'_>) -> Decision {
    match (action, actor) {
        (ListingAction::ReadPublicFeed, _) => Decision::Allow,
        (ListingAction::ReadListing(listing), _) if listing.status.is_public() => Decision::Allow,
        (_, None) => Decision::Deny(Denial::Unauthenticated),
        (ListingAction::Create, Some(actor)) => Decision::from_rule(actor.role == Role::Owner),
        (
            ListingAction::Update(listing)
            | ListingAction::Delete(listing)
            | ListingAction::ReadListing(listing),
            Some(actor),
        ) => Decision::from_rule(actor.owns(listing) || actor.is_admin()),
        (
            ListingAction::Moderate | ListingAction::ReadPendingQueue | ListingAction::ManageUsers,
            Some(actor),
        ) => Decision::from_rule(actor.is_admin()),
        (ListingAction::ListOwn, Some(_)) => Decision::Allow,
    }
}
