use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use super::auth::{account_gone, load_user};
use super::domain::{
    Listing, ListingId, PendingListingView, PublicListingView, Role, User, UserId,
    UserProfileView,
};
use super::error::MarketplaceError;
use super::lifecycle::{ListingStatus, ModerationDecision, Transition};
use super::policy::{authorize, Actor, Decision, ListingAction};
use super::repository::{ListingRepository, RepositoryError, UserRepository};
use super::validation::{validate_listing, validate_listing_changes, ListingInput};

const LISTING_NOT_FOUND: &str = "Listing not found";

/// Listing CRUD, moderation, and the read models built on top of them.
pub struct ListingService<L, U> {
    listings: Arc<L>,
    users: Arc<U>,
}

fn permit(actor: Option<&Actor>, action: ListingAction<'_>) -> Result<(), MarketplaceError> {
    match authorize(actor, action) {
        Decision::Allow => Ok(()),
        Decision::Deny(denial) => {
            warn!(
                actor = ?actor.map(|actor| actor.id),
                ?action,
                ?denial,
                "listing action denied"
            );
            Err(denial.into())
        }
    }
}

impl<L, U> ListingService<L, U>
where
    L: ListingRepository + 'static,
    U: UserRepository + 'static,
{
    pub fn new(listings: Arc<L>, users: Arc<U>) -> Self {
        Self { listings, users }
    }

    /// The token must carry the owner role and the stored account must still be an active owner.
    pub fn ensure_can_create(&self, actor: &Actor) -> Result<User, MarketplaceError> {
        permit(Some(actor), ListingAction::Create)?;

        let owner = load_user(self.users.as_ref(), actor)?;
        if owner.role != Role::Owner || !owner.is_active {
            warn!(user_id = %owner.id, "stored account may not publish listings");
            return Err(MarketplaceError::Forbidden);
        }
        Ok(owner)
    }

    /// New listings always enter the moderation queue as pending.
    pub fn create(&self, actor: &Actor, input: ListingInput) -> Result<Listing, MarketplaceError> {
        let owner = self.ensure_can_create(actor)?;

        let draft = validate_listing(input)?;
        let listing = self
            .listings
            .insert(Listing::from_draft(owner.id, draft, Utc::now()))?;
        info!(listing_id = %listing.id, owner = %owner.id, "listing submitted for review");
        Ok(listing)
    }

    /// The caller must be the listing's owner or an admin.
    pub fn ensure_can_update(
        &self,
        actor: &Actor,
        id: &ListingId,
    ) -> Result<Listing, MarketplaceError> {
        let listing = self.require(id)?;
        permit(Some(actor), ListingAction::Update(&listing))?;
        Ok(listing)
    }

    /// Only the submitted fields change; the moderation state is whatever the store holds.
    pub fn update(
        &self,
        actor: &Actor,
        id: &ListingId,
        input: ListingInput,
    ) -> Result<Listing, MarketplaceError> {
        self.ensure_can_update(actor, id)?;

        let changes = validate_listing_changes(input)?;
        let listing = self
            .listings
            .modify(id, |listing| -> Result<Listing, MarketplaceError> {
                listing.apply_changes(changes);
                Ok(listing.clone())
            })
            .map_err(listing_gone)?;
        info!(listing_id = %listing.id, actor = %actor.id, "listing updated");
        Ok(listing)
    }

    pub fn delete(&self, actor: &Actor, id: &ListingId) -> Result<(), MarketplaceError> {
        let listing = self.require(id)?;
        permit(Some(actor), ListingAction::Delete(&listing))?;

        self.listings
            .delete(id)
            .map_err(|err| listing_gone(err.into()))?;
        info!(listing_id = %id, actor = %actor.id, "listing deleted");
        Ok(())
    }

    pub fn approve(&self, actor: &Actor, id: &ListingId) -> Result<Listing, MarketplaceError> {
        self.moderate(actor, id, ModerationDecision::Approve)
    }

    pub fn reject(&self, actor: &Actor, id: &ListingId) -> Result<Listing, MarketplaceError> {
        self.moderate(actor, id, ModerationDecision::Reject)
    }

    /// Repeating the verdict a listing already carries returns it untouched.
    pub fn moderate(
        &self,
        actor: &Actor,
        id: &ListingId,
        decision: ModerationDecision,
    ) -> Result<Listing, MarketplaceError> {
        permit(Some(actor), ListingAction::Moderate)?;

        let (listing, transition) = self
            .listings
            .modify(id, |listing| -> Result<_, MarketplaceError> {
                let transition = listing.status.apply(decision)?;
                if let Transition::Moved { to, .. } = transition {
                    listing.status = to;
                }
                Ok((listing.clone(), transition))
            })
            .map_err(listing_gone)?;

        if let Transition::Moved { from, to } = transition {
            info!(listing_id = %listing.id, %from, %to, admin = %actor.id, "listing moderated");
        }
        Ok(listing)
    }

    /// Approved listings with the owner's public fields only.
    pub fn list_public(&self) -> Result<Vec<PublicListingView>, MarketplaceError> {
        permit(None, ListingAction::ReadPublicFeed)?;

        let listings = self.listings.with_status(ListingStatus::Approved)?;
        let owners = self.owners_of(&listings)?;
        Ok(listings
            .into_iter()
            .map(|listing| {
                let owner = owners.get(&listing.owner).map(User::public_view);
                listing.with_owner(owner)
            })
            .collect())
    }

    /// Pending queue with owner contact details for moderators.
    pub fn list_pending(&self, actor: &Actor) -> Result<Vec<PendingListingView>, MarketplaceError> {
        permit(Some(actor), ListingAction::ReadPendingQueue)?;

        let listings = self.listings.with_status(ListingStatus::Pending)?;
        let owners = self.owners_of(&listings)?;
        Ok(listings
            .into_iter()
            .map(|listing| {
                let owner = owners.get(&listing.owner).map(User::contact_view);
                listing.with_owner(owner)
            })
            .collect())
    }

    /// Listings that are not yet public read as missing to anyone but their owner and admins.
    pub fn get(
        &self,
        actor: Option<&Actor>,
        id: &ListingId,
    ) -> Result<PublicListingView, MarketplaceError> {
        let listing = self.require(id)?;
        if !authorize(actor, ListingAction::ReadListing(&listing)).is_allowed() {
            return Err(MarketplaceError::NotFound(LISTING_NOT_FOUND));
        }

        let owner = self.users.fetch(&listing.owner)?.map(|user| user.public_view());
        Ok(listing.with_owner(owner))
    }

    /// Everything the caller owns, whatever its moderation state.
    pub fn list_own(&self, actor: &Actor) -> Result<Vec<Listing>, MarketplaceError> {
        permit(Some(actor), ListingAction::ListOwn)?;
        Ok(self.listings.owned_by(&actor.id)?)
    }

    /// Favorites that still exist and are still public.
    pub fn favorites(&self, actor: &Actor) -> Result<Vec<PublicListingView>, MarketplaceError> {
        let user = load_user(self.users.as_ref(), actor)?;

        let mut listings = Vec::with_capacity(user.favorites.len());
        for id in &user.favorites {
            if let Some(listing) = self.listings.fetch(id)? {
                if listing.status.is_public() {
                    listings.push(listing);
                }
            }
        }

        let owners = self.owners_of(&listings)?;
        Ok(listings
            .into_iter()
            .map(|listing| {
                let owner = owners.get(&listing.owner).map(User::public_view);
                listing.with_owner(owner)
            })
            .collect())
    }

    pub fn add_favorite(
        &self,
        actor: &Actor,
        id: &ListingId,
    ) -> Result<UserProfileView, MarketplaceError> {
        let listing = self.require(id)?;
        if !listing.status.is_public() {
            return Err(MarketplaceError::NotFound(LISTING_NOT_FOUND));
        }

        self.users
            .modify(&actor.id, |user| -> Result<_, MarketplaceError> {
                user.favorites.insert(listing.id);
                Ok(user.profile_view())
            })
            .map_err(account_gone)
    }

    pub fn remove_favorite(
        &self,
        actor: &Actor,
        id: &ListingId,
    ) -> Result<UserProfileView, MarketplaceError> {
        self.users
            .modify(&actor.id, |user| -> Result<_, MarketplaceError> {
                user.favorites.remove(id);
                Ok(user.profile_view())
            })
            .map_err(account_gone)
    }

    fn require(&self, id: &ListingId) -> Result<Listing, MarketplaceError> {
        self.listings
            .fetch(id)?
            .ok_or(MarketplaceError::NotFound(LISTING_NOT_FOUND))
    }

    fn owners_of(&self, listings: &[Listing]) -> Result<HashMap<UserId, User>, MarketplaceError> {
        let mut owners = HashMap::new();
        for listing in listings {
            if owners.contains_key(&listing.owner) {
                continue;
            }
            if let Some(owner) = self.users.fetch(&listing.owner)? {
                owners.insert(owner.id, owner);
            }
        }
        Ok(owners)
    }
}

/// A listing removed between load and write reads as missing, not as a server fault.
fn listing_gone(err: MarketplaceError) -> MarketplaceError {
    match err {
        MarketplaceError::Repository(RepositoryError::NotFound) => {
            MarketplaceError::NotFound(LISTING_NOT_FOUND)
        }
        other => other,
    }
}
