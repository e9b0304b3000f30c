use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::lifecycle::ListingStatus;
use super::password::PasswordDigest;

/// Opaque identifier for a registered account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub Uuid);

impl UserId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Opaque identifier for a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ListingId(pub Uuid);

impl ListingId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for ListingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Tenant,
    Owner,
    Admin,
}

impl Role {
    pub const fn label(self) -> &'static str {
        match self {
            Role::Tenant => "tenant",
            Role::Owner => "owner",
            Role::Admin => "admin",
        }
    }

    /// Roles a visitor may pick for themselves at sign-up.
    pub fn self_assignable(raw: &str) -> Option<Self> {
        match raw.trim() {
            "tenant" => Some(Role::Tenant),
            "owner" => Some(Role::Owner),
            _ => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Stored account. Not `Serialize`: responses go through the view types below.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub password: PasswordDigest,
    pub role: Role,
    pub is_active: bool,
    pub phone: Option<String>,
    pub avatar: Option<String>,
    pub favorites: BTreeSet<ListingId>,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn profile_view(&self) -> UserProfileView {
        UserProfileView {
            id: self.id,
            name: self.name.clone(),
            email: self.email.clone(),
            role: self.role,
            is_active: self.is_active,
            phone: self.phone.clone(),
            avatar: self.avatar.clone(),
            favorites: self.favorites.iter().copied().collect(),
            created_at: self.created_at,
        }
    }

    pub fn public_view(&self) -> OwnerPublicView {
        OwnerPublicView {
            id: self.id,
            name: self.name.clone(),
            avatar: self.avatar.clone(),
        }
    }

    pub fn contact_view(&self) -> OwnerContactView {
        OwnerContactView {
            id: self.id,
            name: self.name.clone(),
            email: self.email.clone(),
        }
    }
}

/// The account as its holder sees it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserProfileView {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub is_active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    pub favorites: Vec<ListingId>,
    pub created_at: DateTime<Utc>,
}

/// Owner fields safe to show on the public feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OwnerPublicView {
    pub id: UserId,
    pub name: String,
    pub avatar: Option<String>,
}

/// Owner fields shown to moderators reviewing the pending queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OwnerContactView {
    pub id: UserId,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Listing {
    pub id: ListingId,
    pub title: String,
    pub description: String,
    pub price: f64,
    pub address: String,
    pub size: f64,
    pub images: Vec<String>,
    pub amenities: Vec<String>,
    pub owner: UserId,
    pub status: ListingStatus,
    pub created_at: DateTime<Utc>,
}

impl Listing {
    pub fn from_draft(owner: UserId, draft: ListingDraft, created_at: DateTime<Utc>) -> Self {
        Self {
            id: ListingId::generate(),
            title: draft.title,
            description: draft.description,
            price: draft.price,
            address: draft.address,
            size: draft.size,
            images: draft.images,
            amenities: draft.amenities,
            owner,
            status: ListingStatus::Pending,
            created_at,
        }
    }

    /// Apply field changes. Status is never touched here.
    pub fn apply_changes(&mut self, changes: ListingChanges) {
        if let Some(title) = changes.title {
            self.title = title;
        }
        if let Some(description) = changes.description {
            self.description = description;
        }
        if let Some(price) = changes.price {
            self.price = price;
        }
        if let Some(address) = changes.address {
            self.address = address;
        }
        if let Some(size) = changes.size {
            self.size = size;
        }
        if let Some(images) = changes.images {
            self.images = images;
        }
        if let Some(amenities) = changes.amenities {
            self.amenities = amenities;
        }
    }

    pub fn with_owner<O>(self, owner: Option<O>) -> ListingView<O> {
        ListingView {
            id: self.id,
            title: self.title,
            description: self.description,
            price: self.price,
            address: self.address,
            size: self.size,
            images: self.images,
            amenities: self.amenities,
            status: self.status,
            created_at: self.created_at,
            owner,
        }
    }
}

/// Listing with its owner reference expanded into `O`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListingView<O> {
    pub id: ListingId,
    pub title: String,
    pub description: String,
    pub price: f64,
    pub address: String,
    pub size: f64,
    pub images: Vec<String>,
    pub amenities: Vec<String>,
    pub status: ListingStatus,
    pub created_at: DateTime<Utc>,
    pub owner: Option<O>,
}

pub type PublicListingView = ListingView<OwnerPublicView>;
pub type PendingListingView = ListingView<OwnerContactView>;

/// Validated creation payload.
#[derive(Debug, Clone, PartialEq)]
pub struct ListingDraft {
    pub title: String,
    pub description: String,
    pub price: f64,
    pub address: String,
    pub size: f64,
    pub images: Vec<String>,
    pub amenities: Vec<String>,
}

/// Validated partial update; `None` leaves the field as stored.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListingChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub address: Option<String>,
    pub size: Option<f64>,
    pub images: Option<Vec<String>>,
    pub amenities: Option<Vec<String>>,
}

/// Validated sign-up payload, password still in clear text until hashed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Role,
    pub phone: Option<String>,
    pub avatar: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileChanges {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub avatar: Option<String>,
}

/// Bearer token handed back by register and login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthToken {
    pub token: String,
}
