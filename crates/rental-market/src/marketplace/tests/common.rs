use std::sync::Arc;

use axum::response::Response;
use chrono::Duration;
use serde_json::Value;

use crate::config::AdminSeed;
use crate::marketplace::domain::{Listing, ListingId, Role, User, UserId};
use crate::marketplace::lifecycle::ListingStatus;
use crate::marketplace::policy::Actor;
use crate::marketplace::repository::{ListingRepository, RepositoryError, UserRepository};
use crate::marketplace::store::{InMemoryListingStore, InMemoryUserStore};
use crate::marketplace::token::TokenIssuer;
use crate::marketplace::validation::{ListingInput, NumericInput, RegistrationInput};
use crate::marketplace::{marketplace_router, AuthService, ListingService};

pub(super) type Auth = AuthService<InMemoryUserStore>;
pub(super) type Listings = ListingService<InMemoryListingStore, InMemoryUserStore>;

pub(super) const PASSWORD: &str = "s3cret-pass";

pub(super) struct Harness {
    pub(super) auth: Arc<Auth>,
    pub(super) listings: Arc<Listings>,
    pub(super) users: Arc<InMemoryUserStore>,
}

pub(super) fn token_issuer() -> TokenIssuer {
    TokenIssuer::new(b"marketplace-test-secret", Duration::hours(5))
}

pub(super) fn build_services() -> Harness {
    let users = Arc::new(InMemoryUserStore::default());
    let listings = Arc::new(InMemoryListingStore::default());
    Harness {
        auth: Arc::new(AuthService::new(users.clone(), token_issuer())),
        listings: Arc::new(ListingService::new(listings, users.clone())),
        users,
    }
}

impl Harness {
    pub(super) fn router(&self) -> axum::Router {
        marketplace_router(self.auth.clone(), self.listings.clone())
    }

    /// Register through the public flow and return the caller its token resolves to.
    pub(super) fn register(&self, name: &str, email: &str, role: Role) -> (Actor, String) {
        let token = self
            .auth
            .register(registration(name, email, role.label()))
            .expect("registration succeeds");
        let actor = self
            .auth
            .authenticate(&token.token)
            .expect("fresh token verifies");
        (actor, token.token)
    }

    pub(super) fn admin(&self) -> (Actor, String) {
        let admin = self
            .auth
            .seed_admin(&AdminSeed {
                name: "Moderator".to_string(),
                email: "admin@example.com".to_string(),
                password: PASSWORD.to_string(),
            })
            .expect("admin provisioned");
        let token = self.auth.tokens().issue(&admin).expect("token signs");
        (Actor::new(admin.id, Role::Admin), token.token)
    }

    pub(super) fn approved_listing(&self, owner: &Actor, admin: &Actor) -> Listing {
        let listing = self
            .listings
            .create(owner, listing_input())
            .expect("listing created");
        self.listings
            .approve(admin, &listing.id)
            .expect("listing approved")
    }
}

pub(super) fn registration(name: &str, email: &str, role: &str) -> RegistrationInput {
    RegistrationInput {
        name: Some(name.to_string()),
        email: Some(email.to_string()),
        password: Some(PASSWORD.to_string()),
        role: Some(role.to_string()),
        phone: Some("+33 6 12 34 56 78".to_string()),
        avatar: Some("https://cdn.example.com/avatars/1.png".to_string()),
    }
}

pub(super) fn listing_input() -> ListingInput {
    ListingInput {
        title: Some("Sunny two-bedroom near the park".to_string()),
        description: Some("Renovated kitchen, south facing balcony.".to_string()),
        address: Some("12 Rue des Lilas, Lyon".to_string()),
        price: Some(NumericInput::Number(1150.0)),
        size: Some(NumericInput::Number(64.5)),
        images: Some(vec!["https://cdn.example.com/listings/1.jpg".to_string()]),
        amenities: Some(vec!["balcony".to_string(), "elevator".to_string()]),
    }
}

/// Listing store whose backing database is gone.
pub(super) struct UnavailableListings;

impl ListingRepository for UnavailableListings {
    fn insert(&self, _listing: Listing) -> Result<Listing, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn modify<T, E, F>(&self, _id: &ListingId, _change: F) -> Result<T, E>
    where
        E: From<RepositoryError>,
        F: FnOnce(&mut Listing) -> Result<T, E>,
    {
        Err(RepositoryError::Unavailable("database offline".to_string()).into())
    }

    fn fetch(&self, _id: &ListingId) -> Result<Option<Listing>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn delete(&self, _id: &ListingId) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn with_status(&self, _status: ListingStatus) -> Result<Vec<Listing>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn owned_by(&self, _owner: &UserId) -> Result<Vec<Listing>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

/// Listing store where another writer's change lands just before each of ours.
pub(super) struct InterleavedListings {
    pub(super) inner: InMemoryListingStore,
    pub(super) interleave: fn(&mut Listing),
}

impl ListingRepository for InterleavedListings {
    fn insert(&self, listing: Listing) -> Result<Listing, RepositoryError> {
        self.inner.insert(listing)
    }

    fn modify<T, E, F>(&self, id: &ListingId, change: F) -> Result<T, E>
    where
        E: From<RepositoryError>,
        F: FnOnce(&mut Listing) -> Result<T, E>,
    {
        self.inner.modify(id, |listing| {
            (self.interleave)(listing);
            Ok::<_, RepositoryError>(())
        })?;
        self.inner.modify(id, change)
    }

    fn fetch(&self, id: &ListingId) -> Result<Option<Listing>, RepositoryError> {
        self.inner.fetch(id)
    }

    fn delete(&self, id: &ListingId) -> Result<(), RepositoryError> {
        self.inner.delete(id)
    }

    fn with_status(&self, status: ListingStatus) -> Result<Vec<Listing>, RepositoryError> {
        self.inner.with_status(status)
    }

    fn owned_by(&self, owner: &UserId) -> Result<Vec<Listing>, RepositoryError> {
        self.inner.owned_by(owner)
    }
}

/// User store where another writer's change lands just before each of ours.
pub(super) struct InterleavedUsers {
    pub(super) inner: InMemoryUserStore,
    pub(super) interleave: fn(&mut User),
}

impl UserRepository for InterleavedUsers {
    fn insert(&self, user: User) -> Result<User, RepositoryError> {
        self.inner.insert(user)
    }

    fn modify<T, E, F>(&self, id: &UserId, change: F) -> Result<T, E>
    where
        E: From<RepositoryError>,
        F: FnOnce(&mut User) -> Result<T, E>,
    {
        self.inner.modify(id, |user| {
            (self.interleave)(user);
            Ok::<_, RepositoryError>(())
        })?;
        self.inner.modify(id, change)
    }

    fn fetch(&self, id: &UserId) -> Result<Option<User>, RepositoryError> {
        self.inner.fetch(id)
    }

    fn find_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError> {
        self.inner.find_by_email(email)
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
