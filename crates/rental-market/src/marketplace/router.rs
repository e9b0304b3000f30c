use std::sync::Arc;

use axum::{
    async_trait,
    extract::{rejection::JsonRejection, FromRequestParts, Path, State},
    http::{header, request::Parts, HeaderMap},
    routing::{get, post, put},
    Json, Router,
};
use serde_json::{json, Value};
use uuid::Uuid;

use super::auth::AuthService;
use super::domain::{
    AuthToken, Listing, ListingId, PendingListingView, PublicListingView, UserId,
    UserProfileView,
};
use super::error::MarketplaceError;
use super::listings::ListingService;
use super::policy::Actor;
use super::repository::{ListingRepository, UserRepository};
use super::validation::{
    ListingInput, LoginInput, ProfileInput, RegistrationInput, ValidationErrors,
};

/// Services shared by every marketplace handler.
pub struct MarketplaceState<L, U> {
    pub auth: Arc<AuthService<U>>,
    pub listings: Arc<ListingService<L, U>>,
}

impl<L, U> Clone for MarketplaceState<L, U> {
    fn clone(&self) -> Self {
        Self {
            auth: Arc::clone(&self.auth),
            listings: Arc::clone(&self.listings),
        }
    }
}

/// Caller proven by a valid `Authorization: Bearer` header.
#[derive(Debug, Clone, Copy)]
pub struct Authenticated(pub Actor);

#[async_trait]
impl<L, U> FromRequestParts<MarketplaceState<L, U>> for Authenticated
where
    L: ListingRepository + 'static,
    U: UserRepository + 'static,
{
    type Rejection = MarketplaceError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &MarketplaceState<L, U>,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers).ok_or(MarketplaceError::Unauthenticated)?;
        state.auth.authenticate(token).map(Authenticated)
    }
}

pub(crate) fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let token = headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")?
        .trim();
    (!token.is_empty()).then_some(token)
}

/// Router builder exposing the account and listing endpoints.
pub fn marketplace_router<L, U>(
    auth: Arc<AuthService<U>>,
    listings: Arc<ListingService<L, U>>,
) -> Router
where
    L: ListingRepository + 'static,
    U: UserRepository + 'static,
{
    Router::new()
        .route("/api/auth/register", post(register_handler::<L, U>))
        .route("/api/auth/login", post(login_handler::<L, U>))
        .route(
            "/api/auth/me",
            get(profile_handler::<L, U>).put(update_profile_handler::<L, U>),
        )
        .route("/api/auth/me/favorites", get(favorites_handler::<L, U>))
        .route(
            "/api/auth/me/favorites/:id",
            put(add_favorite_handler::<L, U>).delete(remove_favorite_handler::<L, U>),
        )
        .route(
            "/api/auth/admin/deactivate/:id",
            put(deactivate_handler::<L, U>),
        )
        .route(
            "/api/listings",
            get(public_feed_handler::<L, U>).post(create_handler::<L, U>),
        )
        .route("/api/listings/mine", get(own_listings_handler::<L, U>))
        .route(
            "/api/listings/admin/pending",
            get(pending_queue_handler::<L, U>),
        )
        .route(
            "/api/listings/admin/approve/:id",
            put(approve_handler::<L, U>),
        )
        .route("/api/listings/admin/reject/:id", put(reject_handler::<L, U>))
        .route(
            "/api/listings/:id",
            get(listing_handler::<L, U>)
                .put(update_handler::<L, U>)
                .delete(delete_handler::<L, U>),
        )
        .with_state(MarketplaceState { auth, listings })
}

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, MarketplaceError> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| ValidationErrors::single("body", rejection.body_text()).into())
}

fn listing_id(raw: &str) -> Result<ListingId, MarketplaceError> {
    Uuid::parse_str(raw)
        .map(ListingId)
        .map_err(|_| MarketplaceError::NotFound("Listing not found"))
}

fn user_id(raw: &str) -> Result<UserId, MarketplaceError> {
    Uuid::parse_str(raw)
        .map(UserId)
        .map_err(|_| MarketplaceError::NotFound("User not found"))
}

pub(crate) async fn register_handler<L, U>(
    State(state): State<MarketplaceState<L, U>>,
    payload: Result<Json<RegistrationInput>, JsonRejection>,
) -> Result<Json<AuthToken>, MarketplaceError>
where
    L: ListingRepository + 'static,
    U: UserRepository + 'static,
{
    state.auth.register(body(payload)?).map(Json)
}

pub(crate) async fn login_handler<L, U>(
    State(state): State<MarketplaceState<L, U>>,
    payload: Result<Json<LoginInput>, JsonRejection>,
) -> Result<Json<AuthToken>, MarketplaceError>
where
    L: ListingRepository + 'static,
    U: UserRepository + 'static,
{
    state.auth.login(body(payload)?).map(Json)
}

pub(crate) async fn profile_handler<L, U>(
    State(state): State<MarketplaceState<L, U>>,
    Authenticated(actor): Authenticated,
) -> Result<Json<UserProfileView>, MarketplaceError>
where
    L: ListingRepository + 'static,
    U: UserRepository + 'static,
{
    state.auth.profile(&actor).map(Json)
}

pub(crate) async fn update_profile_handler<L, U>(
    State(state): State<MarketplaceState<L, U>>,
    Authenticated(actor): Authenticated,
    payload: Result<Json<ProfileInput>, JsonRejection>,
) -> Result<Json<UserProfileView>, MarketplaceError>
where
    L: ListingRepository + 'static,
    U: UserRepository + 'static,
{
    state.auth.update_profile(&actor, body(payload)?).map(Json)
}

pub(crate) async fn favorites_handler<L, U>(
    State(state): State<MarketplaceState<L, U>>,
    Authenticated(actor): Authenticated,
) -> Result<Json<Vec<PublicListingView>>, MarketplaceError>
where
    L: ListingRepository + 'static,
    U: UserRepository + 'static,
{
    state.listings.favorites(&actor).map(Json)
}

pub(crate) async fn add_favorite_handler<L, U>(
    State(state): State<MarketplaceState<L, U>>,
    Authenticated(actor): Authenticated,
    Path(id): Path<String>,
) -> Result<Json<UserProfileView>, MarketplaceError>
where
    L: ListingRepository + 'static,
    U: UserRepository + 'static,
{
    state.listings.add_favorite(&actor, &listing_id(&id)?).map(Json)
}

pub(crate) async fn remove_favorite_handler<L, U>(
    State(state): State<MarketplaceState<L, U>>,
    Authenticated(actor): Authenticated,
    Path(id): Path<String>,
) -> Result<Json<UserProfileView>, MarketplaceError>
where
    L: ListingRepository + 'static,
    U: UserRepository + 'static,
{
    state.listings.remove_favorite(&actor, &listing_id(&id)?).map(Json)
}

pub(crate) async fn deactivate_handler<L, U>(
    State(state): State<MarketplaceState<L, U>>,
    Authenticated(actor): Authenticated,
    Path(id): Path<String>,
) -> Result<Json<UserProfileView>, MarketplaceError>
where
    L: ListingRepository + 'static,
    U: UserRepository + 'static,
{
    state.auth.deactivate(&actor, &user_id(&id)?).map(Json)
}

pub(crate) async fn public_feed_handler<L, U>(
    State(state): State<MarketplaceState<L, U>>,
) -> Result<Json<Vec<PublicListingView>>, MarketplaceError>
where
    L: ListingRepository + 'static,
    U: UserRepository + 'static,
{
    state.listings.list_public().map(Json)
}

pub(crate) async fn create_handler<L, U>(
    State(state): State<MarketplaceState<L, U>>,
    Authenticated(actor): Authenticated,
    payload: Result<Json<ListingInput>, JsonRejection>,
) -> Result<Json<Listing>, MarketplaceError>
where
    L: ListingRepository + 'static,
    U: UserRepository + 'static,
{
    // Callers who may not publish are turned away before their payload is looked at.
    if payload.is_err() {
        state.listings.ensure_can_create(&actor)?;
    }
    state.listings.create(&actor, body(payload)?).map(Json)
}

pub(crate) async fn own_listings_handler<L, U>(
    State(state): State<MarketplaceState<L, U>>,
    Authenticated(actor): Authenticated,
) -> Result<Json<Vec<Listing>>, MarketplaceError>
where
    L: ListingRepository + 'static,
    U: UserRepository + 'static,
{
    state.listings.list_own(&actor).map(Json)
}

pub(crate) async fn pending_queue_handler<L, U>(
    State(state): State<MarketplaceState<L, U>>,
    Authenticated(actor): Authenticated,
) -> Result<Json<Vec<PendingListingView>>, MarketplaceError>
where
    L: ListingRepository + 'static,
    U: UserRepository + 'static,
{
    state.listings.list_pending(&actor).map(Json)
}

pub(crate) async fn approve_handler<L, U>(
    State(state): State<MarketplaceState<L, U>>,
    Authenticated(actor): Authenticated,
    Path(id): Path<String>,
) -> Result<Json<Listing>, MarketplaceError>
where
    L: ListingRepository + 'static,
    U: UserRepository + 'static,
{
    state.listings.approve(&actor, &listing_id(&id)?).map(Json)
}

pub(crate) async fn reject_handler<L, U>(
    State(state): State<MarketplaceState<L, U>>,
    Authenticated(actor): Authenticated,
    Path(id): Path<String>,
) -> Result<Json<Listing>, MarketplaceError>
where
    L: ListingRepository + 'static,
    U: UserRepository + 'static,
{
    state.listings.reject(&actor, &listing_id(&id)?).map(Json)
}

pub(crate) async fn listing_handler<L, U>(
    State(state): State<MarketplaceState<L, U>>,
    actor: Option<Authenticated>,
    Path(id): Path<String>,
) -> Result<Json<PublicListingView>, MarketplaceError>
where
    L: ListingRepository + 'static,
    U: UserRepository + 'static,
{
    let actor = actor.map(|Authenticated(actor)| actor);
    state.listings.get(actor.as_ref(), &listing_id(&id)?).map(Json)
}

pub(crate) async fn update_handler<L, U>(
    State(state): State<MarketplaceState<L, U>>,
    Authenticated(actor): Authenticated,
    Path(id): Path<String>,
    payload: Result<Json<ListingInput>, JsonRejection>,
) -> Result<Json<Listing>, MarketplaceError>
where
    L: ListingRepository + 'static,
    U: UserRepository + 'static,
{
    let id = listing_id(&id)?;
    // Strangers learn they may not edit before they learn their body is malformed.
    if payload.is_err() {
        state.listings.ensure_can_update(&actor, &id)?;
    }
    state.listings.update(&actor, &id, body(payload)?).map(Json)
}

pub(crate) async fn delete_handler<L, U>(
    State(state): State<MarketplaceState<L, U>>,
    Authenticated(actor): Authenticated,
    Path(id): Path<String>,
) -> Result<Json<Value>, MarketplaceError>
where
    L: ListingRepository + 'static,
    U: UserRepository + 'static,
{
    state.listings.delete(&actor, &listing_id(&id)?)?;
    Ok(Json(json!({ "msg": "Listing deleted" })))
}
