//! Rental listing marketplace: accounts, bearer tokens, listings, and admin moderation.
//!
//! Requests flow through [`AuthService`] (who is calling), [`policy::authorize`] (may they do
//! this), and [`ListingService`] (apply the lifecycle rules and persist through the repository
//! traits).

pub mod auth;
pub mod domain;
pub mod error;
pub mod lifecycle;
pub mod listings;
pub mod password;
pub mod policy;
pub mod repository;
pub mod router;
pub mod store;
pub mod token;
pub mod validation;

#[cfg(test)]
mod tests;

pub use auth::AuthService;
pub use domain::{
    AuthToken, Listing, ListingId, ListingView, OwnerContactView, OwnerPublicView,
    PendingListingView, PublicListingView, Role, User, UserId, UserProfileView,
};
pub use error::MarketplaceError;
pub use lifecycle::{ListingStatus, ModerationDecision, Transition};
pub use listings::ListingService;
pub use policy::{authorize, Actor, Decision, Denial, ListingAction};
pub use repository::{ListingRepository, RepositoryError, UserRepository};
pub use router::{marketplace_router, Authenticated, MarketplaceState};
pub use store::{InMemoryListingStore, InMemoryUserStore};
pub use token::{TokenClaims, TokenIssuer};
pub use validation::{
    FieldError, ListingInput, LoginInput, NumericInput, ProfileInput, RegistrationInput,
    ValidationErrors,
};
