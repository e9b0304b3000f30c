use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use super::domain::{AuthToken, Role, User, UserId, UserProfileView};
use super::error::MarketplaceError;
use super::password::{hash_password, verify_password};
use super::policy::{authorize, Actor, ListingAction};
use super::repository::{RepositoryError, UserRepository};
use super::token::TokenIssuer;
use super::validation::{
    validate_admin_seed, validate_login, validate_profile, validate_registration, LoginInput,
    ProfileInput, RegistrationInput,
};
use crate::config::AdminSeed;

const DUPLICATE_EMAIL: &str = "A user already exists with this email";

/// Account lifecycle and bearer token issuance.
pub struct AuthService<U> {
    users: Arc<U>,
    tokens: TokenIssuer,
}

impl<U> AuthService<U>
where
    U: UserRepository + 'static,
{
    pub fn new(users: Arc<U>, tokens: TokenIssuer) -> Self {
        Self { users, tokens }
    }

    pub fn tokens(&self) -> &TokenIssuer {
        &self.tokens
    }

    /// Create a tenant or owner account and sign them in.
    pub fn register(&self, input: RegistrationInput) -> Result<AuthToken, MarketplaceError> {
        let registration = validate_registration(input)?;

        if self.users.find_by_email(&registration.email)?.is_some() {
            return Err(MarketplaceError::Conflict(DUPLICATE_EMAIL));
        }

        let user = User {
            id: UserId::generate(),
            name: registration.name,
            email: registration.email,
            password: hash_password(&registration.password)?,
            role: registration.role,
            is_active: true,
            phone: registration.phone,
            avatar: registration.avatar,
            favorites: BTreeSet::new(),
            created_at: Utc::now(),
        };

        let user = self.users.insert(user).map_err(|err| match err {
            RepositoryError::Conflict => MarketplaceError::Conflict(DUPLICATE_EMAIL),
            other => MarketplaceError::Repository(other),
        })?;
        info!(user_id = %user.id, role = %user.role, "user registered");

        Ok(self.tokens.issue(&user)?)
    }

    pub fn login(&self, input: LoginInput) -> Result<AuthToken, MarketplaceError> {
        let credentials = validate_login(input)?;

        let user = self
            .users
            .find_by_email(&credentials.email)?
            .ok_or(MarketplaceError::InvalidCredentials)?;

        if !verify_password(&credentials.password, &user.password)? {
            return Err(MarketplaceError::InvalidCredentials);
        }

        if !user.is_active {
            warn!(user_id = %user.id, "login attempt on disabled account");
            return Err(MarketplaceError::AccountDisabled);
        }

        Ok(self.tokens.issue(&user)?)
    }

    /// Resolve a bearer token to the caller it was issued for.
    pub fn authenticate(&self, token: &str) -> Result<Actor, MarketplaceError> {
        self.tokens
            .verify(token)
            .map_err(|_| MarketplaceError::Unauthenticated)
    }

    pub fn profile(&self, actor: &Actor) -> Result<UserProfileView, MarketplaceError> {
        Ok(load_user(self.users.as_ref(), actor)?.profile_view())
    }

    pub fn update_profile(
        &self,
        actor: &Actor,
        input: ProfileInput,
    ) -> Result<UserProfileView, MarketplaceError> {
        let changes = validate_profile(input)?;

        self.users
            .modify(&actor.id, |user| -> Result<_, MarketplaceError> {
                if let Some(name) = changes.name {
                    user.name = name;
                }
                if let Some(phone) = changes.phone {
                    user.phone = Some(phone);
                }
                if let Some(avatar) = changes.avatar {
                    user.avatar = Some(avatar);
                }
                Ok(user.profile_view())
            })
            .map_err(account_gone)
    }

    /// Disable an account. Tokens already issued stay valid until they expire.
    pub fn deactivate(
        &self,
        actor: &Actor,
        user_id: &UserId,
    ) -> Result<UserProfileView, MarketplaceError> {
        authorize(Some(actor), ListingAction::ManageUsers).into_result()?;

        let (profile, was_active) = self
            .users
            .modify(user_id, |user| -> Result<_, MarketplaceError> {
                let was_active = user.is_active;
                user.is_active = false;
                Ok((user.profile_view(), was_active))
            })
            .map_err(|err| match err {
                MarketplaceError::Repository(RepositoryError::NotFound) => {
                    MarketplaceError::NotFound("User not found")
                }
                other => other,
            })?;

        if was_active {
            info!(user_id = %user_id, admin = %actor.id, "account deactivated");
        }
        Ok(profile)
    }

    /// Ensure the configured administrator exists. Safe to call on every start.
    pub fn seed_admin(&self, seed: &AdminSeed) -> Result<User, MarketplaceError> {
        let account = validate_admin_seed(seed)?;
        let email = account.email;

        if let Some(existing) = self.users.find_by_email(&email)? {
            if existing.role == Role::Admin {
                return Ok(existing);
            }
            return Err(MarketplaceError::Conflict(DUPLICATE_EMAIL));
        }

        let admin = self.users.insert(User {
            id: UserId::generate(),
            name: account.name,
            email,
            password: hash_password(&account.password)?,
            role: Role::Admin,
            is_active: true,
            phone: None,
            avatar: None,
            favorites: BTreeSet::new(),
            created_at: Utc::now(),
        })?;
        info!(user_id = %admin.id, "administrator account provisioned");
        Ok(admin)
    }
}

/// Stored record behind a token. A token for a vanished account no longer authenticates.
pub(crate) fn load_user<U>(users: &U, actor: &Actor) -> Result<User, MarketplaceError>
where
    U: UserRepository + ?Sized,
{
    users
        .fetch(&actor.id)?
        .ok_or(MarketplaceError::Unauthenticated)
}

/// A token whose account has vanished stops authenticating, even mid-write.
pub(crate) fn account_gone(err: MarketplaceError) -> MarketplaceError {
    match err {
        MarketplaceError::Repository(RepositoryError::NotFound) => {
            MarketplaceError::Unauthenticated
        }
        other => other,
    }
}
