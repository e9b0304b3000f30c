use super::domain::{Listing, ListingId, User, UserId};
use super::lifecycle::ListingStatus;

/// Credential store. Email uniqueness is enforced here, not by callers.
pub trait UserRepository: Send + Sync {
    /// Fails with [`RepositoryError::Conflict`] when the id or email is already taken.
    fn insert(&self, user: User) -> Result<User, RepositoryError>;
    /// Runs `change` against the stored record and commits the result in one step, so writes
    /// made by others in the meantime are never overwritten. Nothing is stored when `change`
    /// fails, and a missing record surfaces as [`RepositoryError::NotFound`] through `E`.
    fn modify<T, E, F>(&self, id: &UserId, change: F) -> Result<T, E>
    where
        Self: Sized,
        E: From<RepositoryError>,
        F: FnOnce(&mut User) -> Result<T, E>;
    fn fetch(&self, id: &UserId) -> Result<Option<User>, RepositoryError>;
    fn find_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError>;
}

/// Listing store. Listing queries return records oldest first.
pub trait ListingRepository: Send + Sync {
    fn insert(&self, listing: Listing) -> Result<Listing, RepositoryError>;
    /// Same contract as [`UserRepository::modify`].
    fn modify<T, E, F>(&self, id: &ListingId, change: F) -> Result<T, E>
    where
        Self: Sized,
        E: From<RepositoryError>,
        F: FnOnce(&mut Listing) -> Result<T, E>;
    fn fetch(&self, id: &ListingId) -> Result<Option<Listing>, RepositoryError>;
    fn delete(&self, id: &ListingId) -> Result<(), RepositoryError>;
    fn with_status(&self, status: ListingStatus) -> Result<Vec<Listing>, RepositoryError>;
    fn owned_by(&self, owner: &UserId) -> Result<Vec<Listing>, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}
