//! In-process stores backing the repository traits.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use super::domain::{Listing, ListingId, User, UserId};
use super::lifecycle::ListingStatus;
use super::repository::{ListingRepository, RepositoryError, UserRepository};

fn poisoned<T>(_: PoisonError<T>) -> RepositoryError {
    RepositoryError::Unavailable("store lock poisoned".to_string())
}

#[derive(Default)]
struct UserTable {
    by_id: HashMap<UserId, User>,
    by_email: HashMap<String, UserId>,
}

#[derive(Default, Clone)]
pub struct InMemoryUserStore {
    table: Arc<RwLock<UserTable>>,
}

impl UserRepository for InMemoryUserStore {
    fn insert(&self, user: User) -> Result<User, RepositoryError> {
        let mut table = self.table.write().map_err(poisoned)?;
        if table.by_id.contains_key(&user.id) || table.by_email.contains_key(&user.email) {
            return Err(RepositoryError::Conflict);
        }
        table.by_email.insert(user.email.clone(), user.id);
        table.by_id.insert(user.id, user.clone());
        Ok(user)
    }

    fn modify<T, E, F>(&self, id: &UserId, change: F) -> Result<T, E>
    where
        E: From<RepositoryError>,
        F: FnOnce(&mut User) -> Result<T, E>,
    {
        let mut table = self.table.write().map_err(poisoned)?;
        let mut user = table.by_id.get(id).cloned().ok_or(RepositoryError::NotFound)?;
        let previous_email = user.email.clone();
        let outcome = change(&mut user)?;

        if user.id != *id {
            return Err(RepositoryError::Conflict.into());
        }
        if previous_email != user.email {
            if table.by_email.contains_key(&user.email) {
                return Err(RepositoryError::Conflict.into());
            }
            table.by_email.remove(&previous_email);
            table.by_email.insert(user.email.clone(), user.id);
        }
        table.by_id.insert(user.id, user);
        Ok(outcome)
    }

    fn fetch(&self, id: &UserId) -> Result<Option<User>, RepositoryError> {
        let table = self.table.read().map_err(poisoned)?;
        Ok(table.by_id.get(id).cloned())
    }

    fn find_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError> {
        let table = self.table.read().map_err(poisoned)?;
        Ok(table
            .by_email
            .get(email)
            .and_then(|id| table.by_id.get(id))
            .cloned())
    }
}

#[derive(Default, Clone)]
pub struct InMemoryListingStore {
    records: Arc<RwLock<HashMap<ListingId, Listing>>>,
}

impl InMemoryListingStore {
    fn collect<F>(&self, predicate: F) -> Result<Vec<Listing>, RepositoryError>
    where
        F: Fn(&Listing) -> bool,
    {
        let records = self.records.read().map_err(poisoned)?;
        let mut listings: Vec<Listing> = records
            .values()
            .filter(|listing| predicate(listing))
            .cloned()
            .collect();
        listings.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(listings)
    }
}

impl ListingRepository for InMemoryListingStore {
    fn insert(&self, listing: Listing) -> Result<Listing, RepositoryError> {
        let mut records = self.records.write().map_err(poisoned)?;
        if records.contains_key(&listing.id) {
            return Err(RepositoryError::Conflict);
        }
        records.insert(listing.id, listing.clone());
        Ok(listing)
    }

    fn modify<T, E, F>(&self, id: &ListingId, change: F) -> Result<T, E>
    where
        E: From<RepositoryError>,
        F: FnOnce(&mut Listing) -> Result<T, E>,
    {
        let mut records = self.records.write().map_err(poisoned)?;
        let slot = records.get_mut(id).ok_or(RepositoryError::NotFound)?;
        let mut listing = slot.clone();
        let outcome = change(&mut listing)?;

        if listing.id != *id {
            return Err(RepositoryError::Conflict.into());
        }
        *slot = listing;
        Ok(outcome)
    }

    fn fetch(&self, id: &ListingId) -> Result<Option<Listing>, RepositoryError> {
        let records = self.records.read().map_err(poisoned)?;
        Ok(records.get(id).cloned())
    }

    fn delete(&self, id: &ListingId) -> Result<(), RepositoryError> {
        let mut records = self.records.write().map_err(poisoned)?;
        records
            .remove(id)
            .map(|_| ())
            .ok_or(RepositoryError::NotFound)
    }

    fn with_status(&self, status: ListingStatus) -> Result<Vec<Listing>, RepositoryError> {
        self.collect(|listing| listing.status == status)
    }

    fn owned_by(&self, owner: &UserId) -> Result<Vec<Listing>, RepositoryError> {
        self.collect(|listing| listing.owner == *owner)
    }
}
