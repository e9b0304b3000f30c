use std::fmt;

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{self, PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;

/// Argon2id PHC string. The clear-text password never outlives the request that carried it.
#[derive(Clone, PartialEq, Eq)]
pub struct PasswordDigest(String);

impl PasswordDigest {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for PasswordDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PasswordDigest(<redacted>)")
    }
}

#[derive(Debug, thiserror::Error)]
#[error("password hashing failed: {0}")]
pub struct CredentialError(password_hash::Error);

pub fn hash_password(raw: &str) -> Result<PasswordDigest, CredentialError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(raw.as_bytes(), &salt)
        .map_err(CredentialError)?;
    Ok(PasswordDigest(hash.to_string()))
}

/// `Ok(false)` on mismatch; `Err` only when the stored digest itself is unreadable.
pub fn verify_password(raw: &str, digest: &PasswordDigest) -> Result<bool, CredentialError> {
    let parsed = PasswordHash::new(digest.as_str()).map_err(CredentialError)?;
    match Argon2::default().verify_password(raw.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(password_hash::Error::Password) => Ok(false),
        Err(other) => Err(CredentialError(other)),
    }
}
