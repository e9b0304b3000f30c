use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use super::domain::{AuthToken, User};
use super::policy::Actor;
use crate::config::AuthConfig;

/// Signed payload: `{ user: { id, role }, iat, exp }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    pub user: Actor,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("token signing failed: {0}")]
    Signing(#[source] jsonwebtoken::errors::Error),
    #[error("token rejected: {0}")]
    Rejected(#[source] jsonwebtoken::errors::Error),
}

/// Issues and verifies HS256 bearer tokens with a process-wide secret.
#[derive(Clone)]
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl TokenIssuer {
    pub fn new(secret: &[u8], ttl: Duration) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
            ttl,
        }
    }

    pub fn from_config(config: &AuthConfig) -> Self {
        Self::new(config.jwt_secret.as_bytes(), config.token_ttl)
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn issue(&self, user: &User) -> Result<AuthToken, TokenError> {
        self.issue_at(user, Utc::now())
    }

    pub fn issue_at(&self, user: &User, now: DateTime<Utc>) -> Result<AuthToken, TokenError> {
        let claims = TokenClaims {
            user: Actor::new(user.id, user.role),
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(TokenError::Signing)?;
        Ok(AuthToken { token })
    }

    pub fn decode(&self, token: &str) -> Result<TokenClaims, TokenError> {
        decode::<TokenClaims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(TokenError::Rejected)
    }

    pub fn verify(&self, token: &str) -> Result<Actor, TokenError> {
        self.decode(token).map(|claims| claims.user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::marketplace::domain::{Role, UserId};
    use crate::marketplace::password::hash_password;
    use std::collections::BTreeSet;

    fn user(role: Role) -> User {
        User {
            id: UserId::generate(),
            name: "Grace".to_string(),
            email: "grace@example.com".to_string(),
            password: hash_password("secret1").expect("hashes"),
            role,
            is_active: true,
            phone: None,
            avatar: None,
            favorites: BTreeSet::new(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn token_carries_id_and_role_with_five_hour_expiry() {
        let issuer = TokenIssuer::new(b"test-secret", Duration::hours(5));
        let owner = user(Role::Owner);
        let now = Utc::now();

        let token = issuer.issue_at(&owner, now).expect("signs");
        let claims = issuer.decode(&token.token).expect("verifies");

        assert_eq!(claims.user, Actor::new(owner.id, Role::Owner));
        assert_eq!(claims.exp - claims.iat, issuer.ttl().num_seconds());
        assert_eq!(issuer.ttl(), Duration::hours(5));
    }

    #[test]
    fn expired_tokens_are_rejected() {
        let issuer = TokenIssuer::new(b"test-secret", Duration::hours(5));
        let issued = Utc::now() - Duration::hours(6);
        let token = issuer.issue_at(&user(Role::Tenant), issued).expect("signs");

        assert!(matches!(
            issuer.verify(&token.token),
            Err(TokenError::Rejected(_))
        ));
    }

    #[test]
    fn tokens_from_another_secret_are_rejected() {
        let issuer = TokenIssuer::new(b"test-secret", Duration::hours(5));
        let forger = TokenIssuer::new(b"other-secret", Duration::hours(5));
        let token = forger.issue(&user(Role::Admin)).expect("signs");

        assert!(issuer.verify(&token.token).is_err());
        assert!(issuer.verify("not.a.token").is_err());
    }
}
