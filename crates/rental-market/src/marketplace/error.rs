use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::error;

use super::lifecycle::InvalidTransition;
use super::password::CredentialError;
use super::policy::Denial;
use super::repository::RepositoryError;
use super::token::TokenError;
use super::validation::ValidationErrors;

pub const SERVER_ERROR_MESSAGE: &str = "Server error";

/// Every way a marketplace operation can fail.
#[derive(Debug, thiserror::Error)]
pub enum MarketplaceError {
    #[error("{0}")]
    Validation(ValidationErrors),
    #[error("{0}")]
    Conflict(&'static str),
    /// Unknown email and wrong password share this variant.
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("This account is disabled")]
    AccountDisabled,
    #[error("Authentication required")]
    Unauthenticated,
    #[error("Not authorized")]
    Forbidden,
    #[error("{0}")]
    NotFound(&'static str),
    #[error(transparent)]
    InvalidTransition(#[from] InvalidTransition),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Credential(#[from] CredentialError),
    #[error(transparent)]
    Token(#[from] TokenError),
}

impl MarketplaceError {
    pub fn status(&self) -> StatusCode {
        match self {
            MarketplaceError::Validation(_)
            | MarketplaceError::InvalidCredentials
            | MarketplaceError::AccountDisabled => StatusCode::BAD_REQUEST,
            MarketplaceError::Unauthenticated => StatusCode::UNAUTHORIZED,
            MarketplaceError::Forbidden => StatusCode::FORBIDDEN,
            MarketplaceError::NotFound(_) => StatusCode::NOT_FOUND,
            MarketplaceError::Conflict(_) | MarketplaceError::InvalidTransition(_) => {
                StatusCode::CONFLICT
            }
            MarketplaceError::Repository(_)
            | MarketplaceError::Credential(_)
            | MarketplaceError::Token(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub const fn is_server_error(&self) -> bool {
        matches!(
            self,
            MarketplaceError::Repository(_)
                | MarketplaceError::Credential(_)
                | MarketplaceError::Token(_)
        )
    }
}

impl From<ValidationErrors> for MarketplaceError {
    fn from(value: ValidationErrors) -> Self {
        Self::Validation(value)
    }
}

impl From<Denial> for MarketplaceError {
    fn from(value: Denial) -> Self {
        match value {
            Denial::Unauthenticated => Self::Unauthenticated,
            Denial::Forbidden => Self::Forbidden,
        }
    }
}

impl IntoResponse for MarketplaceError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            MarketplaceError::Validation(errors) => json!({ "errors": errors }),
            other if other.is_server_error() => {
                error!(error = %other, "request failed");
                json!({ "msg": SERVER_ERROR_MESSAGE })
            }
            other => json!({ "msg": other.to_string() }),
        };
        (status, Json(body)).into_response()
    }
}
