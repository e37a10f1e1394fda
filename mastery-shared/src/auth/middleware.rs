/// Bearer credential handling
///
/// The HTTP layer hands the raw `Authorization` header to
/// [`authenticate_bearer`]; on success the resulting [`AuthContext`] is placed
/// in the request extensions for handlers to extract.

use serde::{Deserialize, Serialize};

use super::jwt::{validate_session_token, JwtError};
use crate::models::UserId;

/// Authenticated caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthContext {
    pub user_id: UserId,
    pub email: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Missing credentials")]
    MissingCredentials,

    #[error("{0}")]
    InvalidFormat(String),

    #[error("Invalid token: {0}")]
    InvalidToken(#[from] JwtError),
}

/// Extracts and validates a `Bearer` token from an `Authorization` header value.
pub fn authenticate_bearer(header: Option<&str>, secret: &str) -> Result<AuthContext, AuthError> {
    let header = header.ok_or(AuthError::MissingCredentials)?;

    let token = header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| {
            AuthError::InvalidFormat("Authorization header must use Bearer scheme".to_string())
        })?;

    let claims = validate_session_token(token, secret)?;

    Ok(AuthContext {
        user_id: claims.sub,
        email: claims.email,
    })
}
