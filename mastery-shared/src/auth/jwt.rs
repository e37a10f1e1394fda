/// Identity-provider session tokens
///
/// Tokens are HS256-signed with the provider's JWT secret and carry the
/// audience `"authenticated"` for signed-in users.
///
/// # Example
///
/// ```
/// use mastery_shared::auth::jwt::{create_session_token, validate_session_token, SessionClaims};
/// use mastery_shared::models::UserId;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let claims = SessionClaims::new(UserId::from("u1"), Some("a@example.com".to_string()));
/// let token = create_session_token(&claims, "provider-secret")?;
///
/// let validated = validate_session_token(&token, "provider-secret")?;
/// assert_eq!(validated.sub, UserId::from("u1"));
/// # Ok(())
/// # }
/// ```

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::models::UserId;

/// Audience of tokens issued to signed-in users
pub const SESSION_AUDIENCE: &str = "authenticated";

/// Lifetime used when this crate mints tokens (tests and local tooling)
const DEFAULT_LIFETIME_HOURS: i64 = 1;

/// Error type for session token operations
#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    #[error("Failed to create token: {0}")]
    CreateError(String),

    #[error("Failed to validate token: {0}")]
    ValidationError(String),

    #[error("Token has expired")]
    Expired,

    #[error("Token audience is not authenticated")]
    InvalidAudience,
}

/// Claims of an identity-provider session token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Subject - user id
    pub sub: UserId,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    pub aud: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,

    pub iat: i64,

    pub exp: i64,
}

impl SessionClaims {
    pub fn new(user_id: UserId, email: Option<String>) -> Self {
        Self::with_expiration(user_id, email, Duration::hours(DEFAULT_LIFETIME_HOURS))
    }

    pub fn with_expiration(user_id: UserId, email: Option<String>, expires_in: Duration) -> Self {
        let now = Utc::now();

        Self {
            sub: user_id,
            email,
            aud: SESSION_AUDIENCE.to_string(),
            role: Some(SESSION_AUDIENCE.to_string()),
            iat: now.timestamp(),
            exp: (now + expires_in).timestamp(),
        }
    }

    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() >= self.exp
    }
}

/// Signs claims with HS256.
pub fn create_session_token(claims: &SessionClaims, secret: &str) -> Result<String, JwtError> {
    let header = Header::new(Algorithm::HS256);
    let key = EncodingKey::from_secret(secret.as_bytes());

    encode(&header, claims, &key)
        .map_err(|e| JwtError::CreateError(format!("Token encoding failed: {}", e)))
}

/// Validates signature, expiry and audience, returning the claims.
pub fn validate_session_token(token: &str, secret: &str) -> Result<SessionClaims, JwtError> {
    let key = DecodingKey::from_secret(secret.as_bytes());

    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_audience(&[SESSION_AUDIENCE]);
    validation.validate_exp = true;

    let token_data = decode::<SessionClaims>(token, &key, &validation).map_err(|e| {
        match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => JwtError::Expired,
            jsonwebtoken::errors::ErrorKind::InvalidAudience => JwtError::InvalidAudience,
            _ => JwtError::ValidationError(format!("Token validation failed: {}", e)),
        }
    })?;

    Ok(token_data.claims)
}
