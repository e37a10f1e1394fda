/// Account endpoint errors
///
/// Handlers under `/v1/me` return `ApiResult<T>`. Each
/// `ApiError` variant fixes an HTTP status and a machine-readable code; the
/// body is `{"error": code, "message": text}` plus `details` for field
/// validation failures.
///
/// The Stripe webhook answers with a flatter `{"error": text}` and has its
/// own type, `routes::webhooks::stripe::WebhookError`.
///
/// # Example
///
/// ```
/// use mastery_api::error::{ApiError, ApiResult};
/// use axum::Json;
/// use serde_json::json;
///
/// async fn handler(found: bool) -> ApiResult<Json<serde_json::Value>> {
///     if !found {
///         return Err(ApiError::NotFound("No active entitlement".to_string()));
///     }
///     Ok(Json(json!({ "ok": true })))
/// }
/// ```

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use mastery_shared::{
    auth::{jwt::JwtError, middleware::AuthError},
    store::StoreError,
};
use serde::Serialize;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// One entry per rejected field
    #[error("{} field(s) failed validation", .0.len())]
    ValidationError(Vec<FieldError>),

    /// Logged server-side; the client only sees a generic message
    #[error("Internal error: {0}")]
    InternalError(String),

    /// The store did not answer
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),
}

/// A request field that failed validation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<Vec<FieldError>>,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::ValidationError(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Value of the `error` field in the response body
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "bad_request",
            ApiError::Unauthorized(_) => "unauthorized",
            ApiError::NotFound(_) => "not_found",
            ApiError::ValidationError(_) => "validation_error",
            ApiError::InternalError(_) => "internal_error",
            ApiError::ServiceUnavailable(_) => "service_unavailable",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error = self.code();

        let (message, details) = match self {
            ApiError::BadRequest(msg)
            | ApiError::Unauthorized(msg)
            | ApiError::NotFound(msg)
            | ApiError::ServiceUnavailable(msg) => (msg, None),
            ApiError::ValidationError(fields) => {
                ("Request validation failed".to_string(), Some(fields))
            }
            ApiError::InternalError(msg) => {
                tracing::error!(error = %msg, "Account request failed");
                ("An internal error occurred".to_string(), None)
            }
        };

        (
            status,
            Json(ErrorBody {
                error,
                message,
                details,
            }),
        )
            .into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unavailable(msg) => ApiError::ServiceUnavailable(msg),
            StoreError::Database(_) => ApiError::InternalError(err.to_string()),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingCredentials => {
                ApiError::Unauthorized("Missing authorization header".to_string())
            }
            AuthError::InvalidFormat(msg) => ApiError::BadRequest(msg),
            AuthError::InvalidToken(jwt) => jwt.into(),
        }
    }
}

impl From<JwtError> for ApiError {
    fn from(err: JwtError) -> Self {
        let reason = match err {
            JwtError::Expired => "Session expired".to_string(),
            JwtError::InvalidAudience => "Token is not a signed-in session".to_string(),
            other => other.to_string(),
        };
        ApiError::Unauthorized(reason)
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut fields: Vec<FieldError> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, failures)| {
                failures.iter().map(move |failure| FieldError {
                    field: field.to_string(),
                    message: failure
                        .message
                        .as_deref()
                        .unwrap_or("is invalid")
                        .to_string(),
                })
            })
            .collect();
        fields.sort_by(|a, b| a.field.cmp(&b.field));

        ApiError::ValidationError(fields)
    }
}
