/// Account endpoints for the signed-in user
///
/// # Endpoints
///
/// - `GET /v1/me` - Profile, enrollment and entitlement in one read
/// - `GET /v1/me/entitlement` - Active entitlement, 404 when there is none
/// - `POST /v1/me/enrollment` - Create profile and unpaid enrollment

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{extract::State, http::StatusCode, Extension, Json};
use mastery_shared::{
    auth::middleware::AuthContext,
    models::{
        Account, CreateEnrollment, CreateProfile, EnrollOutcome, EnrollmentReceipt, Entitlement,
    },
};
use serde::Deserialize;
use validator::Validate;

/// Enrollment request
///
/// `email` falls back to the address in the session token.
#[derive(Debug, Deserialize, Validate)]
pub struct EnrollRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,

    #[validate(length(min = 1, max = 255, message = "Full name must be 1 to 255 characters"))]
    pub full_name: String,

    #[validate(length(min = 1, max = 64, message = "Phone must be 1 to 64 characters"))]
    pub phone: String,
}

/// `GET /v1/me`
pub async fn get_account(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<Account>> {
    let user_id = &auth.user_id;

    let (profile, enrollment, entitlement) = tokio::join!(
        state.store.find_profile(user_id),
        state.store.find_enrollment(user_id),
        state.store.find_entitlement(user_id),
    );

    Ok(Json(Account::new(
        user_id.clone(),
        profile?,
        enrollment?,
        entitlement?,
    )))
}

/// `GET /v1/me/entitlement`
///
/// Point read the post-purchase poller repeats until the webhook has landed.
pub async fn get_active_entitlement(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<Entitlement>> {
    state
        .store
        .find_active_entitlement(&auth.user_id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("No active entitlement".to_string()))
}

/// `POST /v1/me/enrollment`
///
/// # Responses
///
/// - `201 Created` with `{"status":"created","enrollment":{...}}`
/// - `200 OK` with `{"status":"already_enrolled","message":"..."}` on a repeat
/// - `400 Bad Request` when no email is available
/// - `422 Unprocessable Entity` on validation failure
pub async fn create_enrollment(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<EnrollRequest>,
) -> ApiResult<(StatusCode, Json<EnrollmentReceipt>)> {
    req.validate()?;

    let email = req
        .email
        .or(auth.email)
        .ok_or_else(|| ApiError::BadRequest("Email is required".to_string()))?;

    state
        .store
        .ensure_profile(CreateProfile {
            id: auth.user_id.clone(),
            full_name: req.full_name,
            phone: req.phone,
        })
        .await?;

    let outcome = state
        .store
        .create_enrollment(CreateEnrollment::standard(auth.user_id.clone(), email))
        .await?;

    match outcome {
        EnrollOutcome::Created(enrollment) => {
            tracing::info!(user_id = %auth.user_id, enrollment_id = %enrollment.id, "Enrollment created");
            Ok((StatusCode::CREATED, Json(EnrollmentReceipt::Created { enrollment })))
        }
        EnrollOutcome::AlreadyEnrolled => {
            tracing::debug!(user_id = %auth.user_id, "User already enrolled");
            Ok((StatusCode::OK, Json(EnrollmentReceipt::already_enrolled())))
        }
    }
}
