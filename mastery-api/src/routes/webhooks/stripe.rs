/// Stripe webhook receiver
///
/// # Endpoint
///
/// ```text
/// POST /v1/webhooks/stripe
/// Stripe-Signature: t=...,v1=...
/// ```
///
/// Stripe retries any non-2xx response, so each failure mode has a fixed
/// status: malformed or unauthenticated input is a 400 (retrying will not
/// help), and store failures are a 500 (a retry may succeed). Redeliveries
/// are harmless because the entitlement write is an upsert keyed by user.
///
/// # Responses
///
/// - `200` `{"received":true,"message":"Entitlement granted"}` after a completed checkout
/// - `200` `{"received":true}` for any other event type
/// - `400` / `500` `{"error":"..."}`

use crate::app::AppState;
use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use mastery_shared::{
    models::{EntitlementGrant, PaymentConfirmation, UpsertedEntitlement},
    payments::stripe::{
        verify_signature, CheckoutSession, EventKind, StripeEvent, SIGNATURE_HEADER,
    },
    store::{AccountStore, StoreError},
};
use serde::Serialize;

/// Message sent back after an entitlement is written
pub const ENTITLEMENT_GRANTED: &str = "Entitlement granted";

/// Acknowledgement body
#[derive(Debug, Serialize)]
pub struct WebhookAck {
    pub received: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl WebhookAck {
    fn granted() -> Self {
        Self {
            received: true,
            message: Some(ENTITLEMENT_GRANTED.to_string()),
        }
    }

    fn ignored() -> Self {
        Self {
            received: true,
            message: None,
        }
    }
}

/// Webhook failure, rendered as `{"error": "<message>"}`
#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    #[error("No signature provided")]
    MissingSignature,

    #[error("Invalid signature")]
    InvalidSignature,

    #[error("Invalid JSON")]
    InvalidJson,

    #[error("Invalid checkout session")]
    InvalidSession,

    #[error("No user_id provided")]
    MissingUserId,

    #[error("{0}")]
    Store(#[from] StoreError),
}

impl WebhookError {
    pub fn status(&self) -> StatusCode {
        match self {
            WebhookError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

#[derive(Serialize)]
struct WebhookErrorBody {
    error: String,
}

impl IntoResponse for WebhookError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "Stripe webhook failed");
        } else {
            tracing::warn!(error = %self, "Stripe webhook rejected");
        }

        (
            status,
            Json(WebhookErrorBody {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}

/// `POST /v1/webhooks/stripe`
pub async fn handle_stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookAck>, WebhookError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok())
        .ok_or(WebhookError::MissingSignature)?;

    let stripe = &state.config.stripe;
    verify_signature(&body, signature, &stripe.webhook_secret, stripe.tolerance_secs).map_err(
        |e| {
            tracing::debug!(reason = %e, "Stripe signature verification failed");
            WebhookError::InvalidSignature
        },
    )?;

    let event: StripeEvent =
        serde_json::from_slice(&body).map_err(|_| WebhookError::InvalidJson)?;

    match event.kind() {
        EventKind::CheckoutSessionCompleted => {
            let session = event
                .checkout_session()
                .map_err(|_| WebhookError::InvalidSession)?;

            apply_checkout_completed(state.store.as_ref(), &session).await?;
            Ok(Json(WebhookAck::granted()))
        }
        EventKind::Other(event_type) => {
            tracing::debug!(event_type = %event_type, event_id = ?event.id, "Ignoring Stripe event");
            Ok(Json(WebhookAck::ignored()))
        }
    }
}

/// Grants access for a completed checkout and marks the enrollment paid.
///
/// The entitlement is the access-control record and is always written. The
/// enrollment is administrative: a user who paid without enrolling first has
/// no row to update, which is logged and otherwise ignored.
pub async fn apply_checkout_completed(
    store: &dyn AccountStore,
    session: &CheckoutSession,
) -> Result<UpsertedEntitlement, WebhookError> {
    let user_id = session.user_id().ok_or(WebhookError::MissingUserId)?;

    let upserted = store
        .upsert_entitlement(EntitlementGrant {
            user_id: user_id.clone(),
            stripe_payment_intent_id: session.payment_intent.clone(),
            stripe_customer_id: session.customer.clone(),
        })
        .await?;

    tracing::info!(
        user_id = %user_id,
        entitlement_id = %upserted.entitlement.id,
        created = upserted.created,
        email = session.email().unwrap_or("-"),
        "Entitlement granted"
    );

    match store
        .mark_enrollment_paid(&user_id, PaymentConfirmation::stripe_now())
        .await?
    {
        Some(enrollment) => {
            tracing::info!(user_id = %user_id, enrollment_id = %enrollment.id, "Enrollment marked paid");
        }
        None => {
            tracing::warn!(user_id = %user_id, "Paid checkout has no enrollment to update");
        }
    }

    Ok(upserted)
}
