//! Common test utilities for integration tests
//!
//! Builds the full router over an `InMemoryStore` so tests can seed and
//! inspect state directly and inject store failures.

#![allow(dead_code)]

use axum::body::Body;
use axum::http::{Request, StatusCode};
use mastery_api::app::{build_router, AppState};
use mastery_api::config::{ApiConfig, Config, DatabaseConfig, SessionConfig, StripeConfig};
use mastery_shared::auth::jwt::{create_session_token, SessionClaims};
use mastery_shared::models::UserId;
use mastery_shared::payments::stripe::sign_payload;
use mastery_shared::store::InMemoryStore;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::Service as _;

pub const WEBHOOK_SECRET: &str = "whsec_integration_test";
pub const SESSION_SECRET: &str = "integration-test-session-secret-0123456789";

/// Test context containing all necessary resources
pub struct TestContext {
    pub store: Arc<InMemoryStore>,
    pub app: axum::Router,
    pub config: Config,
}

impl TestContext {
    pub fn new() -> Self {
        let config = test_config();
        let store = Arc::new(InMemoryStore::new());
        let state = AppState::new(store.clone(), config.clone());
        let app = build_router(state);

        TestContext { store, app, config }
    }

    /// Sends a request and returns status plus JSON body (`Null` when empty)
    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.app.clone().call(request).await.unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();

        let json = if body.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body).unwrap_or_else(|_| {
                panic!("Non-JSON body: {}", String::from_utf8_lossy(&body))
            })
        };

        (status, json)
    }

    /// Bearer header for a signed-in user
    pub fn auth_header(&self, user: &str, email: Option<&str>) -> String {
        let claims = SessionClaims::new(UserId::from(user), email.map(str::to_string));
        let token = create_session_token(&claims, SESSION_SECRET).unwrap();
        format!("Bearer {}", token)
    }
}

pub fn test_config() -> Config {
    Config {
        api: ApiConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            cors_origins: vec!["*".to_string()],
        },
        database: DatabaseConfig {
            url: "postgresql://unused".to_string(),
            max_connections: 1,
        },
        stripe: StripeConfig {
            webhook_secret: WEBHOOK_SECRET.to_string(),
            tolerance_secs: 300,
        },
        session: SessionConfig {
            jwt_secret: SESSION_SECRET.to_string(),
        },
    }
}

/// Webhook request carrying a valid signature for `body`
pub fn signed_webhook(body: &str) -> Request<Body> {
    let header = sign_payload(body.as_bytes(), WEBHOOK_SECRET, chrono::Utc::now().timestamp());

    Request::builder()
        .method("POST")
        .uri("/v1/webhooks/stripe")
        .header("content-type", "application/json")
        .header("stripe-signature", header)
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// `checkout.session.completed` event body
pub fn checkout_completed(
    client_reference_id: Option<&str>,
    payment_intent: &str,
    customer: &str,
) -> String {
    json!({
        "id": "evt_test",
        "type": "checkout.session.completed",
        "data": {
            "object": {
                "id": "cs_test",
                "client_reference_id": client_reference_id,
                "customer_email": "student@example.com",
                "customer": customer,
                "payment_intent": payment_intent,
                "payment_status": "paid"
            }
        }
    })
    .to_string()
}
