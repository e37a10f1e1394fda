/// Application state and router builder
///
/// # Example
///
/// ```no_run
/// use mastery_api::{app::{build_router, AppState}, config::Config};
/// use mastery_shared::store::PgStore;
/// use sqlx::PgPool;
/// use std::sync::Arc;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let pool = PgPool::connect(&config.database.url).await?;
/// let state = AppState::new(Arc::new(PgStore::new(pool)), config);
///
/// let app = build_router(state);
/// let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
/// axum::serve(listener, app).await?;
/// # Ok(())
/// # }
/// ```

use crate::{config::Config, error::ApiError};
use axum::{
    extract::{Request, State},
    http::{header, HeaderName, HeaderValue, Method},
    middleware::Next,
    response::Response,
    routing::{get, post},
    Router,
};
use mastery_shared::{auth::middleware::authenticate_bearer, store::AccountStore};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state
///
/// Cloned into every handler through the `State` extractor.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn AccountStore>,

    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(store: Arc<dyn AccountStore>, config: Config) -> Self {
        Self {
            store,
            config: Arc::new(config),
        }
    }

    /// Secret the identity provider signs session tokens with
    pub fn session_secret(&self) -> &str {
        &self.config.session.jwt_secret
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// ```text
/// /
/// ├── GET  /health                 # Health check (public)
/// └── /v1/
///     ├── POST /webhooks/stripe    # Stripe webhook (signature-verified, any origin)
///     └── /me/                     # Signed-in user (Bearer session token)
///         ├── GET  /
///         ├── GET  /entitlement
///         └── POST /enrollment
/// ```
pub fn build_router(state: AppState) -> Router {
    use crate::routes;

    let me_routes = Router::new()
        .route("/", get(routes::me::get_account))
        .route("/entitlement", get(routes::me::get_active_entitlement))
        .route("/enrollment", post(routes::me::create_enrollment))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            jwt_auth_layer,
        ));

    let account_routes = Router::new()
        .route("/health", get(routes::health::health_check))
        .nest("/v1/me", me_routes)
        .layer(account_cors(&state.config));

    // Stripe posts from its own servers; the endpoint is open to any origin
    let webhook_routes = Router::new()
        .route(
            "/v1/webhooks/stripe",
            post(routes::webhooks::stripe::handle_stripe_webhook),
        )
        .layer(webhook_cors());

    Router::new()
        .merge(account_routes)
        .merge(webhook_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .with_state(state)
}

fn account_cors(config: &Config) -> CorsLayer {
    if config.allows_any_origin() {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = config
        .api
        .cors_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
        .max_age(std::time::Duration::from_secs(3600))
}

fn webhook_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::POST, Method::OPTIONS])
        .allow_headers([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            HeaderName::from_static("stripe-signature"),
        ])
}

/// Bearer session authentication
///
/// Validates the identity provider's token and injects `AuthContext`
/// into request extensions.
async fn jwt_auth_layer(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    let auth_context = authenticate_bearer(auth_header, state.session_secret())?;

    req.extensions_mut().insert(auth_context);

    Ok(next.run(req).await)
}
