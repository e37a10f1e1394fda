//! # Medicare Mastery Client
//!
//! Command-line driver for the client flow against a running API server.
//!
//! ## Usage
//!
//! ```bash
//! # Which view does a location render for the configured session?
//! cargo run -p mastery-client -- gate app.medicaremastery.app /
//!
//! # Where does the login view send this user once signed in?
//! cargo run -p mastery-client -- login --user-id <id> --access-token <token>
//!
//! # Enroll, then print the attributed checkout link
//! cargo run -p mastery-client -- enroll "Pat Doe" 555-0100
//! cargo run -p mastery-client -- checkout
//!
//! # Wait for the payment webhook like the success page does
//! cargo run -p mastery-client -- success
//! ```
//!
//! Session flags fall back to `MASTERY_USER_ID`, `MASTERY_ACCESS_TOKEN` and
//! `MASTERY_USER_EMAIL`.

mod cli;

use crate::cli::{Cli, Commands};

use mastery_client::{
    config::ClientConfig,
    enroll::{checkout_url, enroll},
    gate::{after_login, decide, GateConfig, GateDecision, GateInput},
    identity::{ManualIdentity, Session},
    navigator::LogNavigator,
    poller::{PollState, SuccessFlow},
    session::SessionContext,
    source::{AccountSource, HttpSource, NewEnrollment},
};
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mastery_client=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Session flags may come from .env
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = ClientConfig::from_env()?;
    let session = cli.session.session();
    let source = Arc::new(HttpSource::new(config.api_url.clone()));

    let command = cli.command.unwrap_or(Commands::Gate {
        host: None,
        path: "/".to_string(),
    });

    match command {
        Commands::Gate { host, path } => {
            let host = host.unwrap_or_else(|| config.app_host.clone());

            let context = SessionContext::start(Arc::new(ManualIdentity::new(session)), source);
            let snapshot = context.loaded().await;
            let decision = decide(
                &config.gate(),
                &GateInput {
                    host: &host,
                    path: &path,
                    auth: snapshot.auth_state(),
                },
            );
            println!("{:?}", decision);
            context.shutdown().await;
        }
        Commands::Login => {
            let session = require_session(session)?;
            println!("{:?}", login(&config.gate(), source, session).await);
        }
        Commands::Enroll {
            full_name,
            phone,
            contact_email,
        } => {
            let session = require_session(session)?;

            let notice = enroll(
                source.as_ref(),
                &session,
                NewEnrollment {
                    email: contact_email,
                    full_name,
                    phone,
                },
            )
            .await;
            println!("{:?}", notice);
        }
        Commands::Checkout => {
            let session = require_session(session)?;
            println!("{}", checkout_url(&config.checkout_url, &session));
        }
        Commands::Success { host } => {
            let host = host.unwrap_or_else(|| config.app_host.clone());

            let Some(flow) = SuccessFlow::mount(
                session.as_ref(),
                source,
                Arc::new(LogNavigator),
                config.poller(&host),
            ) else {
                anyhow::bail!(NOT_SIGNED_IN);
            };

            match flow.finished().await {
                PollState::Verified { .. } => {
                    let mut countdown = flow.countdown();
                    while countdown.changed().await.is_ok() {
                        let value = *countdown.borrow_and_update();
                        match value {
                            Some(0) => break,
                            Some(n) => println!("Redirecting in {}...", n),
                            None => {}
                        }
                    }
                }
                PollState::Timeout { attempts } => {
                    println!("Payment not confirmed after {} checks.", attempts);
                    flow.continue_manually();
                }
                PollState::Processing { .. } => {}
            }

            flow.unmount().await;
        }
    }

    Ok(())
}

const NOT_SIGNED_IN: &str =
    "No signed-in user; pass --user-id and --access-token or set MASTERY_USER_ID and MASTERY_ACCESS_TOKEN";

fn require_session(session: Option<Session>) -> anyhow::Result<Session> {
    session.ok_or_else(|| anyhow::anyhow!(NOT_SIGNED_IN))
}

/// Signs `session` in, waits for its account and applies the login view's
/// post-sign-in rule.
async fn login(
    gate: &GateConfig,
    source: Arc<dyn AccountSource>,
    session: Session,
) -> GateDecision {
    let identity = Arc::new(ManualIdentity::default());
    let context = SessionContext::start(identity.clone(), source);
    let mut snapshots = context.subscribe();

    identity.sign_in(session);
    let has_access = match snapshots
        .wait_for(|snapshot| !snapshot.loading && snapshot.session.is_some())
        .await
    {
        Ok(snapshot) => snapshot.has_active_access(),
        Err(_) => false,
    };
    context.shutdown().await;

    after_login(gate, has_access)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mastery_client::gate::View;
    use mastery_client::source::StoreSource;
    use mastery_shared::models::{EntitlementGrant, UserId};
    use mastery_shared::store::{AccountStore, InMemoryStore};

    fn session() -> Session {
        Session::new(UserId::from("u1"), None, "token")
    }

    #[tokio::test]
    async fn test_login_with_access_goes_to_app() {
        let store = Arc::new(InMemoryStore::new());
        store
            .upsert_entitlement(EntitlementGrant {
                user_id: UserId::from("u1"),
                stripe_payment_intent_id: None,
                stripe_customer_id: None,
            })
            .await
            .unwrap();
        let gate = GateConfig::default();

        let decision = login(&gate, Arc::new(StoreSource::new(store)), session()).await;

        assert_eq!(decision, GateDecision::Redirect(gate.app_url.clone()));
    }

    #[tokio::test]
    async fn test_login_without_access_shows_landing() {
        let store = Arc::new(InMemoryStore::new());

        let decision = login(
            &GateConfig::default(),
            Arc::new(StoreSource::new(store)),
            session(),
        )
        .await;

        assert_eq!(decision, GateDecision::Render(View::Landing));
    }

    #[test]
    fn test_missing_session_is_an_error() {
        let err = require_session(None).unwrap_err();
        assert!(err.to_string().contains("MASTERY_USER_ID"));
    }
}
