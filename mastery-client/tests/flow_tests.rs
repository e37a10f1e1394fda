/// Purchase flow across session, enrollment, poller and gate
///
/// The payment webhook is stood in for by a direct store upsert, which is
/// exactly what the receiver performs.

use mastery_client::enroll::{checkout_url, enroll, EnrollmentNotice};
use mastery_client::gate::{decide, AuthState, GateConfig, GateDecision, GateInput, View};
use mastery_client::identity::{ManualIdentity, Session};
use mastery_client::navigator::RecordingNavigator;
use mastery_client::poller::{PollState, PollerConfig, SuccessFlow};
use mastery_client::session::SessionContext;
use mastery_client::source::{NewEnrollment, StoreSource};
use mastery_shared::models::{EntitlementGrant, UserId};
use mastery_shared::store::{AccountStore, InMemoryStore};
use reqwest::Url;
use std::sync::Arc;
use std::time::Duration;

const APP_HOST: &str = "app.medicaremastery.app";

fn app_root(auth: AuthState) -> GateDecision {
    decide(
        &GateConfig::default(),
        &GateInput {
            host: APP_HOST,
            path: "/",
            auth,
        },
    )
}

#[tokio::test(start_paused = true)]
async fn test_signup_checkout_webhook_unlocks_dashboard() {
    let store = Arc::new(InMemoryStore::new());
    let source = Arc::new(StoreSource::new(store.clone()));
    let identity = Arc::new(ManualIdentity::default());
    let context = SessionContext::start(identity.clone(), source.clone());

    // Signed out: the application root shows the login view
    assert_eq!(
        app_root(context.loaded().await.auth_state()),
        GateDecision::Render(View::Login)
    );

    let session = Session::new(UserId::from("u1"), Some("u1@example.com".to_string()), "token");
    identity.sign_in(session.clone());
    let mut snapshots = context.subscribe();
    let snapshot = snapshots
        .wait_for(|s| !s.loading && s.session.is_some())
        .await
        .unwrap()
        .clone();
    assert_eq!(
        app_root(snapshot.auth_state()),
        GateDecision::Redirect(GateConfig::default().site_url)
    );

    let notice = enroll(
        source.as_ref(),
        &session,
        NewEnrollment {
            email: None,
            full_name: "Pat Doe".to_string(),
            phone: "555-0100".to_string(),
        },
    )
    .await;
    assert!(matches!(notice, EnrollmentNotice::Enrolled(_)));

    let link = checkout_url(
        &Url::parse("https://buy.stripe.com/eVqaERa8Fah48ri99Q8k800").unwrap(),
        &session,
    );
    assert!(link.as_str().contains("client_reference_id=u1"));

    // Back from checkout; the webhook lands five seconds later
    let navigator = Arc::new(RecordingNavigator::new());
    let flow = SuccessFlow::mount(
        Some(&session),
        source.clone(),
        navigator.clone(),
        PollerConfig {
            redirect_to: "https://app.medicaremastery.app/".to_string(),
            ..PollerConfig::default()
        },
    )
    .unwrap();

    let webhook_store = store.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(5)).await;
        webhook_store
            .upsert_entitlement(EntitlementGrant {
                user_id: UserId::from("u1"),
                stripe_payment_intent_id: Some("pi_1".to_string()),
                stripe_customer_id: Some("cus_1".to_string()),
            })
            .await
            .unwrap();
    });

    assert_eq!(flow.finished().await, PollState::Verified { attempts: 3 });

    tokio::time::sleep(Duration::from_secs(4)).await;
    assert_eq!(navigator.visits(), vec!["https://app.medicaremastery.app/".to_string()]);

    context.refresh();
    let snapshot = snapshots
        .wait_for(|s| !s.loading && s.has_active_access())
        .await
        .unwrap()
        .clone();
    assert_eq!(
        app_root(snapshot.auth_state()),
        GateDecision::Render(View::Dashboard)
    );

    flow.unmount().await;
    context.shutdown().await;
}
