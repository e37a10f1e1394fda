/// Account reads and enrollment writes
///
/// The client reaches account state either straight through an
/// `AccountStore` (same-process deployments and tests) or over the API's
/// `/v1/me` endpoints with the session's bearer token.

use crate::identity::Session;
use async_trait::async_trait;
use mastery_shared::{
    models::{
        Account, CreateEnrollment, CreateProfile, EnrollOutcome, EnrollmentReceipt, Entitlement,
    },
    store::{AccountStore, StoreError},
};
use reqwest::{StatusCode, Url};
use serde::Serialize;
use std::sync::Arc;

/// Enrollment form input
#[derive(Debug, Clone, Serialize)]
pub struct NewEnrollment {
    /// Falls back to the session email when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub full_name: String,
    pub phone: String,
}

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API responded {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Invalid API URL: {0}")]
    Url(String),

    #[error("An email address is required to enroll")]
    MissingEmail,
}

pub type SourceResult<T> = Result<T, SourceError>;

#[async_trait]
pub trait AccountSource: Send + Sync {
    /// Profile, enrollment and entitlement of the session's user.
    async fn account(&self, session: &Session) -> SourceResult<Account>;

    /// Entitlement only if it currently grants access.
    async fn active_entitlement(&self, session: &Session) -> SourceResult<Option<Entitlement>>;

    /// Creates the profile and an unpaid enrollment.
    async fn enroll(&self, session: &Session, form: NewEnrollment)
        -> SourceResult<EnrollmentReceipt>;
}

/// Direct store access
#[derive(Clone)]
pub struct StoreSource {
    store: Arc<dyn AccountStore>,
}

impl StoreSource {
    pub fn new(store: Arc<dyn AccountStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl AccountSource for StoreSource {
    async fn account(&self, session: &Session) -> SourceResult<Account> {
        let user_id = &session.user.id;

        let (profile, enrollment, entitlement) = tokio::join!(
            self.store.find_profile(user_id),
            self.store.find_enrollment(user_id),
            self.store.find_entitlement(user_id),
        );

        Ok(Account::new(
            user_id.clone(),
            profile?,
            enrollment?,
            entitlement?,
        ))
    }

    async fn active_entitlement(&self, session: &Session) -> SourceResult<Option<Entitlement>> {
        Ok(self.store.find_active_entitlement(&session.user.id).await?)
    }

    async fn enroll(
        &self,
        session: &Session,
        form: NewEnrollment,
    ) -> SourceResult<EnrollmentReceipt> {
        let email = form
            .email
            .or_else(|| session.user.email.clone())
            .ok_or(SourceError::MissingEmail)?;

        self.store
            .ensure_profile(CreateProfile {
                id: session.user.id.clone(),
                full_name: form.full_name,
                phone: form.phone,
            })
            .await?;

        let outcome = self
            .store
            .create_enrollment(CreateEnrollment::standard(session.user.id.clone(), email))
            .await?;

        Ok(match outcome {
            EnrollOutcome::Created(enrollment) => EnrollmentReceipt::Created { enrollment },
            EnrollOutcome::AlreadyEnrolled => EnrollmentReceipt::already_enrolled(),
        })
    }
}

/// API access over HTTP
#[derive(Debug, Clone)]
pub struct HttpSource {
    client: reqwest::Client,
    base: Url,
}

impl HttpSource {
    pub fn new(base: Url) -> Self {
        Self::with_client(reqwest::Client::new(), base)
    }

    pub fn with_client(client: reqwest::Client, base: Url) -> Self {
        Self { client, base }
    }

    fn endpoint(&self, path: &str) -> SourceResult<Url> {
        self.base
            .join(path)
            .map_err(|e| SourceError::Url(e.to_string()))
    }

    async fn error_for(response: reqwest::Response) -> SourceError {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        SourceError::Status { status, body }
    }
}

#[async_trait]
impl AccountSource for HttpSource {
    async fn account(&self, session: &Session) -> SourceResult<Account> {
        let response = self
            .client
            .get(self.endpoint("/v1/me")?)
            .bearer_auth(&session.access_token)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::error_for(response).await);
        }

        Ok(response.json().await?)
    }

    async fn active_entitlement(&self, session: &Session) -> SourceResult<Option<Entitlement>> {
        let response = self
            .client
            .get(self.endpoint("/v1/me/entitlement")?)
            .bearer_auth(&session.access_token)
            .send()
            .await?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => Ok(Some(response.json().await?)),
            _ => Err(Self::error_for(response).await),
        }
    }

    async fn enroll(
        &self,
        session: &Session,
        form: NewEnrollment,
    ) -> SourceResult<EnrollmentReceipt> {
        let response = self
            .client
            .post(self.endpoint("/v1/me/enrollment")?)
            .bearer_auth(&session.access_token)
            .json(&form)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::error_for(response).await);
        }

        Ok(response.json().await?)
    }
}
