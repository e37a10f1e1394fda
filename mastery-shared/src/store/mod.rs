/// Relational store abstraction
///
/// The API and the client talk to profiles, enrollments and entitlements
/// through the `AccountStore` trait. Uniqueness per user is enforced by the
/// store itself (unique constraints in PostgreSQL, map keys in memory), so
/// concurrent webhook redeliveries for one user converge on a single row
/// without application-level locking.
///
/// # Implementations
///
/// - [`PgStore`]: PostgreSQL via `sqlx`
/// - [`InMemoryStore`]: process-local maps with fault injection, for tests
///   and local development
///
/// # Example
///
/// ```
/// use mastery_shared::models::{EntitlementGrant, UserId};
/// use mastery_shared::store::{AccountStore, InMemoryStore};
///
/// # async fn example() -> Result<(), mastery_shared::store::StoreError> {
/// let store = InMemoryStore::new();
/// let grant = EntitlementGrant {
///     user_id: UserId::from("u1"),
///     stripe_payment_intent_id: Some("pi_1".to_string()),
///     stripe_customer_id: Some("cus_1".to_string()),
/// };
///
/// let upserted = store.upsert_entitlement(grant).await?;
/// assert!(upserted.created);
/// assert!(store.find_active_entitlement(&UserId::from("u1")).await?.is_some());
/// # Ok(())
/// # }
/// ```

pub mod memory;
pub mod postgres;

pub use memory::InMemoryStore;
pub use postgres::PgStore;

use crate::models::{
    CreateEnrollment, CreateProfile, EnrollOutcome, Enrollment, Entitlement, EntitlementGrant,
    PaymentConfirmation, Profile, UpsertedEntitlement, UserId,
};
use async_trait::async_trait;

/// Store failure
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The database rejected or failed a query
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The store could not be reached
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Reads and writes of the three per-user records
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Verifies the store answers.
    async fn ping(&self) -> StoreResult<()>;

    async fn find_profile(&self, user_id: &UserId) -> StoreResult<Option<Profile>>;

    /// Inserts the profile unless one exists; returns the stored row either way.
    async fn ensure_profile(&self, data: CreateProfile) -> StoreResult<Profile>;

    async fn find_enrollment(&self, user_id: &UserId) -> StoreResult<Option<Enrollment>>;

    /// Creates an unpaid, locked enrollment.
    ///
    /// An existing enrollment for the user yields `EnrollOutcome::AlreadyEnrolled`.
    async fn create_enrollment(&self, data: CreateEnrollment) -> StoreResult<EnrollOutcome>;

    /// Marks the user's enrollment paid and unlocked.
    ///
    /// Returns `None` when the user has no enrollment row.
    async fn mark_enrollment_paid(
        &self,
        user_id: &UserId,
        confirmation: PaymentConfirmation,
    ) -> StoreResult<Option<Enrollment>>;

    /// Entitlement in any state.
    async fn find_entitlement(&self, user_id: &UserId) -> StoreResult<Option<Entitlement>>;

    /// Entitlement only if it currently grants access.
    async fn find_active_entitlement(&self, user_id: &UserId)
        -> StoreResult<Option<Entitlement>>;

    /// Creates or re-grants the user's entitlement.
    async fn upsert_entitlement(&self, grant: EntitlementGrant)
        -> StoreResult<UpsertedEntitlement>;
}
