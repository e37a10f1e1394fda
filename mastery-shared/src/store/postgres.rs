/// PostgreSQL-backed `AccountStore`
///
/// Duplicate handling is expressed with `ON CONFLICT` clauses against the
/// `user_id` unique constraints rather than by inspecting error codes.

use super::{AccountStore, StoreResult};
use crate::models::{
    CreateEnrollment, CreateProfile, EnrollOutcome, Enrollment, Entitlement, EntitlementGrant,
    PaymentConfirmation, Profile, UpsertedEntitlement, UserId,
};
use async_trait::async_trait;
use sqlx::PgPool;
use tracing::debug;

/// `AccountStore` over a `sqlx` pool
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

#[derive(sqlx::FromRow)]
struct UpsertRow {
    #[sqlx(flatten)]
    entitlement: Entitlement,
    created: bool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl AccountStore for PgStore {
    async fn ping(&self) -> StoreResult<()> {
        crate::db::pool::health_check(&self.pool).await?;
        Ok(())
    }

    async fn find_profile(&self, user_id: &UserId) -> StoreResult<Option<Profile>> {
        let profile = sqlx::query_as::<_, Profile>(
            "SELECT id, full_name, phone FROM user_profiles WHERE id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(profile)
    }

    async fn ensure_profile(&self, data: CreateProfile) -> StoreResult<Profile> {
        let inserted = sqlx::query(
            r#"
            INSERT INTO user_profiles (id, full_name, phone)
            VALUES ($1, $2, $3)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(&data.id)
        .bind(&data.full_name)
        .bind(&data.phone)
        .execute(&self.pool)
        .await?;

        debug!(
            user_id = %data.id,
            created = inserted.rows_affected() > 0,
            "Ensured user profile"
        );

        let profile = sqlx::query_as::<_, Profile>(
            "SELECT id, full_name, phone FROM user_profiles WHERE id = $1",
        )
        .bind(&data.id)
        .fetch_one(&self.pool)
        .await?;

        Ok(profile)
    }

    async fn find_enrollment(&self, user_id: &UserId) -> StoreResult<Option<Enrollment>> {
        let enrollment = sqlx::query_as::<_, Enrollment>(
            r#"
            SELECT id, user_id, email, enrollment_status, program_access,
                   payment_amount, payment_confirmed_at, payment_method
            FROM enrollments
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(enrollment)
    }

    async fn create_enrollment(&self, data: CreateEnrollment) -> StoreResult<EnrollOutcome> {
        let enrollment = sqlx::query_as::<_, Enrollment>(
            r#"
            INSERT INTO enrollments (user_id, email, payment_amount)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id) DO NOTHING
            RETURNING id, user_id, email, enrollment_status, program_access,
                      payment_amount, payment_confirmed_at, payment_method
            "#,
        )
        .bind(&data.user_id)
        .bind(&data.email)
        .bind(data.payment_amount)
        .fetch_optional(&self.pool)
        .await?;

        Ok(match enrollment {
            Some(enrollment) => EnrollOutcome::Created(enrollment),
            None => EnrollOutcome::AlreadyEnrolled,
        })
    }

    async fn mark_enrollment_paid(
        &self,
        user_id: &UserId,
        confirmation: PaymentConfirmation,
    ) -> StoreResult<Option<Enrollment>> {
        let enrollment = sqlx::query_as::<_, Enrollment>(
            r#"
            UPDATE enrollments
            SET enrollment_status = 'paid',
                program_access = 'unlocked',
                payment_confirmed_at = $2,
                payment_method = $3
            WHERE user_id = $1
            RETURNING id, user_id, email, enrollment_status, program_access,
                      payment_amount, payment_confirmed_at, payment_method
            "#,
        )
        .bind(user_id)
        .bind(confirmation.confirmed_at)
        .bind(&confirmation.method)
        .fetch_optional(&self.pool)
        .await?;

        Ok(enrollment)
    }

    async fn find_entitlement(&self, user_id: &UserId) -> StoreResult<Option<Entitlement>> {
        let entitlement = sqlx::query_as::<_, Entitlement>(
            r#"
            SELECT id, user_id, has_active_access, payment_verified,
                   stripe_payment_intent_id, stripe_customer_id,
                   created_at, updated_at, expires_at
            FROM entitlements
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(entitlement)
    }

    async fn find_active_entitlement(
        &self,
        user_id: &UserId,
    ) -> StoreResult<Option<Entitlement>> {
        let entitlement = sqlx::query_as::<_, Entitlement>(
            r#"
            SELECT id, user_id, has_active_access, payment_verified,
                   stripe_payment_intent_id, stripe_customer_id,
                   created_at, updated_at, expires_at
            FROM entitlements
            WHERE user_id = $1
              AND has_active_access = TRUE
              AND payment_verified = TRUE
              AND (expires_at IS NULL OR expires_at > NOW())
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(entitlement)
    }

    async fn upsert_entitlement(
        &self,
        grant: EntitlementGrant,
    ) -> StoreResult<UpsertedEntitlement> {
        // xmax is zero only for a freshly inserted tuple
        let row = sqlx::query_as::<_, UpsertRow>(
            r#"
            INSERT INTO entitlements (
                user_id, has_active_access, payment_verified,
                stripe_payment_intent_id, stripe_customer_id
            )
            VALUES ($1, TRUE, TRUE, $2, $3)
            ON CONFLICT (user_id) DO UPDATE SET
                has_active_access = TRUE,
                payment_verified = TRUE,
                stripe_payment_intent_id = COALESCE(
                    EXCLUDED.stripe_payment_intent_id,
                    entitlements.stripe_payment_intent_id
                ),
                stripe_customer_id = COALESCE(
                    EXCLUDED.stripe_customer_id,
                    entitlements.stripe_customer_id
                ),
                expires_at = NULL,
                updated_at = NOW()
            RETURNING id, user_id, has_active_access, payment_verified,
                      stripe_payment_intent_id, stripe_customer_id,
                      created_at, updated_at, expires_at,
                      (xmax = 0) AS created
            "#,
        )
        .bind(&grant.user_id)
        .bind(&grant.stripe_payment_intent_id)
        .bind(&grant.stripe_customer_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(UpsertedEntitlement {
            entitlement: row.entitlement,
            created: row.created,
        })
    }
}
