/// In-memory `AccountStore`
///
/// Keeps the same uniqueness rules as the PostgreSQL schema (one row per
/// user in each table) and lets callers inject failures so error paths can
/// be exercised without a database.

use super::{AccountStore, StoreError, StoreResult};
use crate::models::{
    CreateEnrollment, CreateProfile, EnrollOutcome, Enrollment, Entitlement, EntitlementGrant,
    PaymentConfirmation, Profile, UpsertedEntitlement, UserId,
};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::RwLock;

#[derive(Debug, Default)]
struct Tables {
    profiles: HashMap<UserId, Profile>,
    enrollments: HashMap<UserId, Enrollment>,
    entitlements: HashMap<UserId, Entitlement>,
}

#[derive(Debug, Default)]
struct Faults {
    failing_reads: AtomicUsize,
    fail_entitlement_writes: AtomicBool,
    fail_enrollment_updates: AtomicBool,
}

/// Process-local store
#[derive(Debug, Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
    faults: Faults,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next `count` read operations fail with `StoreError::Unavailable`.
    pub fn fail_next_reads(&self, count: usize) {
        self.faults.failing_reads.store(count, Ordering::SeqCst);
    }

    /// Makes every entitlement upsert fail until switched off.
    pub fn fail_entitlement_writes(&self, fail: bool) {
        self.faults
            .fail_entitlement_writes
            .store(fail, Ordering::SeqCst);
    }

    /// Makes every enrollment payment update fail until switched off.
    pub fn fail_enrollment_updates(&self, fail: bool) {
        self.faults
            .fail_enrollment_updates
            .store(fail, Ordering::SeqCst);
    }

    pub async fn entitlement_count(&self) -> usize {
        self.tables.read().await.entitlements.len()
    }

    pub async fn enrollment_count(&self) -> usize {
        self.tables.read().await.enrollments.len()
    }

    /// Stores an entitlement as-is, replacing any existing row for the user.
    pub async fn put_entitlement(&self, entitlement: Entitlement) {
        self.tables
            .write()
            .await
            .entitlements
            .insert(entitlement.user_id.clone(), entitlement);
    }

    fn check_read(&self) -> StoreResult<()> {
        let consumed = self
            .faults
            .failing_reads
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |remaining| {
                remaining.checked_sub(1)
            })
            .is_ok();

        if consumed {
            Err(StoreError::Unavailable("injected read failure".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl AccountStore for InMemoryStore {
    async fn ping(&self) -> StoreResult<()> {
        self.check_read()
    }

    async fn find_profile(&self, user_id: &UserId) -> StoreResult<Option<Profile>> {
        self.check_read()?;
        Ok(self.tables.read().await.profiles.get(user_id).cloned())
    }

    async fn ensure_profile(&self, data: CreateProfile) -> StoreResult<Profile> {
        let mut tables = self.tables.write().await;
        let profile = tables
            .profiles
            .entry(data.id.clone())
            .or_insert_with(|| Profile::from(data));

        Ok(profile.clone())
    }

    async fn find_enrollment(&self, user_id: &UserId) -> StoreResult<Option<Enrollment>> {
        self.check_read()?;
        Ok(self.tables.read().await.enrollments.get(user_id).cloned())
    }

    async fn create_enrollment(&self, data: CreateEnrollment) -> StoreResult<EnrollOutcome> {
        let mut tables = self.tables.write().await;

        if tables.enrollments.contains_key(&data.user_id) {
            return Ok(EnrollOutcome::AlreadyEnrolled);
        }

        let enrollment = Enrollment::new_unpaid(data);
        tables
            .enrollments
            .insert(enrollment.user_id.clone(), enrollment.clone());

        Ok(EnrollOutcome::Created(enrollment))
    }

    async fn mark_enrollment_paid(
        &self,
        user_id: &UserId,
        confirmation: PaymentConfirmation,
    ) -> StoreResult<Option<Enrollment>> {
        if self.faults.fail_enrollment_updates.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(
                "injected enrollment update failure".to_string(),
            ));
        }

        let mut tables = self.tables.write().await;
        Ok(tables.enrollments.get_mut(user_id).map(|enrollment| {
            enrollment.confirm_payment(&confirmation);
            enrollment.clone()
        }))
    }

    async fn find_entitlement(&self, user_id: &UserId) -> StoreResult<Option<Entitlement>> {
        self.check_read()?;
        Ok(self.tables.read().await.entitlements.get(user_id).cloned())
    }

    async fn find_active_entitlement(
        &self,
        user_id: &UserId,
    ) -> StoreResult<Option<Entitlement>> {
        self.check_read()?;
        let now = Utc::now();

        Ok(self
            .tables
            .read()
            .await
            .entitlements
            .get(user_id)
            .filter(|entitlement| entitlement.grants_access_at(now))
            .cloned())
    }

    async fn upsert_entitlement(
        &self,
        grant: EntitlementGrant,
    ) -> StoreResult<UpsertedEntitlement> {
        if self.faults.fail_entitlement_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(
                "injected entitlement write failure".to_string(),
            ));
        }

        let now = Utc::now();
        let mut tables = self.tables.write().await;

        let upserted = match tables.entitlements.get_mut(&grant.user_id) {
            Some(existing) => {
                existing.apply_grant(&grant, now);
                UpsertedEntitlement {
                    entitlement: existing.clone(),
                    created: false,
                }
            }
            None => {
                let entitlement = Entitlement::from_grant(&grant, now);
                tables
                    .entitlements
                    .insert(grant.user_id.clone(), entitlement.clone());
                UpsertedEntitlement {
                    entitlement,
                    created: true,
                }
            }
        };

        Ok(upserted)
    }
}
