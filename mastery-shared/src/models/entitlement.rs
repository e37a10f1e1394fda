/// Entitlement model
///
/// The entitlement is the source of truth for "does this user get the
/// dashboard". It does not exist until the first successful checkout event,
/// after which the payment webhook upserts it keyed by `user_id`.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE entitlements (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     user_id TEXT NOT NULL,
///     has_active_access BOOLEAN NOT NULL DEFAULT FALSE,
///     payment_verified BOOLEAN NOT NULL DEFAULT FALSE,
///     stripe_payment_intent_id VARCHAR(255),
///     stripe_customer_id VARCHAR(255),
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     expires_at TIMESTAMPTZ,
///     CONSTRAINT entitlements_user_id_key UNIQUE (user_id)
/// );
/// ```

use super::UserId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Access-control record for one user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Entitlement {
    pub id: Uuid,

    /// Owning user (unique)
    pub user_id: UserId,

    pub has_active_access: bool,

    pub payment_verified: bool,

    /// Stripe `payment_intent` of the granting checkout
    pub stripe_payment_intent_id: Option<String>,

    /// Stripe `customer` of the granting checkout
    pub stripe_customer_id: Option<String>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,

    /// Access lapses at this instant; `None` means lifetime access
    pub expires_at: Option<DateTime<Utc>>,
}

impl Entitlement {
    /// Whether this record unlocks the product at `now`.
    ///
    /// Both flags must be set and the optional expiry must lie in the future.
    pub fn grants_access_at(&self, now: DateTime<Utc>) -> bool {
        self.has_active_access
            && self.payment_verified
            && self.expires_at.map_or(true, |expires| expires > now)
    }

    pub fn grants_access(&self) -> bool {
        self.grants_access_at(Utc::now())
    }

    /// Builds the row a first grant inserts.
    pub fn from_grant(grant: &EntitlementGrant, now: DateTime<Utc>) -> Self {
        Entitlement {
            id: Uuid::new_v4(),
            user_id: grant.user_id.clone(),
            has_active_access: true,
            payment_verified: true,
            stripe_payment_intent_id: grant.stripe_payment_intent_id.clone(),
            stripe_customer_id: grant.stripe_customer_id.clone(),
            created_at: now,
            updated_at: now,
            expires_at: None,
        }
    }

    /// Re-applies a grant to an existing row.
    ///
    /// Ids missing from a redelivered event keep their previous values. A
    /// new payment lifts any earlier expiry.
    pub fn apply_grant(&mut self, grant: &EntitlementGrant, now: DateTime<Utc>) {
        self.has_active_access = true;
        self.payment_verified = true;
        self.expires_at = None;
        if grant.stripe_payment_intent_id.is_some() {
            self.stripe_payment_intent_id = grant.stripe_payment_intent_id.clone();
        }
        if grant.stripe_customer_id.is_some() {
            self.stripe_customer_id = grant.stripe_customer_id.clone();
        }
        self.updated_at = now;
    }
}

/// Access grant derived from a completed checkout
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitlementGrant {
    pub user_id: UserId,
    pub stripe_payment_intent_id: Option<String>,
    pub stripe_customer_id: Option<String>,
}

/// Upsert result
#[derive(Debug, Clone, PartialEq)]
pub struct UpsertedEntitlement {
    pub entitlement: Entitlement,

    /// `true` when no row existed for the user before this write
    pub created: bool,
}
