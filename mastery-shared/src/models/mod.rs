/// Records held in the relational store
///
/// - `profile`: one profile per identity-provider user
/// - `enrollment`: administrative purchase record (unpaid → paid)
/// - `entitlement`: access-control record written by the payment webhook
/// - `account`: read model combining the three for a signed-in user

pub mod account;
pub mod enrollment;
pub mod entitlement;
pub mod profile;

use serde::{Deserialize, Serialize};
use std::fmt;

pub use account::{Account, EnrollmentReceipt, ALREADY_ENROLLED_MESSAGE};
pub use enrollment::{
    CreateEnrollment, EnrollOutcome, Enrollment, EnrollmentStatus, PaymentConfirmation,
    ProgramAccess,
};
pub use entitlement::{Entitlement, EntitlementGrant, UpsertedEntitlement};
pub use profile::{CreateProfile, Profile};

/// Identity-provider user id
///
/// Opaque to this system: the provider may hand out UUIDs or any other
/// string, and the payment gateway echoes it back as `client_reference_id`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type)]
#[serde(transparent)]
#[sqlx(transparent)]
pub struct UserId(String);

impl UserId {
    /// Wraps a raw id; returns `None` for empty or whitespace-only input.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(UserId(trimmed.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(value: &str) -> Self {
        UserId(value.to_string())
    }
}

impl From<String> for UserId {
    fn from(value: String) -> Self {
        UserId(value)
    }
}

/// A stored text column held a value outside its enum
#[derive(Debug, thiserror::Error)]
#[error("unknown {kind} value: {value}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}
