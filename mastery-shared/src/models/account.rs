/// Account read model served by `GET /v1/me`
///
/// Bundles everything the client session needs after sign-in so it can be
/// fetched in one round trip.

use super::{Enrollment, Entitlement, Profile, UserId};
use serde::{Deserialize, Serialize};

/// Profile, enrollment and entitlement of one user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub user_id: UserId,
    pub profile: Option<Profile>,
    pub enrollment: Option<Enrollment>,
    pub entitlement: Option<Entitlement>,

    /// Derived from the entitlement at read time
    pub has_active_access: bool,
}

impl Account {
    pub fn new(
        user_id: UserId,
        profile: Option<Profile>,
        enrollment: Option<Enrollment>,
        entitlement: Option<Entitlement>,
    ) -> Self {
        let has_active_access = entitlement
            .as_ref()
            .map_or(false, Entitlement::grants_access);

        Account {
            user_id,
            profile,
            enrollment,
            entitlement,
            has_active_access,
        }
    }

    /// Account with no records yet
    pub fn empty(user_id: UserId) -> Self {
        Account::new(user_id, None, None, None)
    }
}

/// Response of `POST /v1/me/enrollment`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum EnrollmentReceipt {
    Created { enrollment: Enrollment },
    AlreadyEnrolled { message: String },
}

/// Informational text shown when a user enrolls twice
pub const ALREADY_ENROLLED_MESSAGE: &str = "You are already enrolled in this program.";

impl EnrollmentReceipt {
    pub fn already_enrolled() -> Self {
        EnrollmentReceipt::AlreadyEnrolled {
            message: ALREADY_ENROLLED_MESSAGE.to_string(),
        }
    }
}
