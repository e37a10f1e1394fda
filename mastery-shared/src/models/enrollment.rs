/// Enrollment model
///
/// The enrollment is the administrative record of a purchase. It is created
/// unpaid/locked when the user signs up and flipped to paid/unlocked by the
/// payment webhook. It never decides access on its own; see `entitlement`.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE enrollments (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     user_id TEXT NOT NULL REFERENCES user_profiles(id),
///     email VARCHAR(320) NOT NULL,
///     enrollment_status VARCHAR(16) NOT NULL DEFAULT 'unpaid',
///     program_access VARCHAR(16) NOT NULL DEFAULT 'locked',
///     payment_amount INTEGER NOT NULL DEFAULT 97,
///     payment_confirmed_at TIMESTAMPTZ,
///     payment_method VARCHAR(32),
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     CONSTRAINT enrollments_user_id_key UNIQUE (user_id)
/// );
/// ```

use super::{UnknownVariant, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Course price in whole dollars
pub const DEFAULT_PAYMENT_AMOUNT: i32 = 97;

/// Payment method recorded when the Stripe webhook confirms a purchase
pub const STRIPE_PAYMENT_METHOD: &str = "stripe";

/// Payment state of an enrollment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnrollmentStatus {
    Unpaid,
    Paid,
}

impl EnrollmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnrollmentStatus::Unpaid => "unpaid",
            EnrollmentStatus::Paid => "paid",
        }
    }
}

impl TryFrom<String> for EnrollmentStatus {
    type Error = UnknownVariant;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "unpaid" => Ok(EnrollmentStatus::Unpaid),
            "paid" => Ok(EnrollmentStatus::Paid),
            _ => Err(UnknownVariant {
                kind: "enrollment_status",
                value,
            }),
        }
    }
}

/// Whether the program content is unlocked for this enrollment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgramAccess {
    Locked,
    Unlocked,
}

impl ProgramAccess {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProgramAccess::Locked => "locked",
            ProgramAccess::Unlocked => "unlocked",
        }
    }
}

impl TryFrom<String> for ProgramAccess {
    type Error = UnknownVariant;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "locked" => Ok(ProgramAccess::Locked),
            "unlocked" => Ok(ProgramAccess::Unlocked),
            _ => Err(UnknownVariant {
                kind: "program_access",
                value,
            }),
        }
    }
}

/// Enrollment record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Enrollment {
    pub id: Uuid,

    /// Owning user (unique)
    pub user_id: UserId,

    /// Email captured at signup
    pub email: String,

    #[sqlx(try_from = "String")]
    pub enrollment_status: EnrollmentStatus,

    #[sqlx(try_from = "String")]
    pub program_access: ProgramAccess,

    /// Price in whole dollars
    pub payment_amount: i32,

    /// Set by the payment webhook
    pub payment_confirmed_at: Option<DateTime<Utc>>,

    /// Set by the payment webhook ("stripe")
    pub payment_method: Option<String>,
}

impl Enrollment {
    /// Builds the unpaid/locked record a new signup starts with.
    pub fn new_unpaid(data: CreateEnrollment) -> Self {
        Enrollment {
            id: Uuid::new_v4(),
            user_id: data.user_id,
            email: data.email,
            enrollment_status: EnrollmentStatus::Unpaid,
            program_access: ProgramAccess::Locked,
            payment_amount: data.payment_amount,
            payment_confirmed_at: None,
            payment_method: None,
        }
    }

    /// Applies a webhook payment confirmation in place.
    pub fn confirm_payment(&mut self, confirmation: &PaymentConfirmation) {
        self.enrollment_status = EnrollmentStatus::Paid;
        self.program_access = ProgramAccess::Unlocked;
        self.payment_confirmed_at = Some(confirmation.confirmed_at);
        self.payment_method = Some(confirmation.method.clone());
    }

    pub fn is_paid(&self) -> bool {
        self.enrollment_status == EnrollmentStatus::Paid
    }
}

/// Input for creating an enrollment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateEnrollment {
    pub user_id: UserId,
    pub email: String,
    pub payment_amount: i32,
}

impl CreateEnrollment {
    /// Enrollment at the standard course price.
    pub fn standard(user_id: UserId, email: impl Into<String>) -> Self {
        CreateEnrollment {
            user_id,
            email: email.into(),
            payment_amount: DEFAULT_PAYMENT_AMOUNT,
        }
    }
}

/// Result of an enrollment insert
///
/// A second enrollment for the same user is an expected condition and is
/// reported, not raised.
#[derive(Debug, Clone, PartialEq)]
pub enum EnrollOutcome {
    Created(Enrollment),
    AlreadyEnrolled,
}

/// Payment facts the webhook writes onto the enrollment
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentConfirmation {
    pub confirmed_at: DateTime<Utc>,
    pub method: String,
}

impl PaymentConfirmation {
    /// Confirmation stamped now with the Stripe payment method.
    pub fn stripe_now() -> Self {
        PaymentConfirmation {
            confirmed_at: Utc::now(),
            method: STRIPE_PAYMENT_METHOD.to_string(),
        }
    }
}
