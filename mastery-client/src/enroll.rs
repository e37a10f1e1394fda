/// Enrollment and checkout hand-off
///
/// Enrolling records the buyer before payment; the checkout link then carries
/// their user id as `client_reference_id` so the payment webhook can attribute
/// the purchase.

use crate::identity::Session;
use crate::source::{AccountSource, NewEnrollment, SourceError};
use mastery_shared::models::{Enrollment, EnrollmentReceipt};
use reqwest::Url;

/// Shown when enrollment fails for a reason the user cannot act on
pub const ENROLLMENT_FAILED_MESSAGE: &str =
    "We could not complete your enrollment. Please try again in a moment.";

/// Outcome to show on the enrollment form
#[derive(Debug, Clone, PartialEq)]
pub enum EnrollmentNotice {
    Enrolled(Enrollment),

    /// Informational, not an error
    AlreadyEnrolled(String),

    /// Plain-language failure; the raw error is only logged
    Failed(String),
}

impl EnrollmentNotice {
    /// Whether the user may go on to checkout
    pub fn can_checkout(&self) -> bool {
        !matches!(self, EnrollmentNotice::Failed(_))
    }
}

pub async fn enroll(
    source: &dyn AccountSource,
    session: &Session,
    form: NewEnrollment,
) -> EnrollmentNotice {
    match source.enroll(session, form).await {
        Ok(EnrollmentReceipt::Created { enrollment }) => {
            tracing::info!(user_id = %session.user.id, enrollment_id = %enrollment.id, "Enrolled");
            EnrollmentNotice::Enrolled(enrollment)
        }
        Ok(EnrollmentReceipt::AlreadyEnrolled { message }) => {
            EnrollmentNotice::AlreadyEnrolled(message)
        }
        Err(SourceError::MissingEmail) => {
            EnrollmentNotice::Failed(SourceError::MissingEmail.to_string())
        }
        Err(e) => {
            tracing::error!(user_id = %session.user.id, error = %e, "Enrollment failed");
            EnrollmentNotice::Failed(ENROLLMENT_FAILED_MESSAGE.to_string())
        }
    }
}

/// Hosted checkout link for `session`'s user.
pub fn checkout_url(base: &Url, session: &Session) -> Url {
    let mut url = base.clone();
    {
        let mut query = url.query_pairs_mut();
        query.append_pair("client_reference_id", session.user.id.as_str());
        if let Some(email) = &session.user.email {
            query.append_pair("prefilled_email", email);
        }
    }
    url
}
