/// Payment gateway integration
///
/// Only Stripe is supported. The hosted checkout takes the money; this side
/// decodes its webhook events and verifies their signatures.

pub mod stripe;
