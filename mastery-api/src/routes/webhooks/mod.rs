/// Payment provider webhooks
///
/// - `stripe`: `checkout.session.completed` grants the entitlement

pub mod stripe;
