/// API route handlers
///
/// - `health`: Health check endpoint
/// - `me`: Account state of the signed-in user
/// - `webhooks`: Payment provider callbacks

pub mod health;
pub mod me;
pub mod webhooks;
