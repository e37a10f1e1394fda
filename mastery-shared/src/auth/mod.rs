/// Session authentication
///
/// Users sign in with the external identity provider, which issues HS256
/// session tokens. This crate never issues credentials of its own; it only
/// validates the provider's tokens and turns them into an [`AuthContext`].
///
/// # Modules
///
/// - [`jwt`]: Session token claims and validation
/// - [`middleware`]: Bearer header parsing into an authentication context
///
/// [`AuthContext`]: middleware::AuthContext

pub mod jwt;
pub mod middleware;
