/// Database layer
///
/// - `pool`: PostgreSQL connection pool with a startup health check
/// - `migrations`: embedded schema migrations for profiles, enrollments and entitlements
///
/// Record types and queries live in `models` and `store`.

pub mod migrations;
pub mod pool;
