/// Embedded schema migrations
///
/// `mastery-shared/migrations/` holds reversible `{version}_{name}.up.sql` /
/// `.down.sql` pairs for `user_profiles`, `enrollments` and `entitlements`.
/// They are compiled in with `sqlx::migrate!` and applied at API startup.

use sqlx::migrate::{MigrateDatabase, MigrateError, Migrator};
use sqlx::{PgPool, Postgres};
use tracing::info;

static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// What `_sqlx_migrations` records
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationStatus {
    pub applied: usize,

    /// Embedded migrations not yet applied
    pub pending: usize,

    pub latest_version: Option<i64>,
}

/// Applies every pending migration.
pub async fn run_migrations(pool: &PgPool) -> Result<(), MigrateError> {
    let embedded = MIGRATOR
        .iter()
        .filter(|migration| !migration.migration_type.is_down_migration())
        .count();
    info!(embedded, "Applying schema migrations");

    MIGRATOR.run(pool).await?;

    info!("Schema is current");
    Ok(())
}

/// Compares the embedded migrations with those the database has applied.
pub async fn get_migration_status(pool: &PgPool) -> Result<MigrationStatus, sqlx::Error> {
    let tracked: Option<String> =
        sqlx::query_scalar("SELECT to_regclass('public._sqlx_migrations')::text")
            .fetch_one(pool)
            .await?;

    let applied_versions: Vec<i64> = if tracked.is_some() {
        sqlx::query_scalar(
            "SELECT version FROM _sqlx_migrations WHERE success ORDER BY version",
        )
        .fetch_all(pool)
        .await?
    } else {
        Vec::new()
    };

    let pending = MIGRATOR
        .iter()
        .filter(|migration| !migration.migration_type.is_down_migration())
        .filter(|migration| !applied_versions.contains(&migration.version))
        .count();

    Ok(MigrationStatus {
        applied: applied_versions.len(),
        pending,
        latest_version: applied_versions.last().copied(),
    })
}

/// Creates the database named in `database_url` if it is missing.
///
/// Used by local tooling and the database-backed tests; production
/// databases are provisioned ahead of time.
pub async fn ensure_database_exists(database_url: &str) -> Result<(), sqlx::Error> {
    if Postgres::database_exists(database_url).await? {
        return Ok(());
    }

    info!("Creating missing database");
    Postgres::create_database(database_url).await
}
