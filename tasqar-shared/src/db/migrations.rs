/// Embedded schema migrations
///
/// SQL files live in `tasqar-shared/migrations/` and are compiled into the
/// binary with `sqlx::migrate!`, so the API applies them at start-up without
/// needing the files on disk.

use sqlx::{migrate::MigrateDatabase, postgres::PgPool, Postgres};
use tracing::{info, warn};

/// Migrations that have been applied to a database
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationStatus {
    pub applied_migrations: usize,
    pub latest_version: Option<i64>,
}

impl MigrationStatus {
    /// Whether every embedded migration has been applied
    pub fn is_up_to_date(&self) -> bool {
        self.latest_version == latest_embedded_version()
    }
}

/// Version of the newest migration compiled into this binary
pub fn latest_embedded_version() -> Option<i64> {
    sqlx::migrate!("./migrations")
        .iter()
        .map(|migration| migration.version)
        .max()
}

/// Applies all pending migrations
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    info!("Running database migrations");

    sqlx::migrate!("./migrations").run(pool).await.map_err(|e| {
        warn!(error = %e, "Migration failed");
        e
    })?;

    info!("Database schema is up to date");
    Ok(())
}

/// Reads the `_sqlx_migrations` bookkeeping table
pub async fn get_migration_status(pool: &PgPool) -> Result<MigrationStatus, sqlx::Error> {
    let tracked: bool = sqlx::query_scalar("SELECT to_regclass('public._sqlx_migrations') IS NOT NULL")
        .fetch_one(pool)
        .await?;

    if !tracked {
        return Ok(MigrationStatus {
            applied_migrations: 0,
            latest_version: None,
        });
    }

    let (count, latest_version): (i64, Option<i64>) = sqlx::query_as(
        "SELECT COUNT(*), MAX(version) FROM _sqlx_migrations WHERE success = TRUE",
    )
    .fetch_one(pool)
    .await?;

    Ok(MigrationStatus {
        applied_migrations: count as usize,
        latest_version,
    })
}

/// Creates the database named in `database_url` if it is missing
///
/// Meant for development and test set-up.
pub async fn ensure_database_exists(database_url: &str) -> Result<(), sqlx::Error> {
    if !Postgres::database_exists(database_url).await? {
        info!("Creating database");
        Postgres::create_database(database_url).await?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedded_migrations_are_present() {
        assert!(latest_embedded_version().is_some());
    }

    #[test]
    fn test_is_up_to_date() {
        let current = MigrationStatus {
            applied_migrations: 1,
            latest_version: latest_embedded_version(),
        };
        assert!(current.is_up_to_date());

        let empty = MigrationStatus {
            applied_migrations: 0,
            latest_version: None,
        };
        assert!(!empty.is_up_to_date());
    }
}
