//! Schema migrations on the primary pool.

use crate::error::DbError;
use sqlx::migrate::Migrator;
use sqlx::PgPool;
use std::path::Path;

/// Apply every pending migration. Idempotent: already-applied versions are skipped.
pub async fn run_migrations(pool: &PgPool, migrator: &Migrator) -> Result<(), DbError> {
    migrator.run(pool).await?;
    tracing::info!(count = migrator.iter().count(), "migrations applied");
    Ok(())
}

/// Load migrations from a directory at runtime (for services that do not embed them with `sqlx::migrate!`).
pub async fn migrator_from_dir(dir: impl AsRef<Path>) -> Result<Migrator, DbError> {
    Ok(Migrator::new(dir.as_ref()).await?)
}
