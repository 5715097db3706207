//! Primary (control-plane) database pool.

use crate::config::DbConfig;
use crate::error::DbError;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::time::Duration;

pub const MAX_OPEN_CONNECTIONS: u32 = 10;
pub const IDLE_TIMEOUT: Duration = Duration::from_secs(3);

/// Open the primary pool and verify it with one connection. No retry.
pub async fn connect_primary(config: &DbConfig) -> Result<PgPool, DbError> {
    connect_primary_with(primary_pool_options(), config).await
}

/// [`connect_primary`] with caller-supplied pool options.
pub async fn connect_primary_with(options: PgPoolOptions, config: &DbConfig) -> Result<PgPool, DbError> {
    let pool = options
        .connect_with(config.connect_options())
        .await
        .map_err(DbError::Connect)?;
    tracing::info!(host = %config.host, database = %config.name, "primary database connected");
    Ok(pool)
}

/// Pool limits shared by the primary and tenant pools.
pub fn primary_pool_options() -> PgPoolOptions {
    PgPoolOptions::new()
        .max_connections(MAX_OPEN_CONNECTIONS)
        .idle_timeout(IDLE_TIMEOUT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[tokio::test]
    async fn unreachable_server_is_connect_error() {
        let mut config = Config::from_lookup(|_| None).unwrap().db;
        config.host = "127.0.0.1".to_string();
        config.port = 9;

        let options = primary_pool_options().acquire_timeout(Duration::from_millis(300));
        let err = connect_primary_with(options, &config).await.unwrap_err();
        assert!(matches!(err, DbError::Connect(_)), "unexpected error: {err}");
    }
}
