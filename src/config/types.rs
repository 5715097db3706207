//! Typed configuration records. Built once at startup, read-only afterwards.

use sqlx::postgres::{PgConnectOptions, PgSslMode};

/// Full service configuration: application settings plus the primary database.
#[derive(Clone, Debug)]
pub struct Config {
    pub app: AppConfig,
    pub db: DbConfig,
    /// Service account used for every tenant database.
    pub tenant_db: TenantDbConfig,
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub port: u16,
    pub name: String,
    pub environment: String,
    pub jwt_secret: String,
}

impl AppConfig {
    pub fn is_production(&self) -> bool {
        matches!(self.environment.to_lowercase().as_str(), "prod" | "production")
    }
}

#[derive(Clone, Debug)]
pub struct DbConfig {
    pub host: String,
    pub user: String,
    pub password: String,
    pub name: String,
    pub port: u16,
    pub ssl_mode: PgSslMode,
}

impl DbConfig {
    /// libpq-style key/value DSN. The password is masked; use [`DbConfig::connect_options`] to connect.
    pub fn dsn(&self) -> String {
        format!(
            "host={} user={} password=*** dbname={} port={} sslmode={}",
            self.host, self.user, self.name, self.port, ssl_mode_name(self.ssl_mode)
        )
    }

    pub fn connect_options(&self) -> PgConnectOptions {
        PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(&self.user)
            .password(&self.password)
            .database(&self.name)
            .ssl_mode(self.ssl_mode)
    }
}

/// Credentials and database name shared by all tenant hosts. Host and port come from the control plane.
#[derive(Clone, Debug)]
pub struct TenantDbConfig {
    pub user: String,
    pub password: String,
    pub name: String,
    pub ssl_mode: PgSslMode,
}

impl TenantDbConfig {
    pub fn connect_options(&self, host: &str, port: u16) -> PgConnectOptions {
        PgConnectOptions::new()
            .host(host)
            .port(port)
            .username(&self.user)
            .password(&self.password)
            .database(&self.name)
            .ssl_mode(self.ssl_mode)
    }
}

/// libpq spelling of `mode`.
pub fn ssl_mode_name(mode: PgSslMode) -> &'static str {
    match mode {
        PgSslMode::Disable => "disable",
        PgSslMode::Allow => "allow",
        PgSslMode::Prefer => "prefer",
        PgSslMode::Require => "require",
        PgSslMode::VerifyCa => "verify-ca",
        PgSslMode::VerifyFull => "verify-full",
    }
}
