//! Load configuration from the process environment (and an optional `.env` file).

use crate::config::types::{AppConfig, Config, DbConfig, TenantDbConfig};
use crate::error::ConfigError;
use sqlx::postgres::PgSslMode;

/// Load `.env` if present, then read the environment. A missing `.env` is not an error.
pub fn load() -> Result<Config, ConfigError> {
    match dotenvy::dotenv() {
        Ok(path) => tracing::debug!(path = %path.display(), "loaded .env"),
        Err(e) if e.not_found() => {}
        Err(e) => return Err(ConfigError::DotEnv(e)),
    }
    Config::from_env()
}

impl Config {
    /// Read configuration from the process environment, applying defaults for unset variables.
    pub fn from_env() -> Result<Config, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup. A variable that is set but empty is an error;
    /// an unset variable takes its default.
    pub fn from_lookup<F>(lookup: F) -> Result<Config, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &'static str, default: &str| -> Result<String, ConfigError> {
            let value = lookup(key).unwrap_or_else(|| default.to_string());
            if value.trim().is_empty() {
                return Err(ConfigError::Missing(key));
            }
            Ok(value)
        };

        let app = AppConfig {
            port: parse_port("APP_PORT", get("APP_PORT", "8080")?)?,
            name: get("APP_NAME", "Mikroservis Template")?,
            environment: get("ENVIRONMENT", "dev")?,
            jwt_secret: get("JWT_SECRET", "secret")?,
        };

        let db = DbConfig {
            host: get("DB_HOST", "localhost")?,
            user: get("DB_USER", "postgres")?,
            password: get("DB_PASSWORD", "masterkey")?,
            name: get("DB_NAME", "mikroservis_template")?,
            port: parse_port("DB_PORT", get("DB_PORT", "5432")?)?,
            ssl_mode: parse_ssl_mode("DB_SSL_MODE", get("DB_SSL_MODE", "disable")?)?,
        };

        let tenant_db = TenantDbConfig {
            user: get("TENANT_DB_USER", "postgres")?,
            password: get("TENANT_DB_PASSWORD", "postgres")?,
            name: get("TENANT_DB_NAME", "mikroservis_template")?,
            ssl_mode: parse_ssl_mode("TENANT_DB_SSL_MODE", get("TENANT_DB_SSL_MODE", "disable")?)?,
        };

        Ok(Config { app, db, tenant_db })
    }
}

fn parse_port(key: &'static str, value: String) -> Result<u16, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Invalid {
        key,
        value,
        reason: "expected a port number",
    })
}

fn parse_ssl_mode(key: &'static str, value: String) -> Result<PgSslMode, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Invalid {
        key,
        value,
        reason: "expected one of disable, allow, prefer, require, verify-ca, verify-full",
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = Config::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config.app.port, 8080);
        assert_eq!(config.app.name, "Mikroservis Template");
        assert_eq!(config.app.environment, "dev");
        assert_eq!(config.app.jwt_secret, "secret");
        assert_eq!(config.db.host, "localhost");
        assert_eq!(config.db.user, "postgres");
        assert_eq!(config.db.password, "masterkey");
        assert_eq!(config.db.name, "mikroservis_template");
        assert_eq!(config.db.port, 5432);
        assert!(matches!(config.db.ssl_mode, PgSslMode::Disable));
        assert!(matches!(config.tenant_db.ssl_mode, PgSslMode::Disable));
        assert_eq!(config.tenant_db.user, "postgres");
        assert_eq!(config.tenant_db.password, "postgres");
    }

    #[test]
    fn environment_overrides_defaults() {
        let config = Config::from_lookup(lookup_from(&[
            ("APP_PORT", "9090"),
            ("APP_NAME", "billing"),
            ("DB_HOST", "db.internal"),
            ("DB_PORT", "6543"),
        ]))
        .unwrap();
        assert_eq!(config.app.port, 9090);
        assert_eq!(config.app.name, "billing");
        assert_eq!(config.db.host, "db.internal");
        assert_eq!(config.db.port, 6543);
    }

    #[test]
    fn empty_value_is_missing() {
        let err = Config::from_lookup(lookup_from(&[("DB_PASSWORD", "")])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("DB_PASSWORD")));
    }

    #[test]
    fn bad_port_is_invalid() {
        let err = Config::from_lookup(lookup_from(&[("APP_PORT", "eighty")])).unwrap_err();
        match err {
            ConfigError::Invalid { key, value, .. } => {
                assert_eq!(key, "APP_PORT");
                assert_eq!(value, "eighty");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn ssl_mode_is_parsed_case_insensitively() {
        let config = Config::from_lookup(lookup_from(&[
            ("DB_SSL_MODE", "Require"),
            ("TENANT_DB_SSL_MODE", "verify-full"),
        ]))
        .unwrap();
        assert!(matches!(config.db.ssl_mode, PgSslMode::Require));
        assert!(matches!(config.tenant_db.ssl_mode, PgSslMode::VerifyFull));
        assert!(config.db.dsn().contains("sslmode=require"));
    }

    #[test]
    fn misspelled_ssl_mode_is_invalid() {
        for key in ["DB_SSL_MODE", "TENANT_DB_SSL_MODE"] {
            let err = Config::from_lookup(lookup_from(&[(key, "requrie")])).unwrap_err();
            match err {
                ConfigError::Invalid { key: k, value, .. } => {
                    assert_eq!(k, key);
                    assert_eq!(value, "requrie");
                }
                other => panic!("unexpected error: {other}"),
            }
        }
    }

    #[test]
    fn dsn_masks_password() {
        let config = Config::from_lookup(lookup_from(&[])).unwrap();
        let dsn = config.db.dsn();
        assert!(dsn.contains("host=localhost"));
        assert!(dsn.contains("dbname=mikroservis_template"));
        assert!(!dsn.contains("masterkey"));
    }

    #[test]
    fn tenant_connect_options_use_service_account() {
        let config = Config::from_lookup(lookup_from(&[("TENANT_DB_NAME", "tenant_data")])).unwrap();
        let opts = config.tenant_db.connect_options("10.0.0.7", 5433);
        assert_eq!(opts.get_host(), "10.0.0.7");
        assert_eq!(opts.get_port(), 5433);
        assert_eq!(opts.get_username(), "postgres");
        assert_eq!(opts.get_database(), Some("tenant_data"));
    }
}
