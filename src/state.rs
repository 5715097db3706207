//! Shared application context handed to every route and middleware.

use crate::config::Config;
use crate::database::TenantRouter;
use crate::error::HttpClientError;
use crate::http_client::HttpClient;
use crate::jwt::JwtParser;
use sqlx::PgPool;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    /// Primary (control-plane) pool.
    pub pool: PgPool,
    /// Tenant pools, resolved through `pool` on first use.
    pub tenants: Arc<TenantRouter>,
    pub jwt: Arc<JwtParser>,
    pub http: HttpClient,
}

impl AppState {
    pub fn new(config: Config, pool: PgPool) -> Result<Self, HttpClientError> {
        let tenants = TenantRouter::<PgPool>::postgres(pool.clone(), config.tenant_db.clone());
        let jwt = JwtParser::new(&config.app.jwt_secret);
        let http = HttpClient::new(&config.app.name)?;
        Ok(AppState {
            config: Arc::new(config),
            pool,
            tenants: Arc::new(tenants),
            jwt: Arc::new(jwt),
            http,
        })
    }

    pub fn with_tenant_router(mut self, tenants: TenantRouter) -> Self {
        self.tenants = Arc::new(tenants);
        self
    }

    pub fn app_name(&self) -> &str {
        &self.config.app.name
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use sqlx::postgres::PgPoolOptions;

    /// Default configuration with a pool that never connects unless used. Needs a tokio runtime.
    pub fn lazy_state() -> AppState {
        let config = Config::from_lookup(|_| None).unwrap();
        let pool = PgPoolOptions::new().connect_lazy_with(config.db.connect_options());
        AppState::new(config, pool).unwrap()
    }
}
