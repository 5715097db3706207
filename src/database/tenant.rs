//! Per-tenant database routing: tenant id -> long-lived pool, resolved lazily and cached.
//!
//! Each tenant's handle lives in its own `OnceCell`, so concurrent first requests for the same tenant
//! wait on a single resolution instead of racing. Entries are never evicted or refreshed; a tenant whose
//! host changes is picked up on restart.

use crate::config::TenantDbConfig;
use crate::database::primary::primary_pool_options;
use crate::error::DbError;
use async_trait::async_trait;
use sqlx::PgPool;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::OnceCell;

/// Control-plane record for a tenant's database server.
#[derive(Clone, Debug, PartialEq, Eq, sqlx::FromRow)]
pub struct TenantHost {
    pub host: String,
    pub port: i32,
}

/// Resolves a tenant id to a fresh connection handle.
#[async_trait]
pub trait TenantSource<C>: Send + Sync {
    async fn resolve(&self, tenant_id: &str) -> Result<C, DbError>;
}

/// Resolves tenants through `companies(id, host_id)` and `hosts(id, host, port)` on the primary pool.
pub struct PgTenantSource {
    control: PgPool,
    account: TenantDbConfig,
}

impl PgTenantSource {
    pub fn new(control: PgPool, account: TenantDbConfig) -> Self {
        PgTenantSource { control, account }
    }

    pub async fn lookup_host(&self, tenant_id: &str) -> Result<TenantHost, DbError> {
        let lookup_err = |source| DbError::Lookup {
            tenant_id: tenant_id.to_string(),
            source,
        };
        let host_id = sqlx::query_scalar::<_, Option<String>>("SELECT host_id::text FROM companies WHERE id::text = $1")
            .bind(tenant_id)
            .fetch_optional(&self.control)
            .await
            .map_err(lookup_err)?
            .flatten();
        let host_id = host_id.ok_or_else(|| DbError::UnknownTenant(tenant_id.to_string()))?;

        sqlx::query_as::<_, TenantHost>("SELECT host, port::int4 AS port FROM hosts WHERE id::text = $1")
            .bind(&host_id)
            .fetch_optional(&self.control)
            .await
            .map_err(lookup_err)?
            .ok_or_else(|| DbError::UnknownTenant(tenant_id.to_string()))
    }
}

#[async_trait]
impl TenantSource<PgPool> for PgTenantSource {
    async fn resolve(&self, tenant_id: &str) -> Result<PgPool, DbError> {
        let host = self.lookup_host(tenant_id).await?;
        let port = u16::try_from(host.port).map_err(|_| DbError::UnknownTenant(tenant_id.to_string()))?;
        let options = self.account.connect_options(&host.host, port);
        let pool = primary_pool_options()
            .connect_with(options)
            .await
            .map_err(DbError::Connect)?;
        tracing::info!(tenant_id, host = %host.host, port, "tenant database connected");
        Ok(pool)
    }
}

/// Cache of tenant connections keyed by tenant id.
pub struct TenantRouter<C = PgPool> {
    source: Arc<dyn TenantSource<C>>,
    slots: Mutex<HashMap<String, Arc<OnceCell<C>>>>,
}

impl<C> TenantRouter<C>
where
    C: Clone + Send + Sync + 'static,
{
    pub fn new(source: Arc<dyn TenantSource<C>>) -> Self {
        TenantRouter {
            source,
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Cached connection for `tenant_id`, resolving it on first use. Concurrent callers for the same
    /// unseen tenant share one resolution. A failed resolution is not cached.
    pub async fn get_connection(&self, tenant_id: &str) -> Result<C, DbError> {
        let slot = self.slot(tenant_id);
        if let Some(conn) = slot.get() {
            tracing::trace!(tenant_id, "tenant connection cache hit");
            return Ok(conn.clone());
        }
        let result = slot
            .get_or_try_init(|| async {
                tracing::debug!(tenant_id, "resolving tenant connection");
                self.source.resolve(tenant_id).await
            })
            .await
            .cloned();
        if let Err(e) = &result {
            tracing::warn!(tenant_id, error = %e, "tenant connection failed");
            self.discard_empty(tenant_id, &slot);
        }
        result
    }

    /// Cached connection without resolving.
    pub fn cached(&self, tenant_id: &str) -> Option<C> {
        self.lock().get(tenant_id).and_then(|slot| slot.get().cloned())
    }

    /// Tenant ids with an established connection.
    pub fn cached_tenants(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .lock()
            .iter()
            .filter(|(_, slot)| slot.initialized())
            .map(|(id, _)| id.clone())
            .collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.lock().values().filter(|slot| slot.initialized()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn slot(&self, tenant_id: &str) -> Arc<OnceCell<C>> {
        self.lock()
            .entry(tenant_id.to_string())
            .or_insert_with(|| Arc::new(OnceCell::new()))
            .clone()
    }

    /// Drop a slot left empty by a failed resolution. The slot stays while any other caller holds it:
    /// a queued waiter takes over the initialization and must fill the slot the map still points to.
    fn discard_empty(&self, tenant_id: &str, slot: &Arc<OnceCell<C>>) {
        let mut slots = self.lock();
        if let Some(current) = slots.get(tenant_id) {
            // One reference in the map, one held by the caller.
            if Arc::ptr_eq(current, slot) && !current.initialized() && Arc::strong_count(current) == 2 {
                slots.remove(tenant_id);
            }
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Arc<OnceCell<C>>>> {
        // The map is only touched in short, non-panicking sections; recover from poisoning.
        self.slots.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl TenantRouter<PgPool> {
    /// Router backed by the control-plane tables on `control`.
    pub fn postgres(control: PgPool, account: TenantDbConfig) -> Self {
        Self::new(Arc::new(PgTenantSource::new(control, account)))
    }
}
