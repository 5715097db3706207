//! Connection management: the primary pool, per-tenant routing, and migrations.

pub mod migration;
pub mod primary;
pub mod tenant;

pub use migration::{migrator_from_dir, run_migrations};
pub use primary::{connect_primary, connect_primary_with, primary_pool_options};
pub use tenant::{PgTenantSource, TenantHost, TenantRouter, TenantSource};
