//! Startup wiring: connect the configured databases and register the
//! primary as the default adapter.

use std::time::Duration;

use configs::{AppConfig, DatabaseConfig};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use tracing::{info, instrument};

use crate::adapter::{SeaOrmAdapter, SharedAdapter};
use crate::errors::MapperError;
use crate::registry::AdapterRegistry;

/// Pool options for `cfg`; fails when the config does not validate.
pub fn connect_options(cfg: &DatabaseConfig) -> Result<ConnectOptions, MapperError> {
    cfg.validate("database").map_err(|e| MapperError::Config(e.to_string()))?;
    let mut opt = ConnectOptions::new(cfg.url.clone());
    opt.max_connections(cfg.max_connections)
        .min_connections(cfg.min_connections)
        .connect_timeout(Duration::from_secs(cfg.connect_timeout_secs))
        .idle_timeout(Duration::from_secs(cfg.idle_timeout_secs))
        .max_lifetime(Duration::from_secs(cfg.max_lifetime_secs))
        .acquire_timeout(Duration::from_secs(cfg.acquire_timeout_secs))
        .sqlx_logging(cfg.sqlx_logging);
    Ok(opt)
}

pub async fn connect_with_config(cfg: &DatabaseConfig) -> Result<DatabaseConnection, MapperError> {
    let opt = connect_options(cfg)?;
    let db = Database::connect(opt).await?;
    Ok(db)
}

/// Connect the primary and, when configured, the read replica.
#[instrument(skip(cfg), fields(replica = cfg.replica.is_some()))]
pub async fn adapters_from_config(cfg: &AppConfig) -> Result<(SharedAdapter, Option<SharedAdapter>), MapperError> {
    let primary = SeaOrmAdapter::new("primary", connect_with_config(&cfg.database).await?).shared();
    info!(adapter = "primary", "database connected");

    let replica = match &cfg.replica {
        Some(r) => {
            let adapter = SeaOrmAdapter::new("replica", connect_with_config(r).await?).shared();
            info!(adapter = "replica", "database connected");
            Some(adapter)
        }
        None => None,
    };
    Ok((primary, replica))
}

/// Register the primary as `registry`'s default and return the replica,
/// which callers pass as the read adapter when building mappers.
pub async fn register_from_config(
    cfg: &AppConfig,
    registry: &AdapterRegistry,
) -> Result<Option<SharedAdapter>, MapperError> {
    let (primary, replica) = adapters_from_config(cfg).await?;
    registry.set_default(primary);
    Ok(replica)
}
