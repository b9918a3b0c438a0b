//! Connectivity probe: wires the configured adapters into a mapper and runs a
//! trivial statement through the read side and, optionally, counts a table.
//!
//! Usage: `mapper-probe [table]`

use configs::{AppConfig, LogFormat};
use mapper::{bootstrap, build_mapper, AdapterRegistry, BaseAccess, Mapper, MapperBase};
use sea_orm::sea_query::{Alias, Expr, Query};
use sea_orm::{DatabaseBackend, Statement};
use tracing::{error, info};

struct ProbeMapper {
    base: MapperBase<i64>,
}

impl Mapper for ProbeMapper {
    type Model = i64;

    fn from_base(base: MapperBase<i64>, _: BaseAccess) -> Self { Self { base } }

    fn base(&self, _: &BaseAccess) -> &MapperBase<i64> { &self.base }
}

/// `SELECT COUNT(*) AS n FROM <table>` with the table quoted as an
/// identifier; `schema.table` is split into its two parts.
fn count_statement(backend: DatabaseBackend, table: &str) -> Statement {
    let mut query = Query::select();
    query.expr_as(Expr::cust("COUNT(*)"), Alias::new("n"));
    match table.split_once('.') {
        Some((schema, name)) => query.from((Alias::new(schema), Alias::new(name))),
        None => query.from(Alias::new(table)),
    };
    backend.build(&query)
}

impl ProbeMapper {
    async fn ping(&self) -> anyhow::Result<usize> {
        let backend = self.read_adapter().backend();
        let rows = self.base.fetch_all(Statement::from_string(backend, "SELECT 1")).await?;
        Ok(rows.len())
    }

    async fn count_rows(&mut self) -> anyhow::Result<i64> {
        let table = self.table_name().unwrap_or_default().to_string();
        if let Some(n) = self.base.cache_value(table.as_str()) {
            return Ok(*n);
        }
        let backend = self.read_adapter().backend();
        let rows = self.base.fetch_all(count_statement(backend, &table)).await?;
        let n: i64 = match rows.first() {
            Some(row) => row.try_get("", "n")?,
            None => 0,
        };
        self.base.set_cache_value(n, table);
        Ok(n)
    }
}

async fn run(cfg: AppConfig, table: Option<String>) -> anyhow::Result<()> {
    let registry = AdapterRegistry::new();
    let replica = bootstrap::register_from_config(&cfg, &registry).await?;

    let mut probe: ProbeMapper = build_mapper(None, replica, &registry)?;
    let rows = probe.ping().await?;
    info!(event = "ping", read = probe.read_adapter().name(), rows, "read adapter reachable");

    if let Some(table) = table {
        probe.base.set_table_name(table.as_str());
        let n = probe.count_rows().await?;
        info!(event = "count", %table, rows = n, "table counted");
    }
    Ok(())
}

fn main() -> std::process::ExitCode {
    let cfg = match AppConfig::load_and_validate() {
        Ok(cfg) => cfg,
        Err(e) => {
            common::utils::logging::init_logging_default();
            error!(event = "config_invalid", error = %e, "cannot load configuration");
            return std::process::ExitCode::FAILURE;
        }
    };
    match cfg.logging.format {
        LogFormat::Compact => common::utils::logging::init_logging_default(),
        LogFormat::Json => common::utils::logging::init_logging_json(),
    }
    info!(event = "start", version = env!("CARGO_PKG_VERSION"), replica = cfg.replica.is_some(), "mapper probe starting");

    let rt = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(rt) => rt,
        Err(e) => {
            error!(event = "runtime_build_failed", error = %e, "failed to build tokio runtime");
            return std::process::ExitCode::FAILURE;
        }
    };

    let table = std::env::args().nth(1);
    match rt.block_on(run(cfg, table)) {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(e) => {
            error!(event = "probe_failed", error = %e, "probe failed");
            std::process::ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn count_statement_quotes_table() {
        let stmt = count_statement(DatabaseBackend::Postgres, "users");
        assert_eq!(stmt.sql, r#"SELECT COUNT(*) AS "n" FROM "users""#);

        let stmt = count_statement(DatabaseBackend::Postgres, "audit.events");
        assert_eq!(stmt.sql, r#"SELECT COUNT(*) AS "n" FROM "audit"."events""#);
    }

    #[test]
    fn count_statement_escapes_embedded_quotes() {
        let stmt = count_statement(DatabaseBackend::Postgres, r#"users"; DROP TABLE users; --"#);
        assert_eq!(stmt.sql, r#"SELECT COUNT(*) AS "n" FROM "users""; DROP TABLE users; --""#);
    }
}
