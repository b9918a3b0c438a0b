use std::sync::Arc;

use async_trait::async_trait;
use sea_orm::{ConnectionTrait, DatabaseBackend, DatabaseConnection, QueryResult, Statement};
use tracing::instrument;

use crate::errors::MapperError;

/// Handle to a backing store able to run read and write statements.
///
/// Mappers only hold and forward these; they never look inside.
#[async_trait]
pub trait DataAdapter: Send + Sync {
    /// Label used in logs, e.g. `primary` or `replica`.
    fn name(&self) -> &str;

    fn backend(&self) -> DatabaseBackend;

    async fn query(&self, stmt: Statement) -> Result<Vec<QueryResult>, MapperError>;

    /// Run a mutating statement and return the number of affected rows.
    async fn execute(&self, stmt: Statement) -> Result<u64, MapperError>;
}

/// Adapters are referenced, never owned, by mappers. Identity is `Arc::ptr_eq`.
pub type SharedAdapter = Arc<dyn DataAdapter>;

/// SeaORM-backed adapter over a pooled connection.
pub struct SeaOrmAdapter {
    name: String,
    db: DatabaseConnection,
}

impl SeaOrmAdapter {
    pub fn new(name: impl Into<String>, db: DatabaseConnection) -> Self {
        Self { name: name.into(), db }
    }

    pub fn connection(&self) -> &DatabaseConnection { &self.db }

    pub fn shared(self) -> SharedAdapter { Arc::new(self) }
}

#[async_trait]
impl DataAdapter for SeaOrmAdapter {
    fn name(&self) -> &str { &self.name }

    fn backend(&self) -> DatabaseBackend { self.db.get_database_backend() }

    #[instrument(skip(self, stmt), fields(adapter = %self.name))]
    async fn query(&self, stmt: Statement) -> Result<Vec<QueryResult>, MapperError> {
        Ok(self.db.query_all(stmt).await?)
    }

    #[instrument(skip(self, stmt), fields(adapter = %self.name))]
    async fn execute(&self, stmt: Statement) -> Result<u64, MapperError> {
        let res = self.db.execute(stmt).await?;
        Ok(res.rows_affected())
    }
}

/// Simple in-memory recording adapter for tests and doc examples
pub mod mock {
    use super::*;
    use std::sync::Mutex;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum Op {
        Query,
        Execute,
    }

    /// Records every statement it receives; queries return no rows and
    /// writes report `rows_affected`.
    pub struct RecordingAdapter {
        name: String,
        rows_affected: u64,
        log: Mutex<Vec<(Op, String)>>,
    }

    impl RecordingAdapter {
        pub fn new(name: &str) -> Self {
            Self { name: name.to_string(), rows_affected: 1, log: Mutex::new(Vec::new()) }
        }

        pub fn with_rows_affected(mut self, rows: u64) -> Self {
            self.rows_affected = rows;
            self
        }

        pub fn shared(name: &str) -> Arc<Self> { Arc::new(Self::new(name)) }

        /// Statements seen so far, in order.
        pub fn recorded(&self) -> Vec<(Op, String)> {
            self.log.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl DataAdapter for RecordingAdapter {
        fn name(&self) -> &str { &self.name }

        fn backend(&self) -> DatabaseBackend { DatabaseBackend::Postgres }

        async fn query(&self, stmt: Statement) -> Result<Vec<QueryResult>, MapperError> {
            self.log.lock().unwrap().push((Op::Query, stmt.sql));
            Ok(Vec::new())
        }

        async fn execute(&self, stmt: Statement) -> Result<u64, MapperError> {
            self.log.lock().unwrap().push((Op::Execute, stmt.sql));
            Ok(self.rows_affected)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{MockDatabase, MockExecResult, Value};
    use std::collections::BTreeMap;

    #[tokio::test]
    async fn seaorm_adapter_forwards_queries_and_writes() -> Result<(), anyhow::Error> {
        let row: BTreeMap<&str, Value> = BTreeMap::from([("id", Value::from(7i32))]);
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![row]])
            .append_exec_results([MockExecResult { last_insert_id: 0, rows_affected: 3 }])
            .into_connection();
        let adapter = SeaOrmAdapter::new("primary", db);
        assert_eq!(adapter.name(), "primary");
        assert_eq!(adapter.backend(), DatabaseBackend::Postgres);

        let rows = adapter
            .query(Statement::from_string(DatabaseBackend::Postgres, "SELECT id FROM users"))
            .await?;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].try_get::<i32>("", "id")?, 7);

        let affected = adapter
            .execute(Statement::from_string(DatabaseBackend::Postgres, "DELETE FROM users"))
            .await?;
        assert_eq!(affected, 3);
        Ok(())
    }

    #[tokio::test]
    async fn seaorm_adapter_maps_db_errors() {
        // No query results queued, so the mock connection errors out.
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        let adapter = SeaOrmAdapter::new("primary", db);
        let res = adapter
            .query(Statement::from_string(DatabaseBackend::Postgres, "SELECT 1"))
            .await;
        assert!(matches!(res, Err(MapperError::Database(_))));
    }

    #[tokio::test]
    async fn recording_adapter_keeps_order() -> Result<(), anyhow::Error> {
        let adapter = mock::RecordingAdapter::new("rec").with_rows_affected(2);
        adapter.query(Statement::from_string(DatabaseBackend::Postgres, "SELECT 1")).await?;
        assert_eq!(adapter.execute(Statement::from_string(DatabaseBackend::Postgres, "UPDATE t SET a = 1")).await?, 2);
        assert_eq!(
            adapter.recorded(),
            vec![(mock::Op::Query, "SELECT 1".to_string()), (mock::Op::Execute, "UPDATE t SET a = 1".to_string())]
        );
        Ok(())
    }
}
