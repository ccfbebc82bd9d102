//! Generic client trait for unified database access.

use crate::error::PgdResult;
use tokio_postgres::Row;
use tokio_postgres::types::ToSql;

/// A trait that unifies database clients and transactions.
///
/// Read helpers accept any `GenericClient`, so a statement can run on a plain
/// client, a driver transaction or a [`Session`](crate::Session) alike.
/// Driver errors are returned unchanged as [`PgdError::Query`](crate::PgdError::Query).
pub trait GenericClient: Send + Sync {
    /// Execute a query and return all rows.
    fn query(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> impl std::future::Future<Output = PgdResult<Vec<Row>>> + Send;

    /// Execute a query and return the first row, if any.
    ///
    /// Extra rows are ignored rather than treated as an error.
    fn query_opt(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> impl std::future::Future<Output = PgdResult<Option<Row>>> + Send {
        async move {
            let rows = self.query(sql, params).await?;
            Ok(rows.into_iter().next())
        }
    }

    /// Execute a statement and return the number of affected rows.
    fn execute(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> impl std::future::Future<Output = PgdResult<u64>> + Send;

    /// Run parameterless SQL (possibly several statements) via the simple protocol.
    fn batch_execute(&self, sql: &str) -> impl std::future::Future<Output = PgdResult<()>> + Send;
}

impl GenericClient for tokio_postgres::Client {
    async fn query(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> PgdResult<Vec<Row>> {
        Ok(tokio_postgres::Client::query(self, sql, params).await?)
    }

    async fn execute(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> PgdResult<u64> {
        Ok(tokio_postgres::Client::execute(self, sql, params).await?)
    }

    async fn batch_execute(&self, sql: &str) -> PgdResult<()> {
        Ok(tokio_postgres::Client::batch_execute(self, sql).await?)
    }
}

impl GenericClient for tokio_postgres::Transaction<'_> {
    async fn query(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> PgdResult<Vec<Row>> {
        Ok(tokio_postgres::Transaction::query(self, sql, params).await?)
    }

    async fn execute(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> PgdResult<u64> {
        Ok(tokio_postgres::Transaction::execute(self, sql, params).await?)
    }

    async fn batch_execute(&self, sql: &str) -> PgdResult<()> {
        Ok(tokio_postgres::Transaction::batch_execute(self, sql).await?)
    }
}
