//! Caller-owned connections for mutations.
//!
//! A [`Session`] opens a transaction implicitly before its first statement and
//! keeps it open until [`TransactionHandle::commit`] or
//! [`TransactionHandle::rollback`]. That lets a caller batch several mutations
//! and commit once:
//!
//! ```ignore
//! use pgdynamic::{InsertQuery, Session, TransactionHandle};
//!
//! let session = Session::connect(&config).await?;
//! pgdynamic::insert(&session, &InsertQuery::new("a").set("id", 1), false).await?;
//! pgdynamic::insert(&session, &InsertQuery::new("b").set("id", 1), false).await?;
//! session.commit().await?;
//! ```

use crate::client::GenericClient;
use crate::config::ConnectionConfig;
use crate::error::{PgdError, PgdResult};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::task::JoinHandle;
use tokio_postgres::types::ToSql;
use tokio_postgres::{NoTls, Row};

/// A connection that can commit or roll back the work done through it.
pub trait TransactionHandle: GenericClient {
    /// Commit the open transaction, if any.
    fn commit(&self) -> impl std::future::Future<Output = PgdResult<()>> + Send;

    /// Roll back the open transaction, if any.
    fn rollback(&self) -> impl std::future::Future<Output = PgdResult<()>> + Send;
}

/// Open a driver connection and drive it on a background task.
pub(crate) async fn connect(config: &ConnectionConfig) -> PgdResult<(tokio_postgres::Client, JoinHandle<()>)> {
    let (client, connection) = config
        .to_pg_config()
        .connect(NoTls)
        .await
        .map_err(|e| PgdError::Connection(e.to_string()))?;

    let handle = tokio::spawn(async move {
        if let Err(_e) = connection.await {
            #[cfg(feature = "tracing")]
            tracing::warn!(target: "pgdynamic.conn", error = %_e, "connection closed with error");
        }
    });

    #[cfg(feature = "tracing")]
    tracing::debug!(
        target: "pgdynamic.conn",
        host = %config.host,
        port = config.port,
        database = %config.database,
        "connected"
    );
    Ok((client, handle))
}

/// A connection with an implicit transaction.
///
/// End the transaction with [`TransactionHandle::commit`] or
/// [`TransactionHandle::rollback`]. A lone `COMMIT`, `END`, `ROLLBACK` or
/// `ABORT` sent through [`GenericClient::batch_execute`] is treated the same
/// way; transaction control buried in a larger batch is not tracked.
pub struct Session {
    client: tokio_postgres::Client,
    connection: Option<JoinHandle<()>>,
    in_transaction: AtomicBool,
}

impl Session {
    /// Open a new connection.
    pub async fn connect(config: &ConnectionConfig) -> PgdResult<Self> {
        let (client, handle) = connect(config).await?;
        Ok(Self {
            client,
            connection: Some(handle),
            in_transaction: AtomicBool::new(false),
        })
    }

    /// Wrap an existing client. The caller keeps driving its connection.
    ///
    /// The client must not already be inside a transaction.
    pub fn from_client(client: tokio_postgres::Client) -> Self {
        Self {
            client,
            connection: None,
            in_transaction: AtomicBool::new(false),
        }
    }

    /// Whether a transaction is currently open on this session.
    pub fn in_transaction(&self) -> bool {
        self.in_transaction.load(Ordering::Acquire)
    }

    /// The underlying driver client.
    pub fn client(&self) -> &tokio_postgres::Client {
        &self.client
    }

    /// Close the connection. Uncommitted work is discarded by the server.
    pub async fn close(self) {
        let Session {
            client, connection, ..
        } = self;
        drop(client);
        if let Some(handle) = connection {
            let _ = handle.await;
        }
        #[cfg(feature = "tracing")]
        tracing::debug!(target: "pgdynamic.conn", "session closed");
    }

    async fn begin_if_needed(&self) -> PgdResult<()> {
        if self.in_transaction.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        if let Err(e) = self.client.batch_execute("BEGIN").await {
            self.in_transaction.store(false, Ordering::Release);
            return Err(e.into());
        }
        Ok(())
    }

    async fn finish(&self, statement: &str) -> PgdResult<()> {
        if !self.in_transaction.swap(false, Ordering::AcqRel) {
            return Ok(());
        }
        self.client.batch_execute(statement).await?;
        Ok(())
    }
}

/// Recognize a batch that only ends the transaction.
fn transaction_end(sql: &str) -> Option<&'static str> {
    let statement = sql.trim().trim_end_matches(';').trim_end();
    if statement.eq_ignore_ascii_case("COMMIT") || statement.eq_ignore_ascii_case("END") {
        Some("COMMIT")
    } else if statement.eq_ignore_ascii_case("ROLLBACK") || statement.eq_ignore_ascii_case("ABORT") {
        Some("ROLLBACK")
    } else {
        None
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("in_transaction", &self.in_transaction())
            .field("owns_connection", &self.connection.is_some())
            .finish()
    }
}

impl GenericClient for Session {
    async fn query(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> PgdResult<Vec<Row>> {
        self.begin_if_needed().await?;
        Ok(self.client.query(sql, params).await?)
    }

    async fn execute(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> PgdResult<u64> {
        self.begin_if_needed().await?;
        Ok(self.client.execute(sql, params).await?)
    }

    async fn batch_execute(&self, sql: &str) -> PgdResult<()> {
        if let Some(statement) = transaction_end(sql) {
            return self.finish(statement).await;
        }
        self.begin_if_needed().await?;
        Ok(self.client.batch_execute(sql).await?)
    }
}

impl TransactionHandle for Session {
    async fn commit(&self) -> PgdResult<()> {
        self.finish("COMMIT").await
    }

    async fn rollback(&self) -> PgdResult<()> {
        self.finish("ROLLBACK").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lone_transaction_control_is_recognized() {
        assert_eq!(transaction_end("COMMIT"), Some("COMMIT"));
        assert_eq!(transaction_end("  commit ;\n"), Some("COMMIT"));
        assert_eq!(transaction_end("END"), Some("COMMIT"));
        assert_eq!(transaction_end("rollback;"), Some("ROLLBACK"));
        assert_eq!(transaction_end("ABORT"), Some("ROLLBACK"));
    }

    #[test]
    fn other_batches_are_not_transaction_control() {
        assert_eq!(transaction_end("COMMIT; SELECT 1"), None);
        assert_eq!(transaction_end("ROLLBACK TO SAVEPOINT a"), None);
        assert_eq!(transaction_end("SELECT 1"), None);
        assert_eq!(transaction_end(""), None);
    }
}
