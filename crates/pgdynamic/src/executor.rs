//! Statement execution.
//!
//! Reads go through [`Executor`], which owns the whole connection lifecycle:
//! connect, run one statement, materialize, close. Closing happens on every
//! exit path; an early `?` drops the client, which closes the socket.
//!
//! Mutations ([`insert`], [`update`], [`delete`]) run on a caller-owned
//! [`TransactionHandle`] and never open or close it. On any failure the handle
//! is rolled back before the original error is returned.

use crate::client::GenericClient;
use crate::compose::{DeleteQuery, InsertQuery, SelectQuery, Statement, StatementKind, UpdateQuery};
use crate::config::ConnectionConfig;
use crate::error::{PgdError, PgdResult};
use crate::render::RenderedQuery;
use crate::row::{Count, Record, RowMaterializer, Rows};
use crate::session::{self, Session, TransactionHandle};
use chrono::TimeDelta;
use tokio::task::JoinHandle;

fn log_statement(kind: StatementKind, query: &RenderedQuery) {
    #[cfg(feature = "tracing")]
    tracing::debug!(
        target: "pgdynamic.sql",
        op = kind.as_str(),
        sql = %query.sql(),
        params = query.params().len(),
        "executing"
    );
    #[cfg(not(feature = "tracing"))]
    let _ = (kind, query);
}

async fn read_one(
    conn: &impl GenericClient,
    query: &RenderedQuery,
    materializer: &RowMaterializer,
) -> PgdResult<Option<Record>> {
    log_statement(StatementKind::SelectOne, query);
    let row = conn.query_opt(&query.numbered_sql(), &query.params_ref()).await?;
    row.as_ref().map(|r| materializer.record(r)).transpose()
}

async fn read_many(
    conn: &impl GenericClient,
    query: &RenderedQuery,
    materializer: &RowMaterializer,
) -> PgdResult<Rows> {
    log_statement(StatementKind::SelectMany, query);
    let rows = conn.query(&query.numbered_sql(), &query.params_ref()).await?;
    Ok(Rows {
        data: materializer.records(&rows)?,
    })
}

async fn read_count(conn: &impl GenericClient, query: &RenderedQuery) -> PgdResult<Count> {
    log_statement(StatementKind::Count, query);
    let row = conn
        .query_opt(&query.numbered_sql(), &query.params_ref())
        .await?
        .ok_or_else(|| PgdError::decode("count", "COUNT(*) returned no row"))?;
    let total_data: i64 = row
        .try_get(0)
        .map_err(|e| PgdError::decode("count", e.to_string()))?;
    Ok(Count { total_data })
}

/// Run select-one on a caller connection. `None` when no row matched.
pub async fn fetch_one_with(
    conn: &impl GenericClient,
    query: &SelectQuery,
    materializer: &RowMaterializer,
) -> PgdResult<Option<Record>> {
    read_one(conn, &query.render_one()?, materializer).await
}

/// Run select-many on a caller connection.
pub async fn fetch_all_with(
    conn: &impl GenericClient,
    query: &SelectQuery,
    materializer: &RowMaterializer,
) -> PgdResult<Rows> {
    read_many(conn, &query.render_many()?, materializer).await
}

/// Run count on a caller connection.
pub async fn count_with(conn: &impl GenericClient, query: &SelectQuery) -> PgdResult<Count> {
    read_count(conn, &query.render_count()?).await
}

/// Runs reads on short-lived connections built from one [`ConnectionConfig`].
#[derive(Debug, Clone)]
pub struct Executor {
    config: ConnectionConfig,
    materializer: RowMaterializer,
}

impl Executor {
    pub fn new(config: ConnectionConfig) -> Self {
        Self {
            config,
            materializer: RowMaterializer::default(),
        }
    }

    /// Override the shift applied to temporal columns (default 7 hours).
    pub fn timestamp_shift(mut self, shift: TimeDelta) -> Self {
        self.materializer = RowMaterializer::new(shift);
        self
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    pub fn materializer(&self) -> &RowMaterializer {
        &self.materializer
    }

    /// Open a [`Session`] for mutations using this executor's config.
    pub async fn session(&self) -> PgdResult<Session> {
        Session::connect(&self.config).await
    }

    /// Fetch at most one row. `None` when no row matched.
    pub async fn fetch_one(&self, query: &SelectQuery) -> PgdResult<Option<Record>> {
        let rendered = query.render_one()?;
        let (client, handle) = session::connect(&self.config).await?;
        let result = read_one(&client, &rendered, &self.materializer).await;
        release(client, handle).await;
        result
    }

    /// Fetch a page of rows as `{data: [...]}`.
    pub async fn fetch_all(&self, query: &SelectQuery) -> PgdResult<Rows> {
        let rendered = query.render_many()?;
        let (client, handle) = session::connect(&self.config).await?;
        let result = read_many(&client, &rendered, &self.materializer).await;
        release(client, handle).await;
        result
    }

    /// Count matching rows as `{total_data: n}`.
    pub async fn count(&self, query: &SelectQuery) -> PgdResult<Count> {
        let rendered = query.render_count()?;
        let (client, handle) = session::connect(&self.config).await?;
        let result = read_count(&client, &rendered).await;
        release(client, handle).await;
        result
    }
}

async fn release(client: tokio_postgres::Client, handle: JoinHandle<()>) {
    drop(client);
    let _ = handle.await;
    #[cfg(feature = "tracing")]
    tracing::debug!(target: "pgdynamic.conn", "connection closed");
}

async fn mutate<H: TransactionHandle>(
    handle: &H,
    statement: Statement<'_>,
    commit: bool,
) -> PgdResult<u64> {
    let result = async {
        let rendered = statement.render()?;
        log_statement(statement.kind(), &rendered);
        let affected = handle
            .execute(&rendered.numbered_sql(), &rendered.params_ref())
            .await?;
        if commit {
            handle.commit().await?;
        }
        Ok::<u64, PgdError>(affected)
    }
    .await;

    match result {
        Ok(affected) => Ok(affected),
        Err(error) => {
            #[cfg(feature = "tracing")]
            tracing::warn!(
                target: "pgdynamic.sql",
                op = statement.kind().as_str(),
                error = %error,
                "mutation failed; rolling back"
            );
            match handle.rollback().await {
                Ok(()) => Err(error),
                Err(rollback) => Err(PgdError::Rollback {
                    source: Box::new(error),
                    rollback: Box::new(rollback),
                }),
            }
        }
    }
}

/// Insert one row. Commits afterwards only when `commit` is set.
pub async fn insert<H: TransactionHandle>(
    handle: &H,
    query: &InsertQuery,
    commit: bool,
) -> PgdResult<u64> {
    mutate(handle, Statement::Insert(query), commit).await
}

/// Update matching rows. Commits afterwards only when `commit` is set.
pub async fn update<H: TransactionHandle>(
    handle: &H,
    query: &UpdateQuery,
    commit: bool,
) -> PgdResult<u64> {
    mutate(handle, Statement::Update(query), commit).await
}

/// Delete matching rows. Commits afterwards only when `commit` is set.
pub async fn delete<H: TransactionHandle>(
    handle: &H,
    query: &DeleteQuery,
    commit: bool,
) -> PgdResult<u64> {
    mutate(handle, Statement::Delete(query), commit).await
}
