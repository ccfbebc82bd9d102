//! # pgdynamic
//!
//! Descriptor-driven dynamic SQL for PostgreSQL.
//!
//! Describe a table, its joins, a filter, a column list, ordering and a page;
//! pgdynamic renders parameterized SQL for one of four operations and runs it:
//!
//! - **select-one**: at most one row as a [`Record`]
//! - **select-many**: a page of rows as [`Rows`] (`{data: [...]}`)
//! - **count**: [`Count`] (`{total_data: n}`)
//! - **mutate**: insert / update / delete on a caller-owned [`TransactionHandle`]
//!
//! Only values are parameter-bound. Table names, column names, aliases and
//! join `ON` clauses are written into the SQL as given and must be trusted.
//!
//! ## Example
//!
//! ```ignore
//! use pgdynamic::{Condition, ConnectionConfig, Direction, Executor, Filter, Page, SelectQuery};
//!
//! let executor = Executor::new(ConnectionConfig::from_env()?);
//!
//! let employee = executor
//!     .fetch_one(&SelectQuery::new("employees").filter(Condition::eq("id", 1)))
//!     .await?;
//!
//! let page = executor
//!     .fetch_all(
//!         &SelectQuery::new("employees")
//!             .order_by("first_name", Direction::Asc)
//!             .page(Page::of(5, 2)?),
//!     )
//!     .await?;
//!
//! let session = executor.session().await?;
//! pgdynamic::insert(
//!     &session,
//!     &pgdynamic::InsertQuery::new("employees").set("id", 6).set("first_name", "Harrison"),
//!     true,
//! )
//! .await?;
//! ```

pub mod client;
pub mod compose;
pub mod config;
pub mod descriptor;
pub mod error;
pub mod executor;
pub mod render;
pub mod row;
pub mod session;
pub mod value;

pub use client::GenericClient;
pub use compose::{DeleteQuery, InsertQuery, SelectQuery, Statement, StatementKind, UpdateQuery};
pub use config::ConnectionConfig;
pub use descriptor::{
    Assignments, Condition, Conjunction, Direction, Filter, Join, JoinMethod, Operator, OrderBy,
    Page, TableRef,
};
pub use error::{PgdError, PgdResult};
pub use executor::{Executor, count_with, delete, fetch_all_with, fetch_one_with, insert, update};
pub use render::{Placeholder, RenderedQuery};
pub use row::{Count, DEFAULT_TIMESTAMP_SHIFT_HOURS, Record, RowMaterializer, Rows};
pub use session::{Session, TransactionHandle};
pub use value::Value;

// Re-export the driver so callers can name its types without a separate dependency.
pub use tokio_postgres;
