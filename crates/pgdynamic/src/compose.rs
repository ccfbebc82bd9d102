//! Query composer: statement builders rendered by one renderer.
//!
//! Builders collect descriptors; [`Statement`] names which template a builder is
//! rendered into. All six templates go through [`Statement::render`], which
//! emits the parameters in exactly the order their placeholders appear:
//!
//! - reads: condition values, then (select-many only) `limit` and the computed offset
//! - update: assignment values, then condition values
//!
//! # Example
//!
//! ```ignore
//! use pgdynamic::{Condition, Filter, SelectQuery};
//!
//! let q = SelectQuery::new("employees")
//!     .filter(Filter::new(Condition::eq("id", 1)))
//!     .render_one()?;
//! assert_eq!(q.sql(), "SELECT * FROM employees  WHERE  id = %s ");
//! ```

use crate::descriptor::{Assignments, Direction, Filter, Join, OrderBy, Page, TableRef};
use crate::error::{PgdError, PgdResult};
use crate::render::{RenderedQuery, SqlWriter, write_conditions, write_joins};
use crate::value::Value;

/// Which template a statement renders to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    SelectOne,
    SelectMany,
    Count,
    Insert,
    Update,
    Delete,
}

impl StatementKind {
    pub fn as_str(self) -> &'static str {
        match self {
            StatementKind::SelectOne => "select_one",
            StatementKind::SelectMany => "select_many",
            StatementKind::Count => "count",
            StatementKind::Insert => "insert",
            StatementKind::Update => "update",
            StatementKind::Delete => "delete",
        }
    }
}

/// A statement to render, borrowing its builder.
#[derive(Debug, Clone, Copy)]
pub enum Statement<'a> {
    SelectOne(&'a SelectQuery),
    SelectMany(&'a SelectQuery),
    Count(&'a SelectQuery),
    Insert(&'a InsertQuery),
    Update(&'a UpdateQuery),
    Delete(&'a DeleteQuery),
}

impl Statement<'_> {
    pub fn kind(&self) -> StatementKind {
        match self {
            Statement::SelectOne(_) => StatementKind::SelectOne,
            Statement::SelectMany(_) => StatementKind::SelectMany,
            Statement::Count(_) => StatementKind::Count,
            Statement::Insert(_) => StatementKind::Insert,
            Statement::Update(_) => StatementKind::Update,
            Statement::Delete(_) => StatementKind::Delete,
        }
    }

    /// Render to SQL text plus ordered parameters.
    pub fn render(&self) -> PgdResult<RenderedQuery> {
        let mut w = SqlWriter::new();

        match *self {
            Statement::SelectOne(q) => {
                require_filter(&q.filter, "select_one")?;
                q.write_head(&mut w, false)?;
                w.push(" WHERE ");
                write_conditions(&mut w, &q.filter)?;
            }
            Statement::SelectMany(q) => {
                q.write_head(&mut w, false)?;
                if !q.filter.is_empty() {
                    w.push(" WHERE ");
                    write_conditions(&mut w, &q.filter)?;
                }
                if !q.order.is_empty() {
                    w.push(" ORDER BY ");
                    for (i, (column, direction)) in q.order.entries().iter().enumerate() {
                        if i > 0 {
                            w.push(", ");
                        }
                        w.push(column).push(" ").push(direction.keyword());
                    }
                }
                w.push(" LIMIT ")
                    .push_bind(q.page.limit().into())
                    .push(" OFFSET ")
                    .push_bind(q.page.offset().into());
            }
            Statement::Count(q) => {
                q.write_head(&mut w, true)?;
                if !q.filter.is_empty() {
                    w.push(" WHERE ");
                    write_conditions(&mut w, &q.filter)?;
                }
            }
            Statement::Insert(q) => {
                require_table(&q.table)?;
                q.values.validate()?;
                w.push("INSERT INTO ").push(&q.table).push("(");
                for (i, (column, _)) in q.values.entries().iter().enumerate() {
                    if i > 0 {
                        w.push(", ");
                    }
                    w.push(column);
                }
                w.push(") VALUES (");
                for (i, (_, value)) in q.values.entries().iter().enumerate() {
                    if i > 0 {
                        w.push(", ");
                    }
                    w.push_bind(value.clone());
                }
                w.push(")");
            }
            Statement::Update(q) => {
                require_table(&q.table)?;
                q.set.validate()?;
                require_filter(&q.filter, "update")?;
                w.push("UPDATE ").push(&q.table).push(" SET ");
                for (i, (column, value)) in q.set.entries().iter().enumerate() {
                    if i > 0 {
                        w.push(", ");
                    }
                    w.push(column).push(" = ").push_bind(value.clone());
                }
                w.push(" WHERE ");
                write_conditions(&mut w, &q.filter)?;
            }
            Statement::Delete(q) => {
                require_table(&q.table)?;
                require_filter(&q.filter, "delete")?;
                w.push("DELETE FROM ").push(&q.table).push(" WHERE ");
                write_conditions(&mut w, &q.filter)?;
            }
        }

        Ok(w.finish())
    }
}

fn require_table(table: &str) -> PgdResult<()> {
    if table.trim().is_empty() {
        return Err(PgdError::validation("table name cannot be empty"));
    }
    Ok(())
}

fn require_filter(filter: &Filter, op: &str) -> PgdResult<()> {
    if filter.is_empty() {
        return Err(PgdError::validation(format!(
            "{op} requires at least one condition"
        )));
    }
    Ok(())
}

/// Builder shared by select-one, select-many and count.
#[derive(Debug, Clone)]
pub struct SelectQuery {
    table: TableRef,
    columns: Vec<String>,
    joins: Vec<Join>,
    filter: Filter,
    order: OrderBy,
    page: Page,
}

impl SelectQuery {
    pub fn new(table: impl Into<TableRef>) -> Self {
        Self {
            table: table.into(),
            columns: Vec::new(),
            joins: Vec::new(),
            filter: Filter::empty(),
            order: OrderBy::new(),
            page: Page::unbounded(),
        }
    }

    /// Select these columns instead of `*`.
    pub fn columns<S: AsRef<str>>(mut self, cols: &[S]) -> Self {
        self.columns = cols.iter().map(|c| c.as_ref().to_string()).collect();
        self
    }

    pub fn join(mut self, join: Join) -> Self {
        self.joins.push(join);
        self
    }

    pub fn joins(mut self, joins: impl IntoIterator<Item = Join>) -> Self {
        self.joins.extend(joins);
        self
    }

    pub fn filter(mut self, filter: impl Into<Filter>) -> Self {
        self.filter = filter.into();
        self
    }

    pub fn order_by(mut self, column: impl Into<String>, direction: Direction) -> Self {
        self.order.push(column, direction);
        self
    }

    pub fn order(mut self, order: OrderBy) -> Self {
        self.order = order;
        self
    }

    /// Pagination for select-many; ignored by select-one and count.
    pub fn page(mut self, page: Page) -> Self {
        self.page = page;
        self
    }

    pub fn render_one(&self) -> PgdResult<RenderedQuery> {
        Statement::SelectOne(self).render()
    }

    pub fn render_many(&self) -> PgdResult<RenderedQuery> {
        Statement::SelectMany(self).render()
    }

    pub fn render_count(&self) -> PgdResult<RenderedQuery> {
        Statement::Count(self).render()
    }

    /// `SELECT {cols} FROM {table} {alias}{joins}`
    fn write_head(&self, w: &mut SqlWriter, count: bool) -> PgdResult<()> {
        self.table.validate()?;
        w.push("SELECT ");
        if count {
            w.push("COUNT(*)");
        } else if self.columns.is_empty() {
            w.push("*");
        } else {
            w.push(&self.columns.join(","));
        }
        w.push(" FROM ")
            .push(&self.table.table)
            .push(" ")
            .push(self.table.alias.as_deref().unwrap_or(""));
        write_joins(w, &self.joins)
    }
}

/// `INSERT INTO table(cols) VALUES (...)`
#[derive(Debug, Clone)]
pub struct InsertQuery {
    table: String,
    values: Assignments,
}

impl InsertQuery {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            values: Assignments::new(),
        }
    }

    pub fn set(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values = self.values.set(column, value);
        self
    }

    pub fn values(mut self, values: Assignments) -> Self {
        self.values = values;
        self
    }

    pub fn render(&self) -> PgdResult<RenderedQuery> {
        Statement::Insert(self).render()
    }
}

/// `UPDATE table SET ... WHERE ...`
#[derive(Debug, Clone)]
pub struct UpdateQuery {
    table: String,
    set: Assignments,
    filter: Filter,
}

impl UpdateQuery {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            set: Assignments::new(),
            filter: Filter::empty(),
        }
    }

    pub fn set(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set = self.set.set(column, value);
        self
    }

    pub fn values(mut self, values: Assignments) -> Self {
        self.set = values;
        self
    }

    pub fn filter(mut self, filter: impl Into<Filter>) -> Self {
        self.filter = filter.into();
        self
    }

    pub fn render(&self) -> PgdResult<RenderedQuery> {
        Statement::Update(self).render()
    }
}

/// `DELETE FROM table WHERE ...`
#[derive(Debug, Clone)]
pub struct DeleteQuery {
    table: String,
    filter: Filter,
}

impl DeleteQuery {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            filter: Filter::empty(),
        }
    }

    pub fn filter(mut self, filter: impl Into<Filter>) -> Self {
        self.filter = filter.into();
        self
    }

    pub fn render(&self) -> PgdResult<RenderedQuery> {
        Statement::Delete(self).render()
    }
}
