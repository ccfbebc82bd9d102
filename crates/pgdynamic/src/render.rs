//! Placeholder-aware SQL writer and the fragment renderers.
//!
//! SQL text and parameter slots are stored separately, so the same statement
//! can be printed with `%s` placeholders (the canonical form) or numbered
//! `$1, $2, ...` placeholders (what PostgreSQL executes).

use crate::descriptor::{Filter, Join};
use crate::error::{PgdError, PgdResult};
use crate::value::Value;
use std::fmt::Write;
use tokio_postgres::types::ToSql;

/// Placeholder flavor used when printing a [`RenderedQuery`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placeholder {
    /// `%s` for every parameter.
    Format,
    /// `$1, $2, ...` in parameter order.
    Numbered,
}

#[derive(Debug, Clone, PartialEq)]
enum SqlPart {
    Raw(String),
    Param,
}

/// Accumulates raw SQL and bound values in placeholder order.
#[derive(Debug, Clone, Default)]
pub(crate) struct SqlWriter {
    parts: Vec<SqlPart>,
    params: Vec<Value>,
}

impl SqlWriter {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Append raw SQL (no parameters).
    pub(crate) fn push(&mut self, sql: &str) -> &mut Self {
        if sql.is_empty() {
            return self;
        }

        match self.parts.last_mut() {
            Some(SqlPart::Raw(last)) => last.push_str(sql),
            _ => self.parts.push(SqlPart::Raw(sql.to_string())),
        }
        self
    }

    /// Append a placeholder and bind its value.
    pub(crate) fn push_bind(&mut self, value: Value) -> &mut Self {
        self.parts.push(SqlPart::Param);
        self.params.push(value);
        self
    }

    pub(crate) fn finish(self) -> RenderedQuery {
        RenderedQuery {
            parts: self.parts,
            params: self.params,
        }
    }
}

/// A statement ready to execute: SQL text plus its ordered parameters.
///
/// `params().len()` always equals the number of placeholders in the SQL.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedQuery {
    parts: Vec<SqlPart>,
    params: Vec<Value>,
}

impl RenderedQuery {
    /// SQL with `%s` placeholders.
    pub fn sql(&self) -> String {
        self.to_sql_with(Placeholder::Format)
    }

    /// SQL with `$1, $2, ...` placeholders.
    pub fn numbered_sql(&self) -> String {
        self.to_sql_with(Placeholder::Numbered)
    }

    pub fn to_sql_with(&self, style: Placeholder) -> String {
        let mut out = String::new();
        let mut idx: usize = 0;

        for part in &self.parts {
            match part {
                SqlPart::Raw(s) => out.push_str(s),
                SqlPart::Param => {
                    idx += 1;
                    match style {
                        Placeholder::Format => out.push_str("%s"),
                        Placeholder::Numbered => {
                            let _ = write!(&mut out, "${idx}");
                        }
                    }
                }
            }
        }
        out
    }

    /// Bound values in placeholder order.
    pub fn params(&self) -> &[Value] {
        &self.params
    }

    /// Parameter refs compatible with `tokio-postgres`.
    pub fn params_ref(&self) -> Vec<&(dyn ToSql + Sync)> {
        self.params.iter().map(|p| p as &(dyn ToSql + Sync)).collect()
    }

    pub fn into_parts(self) -> (String, Vec<Value>) {
        let sql = self.sql();
        (sql, self.params)
    }
}

impl std::fmt::Display for RenderedQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.sql())
    }
}

/// Render a filter as ` col op %s AND col op %s `, one placeholder per condition.
///
/// Each condition contributes `" {col} {op} %s"` followed by `" {conj}"` or a
/// single space when it has no connector.
pub(crate) fn write_conditions(w: &mut SqlWriter, filter: &Filter) -> PgdResult<()> {
    for cond in filter.conditions() {
        if cond.column.trim().is_empty() {
            return Err(PgdError::validation("condition column cannot be empty"));
        }
        if cond.operator.symbol().trim().is_empty() {
            return Err(PgdError::validation(format!(
                "condition on '{}' has an empty operator",
                cond.column
            )));
        }
        w.push(" ").push(&cond.column).push(" ").push(cond.operator.symbol()).push(" ");
        match cond.operator.quantifier() {
            Some(q) => {
                w.push(q).push("(").push_bind(cond.value.clone()).push(")");
            }
            None => {
                w.push_bind(cond.value.clone());
            }
        }
        match cond.conjunction {
            Some(conj) => w.push(" ").push(conj.keyword()),
            None => w.push(" "),
        };
    }
    Ok(())
}

/// Render joins as ` {KEYWORD} {table} {alias} ON {on}` each, in order.
pub(crate) fn write_joins(w: &mut SqlWriter, joins: &[Join]) -> PgdResult<()> {
    for join in joins {
        join.validate()?;
        w.push(" ")
            .push(join.method.keyword())
            .push(" ")
            .push(&join.table)
            .push(" ")
            .push(&join.alias)
            .push(" ON ")
            .push(&join.on);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{Condition, JoinMethod, Operator};

    fn conditions(filter: &Filter) -> RenderedQuery {
        let mut w = SqlWriter::new();
        write_conditions(&mut w, filter).unwrap();
        w.finish()
    }

    #[test]
    fn writer_numbers_placeholders_in_order() {
        let mut w = SqlWriter::new();
        w.push("SELECT * FROM t WHERE a = ")
            .push_bind(Value::Int(1))
            .push(" AND b = ")
            .push_bind(Value::from("x"));
        let q = w.finish();

        assert_eq!(q.sql(), "SELECT * FROM t WHERE a = %s AND b = %s");
        assert_eq!(q.numbered_sql(), "SELECT * FROM t WHERE a = $1 AND b = $2");
        assert_eq!(q.params_ref().len(), 2);
    }

    #[test]
    fn single_condition_defaults_to_equal() {
        let q = conditions(&Filter::new(Condition::eq("id", 1)));
        assert_eq!(q.sql(), " id = %s ");
        assert_eq!(q.params(), &[Value::Int(1)]);
    }

    #[test]
    fn connectors_follow_each_condition() {
        let filter = Filter::new(Condition::eq("a", 1))
            .and(Condition::new("b", Operator::Greater, 2))
            .or(Condition::new("c", Operator::Like, "x%"));
        let q = conditions(&filter);

        assert_eq!(q.sql(), " a = %s AND b > %s OR c LIKE %s ");
        assert_eq!(q.sql().matches("%s").count(), filter.len());
        assert_eq!(
            q.params(),
            &[Value::Int(1), Value::Int(2), Value::from("x%")]
        );
    }

    #[test]
    fn in_binds_one_array_parameter() {
        let q = conditions(&Filter::new(Condition::in_list("id", [1, 2, 3])));
        assert_eq!(q.sql(), " id = ANY(%s) ");
        assert_eq!(q.numbered_sql(), " id = ANY($1) ");
        assert_eq!(
            q.params(),
            &[Value::Array(vec![Value::Int(1), Value::Int(2), Value::Int(3)])]
        );
    }

    #[test]
    fn not_in_uses_all() {
        let q = conditions(&Filter::new(Condition::new(
            "status",
            Operator::NotIn,
            vec!["a", "b"].into_iter().collect::<Value>(),
        )));
        assert_eq!(q.sql(), " status <> ALL(%s) ");
    }

    #[test]
    fn empty_custom_operator_is_rejected() {
        let filter = Filter::new(Condition::new("id", Operator::Custom(String::new()), 1));
        let mut w = SqlWriter::new();
        let err = write_conditions(&mut w, &filter).unwrap_err();
        assert!(err.is_validation());

        let filter = Filter::new(Condition::new("id", Operator::Custom("  ".into()), 1));
        assert!(write_conditions(&mut SqlWriter::new(), &filter).is_err());
    }

    #[test]
    fn custom_operator_is_written_verbatim() {
        let q = conditions(&Filter::new(Condition::new(
            "tags",
            Operator::Custom("@>".into()),
            Value::from("x"),
        )));
        assert_eq!(q.sql(), " tags @> %s ");
    }

    #[test]
    fn empty_filter_renders_nothing() {
        let q = conditions(&Filter::empty());
        assert_eq!(q.sql(), "");
        assert!(q.params().is_empty());
    }

    #[test]
    fn joins_render_in_order() {
        let joins = vec![
            Join::new(JoinMethod::Inner, "salaries", "sal", "emp.id = sal.emp_id"),
            Join::new(JoinMethod::from_token("OUTER"), "titles", "t", "emp.id = t.emp_id"),
        ];
        let mut w = SqlWriter::new();
        write_joins(&mut w, &joins).unwrap();
        let q = w.finish();

        assert_eq!(
            q.sql(),
            " INNER JOIN salaries sal ON emp.id = sal.emp_id JOIN titles t ON emp.id = t.emp_id"
        );
        assert!(q.params().is_empty());
    }

    #[test]
    fn join_without_on_is_rejected() {
        let mut w = SqlWriter::new();
        let err = write_joins(&mut w, &[Join::inner("salaries", "sal", "")]).unwrap_err();
        assert!(err.is_validation());
    }
}
