//! Query descriptors: plain values describing tables, joins, filters, ordering,
//! assignments and pagination.
//!
//! Descriptors carry no behavior beyond construction-time validation. Identifiers
//! and join `ON` text are trusted raw SQL; only [`Value`]s are parameter-bound.
//!
//! # Example
//! ```ignore
//! use pgdynamic::{Condition, Filter, Join, JoinMethod, Operator, TableRef};
//!
//! let table = TableRef::new("employees").alias("emp");
//! let join = Join::new(JoinMethod::Inner, "salaries", "sal", "emp.id = sal.emp_id");
//! let filter = Filter::new(Condition::eq("emp.id", 1))
//!     .and(Condition::new("sal.amount", Operator::Greater, 1000));
//! ```

use crate::error::{PgdError, PgdResult};
use crate::value::Value;

/// The main relation of a query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRef {
    pub table: String,
    pub alias: Option<String>,
}

impl TableRef {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            alias: None,
        }
    }

    /// Set the alias used after the table name.
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        let alias = alias.into();
        self.alias = if alias.is_empty() { None } else { Some(alias) };
        self
    }

    pub(crate) fn validate(&self) -> PgdResult<()> {
        if self.table.trim().is_empty() {
            return Err(PgdError::validation("table name cannot be empty"));
        }
        Ok(())
    }
}

impl From<&str> for TableRef {
    fn from(table: &str) -> Self {
        TableRef::new(table)
    }
}

impl From<String> for TableRef {
    fn from(table: String) -> Self {
        TableRef::new(table)
    }
}

/// Join type keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JoinMethod {
    Inner,
    Left,
    Right,
    Full,
    /// A bare `JOIN`.
    #[default]
    Plain,
}

impl JoinMethod {
    /// Map a method token; anything unrecognized becomes [`JoinMethod::Plain`].
    pub fn from_token(token: &str) -> Self {
        match token {
            "INNER" => JoinMethod::Inner,
            "LEFT" => JoinMethod::Left,
            "RIGHT" => JoinMethod::Right,
            "FULL" => JoinMethod::Full,
            _ => JoinMethod::Plain,
        }
    }

    pub fn keyword(self) -> &'static str {
        match self {
            JoinMethod::Inner => "INNER JOIN",
            JoinMethod::Left => "LEFT JOIN",
            JoinMethod::Right => "RIGHT JOIN",
            JoinMethod::Full => "FULL JOIN",
            JoinMethod::Plain => "JOIN",
        }
    }
}

/// A join clause. `on` is raw SQL and is never parameter-bound.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Join {
    pub method: JoinMethod,
    pub table: String,
    pub alias: String,
    pub on: String,
}

impl Join {
    pub fn new(
        method: JoinMethod,
        table: impl Into<String>,
        alias: impl Into<String>,
        on: impl Into<String>,
    ) -> Self {
        Self {
            method,
            table: table.into(),
            alias: alias.into(),
            on: on.into(),
        }
    }

    pub fn inner(table: impl Into<String>, alias: impl Into<String>, on: impl Into<String>) -> Self {
        Self::new(JoinMethod::Inner, table, alias, on)
    }

    pub fn left(table: impl Into<String>, alias: impl Into<String>, on: impl Into<String>) -> Self {
        Self::new(JoinMethod::Left, table, alias, on)
    }

    pub(crate) fn validate(&self) -> PgdResult<()> {
        if self.table.trim().is_empty() {
            return Err(PgdError::validation("join table name cannot be empty"));
        }
        if self.on.trim().is_empty() {
            return Err(PgdError::validation(format!(
                "join on '{}' has an empty ON clause",
                self.table
            )));
        }
        Ok(())
    }
}

/// Comparison operator of a [`Condition`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Operator {
    #[default]
    Equal,
    NotEqual,
    Greater,
    GreaterEqual,
    Less,
    LessEqual,
    Like,
    ILike,
    NotLike,
    /// `col = ANY(%s)`, bound to one array parameter.
    In,
    /// `col <> ALL(%s)`, bound to one array parameter.
    NotIn,
    /// Trusted operator text placed verbatim between column and placeholder.
    Custom(String),
}

impl Operator {
    /// Parse an operator token such as `"="`, `">="` or `"LIKE"`.
    ///
    /// Unknown tokens are kept verbatim as [`Operator::Custom`].
    pub fn from_token(token: &str) -> Self {
        match token.trim().to_ascii_uppercase().as_str() {
            "" | "=" => Operator::Equal,
            "!=" | "<>" => Operator::NotEqual,
            ">" => Operator::Greater,
            ">=" => Operator::GreaterEqual,
            "<" => Operator::Less,
            "<=" => Operator::LessEqual,
            "LIKE" => Operator::Like,
            "ILIKE" => Operator::ILike,
            "NOT LIKE" => Operator::NotLike,
            "IN" => Operator::In,
            "NOT IN" => Operator::NotIn,
            _ => Operator::Custom(token.trim().to_string()),
        }
    }

    pub(crate) fn symbol(&self) -> &str {
        match self {
            Operator::Equal => "=",
            Operator::NotEqual => "!=",
            Operator::Greater => ">",
            Operator::GreaterEqual => ">=",
            Operator::Less => "<",
            Operator::LessEqual => "<=",
            Operator::Like => "LIKE",
            Operator::ILike => "ILIKE",
            Operator::NotLike => "NOT LIKE",
            Operator::In => "=",
            Operator::NotIn => "<>",
            Operator::Custom(op) => op,
        }
    }

    /// Array quantifier wrapping the placeholder, if any.
    pub(crate) fn quantifier(&self) -> Option<&'static str> {
        match self {
            Operator::In => Some("ANY"),
            Operator::NotIn => Some("ALL"),
            _ => None,
        }
    }
}

/// Boolean connector placed after a condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Conjunction {
    And,
    Or,
}

impl Conjunction {
    pub fn keyword(self) -> &'static str {
        match self {
            Conjunction::And => "AND",
            Conjunction::Or => "OR",
        }
    }
}

/// A single `column <op> value` predicate.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub column: String,
    pub operator: Operator,
    pub value: Value,
    /// Connector to the *next* condition.
    pub conjunction: Option<Conjunction>,
}

impl Condition {
    pub fn new(column: impl Into<String>, operator: Operator, value: impl Into<Value>) -> Self {
        Self {
            column: column.into(),
            operator,
            value: value.into(),
            conjunction: None,
        }
    }

    /// `column = value`
    pub fn eq(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(column, Operator::Equal, value)
    }

    /// `column = ANY(values)`
    pub fn in_list<T: Into<Value>>(
        column: impl Into<String>,
        values: impl IntoIterator<Item = T>,
    ) -> Self {
        Self::new(column, Operator::In, values.into_iter().collect::<Value>())
    }

    /// Set the connector to the next condition.
    pub fn then(mut self, conjunction: Conjunction) -> Self {
        self.conjunction = Some(conjunction);
        self
    }
}

/// An ordered, validated list of conditions.
///
/// Every condition but the last carries a connector and the last one carries
/// none, so the rendered predicate is always well formed.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Filter {
    conditions: Vec<Condition>,
}

impl Filter {
    /// Start a filter with its first condition.
    pub fn new(first: Condition) -> Self {
        Self {
            conditions: vec![Condition {
                conjunction: None,
                ..first
            }],
        }
    }

    /// A filter with no conditions.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build from an explicit list, checking every connector.
    pub fn from_conditions(conditions: Vec<Condition>) -> PgdResult<Self> {
        let last = conditions.len().saturating_sub(1);
        for (i, cond) in conditions.iter().enumerate() {
            if cond.column.trim().is_empty() {
                return Err(PgdError::validation(format!(
                    "condition #{} has an empty column name",
                    i + 1
                )));
            }
            match (i == last, cond.conjunction) {
                (false, None) => {
                    return Err(PgdError::validation(format!(
                        "condition #{} ('{}') needs a conjunction before the next condition",
                        i + 1,
                        cond.column
                    )));
                }
                (true, Some(conj)) => {
                    return Err(PgdError::validation(format!(
                        "last condition ('{}') has a trailing {}",
                        cond.column,
                        conj.keyword()
                    )));
                }
                _ => {}
            }
        }
        Ok(Self { conditions })
    }

    fn push(mut self, conjunction: Conjunction, next: Condition) -> Self {
        match self.conditions.last_mut() {
            Some(last) => last.conjunction = Some(conjunction),
            None => return Filter::new(next),
        }
        self.conditions.push(Condition {
            conjunction: None,
            ..next
        });
        self
    }

    /// Append `AND next`.
    pub fn and(self, next: Condition) -> Self {
        self.push(Conjunction::And, next)
    }

    /// Append `OR next`.
    pub fn or(self, next: Condition) -> Self {
        self.push(Conjunction::Or, next)
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    pub fn len(&self) -> usize {
        self.conditions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// Bound values in condition order.
    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.conditions.iter().map(|c| &c.value)
    }
}

impl From<Condition> for Filter {
    fn from(cond: Condition) -> Self {
        Filter::new(cond)
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

impl Direction {
    pub fn keyword(self) -> &'static str {
        match self {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        }
    }
}

/// Insertion-ordered `ORDER BY` entries.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OrderBy {
    entries: Vec<(String, Direction)>,
}

impl OrderBy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a column. Re-adding a column updates its direction in place.
    pub fn push(&mut self, column: impl Into<String>, direction: Direction) -> &mut Self {
        let column = column.into();
        match self.entries.iter_mut().find(|(c, _)| *c == column) {
            Some(entry) => entry.1 = direction,
            None => self.entries.push((column, direction)),
        }
        self
    }

    pub fn entries(&self) -> &[(String, Direction)] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Insertion-ordered `column = value` pairs for INSERT and UPDATE.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Assignments {
    entries: Vec<(String, Value)>,
}

impl Assignments {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a column. Re-setting a column replaces its value in place.
    pub fn set(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        let column = column.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(c, _)| *c == column) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((column, value)),
        }
        self
    }

    pub fn entries(&self) -> &[(String, Value)] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn validate(&self) -> PgdResult<()> {
        if self.entries.is_empty() {
            return Err(PgdError::validation("at least one column assignment is required"));
        }
        if let Some((column, _)) = self.entries.iter().find(|(c, _)| c.trim().is_empty()) {
            return Err(PgdError::validation(format!(
                "invalid assignment column '{column}'"
            )));
        }
        Ok(())
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Assignments {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        iter.into_iter()
            .fold(Assignments::new(), |acc, (k, v)| acc.set(k, v))
    }
}

/// Page-based pagination. `page` is 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Page {
    limit: Option<i64>,
    page: Option<i64>,
}

impl Page {
    /// No limit and no offset.
    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn new(limit: Option<i64>, page: Option<i64>) -> PgdResult<Self> {
        if let Some(limit) = limit {
            if limit < 0 {
                return Err(PgdError::validation(format!(
                    "limit must not be negative, got {limit}"
                )));
            }
        }
        match (limit, page) {
            (_, Some(page)) if page < 1 => Err(PgdError::validation(format!(
                "page is 1-based, got {page}"
            ))),
            (None, Some(_)) => Err(PgdError::validation("page requires a limit")),
            _ => Ok(Self { limit, page }),
        }
    }

    /// `limit` rows starting at 1-based `page`.
    pub fn of(limit: i64, page: i64) -> PgdResult<Self> {
        Self::new(Some(limit), Some(page))
    }

    pub fn limit(&self) -> Option<i64> {
        self.limit
    }

    pub fn page(&self) -> Option<i64> {
        self.page
    }

    /// Row offset `limit * (page - 1)`, or `None` when no page was given.
    pub fn offset(&self) -> Option<i64> {
        match (self.limit, self.page) {
            (Some(limit), Some(page)) => Some(limit.saturating_mul(page - 1)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_method_tokens() {
        assert_eq!(JoinMethod::from_token("INNER").keyword(), "INNER JOIN");
        assert_eq!(JoinMethod::from_token("LEFT").keyword(), "LEFT JOIN");
        assert_eq!(JoinMethod::from_token("RIGHT").keyword(), "RIGHT JOIN");
        assert_eq!(JoinMethod::from_token("FULL").keyword(), "FULL JOIN");
        assert_eq!(JoinMethod::from_token("CROSS").keyword(), "JOIN");
        assert_eq!(JoinMethod::from_token("").keyword(), "JOIN");
    }

    #[test]
    fn operator_tokens() {
        assert_eq!(Operator::from_token("="), Operator::Equal);
        assert_eq!(Operator::from_token(">="), Operator::GreaterEqual);
        assert_eq!(Operator::from_token("ilike"), Operator::ILike);
        assert_eq!(Operator::from_token("in"), Operator::In);
        assert_eq!(
            Operator::from_token("@>"),
            Operator::Custom("@>".to_string())
        );
    }

    #[test]
    fn filter_builder_sets_connectors() {
        let filter = Filter::new(Condition::eq("a", 1))
            .and(Condition::eq("b", 2))
            .or(Condition::eq("c", 3));

        let conj: Vec<_> = filter.conditions().iter().map(|c| c.conjunction).collect();
        assert_eq!(
            conj,
            vec![Some(Conjunction::And), Some(Conjunction::Or), None]
        );
        let values: Vec<_> = filter.values().cloned().collect();
        assert_eq!(values, vec![Value::Int(1), Value::Int(2), Value::Int(3)]);
    }

    #[test]
    fn filter_from_conditions_requires_connectors() {
        let err = Filter::from_conditions(vec![Condition::eq("a", 1), Condition::eq("b", 2)])
            .unwrap_err();
        assert!(err.is_validation());

        let err = Filter::from_conditions(vec![Condition::eq("a", 1).then(Conjunction::And)])
            .unwrap_err();
        assert!(err.is_validation());

        let ok = Filter::from_conditions(vec![
            Condition::eq("a", 1).then(Conjunction::Or),
            Condition::eq("b", 2),
        ])
        .unwrap();
        assert_eq!(ok.len(), 2);

        assert!(Filter::from_conditions(Vec::new()).unwrap().is_empty());
    }

    #[test]
    fn filter_rejects_empty_column() {
        let err = Filter::from_conditions(vec![Condition::eq(" ", 1)]).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn and_on_empty_filter_starts_it() {
        let filter = Filter::empty().and(Condition::eq("a", 1));
        assert_eq!(filter.len(), 1);
        assert_eq!(filter.conditions()[0].conjunction, None);
    }

    #[test]
    fn page_offset() {
        assert_eq!(Page::of(5, 2).unwrap().offset(), Some(5));
        assert_eq!(Page::of(10, 1).unwrap().offset(), Some(0));
        assert_eq!(Page::of(25, 4).unwrap().offset(), Some(75));
        assert_eq!(Page::new(Some(5), None).unwrap().offset(), None);
        assert_eq!(Page::unbounded().offset(), None);
    }

    #[test]
    fn page_validation() {
        assert!(Page::of(5, 0).unwrap_err().is_validation());
        assert!(Page::of(-1, 1).unwrap_err().is_validation());
        assert!(Page::new(None, Some(2)).unwrap_err().is_validation());
    }

    #[test]
    fn order_by_keeps_insertion_order() {
        let mut order = OrderBy::new();
        order
            .push("last_name", Direction::Asc)
            .push("age", Direction::Desc)
            .push("last_name", Direction::Desc);

        assert_eq!(
            order.entries(),
            &[
                ("last_name".to_string(), Direction::Desc),
                ("age".to_string(), Direction::Desc)
            ]
        );
    }

    #[test]
    fn assignments_keep_insertion_order() {
        let set: Assignments = [("id", Value::from(6)), ("first_name", Value::from("Harrison"))]
            .into_iter()
            .collect();
        let cols: Vec<_> = set.entries().iter().map(|(c, _)| c.as_str()).collect();
        assert_eq!(cols, vec!["id", "first_name"]);
        assert!(Assignments::new().validate().is_err());
    }

    #[test]
    fn table_alias_empty_means_none() {
        assert_eq!(TableRef::new("employees").alias("").alias, None);
        assert_eq!(
            TableRef::new("employees").alias("emp").alias.as_deref(),
            Some("emp")
        );
        assert!(TableRef::new("").validate().is_err());
    }
}
