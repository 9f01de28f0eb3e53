//! Row store boundary
//!
//! Rows are JSON objects in named tables. Filtering is equality-only, which
//! is all the site needs.

use std::cmp::Ordering;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;

/// A row as exchanged with the store
pub type Row = Value;

/// Equality filter (`column = value` for every condition)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filter {
    conditions: Vec<(String, String)>,
}

impl Filter {
    /// Create an empty filter (matches every row)
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an equality condition
    pub fn eq(mut self, column: impl Into<String>, value: impl ToString) -> Self {
        self.conditions.push((column.into(), value.to_string()));
        self
    }

    /// Conditions in insertion order
    pub fn conditions(&self) -> &[(String, String)] {
        &self.conditions
    }

    /// Check a row against every condition
    pub fn matches(&self, row: &Row) -> bool {
        self.conditions
            .iter()
            .all(|(column, expected)| value_equals(row.get(column), expected))
    }
}

/// Sort order for a select
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    /// Column to sort on
    pub column: String,
    /// Ascending when true, descending otherwise
    pub ascending: bool,
}

/// Select query: filter, optional ordering, optional limit
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    /// Equality conditions
    pub filter: Filter,
    /// Sort order
    pub order: Option<Order>,
    /// Maximum number of rows
    pub limit: Option<usize>,
}

impl Query {
    /// Create a query matching every row
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an equality condition
    pub fn eq(mut self, column: impl Into<String>, value: impl ToString) -> Self {
        self.filter = self.filter.eq(column, value);
        self
    }

    /// Sort by `column`
    pub fn order_by(mut self, column: impl Into<String>, ascending: bool) -> Self {
        self.order = Some(Order {
            column: column.into(),
            ascending,
        });
        self
    }

    /// Cap the number of rows returned
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Hosted row store
#[async_trait]
pub trait RowStore: Send + Sync {
    /// Insert one row, returning it as stored (with defaults filled in)
    async fn insert(&self, table: &str, row: Row) -> Result<Row>;

    /// Select rows
    async fn select(&self, table: &str, query: &Query) -> Result<Vec<Row>>;

    /// Merge `patch` into every matching row, returning the updated rows
    async fn update(&self, table: &str, filter: &Filter, patch: Row) -> Result<Vec<Row>>;

    /// Insert, or merge into the row with the same `on_conflict` value
    async fn upsert(&self, table: &str, row: Row, on_conflict: &str) -> Result<Row>;

    /// Store name for logging
    fn name(&self) -> &'static str;

    /// Select at most one row
    async fn select_one(&self, table: &str, query: Query) -> Result<Option<Row>> {
        let rows = self.select(table, &query.limit(1)).await?;
        Ok(rows.into_iter().next())
    }
}

/// Compare a stored value with a filter value in its textual form
pub(crate) fn value_equals(value: Option<&Value>, expected: &str) -> bool {
    match value {
        Some(Value::String(s)) => s == expected,
        Some(Value::Null) | None => false,
        Some(other) => other.to_string() == expected,
    }
}

/// Total order over JSON values for sorting (missing/null sort first)
pub(crate) fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (None | Some(Value::Null), None | Some(Value::Null)) => Ordering::Equal,
        (None | Some(Value::Null), _) => Ordering::Less,
        (_, None | Some(Value::Null)) => Ordering::Greater,
        (Some(Value::String(a)), Some(Value::String(b))) => a.cmp(b),
        (Some(Value::Number(a)), Some(Value::Number(b))) => {
            let a = a.as_f64().unwrap_or_default();
            let b = b.as_f64().unwrap_or_default();
            a.partial_cmp(&b).unwrap_or(Ordering::Equal)
        }
        (Some(a), Some(b)) => a.to_string().cmp(&b.to_string()),
    }
}
