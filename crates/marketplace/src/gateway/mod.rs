//! Contract with the hosted table store.
//!
//! Rows travel as JSON objects so every table shares one transport shape; the workflow
//! modules convert them into typed records with [`to_record`] and [`from_rows`].

mod memory;

use std::cmp::Ordering;
use std::future::Future;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

pub use memory::{GatewayOperation, InMemoryGateway};

/// One table row.
pub type Record = Map<String, Value>;

/// Row predicate applied by `select` and `update`.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Eq(String, Value),
    Neq(String, Value),
    In(String, Vec<Value>),
}

impl Filter {
    pub fn eq(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Eq(column.into(), value.into())
    }

    pub fn neq(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Neq(column.into(), value.into())
    }

    pub fn any_of<V: Into<Value>>(
        column: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        Self::In(column.into(), values.into_iter().map(Into::into).collect())
    }

    pub fn matches(&self, row: &Record) -> bool {
        match self {
            Filter::Eq(column, expected) => row.get(column) == Some(expected),
            Filter::Neq(column, rejected) => row.get(column) != Some(rejected),
            Filter::In(column, allowed) => row
                .get(column)
                .map(|value| allowed.contains(value))
                .unwrap_or(false),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderBy {
    pub column: String,
    pub direction: Direction,
}

impl OrderBy {
    /// Compare two rows on the ordering column; missing or null values sort last.
    pub fn compare(&self, left: &Record, right: &Record) -> Ordering {
        let left = left.get(&self.column).filter(|value| !value.is_null());
        let right = right.get(&self.column).filter(|value| !value.is_null());
        match (left, right) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Greater,
            (Some(_), None) => Ordering::Less,
            (Some(left), Some(right)) => {
                let ordering = compare_values(left, right);
                match self.direction {
                    Direction::Ascending => ordering,
                    Direction::Descending => ordering.reverse(),
                }
            }
        }
    }
}

fn compare_values(left: &Value, right: &Value) -> Ordering {
    match (left, right) {
        (Value::Number(left), Value::Number(right)) => left
            .as_f64()
            .partial_cmp(&right.as_f64())
            .unwrap_or(Ordering::Equal),
        (Value::String(left), Value::String(right)) => left.cmp(right),
        (Value::Bool(left), Value::Bool(right)) => left.cmp(right),
        _ => left.to_string().cmp(&right.to_string()),
    }
}

/// Filters, ordering, and limit for a `select`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub filters: Vec<Filter>,
    pub order: Option<OrderBy>,
    pub limit: Option<usize>,
}

impl Query {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn eq(self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filter(Filter::eq(column, value))
    }

    pub fn neq(self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filter(Filter::neq(column, value))
    }

    pub fn any_of<V: Into<Value>>(
        self,
        column: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        self.filter(Filter::any_of(column, values))
    }

    pub fn order_by(mut self, column: impl Into<String>, direction: Direction) -> Self {
        self.order = Some(OrderBy {
            column: column.into(),
            direction,
        });
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn matches(&self, row: &Record) -> bool {
        self.filters.iter().all(|filter| filter.matches(row))
    }
}

/// Failure reported by the table store. The message is what callers surface to operators.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GatewayError {
    /// The store refused the request (constraint violation, permission denial, bad column).
    #[error("{message}")]
    Rejected {
        code: Option<String>,
        message: String,
    },
    #[error("gateway unavailable: {0}")]
    Unavailable(String),
    #[error("expected a single row, found {rows}")]
    NotSingular { rows: usize },
    #[error("malformed row: {0}")]
    Codec(String),
}

impl GatewayError {
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected {
            code: None,
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for GatewayError {
    fn from(value: serde_json::Error) -> Self {
        Self::Codec(value.to_string())
    }
}

/// Table-oriented request/response client.
pub trait DataGateway: Send + Sync {
    fn select(
        &self,
        table: &str,
        query: &Query,
    ) -> impl Future<Output = Result<Vec<Record>, GatewayError>> + Send;

    fn insert(
        &self,
        table: &str,
        record: Record,
    ) -> impl Future<Output = Result<Record, GatewayError>> + Send;

    /// Apply `patch` to every row matching `filters`, returning the updated rows.
    fn update(
        &self,
        table: &str,
        patch: Record,
        filters: &[Filter],
    ) -> impl Future<Output = Result<Vec<Record>, GatewayError>> + Send;

    /// Insert `record`, or overwrite the provided columns of the row whose
    /// `conflict_keys` columns all equal the record's.
    fn upsert(
        &self,
        table: &str,
        record: Record,
        conflict_keys: &[&str],
    ) -> impl Future<Output = Result<Record, GatewayError>> + Send;
}

pub fn to_record<T: Serialize>(value: &T) -> Result<Record, GatewayError> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        other => Err(GatewayError::Codec(format!(
            "expected an object row, got {other}"
        ))),
    }
}

pub fn from_record<T: DeserializeOwned>(record: Record) -> Result<T, GatewayError> {
    Ok(serde_json::from_value(Value::Object(record))?)
}

pub fn from_rows<T: DeserializeOwned>(rows: Vec<Record>) -> Result<Vec<T>, GatewayError> {
    rows.into_iter().map(from_record).collect()
}

/// Enforce `.single()` semantics: exactly one row or an error.
pub fn expect_single(mut rows: Vec<Record>) -> Result<Record, GatewayError> {
    if rows.len() == 1 {
        if let Some(row) = rows.pop() {
            return Ok(row);
        }
    }
    Err(GatewayError::NotSingular { rows: rows.len() })
}
