use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;
use serde_json::Value;

use super::{DataGateway, Filter, GatewayError, Query, Record};

/// Operation kinds recorded by the in-memory gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GatewayOperation {
    Select,
    Insert,
    Update,
    Upsert,
}

/// Process-local table store used by the server, the CLI demo, and tests.
///
/// New rows receive an `id` and a `created_at` timestamp when the caller omits them.
/// Failures can be scripted per operation and table to exercise partial-failure paths.
#[derive(Debug, Default)]
pub struct InMemoryGateway {
    tables: Mutex<HashMap<String, Vec<Record>>>,
    failures: Mutex<HashMap<(GatewayOperation, String), GatewayError>>,
    journal: Mutex<Vec<(GatewayOperation, String)>>,
    sequence: AtomicU64,
}

impl InMemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a gateway pre-populated from `{ table: [rows] }`.
    pub fn with_tables(tables: HashMap<String, Vec<Record>>) -> Self {
        let gateway = Self::default();
        for (table, rows) in tables {
            gateway.seed(&table, rows);
        }
        gateway
    }

    /// Append rows verbatim apart from `id`/`created_at` defaults.
    pub fn seed(&self, table: &str, rows: Vec<Record>) {
        let mut tables = lock(&self.tables);
        let entries = tables.entry(table.to_string()).or_default();
        for mut row in rows {
            self.assign_defaults(&mut row);
            entries.push(row);
        }
    }

    /// Snapshot of a table's rows in insertion order.
    pub fn rows(&self, table: &str) -> Vec<Record> {
        lock(&self.tables).get(table).cloned().unwrap_or_default()
    }

    /// Make every subsequent `operation` against `table` fail with `error`.
    pub fn fail_on(&self, operation: GatewayOperation, table: &str, error: GatewayError) {
        lock(&self.failures).insert((operation, table.to_string()), error);
    }

    pub fn clear_failures(&self) {
        lock(&self.failures).clear();
    }

    /// Every request received so far, including failed ones.
    pub fn journal(&self) -> Vec<(GatewayOperation, String)> {
        lock(&self.journal).clone()
    }

    pub fn count(&self, operation: GatewayOperation, table: &str) -> usize {
        lock(&self.journal)
            .iter()
            .filter(|(op, name)| *op == operation && name == table)
            .count()
    }

    fn record_call(&self, operation: GatewayOperation, table: &str) -> Result<(), GatewayError> {
        lock(&self.journal).push((operation, table.to_string()));
        match lock(&self.failures).get(&(operation, table.to_string())) {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }

    fn assign_defaults(&self, row: &mut Record) {
        if row.get("id").map_or(true, Value::is_null) {
            let next = self.sequence.fetch_add(1, Ordering::Relaxed) + 1;
            row.insert("id".to_string(), Value::String(format!("row-{next:06}")));
        }
        if row.get("created_at").map_or(true, Value::is_null) {
            row.insert(
                "created_at".to_string(),
                Value::String(Utc::now().to_rfc3339()),
            );
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn merge_columns(target: &mut Record, patch: Record) {
    for (column, value) in patch {
        target.insert(column, value);
    }
}

impl DataGateway for InMemoryGateway {
    async fn select(&self, table: &str, query: &Query) -> Result<Vec<Record>, GatewayError> {
        self.record_call(GatewayOperation::Select, table)?;

        let tables = lock(&self.tables);
        let mut rows: Vec<Record> = tables
            .get(table)
            .map(|rows| rows.iter().filter(|row| query.matches(row)).cloned().collect())
            .unwrap_or_default();
        drop(tables);

        if let Some(order) = &query.order {
            rows.sort_by(|left, right| order.compare(left, right));
        }
        if let Some(limit) = query.limit {
            rows.truncate(limit);
        }
        Ok(rows)
    }

    async fn insert(&self, table: &str, mut record: Record) -> Result<Record, GatewayError> {
        self.record_call(GatewayOperation::Insert, table)?;

        self.assign_defaults(&mut record);
        let mut tables = lock(&self.tables);
        let rows = tables.entry(table.to_string()).or_default();
        if rows.iter().any(|row| row.get("id") == record.get("id")) {
            return Err(GatewayError::Rejected {
                code: Some("23505".to_string()),
                message: format!("duplicate key value violates unique constraint \"{table}_pkey\""),
            });
        }
        rows.push(record.clone());
        Ok(record)
    }

    async fn update(
        &self,
        table: &str,
        patch: Record,
        filters: &[Filter],
    ) -> Result<Vec<Record>, GatewayError> {
        self.record_call(GatewayOperation::Update, table)?;

        let mut tables = lock(&self.tables);
        let mut updated = Vec::new();
        if let Some(rows) = tables.get_mut(table) {
            for row in rows
                .iter_mut()
                .filter(|row| filters.iter().all(|filter| filter.matches(row)))
            {
                merge_columns(row, patch.clone());
                updated.push(row.clone());
            }
        }
        Ok(updated)
    }

    async fn upsert(
        &self,
        table: &str,
        mut record: Record,
        conflict_keys: &[&str],
    ) -> Result<Record, GatewayError> {
        self.record_call(GatewayOperation::Upsert, table)?;

        let mut key = Vec::with_capacity(conflict_keys.len());
        for column in conflict_keys {
            match record.get(*column) {
                Some(value) if !value.is_null() => key.push((*column, value.clone())),
                _ => {
                    return Err(GatewayError::Rejected {
                        code: Some("42P10".to_string()),
                        message: format!("upsert on {table} is missing conflict column {column}"),
                    })
                }
            }
        }

        let mut tables = lock(&self.tables);
        let rows = tables.entry(table.to_string()).or_default();
        let existing = rows.iter_mut().find(|row| {
            key.iter()
                .all(|(column, value)| row.get(*column) == Some(value))
        });

        match existing {
            Some(row) => {
                record.remove("id");
                record.remove("created_at");
                merge_columns(row, record);
                Ok(row.clone())
            }
            None => {
                self.assign_defaults(&mut record);
                rows.push(record.clone());
                Ok(record)
            }
        }
    }
}
