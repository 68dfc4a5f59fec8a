//! Remote record store contract
//!
//! The progress store only needs three things from a backing database:
//! equality filters, ordering by a column and an upsert with a conflict
//! target. Anything that offers those can stand behind [`RecordStore`].

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use serde_json::{Map, Value};

use super::error::StoreError;

/// A single row, as a JSON object
pub type Record = Map<String, Value>;

/// Equality filter on one column
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub column: String,
    pub value: Value,
}

impl Filter {
    pub fn eq(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self { column: column.into(), value: value.into() }
    }

    fn matches(&self, record: &Record) -> bool {
        record.get(&self.column) == Some(&self.value)
    }
}

/// Sort order for a select
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub column: String,
    pub descending: bool,
}

impl OrderBy {
    pub fn asc(column: impl Into<String>) -> Self {
        Self { column: column.into(), descending: false }
    }

    pub fn desc(column: impl Into<String>) -> Self {
        Self { column: column.into(), descending: true }
    }
}

/// Generic read/upsert record service
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Select rows of `table` matching every filter, optionally ordered
    async fn select(
        &self,
        table: &str,
        filters: &[Filter],
        order: Option<&OrderBy>,
    ) -> Result<Vec<Record>, StoreError>;

    /// Insert `record`, or replace the row that shares its `conflict` columns
    async fn upsert(&self, table: &str, record: Record, conflict: &[&str])
    -> Result<(), StoreError>;
}

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(a)), Some(Value::Number(b))) => {
            let (a, b) = (a.as_f64().unwrap_or(0.0), b.as_f64().unwrap_or(0.0));
            a.partial_cmp(&b).unwrap_or(Ordering::Equal)
        }
        (Some(Value::String(a)), Some(Value::String(b))) => a.cmp(b),
        (Some(Value::Bool(a)), Some(Value::Bool(b))) => a.cmp(b),
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        _ => Ordering::Equal,
    }
}

/// In-process record store
///
/// Used by tests and as a stand-in when no remote is configured. It can be
/// switched offline to exercise the soft-failure paths of its callers.
#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    tables: Mutex<HashMap<String, Vec<Record>>>,
    offline: AtomicBool,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail as if the service were unreachable
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, AtomicOrdering::SeqCst);
    }

    /// Number of rows currently in `table`
    pub fn row_count(&self, table: &str) -> usize {
        self.tables
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(table)
            .map(|rows| rows.len())
            .unwrap_or(0)
    }

    fn check_online(&self) -> Result<(), StoreError> {
        if self.offline.load(AtomicOrdering::SeqCst) {
            return Err(StoreError::Remote {
                status: 503,
                message: "record store unavailable".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn select(
        &self,
        table: &str,
        filters: &[Filter],
        order: Option<&OrderBy>,
    ) -> Result<Vec<Record>, StoreError> {
        self.check_online()?;

        let tables = self.tables.lock().unwrap_or_else(PoisonError::into_inner);
        let mut rows: Vec<Record> = tables
            .get(table)
            .map(|rows| {
                rows.iter().filter(|row| filters.iter().all(|f| f.matches(row))).cloned().collect()
            })
            .unwrap_or_default();

        if let Some(order) = order {
            rows.sort_by(|a, b| {
                let ordering = compare_values(a.get(&order.column), b.get(&order.column));
                if order.descending { ordering.reverse() } else { ordering }
            });
        }

        Ok(rows)
    }

    async fn upsert(
        &self,
        table: &str,
        record: Record,
        conflict: &[&str],
    ) -> Result<(), StoreError> {
        self.check_online()?;

        for column in conflict {
            if !record.contains_key(*column) {
                return Err(StoreError::MissingColumn(column.to_string()));
            }
        }

        let mut tables = self.tables.lock().unwrap_or_else(PoisonError::into_inner);
        let rows = tables.entry(table.to_string()).or_default();
        let existing = rows
            .iter_mut()
            .find(|row| !conflict.is_empty() && conflict.iter().all(|c| row.get(*c) == record.get(*c)));

        match existing {
            Some(row) => *row = record,
            None => rows.push(record),
        }
        Ok(())
    }
}
