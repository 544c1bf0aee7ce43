//! Row-store collaborator.
//!
//! A deliberately small table/row abstraction: insert rows, select with
//! equality filters and an optional ordering, update matching rows with a
//! patch. No cross-table transactions. Rows are JSON objects; every inserted
//! row receives an `id` (unless provided) and a `created_at` timestamp.

pub mod memory;

use crate::error::Result;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::cmp::Ordering;

pub use memory::MemoryStore;

pub type Row = Map<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Table {
    Incidents,
    IncidentReports,
    IncidentContext,
    ActionsTaken,
}

impl Table {
    pub const ALL: [Table; 4] = [
        Table::Incidents,
        Table::IncidentReports,
        Table::IncidentContext,
        Table::ActionsTaken,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Table::Incidents => "incidents",
            Table::IncidentReports => "incident_reports",
            Table::IncidentContext => "incident_context",
            Table::ActionsTaken => "actions_taken",
        }
    }
}

/// Conjunction of column equality checks.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    conditions: Vec<(String, Value)>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.conditions.push((column.to_string(), value.into()));
        self
    }

    pub fn matches(&self, row: &Row) -> bool {
        self.conditions
            .iter()
            .all(|(column, value)| row.get(column) == Some(value))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub filter: Filter,
    pub order: Option<(String, Direction)>,
    pub limit: Option<usize>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.filter = self.filter.eq(column, value);
        self
    }

    pub fn order_by(mut self, column: &str, direction: Direction) -> Self {
        self.order = Some((column.to_string(), direction));
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Apply filter, order and limit to rows given in insertion order.
    /// Ordering is stable, so ties keep insertion order.
    pub fn apply<'a, I>(&self, rows: I) -> Vec<Row>
    where
        I: IntoIterator<Item = &'a Row>,
    {
        let mut selected: Vec<Row> = rows
            .into_iter()
            .filter(|row| self.filter.matches(row))
            .cloned()
            .collect();

        if let Some((column, direction)) = &self.order {
            selected.sort_by(|a, b| {
                let ordering = compare_values(a.get(column), b.get(column));
                match direction {
                    Direction::Ascending => ordering,
                    Direction::Descending => ordering.reverse(),
                }
            });
        }
        if let Some(limit) = self.limit {
            selected.truncate(limit);
        }
        selected
    }
}

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::String(a)), Some(Value::String(b))) => a.cmp(b),
        (Some(Value::Number(a)), Some(Value::Number(b))) => a
            .as_f64()
            .partial_cmp(&b.as_f64())
            .unwrap_or(Ordering::Equal),
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        _ => Ordering::Equal,
    }
}

#[async_trait]
pub trait RowStore: Send + Sync {
    /// Insert rows, returning them as stored (with `id` and `created_at`).
    async fn insert(&self, table: Table, rows: Vec<Row>) -> Result<Vec<Row>>;

    /// Rows matching `query`; without an explicit order, insertion order.
    async fn select(&self, table: Table, query: Query) -> Result<Vec<Row>>;

    /// Merge `patch` into every row matching `filter`. Returns the number updated.
    async fn update(&self, table: Table, patch: Row, filter: Filter) -> Result<usize>;
}

/// Build a row from a JSON object literal. Non-objects yield an empty row.
pub fn row(value: Value) -> Row {
    match value {
        Value::Object(map) => map,
        _ => Row::new(),
    }
}
