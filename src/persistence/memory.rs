use crate::error::{AppError, Result};
use crate::persistence::{Filter, Query, Row, RowStore, Table};
use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;

/// Snapshot format version. Increment when the layout changes.
const SNAPSHOT_VERSION: u64 = 1;

/// In-memory row store, optionally mirrored to a JSON snapshot file after
/// every write.
pub struct MemoryStore {
    tables: RwLock<BTreeMap<Table, Vec<Row>>>,
    snapshot_path: Option<PathBuf>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(BTreeMap::new()),
            snapshot_path: None,
        }
    }

    /// Open a store backed by `path`, loading an existing snapshot if present.
    ///
    /// A snapshot with a different version is ignored with a warning.
    pub fn open(path: &Path) -> Result<Self> {
        let tables = match load_snapshot(path)? {
            Some(tables) => tables,
            None => BTreeMap::new(),
        };

        Ok(Self {
            tables: RwLock::new(tables),
            snapshot_path: Some(path.to_path_buf()),
        })
    }

    async fn persist(&self, tables: &BTreeMap<Table, Vec<Row>>) -> Result<()> {
        let Some(path) = &self.snapshot_path else {
            return Ok(());
        };

        let encoded: serde_json::Map<String, Value> = tables
            .iter()
            .map(|(table, rows)| {
                let rows = rows.iter().cloned().map(Value::Object).collect();
                (table.as_str().to_string(), Value::Array(rows))
            })
            .collect();
        let body = serde_json::to_vec_pretty(&json!({
            "version": SNAPSHOT_VERSION,
            "tables": encoded,
        }))
        .map_err(|e| AppError::StorageError(format!("Failed to encode snapshot: {}", e)))?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                AppError::StorageError(format!("Failed to create snapshot directory: {}", e))
            })?;
        }

        // Write-then-rename so a crash never leaves a truncated snapshot.
        let tmp = path.with_extension("tmp");
        tokio::fs::write(&tmp, body)
            .await
            .map_err(|e| AppError::StorageError(format!("Failed to write snapshot: {}", e)))?;
        tokio::fs::rename(&tmp, path)
            .await
            .map_err(|e| AppError::StorageError(format!("Failed to replace snapshot: {}", e)))?;

        tracing::debug!(path = %path.display(), "Row store snapshot written");
        Ok(())
    }
}

fn load_snapshot(path: &Path) -> Result<Option<BTreeMap<Table, Vec<Row>>>> {
    if !path.exists() {
        tracing::debug!(path = %path.display(), "Snapshot file does not exist");
        return Ok(None);
    }

    let bytes = std::fs::read(path)
        .map_err(|e| AppError::StorageError(format!("Failed to read snapshot: {}", e)))?;
    let value: Value = serde_json::from_slice(&bytes)
        .map_err(|e| AppError::StorageError(format!("Snapshot is not valid JSON: {}", e)))?;

    let version = value["version"].as_u64().unwrap_or_default();
    if version != SNAPSHOT_VERSION {
        tracing::warn!(
            path = %path.display(),
            snapshot_version = version,
            expected_version = SNAPSHOT_VERSION,
            "Snapshot version mismatch, ignoring"
        );
        return Ok(None);
    }

    let mut tables = BTreeMap::new();
    for table in Table::ALL {
        let rows: Vec<Row> = value["tables"][table.as_str()]
            .as_array()
            .map(|rows| {
                rows.iter()
                    .filter_map(|r| r.as_object().cloned())
                    .collect()
            })
            .unwrap_or_default();
        tables.insert(table, rows);
    }

    tracing::info!(
        path = %path.display(),
        incidents = tables.get(&Table::Incidents).map_or(0, Vec::len),
        "Row store snapshot loaded"
    );
    Ok(Some(tables))
}

#[async_trait]
impl RowStore for MemoryStore {
    async fn insert(&self, table: Table, rows: Vec<Row>) -> Result<Vec<Row>> {
        let mut tables = self.tables.write().await;

        let stored: Vec<Row> = rows
            .into_iter()
            .map(|mut row| {
                if !row.get("id").is_some_and(Value::is_string) {
                    row.insert("id".into(), Value::String(uuid::Uuid::new_v4().to_string()));
                }
                row.entry("created_at").or_insert_with(|| {
                    Value::String(Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true))
                });
                row
            })
            .collect();

        // Memory only changes once the snapshot holds the new rows.
        let mut staged = tables.clone();
        staged
            .entry(table)
            .or_default()
            .extend(stored.iter().cloned());
        self.persist(&staged).await?;
        *tables = staged;

        tracing::debug!(table = table.as_str(), count = stored.len(), "Rows inserted");
        Ok(stored)
    }

    async fn select(&self, table: Table, query: Query) -> Result<Vec<Row>> {
        let tables = self.tables.read().await;
        Ok(tables
            .get(&table)
            .map(|rows| query.apply(rows))
            .unwrap_or_default())
    }

    async fn update(&self, table: Table, patch: Row, filter: Filter) -> Result<usize> {
        let mut tables = self.tables.write().await;

        let mut staged = tables.clone();
        let mut updated = 0;
        if let Some(rows) = staged.get_mut(&table) {
            for row in rows.iter_mut().filter(|row| filter.matches(row)) {
                for (column, value) in &patch {
                    row.insert(column.clone(), value.clone());
                }
                updated += 1;
            }
        }

        if updated > 0 {
            self.persist(&staged).await?;
            *tables = staged;
        }
        Ok(updated)
    }
}
