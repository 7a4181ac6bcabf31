//! Feature Table Implementation

use crate::record::{coerce_client_id, ClientRecord, Fields};
use crate::StoreError;
use serde_json::Value;
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, info, warn};

/// Default identifier column of the applicant table
pub const DEFAULT_ID_COLUMN: &str = "SK_ID_CURR";

/// Read-only applicant feature table
#[derive(Debug, Clone)]
pub struct FeatureTable {
    /// Rows in stored order
    records: Vec<ClientRecord>,
    /// Coerced id per row (None never matches)
    ids: Vec<Option<i64>>,
    /// Column names in first-seen order
    columns: Vec<String>,
    /// Identifier column name
    id_column: String,
}

impl FeatureTable {
    /// Build a table from rows, coercing the identifier column once.
    ///
    /// The coerced id (or `null`) replaces the raw value in every row.
    pub fn new(rows: Vec<Fields>, id_column: &str) -> Self {
        let mut columns: Vec<String> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();
        let mut records = Vec::with_capacity(rows.len());
        let mut ids = Vec::with_capacity(rows.len());

        for fields in rows {
            for key in fields.keys() {
                if seen.insert(key.clone()) {
                    columns.push(key.clone());
                }
            }

            let mut record = ClientRecord::new(fields);
            let id = record.get(id_column).and_then(coerce_client_id);
            record.fields_mut().insert(
                id_column.to_string(),
                id.map(Value::from).unwrap_or(Value::Null),
            );
            ids.push(id);
            records.push(record);
        }

        let table = Self {
            records,
            ids,
            columns,
            id_column: id_column.to_string(),
        };
        table.log_data_quality();
        table
    }

    /// Parse a JSON array of record objects
    pub fn from_json_str(json: &str, id_column: &str) -> Result<Self, StoreError> {
        let rows: Vec<Fields> =
            serde_json::from_str(json).map_err(|e| StoreError::Parse(e.to_string()))?;
        Ok(Self::new(rows, id_column))
    }

    /// Load a JSON records file
    pub fn load(path: impl AsRef<Path>, id_column: &str) -> Result<Self, StoreError> {
        let path = path.as_ref();
        info!("Loading feature table from {}", path.display());

        let raw = std::fs::read_to_string(path).map_err(|e| StoreError::Load {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        let table = Self::from_json_str(&raw, id_column)?;

        info!(
            "Feature table loaded: {} rows, {} columns",
            table.len(),
            table.columns.len()
        );
        Ok(table)
    }

    fn log_data_quality(&self) {
        let missing = self.ids.iter().filter(|id| id.is_none()).count();
        if missing > 0 {
            warn!(
                "{} rows have a missing or non-numeric {} and will never match",
                missing, self.id_column
            );
        }

        let mut seen = HashSet::new();
        let duplicates = self
            .ids
            .iter()
            .flatten()
            .filter(|id| !seen.insert(**id))
            .count();
        if duplicates > 0 {
            warn!(
                "{} duplicate client ids; lookups return the first match",
                duplicates
            );
        }
    }

    /// Get the first record whose id equals `client_id`
    pub fn get_record(&self, client_id: i64) -> Result<&ClientRecord, StoreError> {
        let position = self
            .ids
            .iter()
            .position(|id| *id == Some(client_id))
            .ok_or(StoreError::NotFound(client_id))?;

        debug!("Client {} found at row {}", client_id, position);
        Ok(&self.records[position])
    }

    /// Get the first `n` records in stored order
    pub fn get_sample(&self, n: usize) -> &[ClientRecord] {
        &self.records[..n.min(self.records.len())]
    }

    /// Get all non-missing values of a column in stored order
    pub fn get_column(&self, name: &str) -> Result<Vec<Value>, StoreError> {
        if !self.has_column(name) {
            return Err(StoreError::UnknownColumn(name.to_string()));
        }

        Ok(self
            .records
            .iter()
            .filter_map(|r| r.get(name))
            .filter(|v| !v.is_null())
            .cloned()
            .collect())
    }

    /// Check whether a column exists
    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    /// Column names in first-seen order
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Identifier column name
    pub fn id_column(&self) -> &str {
        &self.id_column
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the table has no rows
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
