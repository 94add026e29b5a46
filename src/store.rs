// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Key-addressed table persistence used by the publishers.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use thiserror::Error;

/// A persisted row: column name to JSON value.
pub type Row = Map<String, Value>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid identifier '{0}'")]
    InvalidIdentifier(String),
    #[error("row has no usable '{0}' key")]
    MissingKey(String),
    #[error("duplicate key '{key}' in table '{table}'")]
    DuplicateKey { table: String, key: String },
    #[error("record did not serialize to a row: {0}")]
    NotARow(String),
    #[error("unknown table '{0}'")]
    UnknownTable(String),
    #[error("row encoding failed: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("store responded {status}: {body}")]
    Status { status: u16, body: String },
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// The five operations a backend must offer. Implementations are assumed to
/// have a single writer for the duration of a publish.
pub trait TableStore {
    /// Project `fields` out of every row of `table`.
    fn select(&mut self, table: &str, fields: &[&str]) -> StoreResult<Vec<Row>>;

    /// Insert or fully overwrite rows by `key_field`.
    fn upsert(&mut self, table: &str, key_field: &str, rows: &[Row]) -> StoreResult<()>;

    /// Insert new rows. An existing key is an error.
    fn insert(&mut self, table: &str, rows: &[Row]) -> StoreResult<()>;

    fn delete(&mut self, table: &str, key_field: &str, keys: &[String]) -> StoreResult<()>;

    /// Remove every row, expressed as `key_field <> ''` for stores that
    /// refuse an unfiltered delete.
    fn delete_all(&mut self, table: &str, key_field: &str) -> StoreResult<()>;

    fn select_keys(&mut self, table: &str, key_field: &str) -> StoreResult<Vec<String>> {
        self.select(table, &[key_field])?
            .iter()
            .map(|r| key_of(r, key_field))
            .collect()
    }
}

static IDENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap()
});

/// Table and column names go into SQL and URLs verbatim, so only plain
/// identifiers are accepted.
pub fn check_ident(name: &str) -> StoreResult<&str> {
    if IDENT.is_match(name) {
        Ok(name)
    } else {
        Err(StoreError::InvalidIdentifier(name.to_string()))
    }
}

/// String form of a row's key column.
pub fn key_of(row: &Row, key_field: &str) -> StoreResult<String> {
    match row.get(key_field) {
        Some(Value::String(s)) if !s.is_empty() => Ok(s.clone()),
        Some(Value::Number(n)) => Ok(n.to_string()),
        _ => Err(StoreError::MissingKey(key_field.to_string())),
    }
}

/// Serialize records into rows.
pub fn to_rows<T: Serialize>(records: &[T]) -> StoreResult<Vec<Row>> {
    records
        .iter()
        .map(|r| match serde_json::to_value(r)? {
            Value::Object(m) => Ok(m),
            other => Err(StoreError::NotARow(other.to_string())),
        })
        .collect()
}

/// In-process store, keyed by the table's key column. Used for dry runs and
/// tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: BTreeMap<String, Table>,
}

#[derive(Debug)]
struct Table {
    key_field: String,
    rows: BTreeMap<String, Row>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a table and its key column; rows can then be written to it.
    pub fn create_table(&mut self, table: &str, key_field: &str) {
        self.tables.entry(table.to_string()).or_insert_with(|| Table {
            key_field: key_field.to_string(),
            rows: BTreeMap::new(),
        });
    }

    pub fn len(&self, table: &str) -> usize {
        self.tables.get(table).map(|t| t.rows.len()).unwrap_or(0)
    }

    pub fn is_empty(&self, table: &str) -> bool {
        self.len(table) == 0
    }

    pub fn get(&self, table: &str, key: &str) -> Option<&Row> {
        self.tables.get(table).and_then(|t| t.rows.get(key))
    }

    fn table(&mut self, table: &str) -> StoreResult<&mut Table> {
        self.tables
            .get_mut(table)
            .ok_or_else(|| StoreError::UnknownTable(table.to_string()))
    }
}

impl TableStore for MemoryStore {
    fn select(&mut self, table: &str, fields: &[&str]) -> StoreResult<Vec<Row>> {
        let t = self.table(table)?;
        Ok(t.rows
            .values()
            .map(|r| {
                fields
                    .iter()
                    .filter_map(|f| r.get(*f).map(|v| (f.to_string(), v.clone())))
                    .collect()
            })
            .collect())
    }

    fn upsert(&mut self, table: &str, key_field: &str, rows: &[Row]) -> StoreResult<()> {
        let t = self.table(table)?;
        if t.key_field != key_field {
            return Err(StoreError::MissingKey(key_field.to_string()));
        }
        for r in rows {
            let k = key_of(r, key_field)?;
            t.rows.insert(k, r.clone());
        }
        Ok(())
    }

    fn insert(&mut self, table: &str, rows: &[Row]) -> StoreResult<()> {
        let t = self.table(table)?;
        let mut staged = Vec::with_capacity(rows.len());
        for r in rows {
            let k = key_of(r, &t.key_field)?;
            if t.rows.contains_key(&k) || staged.iter().any(|(sk, _)| sk == &k) {
                return Err(StoreError::DuplicateKey {
                    table: table.to_string(),
                    key: k,
                });
            }
            staged.push((k, r.clone()));
        }
        t.rows.extend(staged);
        Ok(())
    }

    fn delete(&mut self, table: &str, key_field: &str, keys: &[String]) -> StoreResult<()> {
        let t = self.table(table)?;
        if t.key_field != key_field {
            return Err(StoreError::MissingKey(key_field.to_string()));
        }
        for k in keys {
            t.rows.remove(k);
        }
        Ok(())
    }

    fn delete_all(&mut self, table: &str, _key_field: &str) -> StoreResult<()> {
        self.table(table)?.rows.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(v: Value) -> Row {
        v.as_object().unwrap().clone()
    }

    fn store() -> MemoryStore {
        let mut s = MemoryStore::new();
        s.create_table("t", "id");
        s
    }

    #[test]
    fn identifiers_are_validated() {
        assert!(check_ident("financial_budget_weekly").is_ok());
        assert!(check_ident("_x1").is_ok());
        assert!(check_ident("1abc").is_err());
        assert!(check_ident("t; DROP TABLE x").is_err());
        assert!(check_ident("").is_err());
    }

    #[test]
    fn key_of_rejects_missing_or_empty() {
        assert_eq!(key_of(&row(json!({"id": "a"})), "id").unwrap(), "a");
        assert_eq!(key_of(&row(json!({"id": 7})), "id").unwrap(), "7");
        assert!(key_of(&row(json!({"id": ""})), "id").is_err());
        assert!(key_of(&row(json!({"other": "a"})), "id").is_err());
    }

    #[test]
    fn upsert_overwrites_whole_row() {
        let mut s = store();
        s.upsert("t", "id", &[row(json!({"id": "a", "x": 1, "y": 2}))])
            .unwrap();
        s.upsert("t", "id", &[row(json!({"id": "a", "x": 5}))]).unwrap();
        let r = s.get("t", "a").unwrap();
        assert_eq!(r.get("x"), Some(&json!(5)));
        assert!(r.get("y").is_none());
    }

    #[test]
    fn insert_rejects_existing_key_without_partial_write() {
        let mut s = store();
        s.insert("t", &[row(json!({"id": "a"}))]).unwrap();
        let err = s
            .insert("t", &[row(json!({"id": "b"})), row(json!({"id": "a"}))])
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateKey { .. }));
        assert_eq!(s.len("t"), 1);
    }

    #[test]
    fn select_projects_fields_and_keys() {
        let mut s = store();
        s.insert("t", &[row(json!({"id": "b", "x": 1})), row(json!({"id": "a", "x": 2}))])
            .unwrap();
        let rows = s.select("t", &["x"]).unwrap();
        assert!(rows.iter().all(|r| r.len() == 1 && r.contains_key("x")));
        assert_eq!(s.select_keys("t", "id").unwrap(), vec!["a", "b"]);
    }

    #[test]
    fn delete_and_delete_all() {
        let mut s = store();
        s.insert("t", &[row(json!({"id": "a"})), row(json!({"id": "b"}))])
            .unwrap();
        s.delete("t", "id", &["a".into(), "zz".into()]).unwrap();
        assert_eq!(s.select_keys("t", "id").unwrap(), vec!["b"]);
        s.delete_all("t", "id").unwrap();
        assert!(s.is_empty("t"));
    }

    #[test]
    fn unknown_table_is_an_error() {
        let mut s = MemoryStore::new();
        assert!(matches!(
            s.select("nope", &["id"]),
            Err(StoreError::UnknownTable(_))
        ));
    }
}
