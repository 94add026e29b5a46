// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::store::{check_ident, key_of, Row, StoreResult, TableStore};
use anyhow::{Context, Result};
use directories::ProjectDirs;
use once_cell::sync::Lazy;
use rusqlite::types::{Value as SqlValue, ValueRef};
use rusqlite::{params, params_from_iter, Connection};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

static APP: Lazy<(&str, &str, &str)> =
    Lazy::new(|| ("com.alphavelocity", "Ledgerseed", "ledgerseed"));

pub fn db_path() -> Result<PathBuf> {
    let proj = ProjectDirs::from(APP.0, APP.1, APP.2)
        .context("Could not determine platform-specific data dir")?;
    let data_dir = proj.data_dir();
    fs::create_dir_all(data_dir).context("Failed to create data dir")?;
    Ok(data_dir.join("ledgerseed.sqlite"))
}

/// Open the database at `path` (or the platform default) and make sure both
/// ledger tables exist.
pub fn open_or_init(
    path: Option<&Path>,
    budget_table: &str,
    actuals_table: &str,
) -> Result<Connection> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => db_path()?,
    };
    let conn =
        Connection::open(&path).with_context(|| format!("Open DB at {}", path.display()))?;
    init_schema(&conn, budget_table, actuals_table)?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection, budget_table: &str, actuals_table: &str) -> Result<()> {
    let b = check_ident(budget_table)?;
    let a = check_ident(actuals_table)?;
    conn.execute_batch(&format!(
        r#"
    CREATE TABLE IF NOT EXISTS {b}(
        budgetid TEXT PRIMARY KEY,
        week TEXT NOT NULL,
        line_item TEXT NOT NULL,
        category TEXT NOT NULL,
        budgeted_amount TEXT NOT NULL,
        last_updated TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_{b}_week ON {b}(week);

    -- no FK to the budget table: stale budgets are pruned before actuals are replaced
    CREATE TABLE IF NOT EXISTS {a}(
        actualid TEXT PRIMARY KEY,
        date TEXT NOT NULL,
        line_item TEXT NOT NULL,
        amount TEXT NOT NULL,
        category TEXT NOT NULL,
        description TEXT NOT NULL,
        budgetid TEXT NOT NULL,
        last_updated TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_{a}_budgetid ON {a}(budgetid);
    "#
    ))?;
    Ok(())
}

/// [`TableStore`] over a SQLite connection. Every write call runs in its own
/// transaction, so a failed batch leaves nothing behind.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }
}

fn to_sql(v: &Value) -> SqlValue {
    match v {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
        Value::Number(n) => match n.as_i64() {
            Some(i) => SqlValue::Integer(i),
            None => SqlValue::Real(n.as_f64().unwrap_or_default()),
        },
        Value::String(s) => SqlValue::Text(s.clone()),
        other => SqlValue::Text(other.to_string()),
    }
}

fn from_sql(v: ValueRef<'_>) -> Value {
    match v {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => Value::from(f),
        ValueRef::Text(t) => Value::String(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(b) => Value::String(hex::encode(b)),
    }
}

fn columns(row: &Row) -> StoreResult<Vec<&str>> {
    row.keys().map(|k| check_ident(k)).collect()
}

fn placeholders(n: usize) -> String {
    (1..=n).map(|i| format!("?{i}")).collect::<Vec<_>>().join(",")
}

fn table_columns(conn: &Connection, table: &str) -> StoreResult<Vec<String>> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table})"))?;
    let cols = stmt
        .query_map([], |r| r.get::<_, String>(1))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(cols)
}

impl TableStore for SqliteStore {
    fn select(&mut self, table: &str, fields: &[&str]) -> StoreResult<Vec<Row>> {
        let table = check_ident(table)?;
        let cols = fields
            .iter()
            .map(|f| check_ident(f))
            .collect::<StoreResult<Vec<_>>>()?;
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {} FROM {table}", cols.join(",")))?;
        let mut cur = stmt.query([])?;
        let mut out = Vec::new();
        while let Some(r) = cur.next()? {
            let mut row = Row::new();
            for (i, c) in cols.iter().enumerate() {
                row.insert((*c).to_string(), from_sql(r.get_ref(i)?));
            }
            out.push(row);
        }
        Ok(out)
    }

    fn upsert(&mut self, table: &str, key_field: &str, rows: &[Row]) -> StoreResult<()> {
        let table = check_ident(table)?;
        let key_field = check_ident(key_field)?;
        let tx = self.conn.transaction()?;
        // full overwrite: columns absent from a row are reset, not kept
        let updates = table_columns(&tx, table)?
            .into_iter()
            .filter(|c| c != key_field)
            .map(|c| format!("{c}=excluded.{c}"))
            .collect::<Vec<_>>();
        for row in rows {
            key_of(row, key_field)?;
            let cols = columns(row)?;
            let conflict = if updates.is_empty() {
                "DO NOTHING".to_string()
            } else {
                format!("DO UPDATE SET {}", updates.join(","))
            };
            let sql = format!(
                "INSERT INTO {table}({}) VALUES ({}) ON CONFLICT({key_field}) {conflict}",
                cols.join(","),
                placeholders(cols.len())
            );
            let mut stmt = tx.prepare_cached(&sql)?;
            stmt.execute(params_from_iter(row.values().map(to_sql)))?;
        }
        tx.commit()?;
        debug!(table, rows = rows.len(), "sqlite upsert");
        Ok(())
    }

    fn insert(&mut self, table: &str, rows: &[Row]) -> StoreResult<()> {
        let table = check_ident(table)?;
        let tx = self.conn.transaction()?;
        for row in rows {
            let cols = columns(row)?;
            let sql = format!(
                "INSERT INTO {table}({}) VALUES ({})",
                cols.join(","),
                placeholders(cols.len())
            );
            let mut stmt = tx.prepare_cached(&sql)?;
            stmt.execute(params_from_iter(row.values().map(to_sql)))?;
        }
        tx.commit()?;
        debug!(table, rows = rows.len(), "sqlite insert");
        Ok(())
    }

    fn delete(&mut self, table: &str, key_field: &str, keys: &[String]) -> StoreResult<()> {
        let table = check_ident(table)?;
        let key_field = check_ident(key_field)?;
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(&format!("DELETE FROM {table} WHERE {key_field}=?1"))?;
            for k in keys {
                stmt.execute(params![k])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn delete_all(&mut self, table: &str, key_field: &str) -> StoreResult<()> {
        let table = check_ident(table)?;
        let key_field = check_ident(key_field)?;
        let n = self
            .conn
            .execute(&format!("DELETE FROM {table} WHERE {key_field} <> ''"), [])?;
        debug!(table, rows = n, "sqlite delete_all");
        Ok(())
    }
}
