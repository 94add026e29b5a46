// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Per-table publishing strategies.
//!
//! [`SmartSync`] keeps stable keys alive across regenerations: it upserts the
//! fresh rows and prunes whatever the store holds beyond them.
//! [`FullReplace`] treats the table as disposable: wipe, then bulk insert.
//! Neither retries; the first failing call aborts and the table is left in
//! whatever partial state the applied batches produced.

use crate::models::{ACTUAL_KEY, ACTUALS_TABLE, BUDGET_KEY, BUDGET_TABLE, Ledger};
use crate::store::{key_of, to_rows, Row, StoreError, TableStore};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;
use thiserror::Error;
use tracing::{debug, info};

pub const DEFAULT_DELETE_BATCH: usize = 500;
pub const DEFAULT_INSERT_BATCH: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Dedup,
    Upsert,
    ReadKeys,
    DeleteStale,
    DeleteAll,
    Insert,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::Dedup => "dedup",
            Stage::Upsert => "upsert",
            Stage::ReadKeys => "read keys",
            Stage::DeleteStale => "delete stale",
            Stage::DeleteAll => "delete all",
            Stage::Insert => "insert",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Error)]
#[error("{stage} on '{table}' failed at batch {batch}/{batches}: {source}")]
pub struct PublishError {
    pub table: String,
    pub stage: Stage,
    pub batch: usize,
    pub batches: usize,
    #[source]
    pub source: StoreError,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PublishReport {
    pub upserted: usize,
    pub inserted: usize,
    pub deleted: usize,
    /// Store calls that carried rows or keys.
    pub batches: usize,
}

/// A table publication policy.
pub trait Publisher {
    fn name(&self) -> &'static str;

    fn publish(
        &self,
        store: &mut dyn TableStore,
        table: &str,
        rows: &[Row],
    ) -> Result<PublishReport, PublishError>;
}

fn fail(
    table: &str,
    stage: Stage,
    batch: usize,
    batches: usize,
) -> impl FnOnce(StoreError) -> PublishError + '_ {
    move |source| PublishError {
        table: table.to_string(),
        stage,
        batch,
        batches,
        source,
    }
}

fn batch_count(len: usize, size: usize) -> usize {
    len.div_ceil(size.max(1))
}

/// Keep one row per key: the last occurrence's contents at the first
/// occurrence's position.
pub fn dedup_by_key(rows: &[Row], key_field: &str) -> Result<Vec<Row>, StoreError> {
    let mut out: Vec<Row> = Vec::with_capacity(rows.len());
    let mut seen: HashMap<String, usize> = HashMap::with_capacity(rows.len());
    for r in rows {
        let k = key_of(r, key_field)?;
        match seen.get(&k) {
            Some(&i) => out[i] = r.clone(),
            None => {
                seen.insert(k, out.len());
                out.push(r.clone());
            }
        }
    }
    Ok(out)
}

/// Upsert everything, then delete persisted keys absent from `rows`.
#[derive(Debug, Clone)]
pub struct SmartSync {
    pub key_field: String,
    pub delete_batch: usize,
}

impl SmartSync {
    pub fn new(key_field: &str) -> Self {
        Self {
            key_field: key_field.to_string(),
            delete_batch: DEFAULT_DELETE_BATCH,
        }
    }

    pub fn with_delete_batch(mut self, n: usize) -> Self {
        self.delete_batch = n.max(1);
        self
    }
}

impl Publisher for SmartSync {
    fn name(&self) -> &'static str {
        "smart sync"
    }

    fn publish(
        &self,
        store: &mut dyn TableStore,
        table: &str,
        rows: &[Row],
    ) -> Result<PublishReport, PublishError> {
        let key = self.key_field.as_str();
        let rows = dedup_by_key(rows, key).map_err(fail(table, Stage::Dedup, 0, 0))?;
        let mut report = PublishReport::default();
        info!(table, rows = rows.len(), "smart-syncing");

        if !rows.is_empty() {
            store
                .upsert(table, key, &rows)
                .map_err(fail(table, Stage::Upsert, 1, 1))?;
            report.upserted = rows.len();
            report.batches += 1;
        }

        let fresh: HashSet<String> = rows
            .iter()
            .map(|r| key_of(r, key))
            .collect::<Result<_, _>>()
            .map_err(fail(table, Stage::Dedup, 0, 0))?;
        let persisted = store
            .select_keys(table, key)
            .map_err(fail(table, Stage::ReadKeys, 1, 1))?;
        // sorted so batch contents are reproducible between runs
        let stale: Vec<String> = persisted
            .into_iter()
            .filter(|k| !fresh.contains(k))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        if !stale.is_empty() {
            let batches = batch_count(stale.len(), self.delete_batch);
            info!(table, stale = stale.len(), batches, "deleting stale keys");
            for (i, chunk) in stale.chunks(self.delete_batch.max(1)).enumerate() {
                store
                    .delete(table, key, chunk)
                    .map_err(fail(table, Stage::DeleteStale, i + 1, batches))?;
                report.deleted += chunk.len();
                report.batches += 1;
                debug!(table, batch = i + 1, batches, "deleted stale batch");
            }
        }
        info!(
            table,
            upserted = report.upserted,
            deleted = report.deleted,
            "smart-synced"
        );
        Ok(report)
    }
}

/// Delete every row, then insert `rows` in order, chunked.
#[derive(Debug, Clone)]
pub struct FullReplace {
    pub key_field: String,
    pub insert_batch: usize,
}

impl FullReplace {
    pub fn new(key_field: &str) -> Self {
        Self {
            key_field: key_field.to_string(),
            insert_batch: DEFAULT_INSERT_BATCH,
        }
    }

    pub fn with_insert_batch(mut self, n: usize) -> Self {
        self.insert_batch = n.max(1);
        self
    }
}

impl Publisher for FullReplace {
    fn name(&self) -> &'static str {
        "full replace"
    }

    fn publish(
        &self,
        store: &mut dyn TableStore,
        table: &str,
        rows: &[Row],
    ) -> Result<PublishReport, PublishError> {
        info!(table, "deleting all existing rows");
        store
            .delete_all(table, &self.key_field)
            .map_err(fail(table, Stage::DeleteAll, 1, 1))?;

        let mut report = PublishReport::default();
        let size = self.insert_batch.max(1);
        let batches = batch_count(rows.len(), size);
        info!(table, rows = rows.len(), batches, "inserting");
        for (i, chunk) in rows.chunks(size).enumerate() {
            store
                .insert(table, chunk)
                .map_err(fail(table, Stage::Insert, i + 1, batches))?;
            report.inserted += chunk.len();
            report.batches += 1;
            info!(table, "inserted chunk {}/{}", i + 1, batches);
        }
        info!(table, inserted = report.inserted, "replaced all rows");
        Ok(report)
    }
}

/// One table, its rows and the policy that publishes them.
pub struct TablePlan {
    pub table: String,
    pub rows: Vec<Row>,
    pub publisher: Box<dyn Publisher>,
}

#[derive(Debug, Clone)]
pub struct PublishOptions {
    pub budget_table: String,
    pub actuals_table: String,
    pub delete_batch: usize,
    pub insert_batch: usize,
}

impl Default for PublishOptions {
    fn default() -> Self {
        Self {
            budget_table: BUDGET_TABLE.to_string(),
            actuals_table: ACTUALS_TABLE.to_string(),
            delete_batch: DEFAULT_DELETE_BATCH,
            insert_batch: DEFAULT_INSERT_BATCH,
        }
    }
}

/// Budgets are smart-synced to keep their ids stable; actuals are disposable
/// and fully replaced. Budgets go first.
pub fn ledger_plans(
    ledger: &Ledger,
    opts: &PublishOptions,
) -> Result<Vec<TablePlan>, StoreError> {
    Ok(vec![
        TablePlan {
            table: opts.budget_table.clone(),
            rows: to_rows(&ledger.budgets)?,
            publisher: Box::new(
                SmartSync::new(BUDGET_KEY).with_delete_batch(opts.delete_batch),
            ),
        },
        TablePlan {
            table: opts.actuals_table.clone(),
            rows: to_rows(&ledger.actuals)?,
            publisher: Box::new(
                FullReplace::new(ACTUAL_KEY).with_insert_batch(opts.insert_batch),
            ),
        },
    ])
}

/// Run plans in order, stopping at the first failure.
pub fn run_plans(
    store: &mut dyn TableStore,
    plans: &[TablePlan],
) -> Result<Vec<(String, PublishReport)>, PublishError> {
    let mut out = Vec::with_capacity(plans.len());
    for plan in plans {
        info!(table = %plan.table, strategy = plan.publisher.name(), "publishing");
        let report = plan.publisher.publish(store, &plan.table, &plan.rows)?;
        out.push((plan.table.clone(), report));
    }
    Ok(out)
}
