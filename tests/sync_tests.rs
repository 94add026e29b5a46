// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::{DateTime, Utc};
use ledgerseed::db::{SqliteStore, init_schema};
use ledgerseed::generator::{GeneratorConfig, generate};
use ledgerseed::models::{ACTUAL_KEY, ACTUALS_TABLE, BUDGET_KEY, BUDGET_TABLE};
use ledgerseed::publish::{FullReplace, PublishOptions, Publisher, SmartSync, ledger_plans, run_plans};
use ledgerseed::store::{MemoryStore, Row, TableStore};
use rusqlite::Connection;
use serde_json::json;

fn row(id: &str, v: &str) -> Row {
    json!({"budgetid": id, "week": v}).as_object().unwrap().clone()
}

fn memory() -> MemoryStore {
    let mut s = MemoryStore::new();
    s.create_table(BUDGET_TABLE, BUDGET_KEY);
    s.create_table(ACTUALS_TABLE, ACTUAL_KEY);
    s
}

fn sqlite() -> SqliteStore {
    let conn = Connection::open_in_memory().unwrap();
    init_schema(&conn, BUDGET_TABLE, ACTUALS_TABLE).unwrap();
    SqliteStore::new(conn)
}

fn budget_rows(keys: &[&str]) -> Vec<Row> {
    keys.iter().map(|k| row(k, "2024-01-01")).collect()
}

fn sorted_keys(store: &mut dyn TableStore, table: &str, key: &str) -> Vec<String> {
    let mut keys = store.select_keys(table, key).unwrap();
    keys.sort();
    keys
}

fn check_smart_sync(store: &mut dyn TableStore) {
    // sqlite needs every NOT NULL column
    let full = |k: &str, amount: &str| -> Row {
        json!({
            "budgetid": k,
            "week": "2024-01-01",
            "line_item": "Rent",
            "category": "Operating Expenses",
            "budgeted_amount": amount,
            "last_updated": "2024-01-01T00:00:00Z",
        })
        .as_object()
        .unwrap()
        .clone()
    };
    let sync = SmartSync::new(BUDGET_KEY).with_delete_batch(1);
    let first: Vec<Row> = ["A", "B", "C"].iter().map(|k| full(*k, "-1.00")).collect();
    sync.publish(store, BUDGET_TABLE, &first).unwrap();

    let second: Vec<Row> = ["B", "C", "D"].iter().map(|k| full(*k, "-2.00")).collect();
    let report = sync.publish(store, BUDGET_TABLE, &second).unwrap();
    assert_eq!(report.upserted, 3);
    assert_eq!(report.deleted, 1);
    assert_eq!(sorted_keys(store, BUDGET_TABLE, BUDGET_KEY), ["B", "C", "D"]);

    let amounts: Vec<_> = store
        .select(BUDGET_TABLE, &["budgeted_amount"])
        .unwrap()
        .into_iter()
        .map(|r| r["budgeted_amount"].clone())
        .collect();
    assert!(amounts.iter().all(|a| a == "-2.00"));

    // same input again: nothing to delete, content unchanged
    let again = sync.publish(store, BUDGET_TABLE, &second).unwrap();
    assert_eq!(again.deleted, 0);
    assert_eq!(sorted_keys(store, BUDGET_TABLE, BUDGET_KEY), ["B", "C", "D"]);
}

#[test]
fn smart_sync_replaces_key_set_in_memory() {
    check_smart_sync(&mut memory());
}

#[test]
fn smart_sync_replaces_key_set_in_sqlite() {
    check_smart_sync(&mut sqlite());
}

#[test]
fn smart_sync_collapses_duplicate_keys() {
    let mut s = memory();
    let rows = vec![row("A", "first"), row("B", "x"), row("A", "second")];
    let report = SmartSync::new(BUDGET_KEY)
        .publish(&mut s, BUDGET_TABLE, &rows)
        .unwrap();
    assert_eq!(report.upserted, 2);
    assert_eq!(s.get(BUDGET_TABLE, "A").unwrap()["week"], "second");
}

#[test]
fn full_replace_leaves_only_new_rows() {
    let mut s = memory();
    let old: Vec<Row> = ["o1", "o2", "shared"]
        .iter()
        .map(|k| json!({"actualid": k, "amount": "1"}).as_object().unwrap().clone())
        .collect();
    s.insert(ACTUALS_TABLE, &old).unwrap();

    let new: Vec<Row> = ["shared", "n1", "n2", "n3"]
        .iter()
        .map(|k| json!({"actualid": k, "amount": "2"}).as_object().unwrap().clone())
        .collect();
    let report = FullReplace::new(ACTUAL_KEY)
        .with_insert_batch(3)
        .publish(&mut s, ACTUALS_TABLE, &new)
        .unwrap();
    assert_eq!(report.inserted, 4);
    assert_eq!(report.batches, 2);
    assert_eq!(
        sorted_keys(&mut s, ACTUALS_TABLE, ACTUAL_KEY),
        ["n1", "n2", "n3", "shared"]
    );
    assert!(s.get(ACTUALS_TABLE, "o1").is_none());
    assert_eq!(s.get(ACTUALS_TABLE, "shared").unwrap()["amount"], "2");
}

#[test]
fn budget_rows_for_other_weeks_are_pruned() {
    let mut s = memory();
    s.upsert(BUDGET_TABLE, BUDGET_KEY, &budget_rows(&["stale"]))
        .unwrap();
    SmartSync::new(BUDGET_KEY)
        .publish(&mut s, BUDGET_TABLE, &budget_rows(&["fresh"]))
        .unwrap();
    assert_eq!(sorted_keys(&mut s, BUDGET_TABLE, BUDGET_KEY), ["fresh"]);
}

fn fixed_ts() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2025-06-01T12:00:00Z")
        .unwrap()
        .with_timezone(&Utc)
}

#[test]
fn publishing_a_ledger_twice_keeps_budget_ids_stable() {
    let mut store = sqlite();
    let opts = PublishOptions {
        insert_batch: 100,
        ..Default::default()
    };
    let cfg = |seed| GeneratorConfig {
        weeks: 3,
        seed: Some(seed),
        generated_at: Some(fixed_ts()),
        ..Default::default()
    };

    let first = generate(&cfg(1)).unwrap();
    let reports = run_plans(&mut store, &ledger_plans(&first, &opts).unwrap()).unwrap();
    assert_eq!(reports[0].0, BUDGET_TABLE);
    assert_eq!(reports[0].1.upserted, 3 * 26);
    assert_eq!(reports[1].1.inserted, first.actuals.len());
    let ids_before = sorted_keys(&mut store, BUDGET_TABLE, BUDGET_KEY);

    let second = generate(&cfg(2)).unwrap();
    let reports = run_plans(&mut store, &ledger_plans(&second, &opts).unwrap()).unwrap();
    assert_eq!(reports[0].1.deleted, 0);
    assert_eq!(sorted_keys(&mut store, BUDGET_TABLE, BUDGET_KEY), ids_before);

    let mut actual_ids: Vec<String> = second.actuals.iter().map(|a| a.actualid.clone()).collect();
    actual_ids.sort();
    assert_eq!(
        sorted_keys(&mut store, ACTUALS_TABLE, ACTUAL_KEY),
        actual_ids
    );

    let n: i64 = store
        .conn()
        .query_row(&format!("SELECT COUNT(*) FROM {ACTUALS_TABLE}"), [], |r| r.get(0))
        .unwrap();
    assert_eq!(n as usize, second.actuals.len());
}

#[test]
fn shrinking_the_range_prunes_old_weeks() {
    let mut store = memory();
    let opts = PublishOptions::default();
    let cfg = |weeks| GeneratorConfig {
        weeks,
        seed: Some(3),
        generated_at: Some(fixed_ts()),
        ..Default::default()
    };
    let wide = generate(&cfg(4)).unwrap();
    run_plans(&mut store, &ledger_plans(&wide, &opts).unwrap()).unwrap();
    let narrow = generate(&cfg(2)).unwrap();
    let reports = run_plans(&mut store, &ledger_plans(&narrow, &opts).unwrap()).unwrap();
    assert_eq!(reports[0].1.deleted, 2 * 26);
    assert_eq!(store.len(BUDGET_TABLE), 2 * 26);
    assert_eq!(store.len(ACTUALS_TABLE), narrow.actuals.len());
}

#[test]
fn publish_command_writes_a_file_backed_database() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("ledger.sqlite");
    let db_str = db.to_string_lossy().to_string();
    let args = [
        "ledgerseed",
        "publish",
        "--store",
        "sqlite",
        "--db",
        &db_str,
        "--weeks",
        "1",
        "--seed",
        "5",
        "--insert-batch",
        "7",
    ];
    for _ in 0..2 {
        let matches = ledgerseed::cli::build_cli().get_matches_from(args);
        if let Some(("publish", m)) = matches.subcommand() {
            ledgerseed::commands::sync::handle(m).unwrap();
        } else {
            panic!("no publish subcommand");
        }
    }

    let conn = ledgerseed::db::open_or_init(Some(&db), BUDGET_TABLE, ACTUALS_TABLE).unwrap();
    let budgets: i64 = conn
        .query_row(&format!("SELECT COUNT(*) FROM {BUDGET_TABLE}"), [], |r| r.get(0))
        .unwrap();
    assert_eq!(budgets, 26);
    let orphans: i64 = conn
        .query_row(
            &format!(
                "SELECT COUNT(*) FROM {ACTUALS_TABLE} a LEFT JOIN {BUDGET_TABLE} b \
                 ON a.budgetid=b.budgetid WHERE b.budgetid IS NULL"
            ),
            [],
            |r| r.get(0),
        )
        .unwrap();
    assert_eq!(orphans, 0);
}
