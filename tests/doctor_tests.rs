// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::Weekday;
use ledgerseed::commands::doctor::diagnose;
use ledgerseed::db::{SqliteStore, init_schema};
use ledgerseed::generator::{GeneratorConfig, generate};
use ledgerseed::models::{ACTUALS_TABLE, BUDGET_TABLE};
use ledgerseed::publish::{PublishOptions, ledger_plans, run_plans};
use rusqlite::Connection;

fn published(weeks: usize) -> SqliteStore {
    let conn = Connection::open_in_memory().unwrap();
    init_schema(&conn, BUDGET_TABLE, ACTUALS_TABLE).unwrap();
    let mut store = SqliteStore::new(conn);
    let ledger = generate(&GeneratorConfig {
        weeks,
        seed: Some(42),
        ..Default::default()
    })
    .unwrap();
    let plans = ledger_plans(&ledger, &PublishOptions::default()).unwrap();
    run_plans(&mut store, &plans).unwrap();
    store
}

fn kinds(store: &SqliteStore, tolerance: f64) -> Vec<&'static str> {
    diagnose(
        store.conn(),
        BUDGET_TABLE,
        ACTUALS_TABLE,
        Weekday::Mon,
        tolerance,
    )
    .unwrap()
    .into_iter()
    .map(|i| i.kind)
    .collect()
}

#[test]
fn freshly_published_ledger_is_structurally_clean() {
    let store = published(3);
    let found = kinds(&store, 0.5);
    for bad in ["orphan_actual", "off_anchor_week", "actual_outside_week", "no_actuals"] {
        assert!(!found.contains(&bad), "unexpected {bad}");
    }
}

#[test]
fn detects_orphans_and_misplaced_rows() {
    let store = published(1);
    let conn = store.conn();
    conn.execute(
        &format!(
            "INSERT INTO {ACTUALS_TABLE}(actualid,date,line_item,amount,category,description,budgetid,last_updated) \
             VALUES ('x1','2021-01-05','Rent','-1.00','Operating Expenses','stray','missing','2025-01-01T00:00:00Z')"
        ),
        [],
    )
    .unwrap();
    conn.execute(
        &format!(
            "INSERT INTO {BUDGET_TABLE}(budgetid,week,line_item,category,budgeted_amount,last_updated) \
             VALUES ('tue','2021-01-05','Rent','Operating Expenses','-100.00','2025-01-01T00:00:00Z')"
        ),
        [],
    )
    .unwrap();
    conn.execute(
        &format!(
            "INSERT INTO {ACTUALS_TABLE}(actualid,date,line_item,amount,category,description,budgetid,last_updated) \
             VALUES ('x2','2021-02-01','Rent','-100.00','Operating Expenses','late','tue','2025-01-01T00:00:00Z')"
        ),
        [],
    )
    .unwrap();

    let found = kinds(&store, 0.5);
    assert!(found.contains(&"orphan_actual"));
    assert!(found.contains(&"off_anchor_week"));
    assert!(found.contains(&"actual_outside_week"));
}

#[test]
fn budget_without_actuals_is_reported() {
    let store = published(1);
    store
        .conn()
        .execute(&format!("DELETE FROM {ACTUALS_TABLE}"), [])
        .unwrap();
    let found = kinds(&store, 0.5);
    assert_eq!(found.iter().filter(|k| **k == "no_actuals").count(), 26);
}

#[test]
fn zero_tolerance_flags_drift() {
    let store = published(2);
    assert!(kinds(&store, 0.0).contains(&"budget_drift"));
}
