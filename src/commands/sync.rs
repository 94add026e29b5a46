// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::db::{self, SqliteStore};
use crate::generator::generate;
use crate::models::{ACTUAL_KEY, BUDGET_KEY};
use crate::publish::{ledger_plans, run_plans, PublishOptions};
use crate::rest::RestStore;
use crate::store::{MemoryStore, TableStore};
use crate::utils::pretty_table;
use anyhow::{Context, Result};
use std::path::Path;

use super::generator_config;

pub fn handle(m: &clap::ArgMatches) -> Result<()> {
    let opts = PublishOptions {
        budget_table: m.get_one::<String>("budget-table").unwrap().trim().to_string(),
        actuals_table: m.get_one::<String>("actuals-table").unwrap().trim().to_string(),
        delete_batch: *m.get_one::<usize>("delete-batch").unwrap(),
        insert_batch: *m.get_one::<usize>("insert-batch").unwrap(),
    };
    let kind = m.get_one::<String>("store").unwrap().as_str();
    let mut store = open_store(kind, m, &opts)?;

    let cfg = generator_config(m)?;
    let ledger = generate(&cfg)?;
    println!(
        "Generated {} budget records and {} actual records",
        ledger.budgets.len(),
        ledger.actuals.len()
    );

    let plans = ledger_plans(&ledger, &opts)?;
    let reports = run_plans(store.as_mut(), &plans).context("Publish failed")?;

    let rows = reports
        .iter()
        .zip(&plans)
        .map(|((table, r), plan)| {
            vec![
                table.clone(),
                plan.publisher.name().to_string(),
                r.upserted.to_string(),
                r.inserted.to_string(),
                r.deleted.to_string(),
                r.batches.to_string(),
            ]
        })
        .collect();
    println!(
        "{}",
        pretty_table(
            &["Table", "Strategy", "Upserted", "Inserted", "Deleted", "Calls"],
            rows,
        )
    );
    println!("✅ Upload complete ({} store)", kind);
    Ok(())
}

fn open_store(
    kind: &str,
    m: &clap::ArgMatches,
    opts: &PublishOptions,
) -> Result<Box<dyn TableStore>> {
    let store: Box<dyn TableStore> = match kind {
        "memory" => {
            let mut s = MemoryStore::new();
            s.create_table(&opts.budget_table, BUDGET_KEY);
            s.create_table(&opts.actuals_table, ACTUAL_KEY);
            Box::new(s)
        }
        "rest" => {
            let url = m
                .get_one::<String>("url")
                .context("--url (or LEDGERSEED_URL) is required for the rest store")?;
            let key = m
                .get_one::<String>("service-key")
                .context("--service-key (or LEDGERSEED_SERVICE_KEY) is required for the rest store")?;
            Box::new(RestStore::new(url.trim(), key.trim())?)
        }
        _ => {
            let path = m.get_one::<String>("db").map(|p| Path::new(p.trim()));
            let conn = db::open_or_init(path, &opts.budget_table, &opts.actuals_table)?;
            Box::new(SqliteStore::new(conn))
        }
    };
    Ok(store)
}
