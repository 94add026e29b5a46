// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::generator::generate;
use crate::utils::{fmt_money, maybe_print_json, pretty_table};
use anyhow::Result;
use rust_decimal::Decimal;

use super::generator_config;

pub fn handle(m: &clap::ArgMatches) -> Result<()> {
    let json_flag = m.get_flag("json");
    let jsonl_flag = m.get_flag("jsonl");
    let cfg = generator_config(m)?;
    let ledger = generate(&cfg)?;
    let summary = ledger.summary();

    if !maybe_print_json(json_flag, jsonl_flag, &summary)? {
        let mut data: Vec<Vec<String>> = summary
            .iter()
            .map(|s| {
                vec![
                    s.category.clone(),
                    s.budget_rows.to_string(),
                    s.actual_rows.to_string(),
                    fmt_money(&s.budget_total),
                    fmt_money(&s.actual_total),
                ]
            })
            .collect();
        let budget_total: Decimal = summary.iter().map(|s| s.budget_total).sum();
        let actual_total: Decimal = summary.iter().map(|s| s.actual_total).sum();
        data.push(vec![
            "TOTAL".into(),
            ledger.budgets.len().to_string(),
            ledger.actuals.len().to_string(),
            fmt_money(&budget_total),
            fmt_money(&actual_total),
        ]);
        println!(
            "{}",
            pretty_table(
                &["Category", "Budget rows", "Actual rows", "Budgeted", "Actual"],
                data,
            )
        );
        println!(
            "Generated {} budget records and {} actual records",
            ledger.budgets.len(),
            ledger.actuals.len()
        );
    }
    Ok(())
}
