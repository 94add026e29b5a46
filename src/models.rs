// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub const BUDGET_TABLE: &str = "financial_budget_weekly";
pub const ACTUALS_TABLE: &str = "financial_actuals_granular";
pub const BUDGET_KEY: &str = "budgetid";
pub const ACTUAL_KEY: &str = "actualid";

/// One planned amount for a (week, category, line item) triple.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetRecord {
    pub budgetid: String,
    pub week: NaiveDate,
    pub line_item: String,
    pub category: String,
    pub budgeted_amount: Decimal,
    pub last_updated: DateTime<Utc>,
}

/// One realized transaction booked against a budget record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActualRecord {
    pub actualid: String,
    pub date: NaiveDate,
    pub line_item: String,
    pub amount: Decimal,
    pub category: String,
    pub description: String,
    pub budgetid: String, // references BudgetRecord::budgetid
    pub last_updated: DateTime<Utc>,
}

/// Output of one generator run. Both sets are in generation order.
#[derive(Debug, Clone)]
pub struct Ledger {
    pub budgets: Vec<BudgetRecord>,
    pub actuals: Vec<ActualRecord>,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategorySummary {
    pub category: String,
    pub budget_rows: usize,
    pub actual_rows: usize,
    pub budget_total: Decimal,
    pub actual_total: Decimal,
}

impl Ledger {
    /// Per-category totals in first-seen category order.
    pub fn summary(&self) -> Vec<CategorySummary> {
        let mut out: Vec<CategorySummary> = Vec::new();
        fn slot<'a>(out: &'a mut Vec<CategorySummary>, cat: &str) -> &'a mut CategorySummary {
            let idx = match out.iter().position(|s| s.category == cat) {
                Some(i) => i,
                None => {
                    out.push(CategorySummary {
                        category: cat.to_string(),
                        budget_rows: 0,
                        actual_rows: 0,
                        budget_total: Decimal::ZERO,
                        actual_total: Decimal::ZERO,
                    });
                    out.len() - 1
                }
            };
            &mut out[idx]
        }
        for b in &self.budgets {
            let s = slot(&mut out, &b.category);
            s.budget_rows += 1;
            s.budget_total += b.budgeted_amount;
        }
        for a in &self.actuals {
            let s = slot(&mut out, &a.category);
            s.actual_rows += 1;
            s.actual_total += a.amount;
        }
        out
    }
}
