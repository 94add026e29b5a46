// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::db;
use crate::store::check_ident;
use crate::utils::{maybe_print_json, parse_date, parse_weekday, pretty_table};
use anyhow::{Context, Result};
use chrono::{Datelike, Duration, Weekday};
use rusqlite::Connection;
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;

/// Rows printed before the table is cut short.
const MAX_ROWS: usize = 50;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Issue {
    pub kind: &'static str,
    pub detail: String,
}

pub fn handle(m: &clap::ArgMatches) -> Result<()> {
    let json_flag = m.get_flag("json");
    let jsonl_flag = m.get_flag("jsonl");
    let budget_table = m.get_one::<String>("budget-table").unwrap().trim();
    let actuals_table = m.get_one::<String>("actuals-table").unwrap().trim();
    let anchor = parse_weekday(m.get_one::<String>("anchor").unwrap())?;
    let tolerance = *m.get_one::<f64>("tolerance").unwrap();
    let path = m.get_one::<String>("db").map(|p| Path::new(p.trim()));
    let conn = db::open_or_init(path, budget_table, actuals_table)?;

    let issues = diagnose(&conn, budget_table, actuals_table, anchor, tolerance)?;
    if maybe_print_json(json_flag, jsonl_flag, &issues)? {
        return Ok(());
    }
    if issues.is_empty() {
        println!("✅ doctor: no issues found");
        return Ok(());
    }
    let rows: Vec<Vec<String>> = issues
        .iter()
        .take(MAX_ROWS)
        .map(|i| vec![i.kind.to_string(), i.detail.clone()])
        .collect();
    println!("{}", pretty_table(&["Issue", "Detail"], rows));
    if issues.len() > MAX_ROWS {
        println!("... {} more (use --json for all)", issues.len() - MAX_ROWS);
    }
    Ok(())
}

struct Group {
    week: String,
    label: String,
    budgeted: Decimal,
    actual: Decimal,
    count: usize,
}

/// Check persisted tables against the generator's invariants: every actual
/// points at a budget, weeks sit on `anchor`, actuals fall inside their
/// week, and each week's actuals land within `tolerance` of the budget.
pub fn diagnose(
    conn: &Connection,
    budget_table: &str,
    actuals_table: &str,
    anchor: Weekday,
    tolerance: f64,
) -> Result<Vec<Issue>> {
    let b = check_ident(budget_table)?;
    let a = check_ident(actuals_table)?;
    let tolerance = Decimal::from_f64(tolerance).context("Invalid tolerance")?;
    let mut issues = Vec::new();

    // 1) Actuals whose budget is gone
    let mut stmt = conn.prepare(&format!(
        "SELECT x.actualid, x.budgetid FROM {a} x LEFT JOIN {b} y ON x.budgetid=y.budgetid
         WHERE y.budgetid IS NULL ORDER BY x.actualid"
    ))?;
    let mut cur = stmt.query([])?;
    while let Some(r) = cur.next()? {
        let id: String = r.get(0)?;
        let bid: String = r.get(1)?;
        issues.push(Issue {
            kind: "orphan_actual",
            detail: format!("{} -> {}", id, bid),
        });
    }

    // 2) Budget weeks off the anchor day
    let mut groups: HashMap<String, Group> = HashMap::new();
    let mut stmt = conn.prepare(&format!(
        "SELECT budgetid, week, category, line_item, budgeted_amount FROM {b} ORDER BY week, budgetid"
    ))?;
    let mut cur = stmt.query([])?;
    while let Some(r) = cur.next()? {
        let id: String = r.get(0)?;
        let week: String = r.get(1)?;
        let category: String = r.get(2)?;
        let line_item: String = r.get(3)?;
        let amt_s: String = r.get(4)?;
        let date = parse_date(&week)?;
        if date.weekday() != anchor {
            issues.push(Issue {
                kind: "off_anchor_week",
                detail: format!("{} {} is a {}", id, week, date.weekday()),
            });
        }
        let budgeted = amt_s
            .parse::<Decimal>()
            .with_context(|| format!("Invalid budgeted_amount '{}' for {}", amt_s, id))?;
        groups.insert(
            id,
            Group {
                week,
                label: format!("{} / {}", category, line_item),
                budgeted,
                actual: Decimal::ZERO,
                count: 0,
            },
        );
    }

    // 3) Actuals dated outside their parent week
    let mut stmt = conn.prepare(&format!(
        "SELECT actualid, date, amount, budgetid FROM {a} ORDER BY date, actualid"
    ))?;
    let mut cur = stmt.query([])?;
    while let Some(r) = cur.next()? {
        let id: String = r.get(0)?;
        let date_s: String = r.get(1)?;
        let amt_s: String = r.get(2)?;
        let bid: String = r.get(3)?;
        let Some(g) = groups.get_mut(&bid) else {
            continue;
        };
        let date = parse_date(&date_s)?;
        let week = parse_date(&g.week)?;
        if date < week || date > week + Duration::days(6) {
            issues.push(Issue {
                kind: "actual_outside_week",
                detail: format!("{} on {} (week {})", id, date_s, g.week),
            });
        }
        g.actual += amt_s
            .parse::<Decimal>()
            .with_context(|| format!("Invalid amount '{}' for {}", amt_s, id))?;
        g.count += 1;
    }

    // 4) Coverage and drift per budget record
    let mut ids: Vec<&String> = groups.keys().collect();
    ids.sort_by(|x, y| groups[*x].week.cmp(&groups[*y].week).then(x.cmp(y)));
    for id in ids {
        let g = &groups[id];
        if g.count == 0 {
            issues.push(Issue {
                kind: "no_actuals",
                detail: format!("{} {} ({})", g.week, g.label, id),
            });
            continue;
        }
        let gap = (g.actual - g.budgeted).abs();
        if gap > tolerance * g.budgeted.abs() {
            issues.push(Issue {
                kind: "budget_drift",
                detail: format!(
                    "{} {}: actual {:.2} vs budget {:.2}",
                    g.week, g.label, g.actual, g.budgeted
                ),
            });
        }
    }
    Ok(issues)
}
