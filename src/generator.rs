// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Synthetic ledger generation: a weekly budget plan, then transactions
//! fragmented from an independently drawn weekly total.

use crate::amounts::{self, AmountDist};
use crate::ids;
use crate::models::{ActualRecord, BudgetRecord, Ledger};
use chrono::{DateTime, Datelike, Days, Duration, NaiveDate, Utc, Weekday};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use std::collections::{HashMap, HashSet};
use thiserror::Error;
use tracing::{debug, info};

/// Share of the per-transaction magnitude used as the noise standard deviation.
pub const SPLIT_NOISE: f64 = 0.15;

#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("no budget id for {week} / {category} / {line_item}")]
    MissingBudget {
        week: NaiveDate,
        category: String,
        line_item: String,
    },
    #[error("{weeks} weeks from {start} run past the last representable date")]
    RangeOutOfBounds { start: NaiveDate, weeks: usize },
}

#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    pub start: NaiveDate,
    pub weeks: usize,
    pub anchor: Weekday,
    /// Fixed seed for reproducible output; `None` seeds from OS entropy.
    pub seed: Option<u64>,
    /// Stamped into every record's `last_updated`; defaults to now.
    pub generated_at: Option<DateTime<Utc>>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            start: NaiveDate::from_ymd_opt(2021, 1, 1).unwrap_or_default(),
            weeks: 52 * 3,
            anchor: Weekday::Mon,
            seed: None,
            generated_at: None,
        }
    }
}

/// First date on `anchor` that is on or after `start`, then every 7 days.
/// The whole range, including the last week's trailing six days, must be
/// representable.
pub fn week_grid(
    start: NaiveDate,
    weeks: usize,
    anchor: Weekday,
) -> Result<Vec<NaiveDate>, GenerateError> {
    let out_of_range = || GenerateError::RangeOutOfBounds { start, weeks };
    let shift = (7 + anchor.num_days_from_monday() - start.weekday().num_days_from_monday()) % 7;
    let first = start
        .checked_add_days(Days::new(u64::from(shift)))
        .ok_or_else(out_of_range)?;
    if weeks > 0 {
        let span = (weeks as u64 - 1)
            .checked_mul(7)
            .and_then(|d| d.checked_add(6))
            .ok_or_else(out_of_range)?;
        first
            .checked_add_days(Days::new(span))
            .ok_or_else(out_of_range)?;
    }
    Ok((0..weeks as u64)
        .map(|i| first + Days::new(i * 7))
        .collect())
}

/// Round a sampled value to currency scale (banker's rounding).
pub fn to_currency(v: f64) -> Decimal {
    Decimal::from_f64(v)
        .map(|d| d.round_dp(2))
        .unwrap_or(Decimal::ZERO)
}

pub fn generate(cfg: &GeneratorConfig) -> Result<Ledger, GenerateError> {
    let mut rng = match cfg.seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_entropy(),
    };
    generate_with(cfg, &mut rng)
}

pub fn generate_with<R: Rng + ?Sized>(
    cfg: &GeneratorConfig,
    rng: &mut R,
) -> Result<Ledger, GenerateError> {
    let generated_at = cfg.generated_at.unwrap_or_else(Utc::now);
    let weeks = week_grid(cfg.start, cfg.weeks, cfg.anchor)?;
    info!(weeks = weeks.len(), anchor = ?cfg.anchor, "generating budget");

    let mut budgets = Vec::with_capacity(weeks.len() * amounts::line_items().count());
    let mut lookup: HashMap<(NaiveDate, &str, &str), String> = HashMap::new();
    for &week in &weeks {
        for (cat, item) in amounts::line_items() {
            let budgetid = ids::budget_id(week, cat.name, item.name);
            let budgeted = amounts::sample(rng, cat.name, item.name);
            lookup.insert((week, cat.name, item.name), budgetid.clone());
            budgets.push(BudgetRecord {
                budgetid,
                week,
                line_item: item.name.to_string(),
                category: cat.name.to_string(),
                budgeted_amount: to_currency(budgeted),
                last_updated: generated_at,
            });
        }
    }

    // Actuals only start once every budget id exists.
    info!(budgets = budgets.len(), "generating actuals");
    let mut actuals = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();
    for &week in &weeks {
        for (cat, item) in amounts::line_items() {
            let budgetid = lookup.get(&(week, cat.name, item.name)).ok_or_else(|| {
                GenerateError::MissingBudget {
                    week,
                    category: cat.name.to_string(),
                    line_item: item.name.to_string(),
                }
            })?;
            let (lo, hi) = cat.kind.transaction_range();
            let n = rng.gen_range(lo..=hi);
            let total = amounts::sample(rng, cat.name, item.name);
            for split in split_total(rng, total, n) {
                let date = week + Duration::days(rng.gen_range(0..=6));
                let record = actual(date, cat.name, item.name, budgetid, split, generated_at);
                // same day and same cents: the row is identical, keep one
                if !seen.insert(record.actualid.clone()) {
                    debug!(id = %record.actualid, "dropping duplicate actual");
                    continue;
                }
                actuals.push(record);
            }
        }
        debug!(%week, actuals = actuals.len(), "week done");
    }

    info!(
        budgets = budgets.len(),
        actuals = actuals.len(),
        "generated ledger"
    );
    Ok(Ledger {
        budgets,
        actuals,
        generated_at,
    })
}

/// `n` parts of `total`, each `total / n` plus gaussian noise at
/// [`SPLIT_NOISE`] of the per-part magnitude. Parts are not rebalanced, so
/// their sum only approximates `total` and a small part can change sign.
pub fn split_total<R: Rng + ?Sized>(rng: &mut R, total: f64, n: u32) -> Vec<Decimal> {
    let per = total / n as f64;
    let noise = AmountDist {
        mean: 0.0,
        std_dev: (per * SPLIT_NOISE).abs(),
    };
    (0..n)
        .map(|_| to_currency(per + amounts::draw(rng, noise)))
        .collect()
}

fn actual(
    date: NaiveDate,
    category: &str,
    line_item: &str,
    budgetid: &str,
    amount: Decimal,
    generated_at: DateTime<Utc>,
) -> ActualRecord {
    let description = format!(
        "{} - {} transaction on {}",
        category,
        line_item,
        date.format("%Y-%m-%d")
    );
    ActualRecord {
        actualid: ids::actual_id(date, line_item, category, budgetid, amount, &description),
        date,
        line_item: line_item.to_string(),
        amount,
        category: category.to_string(),
        description,
        budgetid: budgetid.to_string(),
        last_updated: generated_at,
    }
}
