// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::generator::generate;
use crate::models::Ledger;
use anyhow::{Context, Result, bail};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

use super::generator_config;

pub fn handle(m: &clap::ArgMatches) -> Result<()> {
    let fmt = m.get_one::<String>("format").unwrap().to_lowercase();
    let out_dir = PathBuf::from(m.get_one::<String>("out-dir").unwrap().trim());
    if fmt != "csv" && fmt != "json" {
        bail!("Unknown format: {} (use csv|json)", fmt);
    }
    let cfg = generator_config(m)?;
    let ledger = generate(&cfg)?;
    let (budget_path, actuals_path) = export_ledger(&ledger, &fmt, &out_dir)?;
    println!(
        "Exported {} budget records to {} and {} actual records to {}",
        ledger.budgets.len(),
        budget_path.display(),
        ledger.actuals.len(),
        actuals_path.display()
    );
    Ok(())
}

/// Write `budget.<fmt>` and `actuals.<fmt>` into `dir`, creating it if needed.
pub fn export_ledger(ledger: &Ledger, fmt: &str, dir: &Path) -> Result<(PathBuf, PathBuf)> {
    if fmt != "csv" && fmt != "json" {
        bail!("Unknown format: {} (use csv|json)", fmt);
    }
    fs::create_dir_all(dir).with_context(|| format!("Create {}", dir.display()))?;
    let budget_path = dir.join(format!("budget.{fmt}"));
    let actuals_path = dir.join(format!("actuals.{fmt}"));
    if fmt == "csv" {
        write_csv(&budget_path, &ledger.budgets)?;
        write_csv(&actuals_path, &ledger.actuals)?;
    } else {
        write_json(&budget_path, &ledger.budgets)?;
        write_json(&actuals_path, &ledger.actuals)?;
    }
    Ok((budget_path, actuals_path))
}

fn write_csv<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    let mut wtr =
        csv::Writer::from_path(path).with_context(|| format!("Open {}", path.display()))?;
    for r in rows {
        wtr.serialize(r)?;
    }
    wtr.flush()?;
    Ok(())
}

fn write_json<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    fs::write(path, serde_json::to_string_pretty(rows)?)
        .with_context(|| format!("Write {}", path.display()))?;
    Ok(())
}
