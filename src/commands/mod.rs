// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

pub mod generate;
pub mod exporter;
pub mod sync;
pub mod doctor;

use crate::generator::GeneratorConfig;
use crate::utils::{parse_date, parse_weekday};
use anyhow::{Context, Result};

/// Build the generator settings shared by `generate`, `export` and `publish`.
pub fn generator_config(sub: &clap::ArgMatches) -> Result<GeneratorConfig> {
    let defaults = GeneratorConfig::default();
    let start = match sub.get_one::<String>("start") {
        Some(s) => parse_date(s)?,
        None => defaults.start,
    };
    let weeks = match sub.get_one::<usize>("weeks") {
        Some(w) => *w,
        None => {
            let years = *sub.get_one::<usize>("years").unwrap_or(&3);
            years
                .checked_mul(52)
                .with_context(|| format!("--years {} is too large", years))?
        }
    };
    let anchor = match sub.get_one::<String>("anchor") {
        Some(a) => parse_weekday(a)?,
        None => defaults.anchor,
    };
    Ok(GeneratorConfig {
        start,
        weeks,
        anchor,
        seed: sub.get_one::<u64>("seed").copied(),
        generated_at: None,
    })
}
