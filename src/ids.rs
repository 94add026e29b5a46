// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Content-addressed identifiers for generated records.
//!
//! Ids are SHA-1 hex digests over `|`-joined fields. The field order and the
//! delimiter are fixed: changing either changes every id and breaks
//! idempotent regeneration against an existing store.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sha1::{Digest, Sha1};

fn digest(key: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(key.as_bytes());
    hex::encode(hasher.finalize())
}

pub fn budget_id(week: NaiveDate, category: &str, line_item: &str) -> String {
    digest(&format!("{}|{}|{}", week.format("%Y-%m-%d"), category, line_item))
}

pub fn actual_id(
    date: NaiveDate,
    line_item: &str,
    category: &str,
    budget_id: &str,
    amount: Decimal,
    description: &str,
) -> String {
    digest(&format!(
        "{}|{}|{}|{}|{}|{}",
        date.format("%Y-%m-%d"),
        line_item,
        category,
        budget_id,
        amount,
        description
    ))
}
