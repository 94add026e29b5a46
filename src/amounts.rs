// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Line-item catalog and the normal distributions that drive amounts.

use once_cell::sync::Lazy;
use rand::Rng;
use rand_distr::{Distribution, Normal};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoryKind {
    Revenue,
    Expense,
}

impl CategoryKind {
    /// Inclusive range of transactions booked per week for one line item.
    pub fn transaction_range(self) -> (u32, u32) {
        match self {
            CategoryKind::Revenue => (5, 30),
            CategoryKind::Expense => (2, 8),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AmountDist {
    pub mean: f64,
    pub std_dev: f64,
}

/// Used for any (category, line item) pair missing from the catalog.
pub const FALLBACK: AmountDist = AmountDist {
    mean: -5000.0,
    std_dev: 1000.0,
};

#[derive(Debug)]
pub struct LineItem {
    pub name: &'static str,
    pub dist: AmountDist,
}

#[derive(Debug)]
pub struct Category {
    pub name: &'static str,
    pub kind: CategoryKind,
    pub items: &'static [LineItem],
}

const fn item(name: &'static str, mean: f64, std_dev: f64) -> LineItem {
    LineItem {
        name,
        dist: AmountDist { mean, std_dev },
    }
}

pub static CATALOG: &[Category] = &[
    Category {
        name: "Revenue",
        kind: CategoryKind::Revenue,
        items: &[
            item("Sales Revenue", 9_000_000.0, 400_000.0),
            item("Service Revenue", 800_000.0, 80_000.0),
            item("Interest Income", 75_000.0, 25_000.0),
            item("Other Income", 125_000.0, 50_000.0),
        ],
    },
    Category {
        name: "COGS",
        kind: CategoryKind::Expense,
        items: &[
            item("Raw Materials", -3_500_000.0, 200_000.0),
            item("Direct Labor", -2_000_000.0, 150_000.0),
            item("Manufacturing Overhead", -850_000.0, 50_000.0),
        ],
    },
    Category {
        name: "General & Administrative",
        kind: CategoryKind::Expense,
        items: &[
            item("Salaries & Wages", -600_000.0, 50_000.0),
            item("Office Supplies", -25_000.0, 4_000.0),
            item("Rent", -80_000.0, 9_000.0),
            item("Utilities", -15_000.0, 2_500.0),
            item("Insurance", -12_000.0, 2_000.0),
            item("Depreciation", -25_000.0, 4_000.0),
        ],
    },
    Category {
        name: "Sales & Marketing",
        kind: CategoryKind::Expense,
        items: &[
            item("Advertising", -90_000.0, 15_000.0),
            item("Marketing Campaigns", -25_000.0, 6_000.0),
            item("Sales Commissions", -32_000.0, 7_000.0),
            item("Travel Expenses", -12_000.0, 3_000.0),
        ],
    },
    Category {
        name: "Research & Development",
        kind: CategoryKind::Expense,
        items: &[
            item("R&D Salaries", -40_000.0, 9_000.0),
            item("Prototyping Materials", -8_000.0, 1_500.0),
            item("Software Licenses", -5_000.0, 1_000.0),
        ],
    },
    Category {
        name: "IT & Infrastructure",
        kind: CategoryKind::Expense,
        items: &[
            item("Software Subscriptions", -7_000.0, 1_200.0),
            item("Hardware Purchases", -15_000.0, 2_500.0),
            item("Cloud Hosting", -12_000.0, 2_000.0),
        ],
    },
    Category {
        name: "Other Expenses",
        kind: CategoryKind::Expense,
        items: &[
            item("Interest Expense", -9_000.0, 2_000.0),
            item("Taxes", -55_000.0, 5_000.0),
            item("Legal & Professional Fees", -7_000.0, 1_500.0),
        ],
    },
];

static INDEX: Lazy<HashMap<(&'static str, &'static str), AmountDist>> = Lazy::new(|| {
    CATALOG
        .iter()
        .flat_map(|c| c.items.iter().map(move |i| ((c.name, i.name), i.dist)))
        .collect()
});

/// Every (category, line item) pair in catalog order.
pub fn line_items() -> impl Iterator<Item = (&'static Category, &'static LineItem)> {
    CATALOG
        .iter()
        .flat_map(|c| c.items.iter().map(move |i| (c, i)))
}

pub fn category_kind(category: &str) -> CategoryKind {
    CATALOG
        .iter()
        .find(|c| c.name == category)
        .map(|c| c.kind)
        .unwrap_or(CategoryKind::Expense)
}

pub fn distribution(category: &str, line_item: &str) -> AmountDist {
    INDEX
        .get(&(category, line_item))
        .copied()
        .unwrap_or(FALLBACK)
}

/// Draw one signed amount for the pair; unknown pairs use [`FALLBACK`].
pub fn sample<R: Rng + ?Sized>(rng: &mut R, category: &str, line_item: &str) -> f64 {
    draw(rng, distribution(category, line_item))
}

pub(crate) fn draw<R: Rng + ?Sized>(rng: &mut R, dist: AmountDist) -> f64 {
    match Normal::new(dist.mean, dist.std_dev) {
        Ok(n) => n.sample(rng),
        // only reachable with a non-finite or negative std_dev
        Err(_) => dist.mean,
    }
}
