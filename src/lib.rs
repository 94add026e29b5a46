// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

pub mod amounts;
pub mod cli;
pub mod commands;
pub mod db;
pub mod generator;
pub mod ids;
pub mod models;
pub mod publish;
pub mod rest;
pub mod store;
pub mod utils;

use std::sync::Once;

static TRACING_INIT: Once = Once::new();

/// Install the global fmt subscriber. `RUST_LOG` overrides the default
/// `ledgerseed=info` filter.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{EnvFilter, fmt};

        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("ledgerseed=info"));

        fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
    });
}
