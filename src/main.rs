// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::Result;

use ledgerseed::{cli, commands, init_tracing};

fn main() -> Result<()> {
    init_tracing();
    let cli = cli::build_cli();
    let matches = cli.get_matches();

    match matches.subcommand() {
        Some(("generate", sub)) => commands::generate::handle(sub)?,
        Some(("export", sub)) => commands::exporter::handle(sub)?,
        Some(("publish", sub)) => commands::sync::handle(sub)?,
        Some(("doctor", sub)) => commands::doctor::handle(sub)?,
        _ => {
            cli::build_cli().print_help()?;
            println!();
        }
    }
    Ok(())
}
