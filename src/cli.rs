// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use clap::{Arg, ArgAction, Command, crate_version, value_parser};

use crate::models::{ACTUALS_TABLE, BUDGET_TABLE};

fn generation_args(cmd: Command) -> Command {
    cmd.arg(
        Arg::new("start")
            .long("start")
            .default_value("2021-01-01")
            .help("First day of the range (YYYY-MM-DD); weeks begin on the first anchor day on or after it"),
    )
    .arg(
        Arg::new("years")
            .long("years")
            .value_parser(value_parser!(usize))
            .default_value("3")
            .conflicts_with("weeks")
            .help("Number of 52-week years to generate"),
    )
    .arg(
        Arg::new("weeks")
            .long("weeks")
            .value_parser(value_parser!(usize))
            .help("Exact number of weeks to generate"),
    )
    .arg(
        Arg::new("anchor")
            .long("anchor")
            .default_value("mon")
            .help("Weekday every budget week starts on"),
    )
    .arg(
        Arg::new("seed")
            .long("seed")
            .value_parser(value_parser!(u64))
            .help("Seed for reproducible output"),
    )
}

fn store_args(cmd: Command) -> Command {
    cmd.arg(
        Arg::new("db")
            .long("db")
            .help("SQLite database path (defaults to the platform data dir)"),
    )
    .arg(
        Arg::new("budget-table")
            .long("budget-table")
            .default_value(BUDGET_TABLE),
    )
    .arg(
        Arg::new("actuals-table")
            .long("actuals-table")
            .default_value(ACTUALS_TABLE),
    )
}

fn json_flags(cmd: Command) -> Command {
    cmd.arg(
        Arg::new("json")
            .long("json")
            .action(ArgAction::SetTrue)
            .conflicts_with("jsonl"),
    )
    .arg(Arg::new("jsonl").long("jsonl").action(ArgAction::SetTrue))
}

pub fn build_cli() -> Command {
    Command::new("ledgerseed")
        .version(crate_version!())
        .about("Synthetic weekly budget and actuals generator with smart-sync publishing")
        .subcommand(json_flags(generation_args(
            Command::new("generate").about("Generate a ledger and print per-category totals"),
        )))
        .subcommand(generation_args(
            Command::new("export")
                .about("Generate a ledger and write budget and actuals files")
                .arg(
                    Arg::new("format")
                        .long("format")
                        .default_value("csv")
                        .help("csv|json"),
                )
                .arg(Arg::new("out-dir").long("out-dir").required(true)),
        ))
        .subcommand(store_args(generation_args(
            Command::new("publish")
                .about("Generate, smart-sync the budget table and fully replace the actuals table")
                .arg(
                    Arg::new("store")
                        .long("store")
                        .default_value("sqlite")
                        .value_parser(["memory", "sqlite", "rest"]),
                )
                .arg(
                    Arg::new("url")
                        .long("url")
                        .env("LEDGERSEED_URL")
                        .help("Base URL of a PostgREST-compatible store"),
                )
                .arg(
                    Arg::new("service-key")
                        .long("service-key")
                        .env("LEDGERSEED_SERVICE_KEY")
                        .hide_env_values(true)
                        .help("Write credential for the rest store"),
                )
                .arg(
                    Arg::new("delete-batch")
                        .long("delete-batch")
                        .value_parser(value_parser!(usize))
                        .default_value("500"),
                )
                .arg(
                    Arg::new("insert-batch")
                        .long("insert-batch")
                        .value_parser(value_parser!(usize))
                        .default_value("1000"),
                ),
        )))
        .subcommand(json_flags(store_args(
            Command::new("doctor")
                .about("Check a SQLite store for orphans, off-anchor weeks and budget drift")
                .arg(Arg::new("anchor").long("anchor").default_value("mon"))
                .arg(
                    Arg::new("tolerance")
                        .long("tolerance")
                        .value_parser(value_parser!(f64))
                        .default_value("0.5")
                        .help("Allowed relative gap between a week's actuals and its budget"),
                ),
        )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_is_consistent() {
        build_cli().debug_assert();
    }

    #[test]
    fn years_and_weeks_conflict() {
        let r = build_cli().try_get_matches_from([
            "ledgerseed", "generate", "--years", "1", "--weeks", "4",
        ]);
        assert!(r.is_err());
    }

    #[test]
    fn publish_defaults() {
        let m = build_cli()
            .try_get_matches_from(["ledgerseed", "publish", "--store", "memory"])
            .unwrap();
        let (_, sub) = m.subcommand().unwrap();
        assert_eq!(
            sub.get_one::<usize>("delete-batch"),
            Some(&crate::publish::DEFAULT_DELETE_BATCH)
        );
        assert_eq!(
            sub.get_one::<usize>("insert-batch"),
            Some(&crate::publish::DEFAULT_INSERT_BATCH)
        );
        assert_eq!(
            sub.get_one::<String>("budget-table").map(String::as_str),
            Some(BUDGET_TABLE)
        );
    }
}
