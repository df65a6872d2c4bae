//! Tests for CLI argument parsing.

use crate::cli::{Cli, Commands, LsOutput};
use clap::Parser;

#[test]
fn run_defaults() {
    let cli = Cli::try_parse_from(["strata", "run"]).unwrap();
    assert!(!cli.global.verbose);
    assert_eq!(cli.global.project_dir, ".");
    match cli.command {
        Commands::Run(args) => {
            assert!(args.select.is_none());
            assert!(args.run_id.is_none());
            assert!(args.report.is_none());
        }
        _ => panic!("expected run command"),
    }
}

#[test]
fn run_with_selection_and_run_id() {
    let cli = Cli::try_parse_from([
        "strata",
        "run",
        "--select",
        "merge_countries,weather",
        "--run-id",
        "airflow_20260828",
    ])
    .unwrap();

    match cli.command {
        Commands::Run(args) => {
            assert_eq!(args.select.as_deref(), Some("merge_countries,weather"));
            assert_eq!(args.run_id.as_deref(), Some("airflow_20260828"));
        }
        _ => panic!("expected run command"),
    }
}

#[test]
fn global_args_apply_after_subcommand() {
    let cli =
        Cli::try_parse_from(["strata", "run", "--verbose", "-p", "/srv/etl"]).unwrap();
    assert!(cli.global.verbose);
    assert_eq!(cli.global.project_dir, "/srv/etl");
}

#[test]
fn ls_output_formats() {
    let cli = Cli::try_parse_from(["strata", "ls", "--output", "json"]).unwrap();
    match cli.command {
        Commands::Ls(args) => assert_eq!(args.output, LsOutput::Json),
        _ => panic!("expected ls command"),
    }
}

#[test]
fn unknown_subcommand_is_rejected() {
    assert!(Cli::try_parse_from(["strata", "compile"]).is_err());
}
