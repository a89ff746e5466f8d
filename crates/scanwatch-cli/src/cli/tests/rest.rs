//! Tests for status, cancel, completions and man.

use super::parse;
use crate::cli::{Cli, CliCommand};
use clap::CommandFactory;

#[test]
fn cli_parse_status() {
    match parse(&["scanwatch", "status", "job-1"]) {
        CliCommand::Status { id } => assert_eq!(id, "job-1"),
        _ => panic!("expected Status"),
    }
}

#[test]
fn cli_parse_cancel() {
    match parse(&["scanwatch", "cancel", "job-1"]) {
        CliCommand::Cancel { id, force } => {
            assert_eq!(id, "job-1");
            assert!(!force);
        }
        _ => panic!("expected Cancel"),
    }
}

#[test]
fn cli_parse_cancel_force() {
    match parse(&["scanwatch", "cancel", "job-1", "--force"]) {
        CliCommand::Cancel { force, .. } => assert!(force),
        _ => panic!("expected Cancel --force"),
    }
}

#[test]
fn cli_parse_completions() {
    match parse(&["scanwatch", "completions", "bash"]) {
        CliCommand::Completions { shell } => assert_eq!(shell, clap_complete::Shell::Bash),
        _ => panic!("expected Completions"),
    }
}

#[test]
fn cli_parse_man() {
    assert!(matches!(parse(&["scanwatch", "man"]), CliCommand::Man));
}

#[test]
fn cli_definition_is_consistent() {
    Cli::command().debug_assert();
}
