//! Tests for the scan subcommand.

use super::{parse, parse_err};
use crate::cli::{CheckArg, CliCommand};

#[test]
fn cli_parse_scan_defaults() {
    match parse(&["scanwatch", "scan", "https://example.com"]) {
        CliCommand::Scan { url, depth, checks } => {
            assert_eq!(url, "https://example.com");
            assert_eq!(depth, 2);
            assert!(checks.is_empty());
        }
        _ => panic!("expected Scan"),
    }
}

#[test]
fn cli_parse_scan_depth_and_checks() {
    match parse(&[
        "scanwatch",
        "scan",
        "https://example.com",
        "--depth",
        "3",
        "--checks",
        "ports,headers",
    ]) {
        CliCommand::Scan { depth, checks, .. } => {
            assert_eq!(depth, 3);
            assert_eq!(checks, vec![CheckArg::Ports, CheckArg::Headers]);
        }
        _ => panic!("expected Scan with --checks"),
    }
}

#[test]
fn cli_parse_scan_rejects_bad_depth() {
    let err = parse_err(&["scanwatch", "scan", "https://example.com", "--depth", "4"]);
    assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
}

#[test]
fn cli_parse_scan_rejects_unknown_check() {
    let err = parse_err(&[
        "scanwatch",
        "scan",
        "https://example.com",
        "--checks",
        "telepathy",
    ]);
    assert_eq!(err.kind(), clap::error::ErrorKind::InvalidValue);
}

#[test]
fn cli_parse_scan_requires_url() {
    let err = parse_err(&["scanwatch", "scan"]);
    assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
}
