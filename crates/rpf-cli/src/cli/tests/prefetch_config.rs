//! Tests for prefetch, learn and config subcommands.

use super::parse;
use crate::cli::{Cli, CliCommand};
use clap::Parser;

#[test]
fn cli_parse_prefetch() {
    match parse(&[
        "rpf",
        "prefetch",
        "manifest.json",
        "--page",
        "http://site.com/",
        "--max-per-host",
        "2",
    ]) {
        CliCommand::Prefetch {
            manifest,
            page,
            max_global,
            max_per_host,
        } => {
            assert_eq!(manifest, std::path::PathBuf::from("manifest.json"));
            assert_eq!(page, "http://site.com/");
            assert!(max_global.is_none());
            assert_eq!(max_per_host, Some(2));
        }
        _ => panic!("expected Prefetch"),
    }
}

#[test]
fn cli_parse_prefetch_requires_page() {
    assert!(Cli::try_parse_from(["rpf", "prefetch", "manifest.json"]).is_err());
}

#[test]
fn cli_parse_learn_keeps_resource_order() {
    match parse(&[
        "rpf",
        "learn",
        "manifest.json",
        "--page",
        "http://site.com/",
        "http://cdn.com/b.css",
        "http://cdn.com/a.js",
    ]) {
        CliCommand::Learn {
            manifest,
            page,
            resources,
        } => {
            assert_eq!(manifest, std::path::PathBuf::from("manifest.json"));
            assert_eq!(page, "http://site.com/");
            assert_eq!(resources, vec!["http://cdn.com/b.css", "http://cdn.com/a.js"]);
        }
        _ => panic!("expected Learn"),
    }
}

#[test]
fn cli_parse_learn_allows_load_without_resources() {
    match parse(&["rpf", "learn", "m.json", "--page", "http://site.com/"]) {
        CliCommand::Learn { resources, .. } => assert!(resources.is_empty()),
        _ => panic!("expected Learn"),
    }
}

#[test]
fn cli_parse_config() {
    assert!(matches!(parse(&["rpf", "config"]), CliCommand::Config));
}
