//! CLI for the RPF resource prefetcher.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use rpf_core::config;
use std::path::PathBuf;

use commands::{run_config, run_fetch, run_learn, run_plan, run_prefetch, CapOverrides};

/// Top-level CLI for the RPF prefetcher.
#[derive(Debug, Parser)]
#[command(name = "rpf")]
#[command(about = "RPF: bounded, per-host fair resource prefetcher", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Prefetch the given URLs and print each one's status.
    Fetch {
        /// Resource URLs, admitted in this order.
        #[arg(required = true)]
        urls: Vec<String>,
        /// Override the global in-flight cap.
        #[arg(long, value_name = "N")]
        max_global: Option<usize>,
        /// Override the per-host in-flight cap.
        #[arg(long, value_name = "N")]
        max_per_host: Option<usize>,
    },

    /// Show the resources learned for a page and which would be prefetched.
    Plan {
        /// Path to a JSON resource manifest.
        manifest: PathBuf,
        /// Main-frame URL to look up.
        #[arg(long)]
        page: String,
        /// Override the minimum confidence (0..=1).
        #[arg(long, value_name = "F")]
        min_confidence: Option<f64>,
        /// Override the minimum hit count.
        #[arg(long, value_name = "N")]
        min_hits: Option<u32>,
    },

    /// Prefetch the resources learned for a page (URL entry, else host entry).
    Prefetch {
        /// Path to a JSON resource manifest.
        manifest: PathBuf,
        /// Main-frame URL the resources belong to.
        #[arg(long)]
        page: String,
        /// Override the global in-flight cap.
        #[arg(long, value_name = "N")]
        max_global: Option<usize>,
        /// Override the per-host in-flight cap.
        #[arg(long, value_name = "N")]
        max_per_host: Option<usize>,
    },

    /// Record one load of a page into the manifest and write it back.
    Learn {
        /// Path to a JSON resource manifest (created if missing).
        manifest: PathBuf,
        /// Main-frame URL that was loaded.
        #[arg(long)]
        page: String,
        /// Subresource URLs in the order they were requested.
        resources: Vec<String>,
    },

    /// Print the config file path and effective values.
    Config,
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let cfg = config::load_or_init()?;
        tracing::debug!("loaded config: {:?}", cfg);

        match cli.command {
            CliCommand::Fetch {
                urls,
                max_global,
                max_per_host,
            } => {
                let caps = CapOverrides {
                    max_global,
                    max_per_host,
                };
                run_fetch(&cfg, urls, caps).await?
            }
            CliCommand::Plan {
                manifest,
                page,
                min_confidence,
                min_hits,
            } => run_plan(&cfg, &manifest, &page, min_confidence, min_hits)?,
            CliCommand::Prefetch {
                manifest,
                page,
                max_global,
                max_per_host,
            } => {
                let caps = CapOverrides {
                    max_global,
                    max_per_host,
                };
                run_prefetch(&cfg, &manifest, &page, caps).await?
            }
            CliCommand::Learn {
                manifest,
                page,
                resources,
            } => run_learn(&cfg, &manifest, &page, &resources)?,
            CliCommand::Config => run_config(&cfg)?,
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
