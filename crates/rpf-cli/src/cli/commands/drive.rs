//! Shared plumbing: cap overrides, the blocking curl loop, result printing.

use anyhow::{Context, Result};
use rpf_core::config::{PrefetchConfig, RpfConfig};
use rpf_core::manager::{NavigationId, PrefetchKeyType, PrefetchManager, PrefetchResult};
use rpf_core::target::{PrefetchStatus, PrefetchTarget};
use rpf_core::transport::{CurlOptions, CurlTransport};

/// Command-line overrides for the admission caps.
#[derive(Debug, Clone, Copy, Default)]
pub struct CapOverrides {
    pub max_global: Option<usize>,
    pub max_per_host: Option<usize>,
}

impl CapOverrides {
    /// Merge with the config file values; zero caps are rejected.
    pub fn apply(self, cfg: &RpfConfig) -> Result<PrefetchConfig> {
        let mut caps = cfg.prefetch();
        if let Some(n) = self.max_global {
            caps.max_global_in_flight = n;
        }
        if let Some(n) = self.max_per_host {
            caps.max_per_host_in_flight = n;
        }
        if caps.max_global_in_flight == 0 || caps.max_per_host_in_flight == 0 {
            anyhow::bail!("in-flight caps must be at least 1");
        }
        Ok(caps)
    }
}

/// Prefetch `targets` for `navigation` on a blocking thread and return the result.
pub async fn prefetch_blocking(
    cfg: &RpfConfig,
    caps: PrefetchConfig,
    navigation: NavigationId,
    key_type: PrefetchKeyType,
    targets: Vec<PrefetchTarget>,
) -> Result<PrefetchResult> {
    let options = CurlOptions::from(&cfg.curl_or_default());
    tokio::task::spawn_blocking(move || -> Result<PrefetchResult> {
        let mut transport = CurlTransport::new(options);
        let mut manager = PrefetchManager::new(caps);
        manager.maybe_add_prefetch(navigation, key_type, targets, &mut transport);
        transport.run_until_idle(&mut manager)?;
        manager
            .take_finished()
            .pop()
            .context("prefetch produced no result")
    })
    .await
    .context("prefetch task join")?
}

pub fn print_result(result: &PrefetchResult) {
    println!("{:<14} {}", "STATUS", "URL");
    for r in &result.requests {
        println!("{:<14} {}", r.status, r.target);
    }
    let ok = result.requests.iter().filter(|r| r.status.is_success()).count();
    println!(
        "{} of {} prefetched, {} not started",
        ok,
        result.requests.len(),
        result.count(PrefetchStatus::NotStarted)
    );
}
