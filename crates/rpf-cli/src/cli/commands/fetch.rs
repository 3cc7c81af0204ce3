//! `rpf fetch <url>...` – prefetch URLs directly.

use anyhow::{Context, Result};
use rpf_core::config::RpfConfig;
use rpf_core::manager::{NavigationId, PrefetchKeyType};
use rpf_core::target::PrefetchTarget;

use super::drive::{prefetch_blocking, print_result, CapOverrides};

pub async fn run_fetch(cfg: &RpfConfig, urls: Vec<String>, caps: CapOverrides) -> Result<()> {
    let caps = caps.apply(cfg)?;
    let targets = urls
        .iter()
        .map(|u| PrefetchTarget::parse(u))
        .collect::<Result<Vec<_>, _>>()?;
    // The first URL stands in for the page the resources belong to.
    let page = targets
        .first()
        .map(|t| t.url().clone())
        .context("no URLs given")?;
    let navigation = NavigationId::new(0, page);
    let result = prefetch_blocking(cfg, caps, navigation, PrefetchKeyType::Url, targets).await?;
    print_result(&result);
    Ok(())
}
