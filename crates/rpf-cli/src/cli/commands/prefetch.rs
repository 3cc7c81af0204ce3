//! `rpf prefetch <manifest> --page <url>` – prefetch what was learned for a page.

use anyhow::{Context, Result};
use rpf_core::config::RpfConfig;
use rpf_core::manager::NavigationId;
use rpf_core::manifest;
use rpf_core::selection::SelectionConfig;
use std::path::Path;

use super::drive::{prefetch_blocking, print_result, CapOverrides};

pub async fn run_prefetch(
    cfg: &RpfConfig,
    manifest: &Path,
    page: &str,
    caps: CapOverrides,
) -> Result<()> {
    let caps = caps.apply(cfg)?;
    let page = url::Url::parse(page).with_context(|| format!("invalid page URL: {page}"))?;
    let manifest = manifest::load_manifest(manifest)?;
    let Some((key_type, targets)) =
        manifest.targets_for_navigation(&page, &SelectionConfig::from(cfg))
    else {
        println!("No resources meet the prefetch thresholds for {page}.");
        return Ok(());
    };
    tracing::info!(page = %page, %key_type, targets = targets.len(), "prefetching from manifest");
    let navigation = NavigationId::new(1, page);
    let result = prefetch_blocking(cfg, caps, navigation, key_type, targets).await?;
    print_result(&result);
    Ok(())
}
