//! `rpf plan <manifest> --page <url>` – show what would be prefetched for a page.

use anyhow::{Context, Result};
use rpf_core::config::RpfConfig;
use rpf_core::manager::{NavigationKey, PrefetchKeyType};
use rpf_core::manifest;
use rpf_core::selection::{self, ResourceStat, SelectionConfig};
use std::collections::HashSet;
use std::path::Path;

/// Each stat paired with whether selection keeps it.
pub(super) fn mark_selected<'a>(
    stats: &'a [ResourceStat],
    sel: &SelectionConfig,
) -> Vec<(&'a ResourceStat, bool)> {
    let chosen: HashSet<usize> = selection::select(stats, sel)
        .into_iter()
        .map(|(i, _)| i)
        .collect();
    stats
        .iter()
        .enumerate()
        .map(|(i, s)| (s, chosen.contains(&i)))
        .collect()
}

pub fn run_plan(
    cfg: &RpfConfig,
    manifest: &Path,
    page: &str,
    min_confidence: Option<f64>,
    min_hits: Option<u32>,
) -> Result<()> {
    let mut sel = SelectionConfig::from(cfg);
    if let Some(c) = min_confidence {
        sel.min_resource_confidence = c;
    }
    if let Some(h) = min_hits {
        sel.min_resource_hits = h;
    }
    let page = url::Url::parse(page).with_context(|| format!("invalid page URL: {page}"))?;
    let manifest = manifest::load_manifest(manifest)?;

    for key_type in [PrefetchKeyType::Url, PrefetchKeyType::Host] {
        let key = NavigationKey::for_page(&page, key_type);
        let Some(entry) = manifest.entry(&page, key_type) else {
            println!("{key}: no data");
            continue;
        };
        println!("{key}:");
        println!("  {:<6} {:<6} {:<6} {}", "HITS", "MISS", "CONF", "URL");
        for (stat, chosen) in mark_selected(&entry.resources, &sel) {
            println!(
                "  {:<6} {:<6} {:<6.2} {}{}",
                stat.hits,
                stat.misses,
                stat.confidence(),
                stat.url,
                if chosen { "" } else { "  (skipped)" }
            );
        }
    }

    match manifest.targets_for_navigation(&page, &sel) {
        Some((key_type, targets)) => {
            println!("{} resources would be prefetched by {key_type}", targets.len())
        }
        None => println!("Nothing would be prefetched for {page}"),
    }
    Ok(())
}
