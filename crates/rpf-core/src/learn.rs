//! Updating the manifest from an observed page load.
//!
//! Every resource already known for the page gets a hit (if it was requested
//! again) or a miss. New resources start with one hit. Resources missed too
//! many loads in a row are dropped, the rest are ranked by score and the
//! list is capped. Both the page URL entry and the page host entry learn.

use std::collections::{HashMap, HashSet};

use crate::config::LearnConfig;
use crate::manager::{NavigationKey, PrefetchKeyType};
use crate::manifest::{PageResources, ResourceManifest};
use crate::selection::{ResourceKind, ResourceStat};

/// Longest page URL or host that is learned.
pub const MAX_KEY_LEN: usize = 1024;

/// A subresource requested during a page load, in request order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservedResource {
    pub url: String,
    pub kind: ResourceKind,
}

impl ObservedResource {
    pub fn new(url: impl Into<String>, kind: ResourceKind) -> Self {
        Self {
            url: url.into(),
            kind,
        }
    }

    /// Kind guessed from the URL's extension.
    pub fn from_url(url: &url::Url) -> Self {
        Self::new(url.as_str(), ResourceKind::from_url(url))
    }
}

impl ResourceManifest {
    /// Learn one load of `page` into both the URL and the host table.
    /// `now` is the visit time in unix seconds.
    pub fn learn_navigation(
        &mut self,
        page: &url::Url,
        observed: &[ObservedResource],
        cfg: &LearnConfig,
        now: u64,
    ) {
        for (key_type, max_entries) in [
            (PrefetchKeyType::Url, cfg.max_urls_to_track),
            (PrefetchKeyType::Host, cfg.max_hosts_to_track),
        ] {
            let key = NavigationKey::for_page(page, key_type);
            if key.key.is_empty() || key.key.len() > MAX_KEY_LEN {
                tracing::debug!(%key, "page key not learnable");
                continue;
            }
            learn_entry(self, &key, observed, cfg, max_entries, now);
        }
    }
}

fn learn_entry(
    manifest: &mut ResourceManifest,
    key: &NavigationKey,
    observed: &[ObservedResource],
    cfg: &LearnConfig,
    max_entries: usize,
    now: u64,
) {
    let table = manifest.table_mut(key.key_type);
    if !table.contains_key(&key.key) && table.len() >= max_entries {
        evict_oldest(table);
    }
    let entry = table.entry(key.key.clone()).or_default();
    entry.last_visit = now;
    merge_observed(entry, observed);

    entry
        .resources
        .retain(|r| r.consecutive_misses < cfg.max_consecutive_misses);
    entry
        .resources
        .sort_by(|a, b| b.score().total_cmp(&a.score()));
    entry.resources.truncate(cfg.max_resources_per_entry);

    let kept = entry.resources.len();
    if kept == 0 {
        table.remove(&key.key);
        tracing::debug!(%key, "no resources left, entry removed");
    } else {
        tracing::debug!(%key, resources = kept, "learned navigation");
    }
}

fn evict_oldest(table: &mut std::collections::BTreeMap<String, PageResources>) {
    let oldest = table
        .iter()
        .min_by_key(|(_, e)| e.last_visit)
        .map(|(k, _)| k.clone());
    if let Some(key) = oldest {
        tracing::debug!(key = %key, "evicting least recently visited page");
        table.remove(&key);
    }
}

/// Apply hits, misses and new resources. Only the first occurrence of a
/// repeated URL counts.
fn merge_observed(entry: &mut PageResources, observed: &[ObservedResource]) {
    let mut first_position: HashMap<&str, usize> = HashMap::new();
    for (i, r) in observed.iter().enumerate() {
        first_position.entry(r.url.as_str()).or_insert(i);
    }

    let mut known: HashSet<String> = HashSet::new();
    for row in &mut entry.resources {
        known.insert(row.url.clone());
        match first_position.get(row.url.as_str()) {
            None => {
                row.misses += 1;
                row.consecutive_misses += 1;
            }
            Some(&i) => {
                row.kind = observed[i].kind;
                let position = (i + 1) as f64;
                let total = f64::from(row.hits) + f64::from(row.misses);
                row.average_position = (row.average_position * total + position) / (total + 1.0);
                row.hits += 1;
                row.consecutive_misses = 0;
            }
        }
    }

    for (i, r) in observed.iter().enumerate() {
        if known.insert(r.url.clone()) {
            entry
                .resources
                .push(ResourceStat::first_seen(r.url.clone(), r.kind, i + 1));
        }
    }
}
