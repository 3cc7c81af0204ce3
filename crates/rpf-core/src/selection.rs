//! Choosing which learned resources are worth prefetching.
//!
//! Each resource seen on earlier loads of a page carries hit/miss counts. A
//! resource is prefetched only when it was seen often enough and reliably
//! enough; the survivors keep the order they appear in.

use serde::{Deserialize, Serialize};

use crate::config::RpfConfig;
use crate::target::PrefetchTarget;

/// Resources below this average position are ranked purely by position.
const MAX_INITIAL_RESOURCE_POSITION: f64 = 500.0;

/// Coarse resource type; stylesheets and scripts are ranked first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Stylesheet,
    Script,
    #[default]
    Other,
}

impl ResourceKind {
    /// Guess the kind from the URL path extension.
    pub fn from_url(url: &url::Url) -> Self {
        let path = url.path().to_ascii_lowercase();
        if path.ends_with(".css") {
            ResourceKind::Stylesheet
        } else if path.ends_with(".js") || path.ends_with(".mjs") {
            ResourceKind::Script
        } else {
            ResourceKind::Other
        }
    }
}

/// Hit/miss history of one subresource of a page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceStat {
    pub url: String,
    #[serde(default)]
    pub kind: ResourceKind,
    #[serde(default)]
    pub hits: u32,
    #[serde(default)]
    pub misses: u32,
    #[serde(default)]
    pub consecutive_misses: u32,
    /// Mean 1-based position among the page's requests across hits.
    #[serde(default)]
    pub average_position: f64,
}

impl ResourceStat {
    /// A resource seen for the first time at `position` (1-based).
    pub fn first_seen(url: String, kind: ResourceKind, position: usize) -> Self {
        Self {
            url,
            kind,
            hits: 1,
            misses: 0,
            consecutive_misses: 0,
            average_position: position as f64,
        }
    }

    /// `hits / (hits + misses)`; 0 when the resource was never observed.
    pub fn confidence(&self) -> f64 {
        let total = u64::from(self.hits) + u64::from(self.misses);
        if total == 0 {
            return 0.0;
        }
        f64::from(self.hits) / total as f64
    }

    /// Ranking score: stylesheets and scripts first, then earlier resources.
    pub fn score(&self) -> f64 {
        match self.kind {
            ResourceKind::Stylesheet | ResourceKind::Script => {
                2.0 * MAX_INITIAL_RESOURCE_POSITION - self.average_position
            }
            ResourceKind::Other => MAX_INITIAL_RESOURCE_POSITION - self.average_position,
        }
    }
}

/// Thresholds a resource must meet to be prefetched.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SelectionConfig {
    pub min_resource_confidence: f64,
    pub min_resource_hits: u32,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self::from(&RpfConfig::default())
    }
}

impl From<&RpfConfig> for SelectionConfig {
    fn from(cfg: &RpfConfig) -> Self {
        Self {
            min_resource_confidence: cfg.min_resource_confidence,
            min_resource_hits: cfg.min_resource_hits,
        }
    }
}

impl SelectionConfig {
    pub fn accepts(&self, stat: &ResourceStat) -> bool {
        stat.confidence() >= self.min_resource_confidence && stat.hits >= self.min_resource_hits
    }
}

/// Every resource meeting both thresholds, as `(index into stats, target)`,
/// in input order.
pub fn select(stats: &[ResourceStat], cfg: &SelectionConfig) -> Vec<(usize, PrefetchTarget)> {
    stats
        .iter()
        .enumerate()
        .filter(|(_, s)| cfg.accepts(s))
        .filter_map(|(i, s)| match PrefetchTarget::parse(&s.url) {
            Ok(t) => Some((i, t)),
            Err(e) => {
                tracing::warn!("skipping resource: {e}");
                None
            }
        })
        .collect()
}

/// Targets for every resource meeting both thresholds, in input order.
pub fn select_targets(stats: &[ResourceStat], cfg: &SelectionConfig) -> Vec<PrefetchTarget> {
    select(stats, cfg).into_iter().map(|(_, t)| t).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stat(url: &str, hits: u32, misses: u32) -> ResourceStat {
        ResourceStat {
            url: url.to_string(),
            kind: ResourceKind::Other,
            hits,
            misses,
            consecutive_misses: 0,
            average_position: 1.0,
        }
    }

    #[test]
    fn confidence_of_unseen_resource_is_zero() {
        assert_eq!(stat("http://a.com/x", 0, 0).confidence(), 0.0);
        assert!((stat("http://a.com/x", 3, 1).confidence() - 0.75).abs() < 1e-9);
    }

    #[test]
    fn selection_applies_both_thresholds_in_order() {
        let stats = vec![
            stat("http://a.com/app.js", 9, 1),    // 0.9, 9 hits
            stat("http://a.com/rare.js", 2, 0),   // 1.0 but too few hits
            stat("http://b.com/flaky.css", 5, 5), // 0.5
            stat("http://b.com/logo.png", 4, 1),  // 0.8 exactly
        ];
        let selected = select_targets(&stats, &SelectionConfig::default());
        let urls: Vec<&str> = selected.iter().map(|t| t.url().as_str()).collect();
        assert_eq!(urls, vec!["http://a.com/app.js", "http://b.com/logo.png"]);
    }

    #[test]
    fn selection_reports_indices_of_normalised_urls() {
        let stats = vec![
            stat("http://CDN.a.com/app.js", 9, 0),
            stat("http://b.com", 9, 0),
            stat("http://b.com", 1, 9),
        ];
        let selected = select(&stats, &SelectionConfig::default());
        let indices: Vec<usize> = selected.iter().map(|(i, _)| *i).collect();
        assert_eq!(indices, vec![0, 1]);
        assert_eq!(selected[0].1.url().as_str(), "http://cdn.a.com/app.js");
        assert_eq!(selected[1].1.url().as_str(), "http://b.com/");
    }

    #[test]
    fn selection_skips_unparseable_urls() {
        let stats = vec![stat("::nope::", 10, 0), stat("http://a.com/ok.js", 10, 0)];
        let selected = select(&stats, &SelectionConfig::default());
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].0, 1);
        assert_eq!(selected[0].1.host(), "a.com");
    }

    #[test]
    fn scripts_and_stylesheets_outrank_other_resources() {
        let mut img = stat("http://a.com/hero.png", 1, 0);
        img.average_position = 1.0;
        let mut js = stat("http://a.com/late.js", 1, 0);
        js.kind = ResourceKind::Script;
        js.average_position = 40.0;
        assert!(js.score() > img.score());

        let mut early = img.clone();
        early.average_position = 2.0;
        let mut later = img;
        later.average_position = 3.0;
        assert!(early.score() > later.score());
    }

    #[test]
    fn kind_from_url_extension() {
        let kind = |u: &str| ResourceKind::from_url(&url::Url::parse(u).unwrap());
        assert_eq!(kind("http://a.com/site.CSS"), ResourceKind::Stylesheet);
        assert_eq!(kind("http://a.com/app.js?v=2"), ResourceKind::Script);
        assert_eq!(kind("http://a.com/mod.mjs"), ResourceKind::Script);
        assert_eq!(kind("http://a.com/logo.png"), ResourceKind::Other);
    }
}
