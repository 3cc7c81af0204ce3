//! `rpf learn <manifest> --page <url> <resource>...` – record one page load.

use anyhow::{Context, Result};
use rpf_core::config::RpfConfig;
use rpf_core::learn::ObservedResource;
use rpf_core::manifest;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

pub fn run_learn(cfg: &RpfConfig, path: &Path, page: &str, resources: &[String]) -> Result<()> {
    let page = url::Url::parse(page).with_context(|| format!("invalid page URL: {page}"))?;
    let observed = resources
        .iter()
        .map(|r| {
            url::Url::parse(r)
                .map(|u| ObservedResource::from_url(&u))
                .with_context(|| format!("invalid resource URL: {r}"))
        })
        .collect::<Result<Vec<_>>>()?;
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default();

    let mut manifest = manifest::load_manifest_or_default(path)?;
    manifest.learn_navigation(&page, &observed, &cfg.learning_or_default(), now);
    manifest::save_manifest(path, &manifest)?;

    println!(
        "Learned {} resources for {}; manifest tracks {} pages and {} hosts",
        observed.len(),
        page,
        manifest.urls.len(),
        manifest.hosts.len()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn learn_creates_and_updates_manifest_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("manifest.json");
        let cfg = RpfConfig::default();
        let resources = vec!["http://cdn.com/app.js".to_string()];

        run_learn(&cfg, &path, "http://site.com/", &resources).unwrap();
        run_learn(&cfg, &path, "http://site.com/", &resources).unwrap();

        let manifest = manifest::load_manifest(&path).unwrap();
        assert_eq!(manifest.urls["http://site.com/"].resources[0].hits, 2);
        assert_eq!(manifest.hosts["site.com"].resources[0].hits, 2);
    }

    #[test]
    fn learn_rejects_bad_resource_url_without_writing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("manifest.json");
        let err = run_learn(&RpfConfig::default(), &path, "http://site.com/", &["nope".into()])
            .unwrap_err();
        assert!(err.to_string().contains("nope"));
        assert!(!path.exists());
    }
}
