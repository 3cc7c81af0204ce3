//! Learned resources per page, stored as JSON.
//!
//! The manifest keeps two tables: one keyed by main-frame URL and one keyed by
//! main-frame host. Lookups prefer the URL table and fall back to the host
//! table when the URL entry yields nothing worth prefetching.
//!
//! ```json
//! {
//!   "urls":  { "http://site.com/": { "last_visit": 1700000000, "resources": [..] } },
//!   "hosts": { "site.com":         { "last_visit": 1700000000, "resources": [..] } }
//! }
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::manager::{NavigationKey, PrefetchKeyType};
use crate::selection::{self, ResourceStat, SelectionConfig};
use crate::target::PrefetchTarget;

/// Errors loading or saving a resource manifest.
#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("reading manifest {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("parsing manifest {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("writing manifest {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("encoding manifest: {0}")]
    Encode(#[source] serde_json::Error),
}

/// Resources learned for one page URL or host.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageResources {
    /// Unix seconds of the last learned visit; oldest entries are evicted first.
    #[serde(default)]
    pub last_visit: u64,
    #[serde(default)]
    pub resources: Vec<ResourceStat>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceManifest {
    #[serde(default)]
    pub urls: BTreeMap<String, PageResources>,
    #[serde(default)]
    pub hosts: BTreeMap<String, PageResources>,
}

impl ResourceManifest {
    pub fn parse(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn table(&self, key_type: PrefetchKeyType) -> &BTreeMap<String, PageResources> {
        match key_type {
            PrefetchKeyType::Url => &self.urls,
            PrefetchKeyType::Host => &self.hosts,
        }
    }

    pub fn table_mut(
        &mut self,
        key_type: PrefetchKeyType,
    ) -> &mut BTreeMap<String, PageResources> {
        match key_type {
            PrefetchKeyType::Url => &mut self.urls,
            PrefetchKeyType::Host => &mut self.hosts,
        }
    }

    /// Entry learned for `page` under `key_type`, if any.
    pub fn entry(&self, page: &url::Url, key_type: PrefetchKeyType) -> Option<&PageResources> {
        let key = NavigationKey::for_page(page, key_type);
        self.table(key_type).get(&key.key)
    }

    /// Targets to prefetch for `page`: the URL entry's selection if it is
    /// non-empty, otherwise the host entry's. `None` when neither yields any.
    pub fn targets_for_navigation(
        &self,
        page: &url::Url,
        cfg: &SelectionConfig,
    ) -> Option<(PrefetchKeyType, Vec<PrefetchTarget>)> {
        [PrefetchKeyType::Url, PrefetchKeyType::Host]
            .into_iter()
            .find_map(|key_type| {
                let entry = self.entry(page, key_type)?;
                let targets = selection::select_targets(&entry.resources, cfg);
                (!targets.is_empty()).then_some((key_type, targets))
            })
    }
}

/// Load a manifest from `path`.
pub fn load_manifest(path: &Path) -> Result<ResourceManifest, ManifestError> {
    let display = path.display().to_string();
    let data = fs::read_to_string(path).map_err(|source| ManifestError::Io {
        path: display.clone(),
        source,
    })?;
    ResourceManifest::parse(&data).map_err(|source| ManifestError::Parse {
        path: display,
        source,
    })
}

/// Like [`load_manifest`], but a missing file is an empty manifest.
pub fn load_manifest_or_default(path: &Path) -> Result<ResourceManifest, ManifestError> {
    match load_manifest(path) {
        Err(ManifestError::Io { source, .. }) if source.kind() == io::ErrorKind::NotFound => {
            Ok(ResourceManifest::default())
        }
        other => other,
    }
}

/// Write `manifest` to `path` as pretty JSON, creating parent directories.
pub fn save_manifest(path: &Path, manifest: &ResourceManifest) -> Result<(), ManifestError> {
    let write_err = |source| ManifestError::Write {
        path: path.display().to_string(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(write_err)?;
    }
    let json = serde_json::to_string_pretty(manifest).map_err(ManifestError::Encode)?;
    fs::write(path, json).map_err(write_err)
}
