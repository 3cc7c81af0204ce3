use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Problems found when validating a loaded configuration.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ConfigError {
    #[error("{field} must be at least 1")]
    ZeroCap { field: &'static str },
    #[error("min_resource_confidence must be within [0, 1], got {0}")]
    ConfidenceOutOfRange(f64),
}

/// Curl transport parameters (optional section in config.toml).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurlConfig {
    /// Connect timeout in seconds.
    pub connect_timeout_secs: u64,
    /// Hard timeout for a whole prefetch in seconds.
    pub timeout_secs: u64,
    /// Optional User-Agent header sent with every prefetch.
    #[serde(default)]
    pub user_agent: Option<String>,
}

impl Default for CurlConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 30,
            timeout_secs: 60,
            user_agent: None,
        }
    }
}

/// Limits applied when learning resources from observed page loads
/// (optional `[learning]` section in config.toml).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LearnConfig {
    /// Page URLs kept in the manifest; the least recently visited is evicted.
    pub max_urls_to_track: usize,
    /// Page hosts kept in the manifest.
    pub max_hosts_to_track: usize,
    /// Resources kept per page after sorting by score.
    pub max_resources_per_entry: usize,
    /// A resource missed this many loads in a row is forgotten.
    pub max_consecutive_misses: u32,
}

impl Default for LearnConfig {
    fn default() -> Self {
        Self {
            max_urls_to_track: 500,
            max_hosts_to_track: 200,
            max_resources_per_entry: 50,
            max_consecutive_misses: 3,
        }
    }
}

/// Admission caps handed to a single prefetch coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrefetchConfig {
    /// Maximum in-flight sessions for one navigation.
    pub max_global_in_flight: usize,
    /// Maximum in-flight sessions for one host within one navigation.
    pub max_per_host_in_flight: usize,
}

impl Default for PrefetchConfig {
    fn default() -> Self {
        Self {
            max_global_in_flight: 5,
            max_per_host_in_flight: 3,
        }
    }
}

/// Global configuration loaded from `~/.config/rpf/config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpfConfig {
    /// Maximum concurrent prefetches per navigation.
    pub max_global_in_flight: usize,
    /// Maximum concurrent prefetches per host per navigation.
    pub max_per_host_in_flight: usize,
    /// Minimum hits / (hits + misses) for a resource to be prefetched.
    pub min_resource_confidence: f64,
    /// Minimum number of hits for a resource to be prefetched.
    pub min_resource_hits: u32,
    /// Optional curl settings; if missing, built-in defaults are used.
    #[serde(default)]
    pub curl: Option<CurlConfig>,
    /// Optional learning limits; if missing, built-in defaults are used.
    #[serde(default)]
    pub learning: Option<LearnConfig>,
}

impl Default for RpfConfig {
    fn default() -> Self {
        let caps = PrefetchConfig::default();
        Self {
            max_global_in_flight: caps.max_global_in_flight,
            max_per_host_in_flight: caps.max_per_host_in_flight,
            min_resource_confidence: 0.8,
            min_resource_hits: 3,
            curl: None,
            learning: None,
        }
    }
}

impl RpfConfig {
    /// Reject zero caps and out-of-range thresholds.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_global_in_flight == 0 {
            return Err(ConfigError::ZeroCap {
                field: "max_global_in_flight",
            });
        }
        if self.max_per_host_in_flight == 0 {
            return Err(ConfigError::ZeroCap {
                field: "max_per_host_in_flight",
            });
        }
        let learn = self.learning_or_default();
        for (field, value) in [
            ("learning.max_urls_to_track", learn.max_urls_to_track),
            ("learning.max_hosts_to_track", learn.max_hosts_to_track),
            ("learning.max_resources_per_entry", learn.max_resources_per_entry),
            ("learning.max_consecutive_misses", learn.max_consecutive_misses as usize),
        ] {
            if value == 0 {
                return Err(ConfigError::ZeroCap { field });
            }
        }
        if !(0.0..=1.0).contains(&self.min_resource_confidence) {
            return Err(ConfigError::ConfidenceOutOfRange(
                self.min_resource_confidence,
            ));
        }
        Ok(())
    }

    pub fn prefetch(&self) -> PrefetchConfig {
        PrefetchConfig {
            max_global_in_flight: self.max_global_in_flight,
            max_per_host_in_flight: self.max_per_host_in_flight,
        }
    }

    pub fn curl_or_default(&self) -> CurlConfig {
        self.curl.clone().unwrap_or_default()
    }

    pub fn learning_or_default(&self) -> LearnConfig {
        self.learning.unwrap_or_default()
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("rpf")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Parse and validate a config file at `path`.
pub fn load_from(path: &Path) -> Result<RpfConfig> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    let cfg: RpfConfig =
        toml::from_str(&data).with_context(|| format!("parsing config {}", path.display()))?;
    cfg.validate()
        .with_context(|| format!("invalid config {}", path.display()))?;
    Ok(cfg)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<RpfConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = RpfConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }
    load_from(&path)
}
