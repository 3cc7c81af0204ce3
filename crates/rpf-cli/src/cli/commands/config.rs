//! `rpf config` – show config path and effective values.

use anyhow::Result;
use rpf_core::config::{self, RpfConfig};

pub fn run_config(cfg: &RpfConfig) -> Result<()> {
    println!("Config file: {}", config::config_path()?.display());
    let curl = cfg.curl_or_default();
    println!("max_global_in_flight    = {}", cfg.max_global_in_flight);
    println!("max_per_host_in_flight  = {}", cfg.max_per_host_in_flight);
    println!("min_resource_confidence = {}", cfg.min_resource_confidence);
    println!("min_resource_hits       = {}", cfg.min_resource_hits);
    println!("curl.connect_timeout    = {}s", curl.connect_timeout_secs);
    println!("curl.timeout            = {}s", curl.timeout_secs);
    if let Some(ua) = curl.user_agent {
        println!("curl.user_agent         = {}", ua);
    }
    let learn = cfg.learning_or_default();
    println!("learning.max_urls_to_track       = {}", learn.max_urls_to_track);
    println!("learning.max_hosts_to_track      = {}", learn.max_hosts_to_track);
    println!("learning.max_resources_per_entry = {}", learn.max_resources_per_entry);
    println!("learning.max_consecutive_misses  = {}", learn.max_consecutive_misses);
    Ok(())
}
