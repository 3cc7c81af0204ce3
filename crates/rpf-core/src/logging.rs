//! Tracing setup for the `rpf` binary.
//!
//! Events go to `$XDG_STATE_HOME/rpf/rpf.log` when that file can be opened,
//! otherwise to stderr. `RPF_LOG` (or `RUST_LOG`) overrides the filter.

use anyhow::{Context, Result};
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "info,rpf=debug,rpf_core=debug";
const FILTER_ENV: &str = "RPF_LOG";

/// Where log events are written.
#[derive(Debug)]
pub enum LogSink {
    File(PathBuf),
    Stderr,
}

/// Path of the log file: `~/.local/state/rpf/rpf.log`.
pub fn log_file_path() -> Result<PathBuf> {
    let dirs = xdg::BaseDirectories::with_prefix("rpf")?;
    Ok(dirs.get_state_home().join("rpf.log"))
}

fn filter_directives() -> String {
    std::env::var(FILTER_ENV)
        .or_else(|_| std::env::var(EnvFilter::DEFAULT_ENV))
        .unwrap_or_else(|_| DEFAULT_FILTER.to_string())
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_new(filter_directives()).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

fn open_log(path: &Path) -> Result<File> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("opening {}", path.display()))
}

/// Install the global subscriber for `sink`.
pub fn init(sink: LogSink) -> Result<()> {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_ansi(false);
    match sink {
        LogSink::File(path) => {
            let file = open_log(&path)?;
            builder
                .with_writer(Mutex::new(file))
                .try_init()
                .map_err(|e| anyhow::anyhow!("tracing subscriber: {e}"))?;
            tracing::info!("rpf logging to {}", path.display());
        }
        LogSink::Stderr => builder
            .with_writer(std::io::stderr)
            .try_init()
            .map_err(|e| anyhow::anyhow!("tracing subscriber: {e}"))?,
    }
    Ok(())
}

/// Log to the XDG state file. On error nothing is installed, so the caller
/// can fall back to [`init_logging_stderr`].
pub fn init_logging() -> Result<()> {
    init(LogSink::File(log_file_path()?))
}

/// Log to stderr. Failure is reported on stderr and otherwise ignored.
pub fn init_logging_stderr() {
    if let Err(e) = init(LogSink::Stderr) {
        eprintln!("rpf: stderr logging unavailable: {e:#}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_filter_parses() {
        assert!(EnvFilter::try_new(DEFAULT_FILTER).is_ok());
    }

    #[test]
    fn open_log_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state").join("rpf").join("rpf.log");
        open_log(&path).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn second_install_errors_and_stderr_fallback_survives_it() {
        let _ = init(LogSink::Stderr);
        let err = init(LogSink::Stderr).unwrap_err();
        assert!(err.to_string().contains("tracing subscriber"));
        init_logging_stderr();
    }

    #[test]
    fn log_file_lives_under_rpf_dir() {
        if let Ok(path) = log_file_path() {
            assert!(path.ends_with("rpf/rpf.log"));
        }
    }
}
