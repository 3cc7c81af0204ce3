//! Prefetch targets and per-request status.

use std::fmt;

/// Why a string could not become a prefetch target.
#[derive(Debug, thiserror::Error)]
pub enum TargetError {
    #[error("invalid prefetch URL {url}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("prefetch URL has no host: {0}")]
    MissingHost(String),
}

/// One resource to prefetch: the URL plus the host used for per-host admission.
///
/// Immutable once built; the host is taken from the parsed URL so different
/// paths on the same host share a per-host slot count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrefetchTarget {
    url: url::Url,
    host: String,
}

impl PrefetchTarget {
    /// Parse a URL string into a target.
    pub fn parse(url: &str) -> Result<Self, TargetError> {
        let parsed = url::Url::parse(url).map_err(|source| TargetError::InvalidUrl {
            url: url.to_string(),
            source,
        })?;
        Self::from_url(parsed)
    }

    pub fn from_url(url: url::Url) -> Result<Self, TargetError> {
        let host = url
            .host_str()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| TargetError::MissingHost(url.to_string()))?
            .to_string();
        Ok(Self { url, host })
    }

    pub fn url(&self) -> &url::Url {
        &self.url
    }

    pub fn host(&self) -> &str {
        &self.host
    }
}

impl fmt::Display for PrefetchTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.url)
    }
}

/// Lifecycle of a single prefetch request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrefetchStatus {
    /// Never admitted (still queued, or dropped by `stop()`).
    NotStarted,
    /// Admitted; a fetch session is running.
    Started,
    Redirected,
    AuthRequired,
    CertRequired,
    CertError,
    Failed,
    /// Body fully read; the response came from a cache.
    FromCache,
    /// Body fully read; the response came from the network.
    FromNetwork,
}

impl PrefetchStatus {
    /// True for the two outcomes where the body was fully read.
    pub fn is_success(self) -> bool {
        matches!(self, PrefetchStatus::FromCache | PrefetchStatus::FromNetwork)
    }

    /// True once a session has reported its outcome.
    pub fn is_terminal(self) -> bool {
        !matches!(self, PrefetchStatus::NotStarted | PrefetchStatus::Started)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PrefetchStatus::NotStarted => "not-started",
            PrefetchStatus::Started => "started",
            PrefetchStatus::Redirected => "redirected",
            PrefetchStatus::AuthRequired => "auth-required",
            PrefetchStatus::CertRequired => "cert-required",
            PrefetchStatus::CertError => "cert-error",
            PrefetchStatus::Failed => "failed",
            PrefetchStatus::FromCache => "from-cache",
            PrefetchStatus::FromNetwork => "from-network",
        }
    }
}

impl fmt::Display for PrefetchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// A target together with what happened to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrefetchRequest {
    pub target: PrefetchTarget,
    pub status: PrefetchStatus,
}

impl PrefetchRequest {
    pub fn new(target: PrefetchTarget) -> Self {
        Self {
            target,
            status: PrefetchStatus::NotStarted,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_extracts_lowercased_host() {
        let t = PrefetchTarget::parse("https://CDN.Example.com:8443/app.js").unwrap();
        assert_eq!(t.host(), "cdn.example.com");
        assert_eq!(t.url().path(), "/app.js");
    }

    #[test]
    fn parse_rejects_garbage_and_hostless_urls() {
        assert!(matches!(
            PrefetchTarget::parse("not a url"),
            Err(TargetError::InvalidUrl { .. })
        ));
        assert!(matches!(
            PrefetchTarget::parse("data:text/plain,hello"),
            Err(TargetError::MissingHost(_))
        ));
    }

    #[test]
    fn status_classification() {
        assert!(PrefetchStatus::FromNetwork.is_success());
        assert!(PrefetchStatus::FromCache.is_success());
        assert!(!PrefetchStatus::Redirected.is_success());
        assert!(PrefetchStatus::Failed.is_terminal());
        assert!(!PrefetchStatus::Started.is_terminal());
        assert!(!PrefetchStatus::NotStarted.is_terminal());
        assert_eq!(PrefetchStatus::CertError.to_string(), "cert-error");
    }
}
