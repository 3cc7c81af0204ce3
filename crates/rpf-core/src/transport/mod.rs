//! Curl multi transport: every admitted prefetch becomes one Easy2 handle on a
//! single `curl::multi` handle, driven from the thread that owns the manager.

mod handler;

use anyhow::Result;
use std::collections::HashMap;
use std::time::Duration;

use crate::config::CurlConfig;
use crate::manager::{NavigationKey, PrefetchManager, SessionFactory};
use crate::session::SessionId;
use crate::target::{PrefetchStatus, PrefetchTarget};

pub use handler::PrefetchHandler;

const WAIT_MS: u64 = 100;

/// Curl settings applied to every prefetch handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurlOptions {
    pub connect_timeout: Duration,
    pub timeout: Duration,
    pub user_agent: Option<String>,
}

impl Default for CurlOptions {
    fn default() -> Self {
        Self::from(&CurlConfig::default())
    }
}

impl From<&CurlConfig> for CurlOptions {
    fn from(cfg: &CurlConfig) -> Self {
        Self {
            connect_timeout: Duration::from_secs(cfg.connect_timeout_secs),
            timeout: Duration::from_secs(cfg.timeout_secs),
            user_agent: cfg.user_agent.clone(),
        }
    }
}

/// Transport handle owned by the coordinator while a prefetch runs.
pub enum CurlSession {
    Active(curl::multi::Easy2Handle<PrefetchHandler>),
    /// The handle could not be added; completes as `Failed` on the next turn.
    Rejected,
}

impl std::fmt::Debug for CurlSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CurlSession::Active(_) => f.write_str("CurlSession::Active"),
            CurlSession::Rejected => f.write_str("CurlSession::Rejected"),
        }
    }
}

/// Owns the multi handle and the token -> session routing table.
pub struct CurlTransport {
    multi: curl::multi::Multi,
    options: CurlOptions,
    routes: HashMap<usize, (NavigationKey, SessionId)>,
    rejected: Vec<(NavigationKey, SessionId)>,
    next_token: usize,
}

impl CurlTransport {
    pub fn new(options: CurlOptions) -> Self {
        Self {
            multi: curl::multi::Multi::new(),
            options,
            routes: HashMap::new(),
            rejected: Vec::new(),
            next_token: 0,
        }
    }

    /// Number of transfers currently attached to the multi handle.
    pub fn active_transfers(&self) -> usize {
        self.routes.len()
    }

    fn build_easy(&self, target: &PrefetchTarget) -> Result<curl::easy::Easy2<PrefetchHandler>> {
        let mut easy = curl::easy::Easy2::new(PrefetchHandler::new());
        easy.url(target.url().as_str())
            .map_err(|e| anyhow::anyhow!("curl url: {}", e))?;
        easy.get(true).map_err(|e| anyhow::anyhow!("curl: {}", e))?;
        easy.follow_location(false)
            .map_err(|e| anyhow::anyhow!("curl: {}", e))?;
        easy.connect_timeout(self.options.connect_timeout)
            .map_err(|e| anyhow::anyhow!("curl: {}", e))?;
        easy.timeout(self.options.timeout)
            .map_err(|e| anyhow::anyhow!("curl: {}", e))?;
        if let Some(ref ua) = self.options.user_agent {
            easy.useragent(ua)
                .map_err(|e| anyhow::anyhow!("curl: {}", e))?;
        }
        Ok(easy)
    }

    fn add(
        &mut self,
        target: &PrefetchTarget,
        token: usize,
    ) -> Result<curl::multi::Easy2Handle<PrefetchHandler>> {
        let easy = self.build_easy(target)?;
        let mut handle = self
            .multi
            .add2(easy)
            .map_err(|e| anyhow::anyhow!("curl multi add: {}", e))?;
        handle
            .set_token(token)
            .map_err(|e| anyhow::anyhow!("curl multi token: {}", e))?;
        Ok(handle)
    }

    /// Drive transfers until every prefetch in `manager` has finished.
    ///
    /// Finished results stay in the manager for `take_finished`.
    pub fn run_until_idle(&mut self, manager: &mut PrefetchManager<CurlSession>) -> Result<()> {
        loop {
            self.retire_rejected(manager);
            if manager.is_idle() {
                return Ok(());
            }

            let running = self
                .multi
                .perform()
                .map_err(|e| anyhow::anyhow!("curl multi perform: {}", e))?;

            let mut done: Vec<(usize, Result<(), curl::Error>)> = Vec::new();
            self.multi.messages(|msg| {
                if let (Ok(token), Some(result)) = (msg.token(), msg.result()) {
                    done.push((token, result));
                }
            });
            let progressed = !done.is_empty();
            for (token, result) in done {
                self.complete(token, result, manager)?;
            }

            if progressed || !self.rejected.is_empty() {
                continue;
            }
            if running == 0 && self.routes.is_empty() {
                anyhow::bail!(
                    "no active transfers but {} prefetch(es) still live",
                    manager.live_count()
                );
            }
            self.multi
                .wait(&mut [], Duration::from_millis(WAIT_MS))
                .map_err(|e| anyhow::anyhow!("curl multi wait: {}", e))?;
        }
    }

    fn complete(
        &mut self,
        token: usize,
        result: Result<(), curl::Error>,
        manager: &mut PrefetchManager<CurlSession>,
    ) -> Result<()> {
        let Some((key, id)) = self.routes.remove(&token) else {
            tracing::warn!(token, "curl message for unknown transfer");
            return Ok(());
        };
        let status = match manager.session_mut(&key, id) {
            Some(CurlSession::Active(handle)) => {
                handle.get_mut().finish(result.as_ref().map(|_| ()))
            }
            _ => PrefetchStatus::Failed,
        };
        if let Err(ref e) = result {
            tracing::debug!(%key, session = %id, %status, "prefetch transfer ended: {}", e);
        }
        if let Some(CurlSession::Active(handle)) =
            manager.on_session_complete(&key, id, status, self)
        {
            let easy = self
                .multi
                .remove2(handle)
                .map_err(|e| anyhow::anyhow!("curl multi remove: {}", e))?;
            tracing::debug!(
                %key,
                session = %id,
                bytes = easy.get_ref().bytes_read(),
                "prefetch transfer released"
            );
        }
        Ok(())
    }

    fn retire_rejected(&mut self, manager: &mut PrefetchManager<CurlSession>) {
        while let Some((key, id)) = self.rejected.pop() {
            manager.on_session_complete(&key, id, PrefetchStatus::Failed, self);
        }
    }
}

impl SessionFactory for CurlTransport {
    type Session = CurlSession;

    fn create_fetch_session(
        &mut self,
        key: &NavigationKey,
        id: SessionId,
        target: &PrefetchTarget,
    ) -> CurlSession {
        let token = self.next_token;
        self.next_token += 1;
        match self.add(target, token) {
            Ok(handle) => {
                self.routes.insert(token, (key.clone(), id));
                CurlSession::Active(handle)
            }
            Err(e) => {
                tracing::warn!(
                    %key,
                    session = %id,
                    url = %target,
                    "cannot start prefetch: {:#}",
                    e
                );
                self.rejected.push((key.clone(), id));
                CurlSession::Rejected
            }
        }
    }
}
