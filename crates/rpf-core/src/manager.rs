//! Per-navigation prefetch registry.
//!
//! One coordinator runs per navigation key (the main-frame URL or its host).
//! A second request for a key that is already prefetching is ignored. When
//! the navigation's own main-frame response arrives the prefetch is stopped,
//! and once a coordinator finishes its result is parked for the caller to
//! collect with [`PrefetchManager::take_finished`].

use std::collections::HashMap;
use std::fmt;

use crate::config::PrefetchConfig;
use crate::coordinator::{CoordinatorState, PrefetchCoordinator, PrefetchDelegate};
use crate::session::SessionId;
use crate::target::{PrefetchRequest, PrefetchStatus, PrefetchTarget};

/// A main-frame navigation in a tab.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NavigationId {
    pub tab_id: u32,
    pub main_frame_url: url::Url,
}

impl NavigationId {
    pub fn new(tab_id: u32, main_frame_url: url::Url) -> Self {
        Self {
            tab_id,
            main_frame_url,
        }
    }
}

/// Whether prefetch data was learned per page URL or per page host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrefetchKeyType {
    Url,
    Host,
}

impl PrefetchKeyType {
    pub fn as_str(self) -> &'static str {
        match self {
            PrefetchKeyType::Url => "url",
            PrefetchKeyType::Host => "host",
        }
    }
}

impl fmt::Display for PrefetchKeyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Key a live prefetch is registered under.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NavigationKey {
    pub key_type: PrefetchKeyType,
    pub key: String,
}

impl NavigationKey {
    /// Main-frame URL spec for `Url`, main-frame host for `Host`.
    pub fn for_page(page: &url::Url, key_type: PrefetchKeyType) -> Self {
        let key = match key_type {
            PrefetchKeyType::Url => page.as_str().to_string(),
            PrefetchKeyType::Host => page.host_str().unwrap_or_default().to_string(),
        };
        Self { key_type, key }
    }

    pub fn for_navigation(navigation: &NavigationId, key_type: PrefetchKeyType) -> Self {
        Self::for_page(&navigation.main_frame_url, key_type)
    }
}

impl fmt::Display for NavigationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.key_type, self.key)
    }
}

/// Starts fetches on behalf of any coordinator the manager owns.
pub trait SessionFactory {
    type Session;

    fn create_fetch_session(
        &mut self,
        key: &NavigationKey,
        id: SessionId,
        target: &PrefetchTarget,
    ) -> Self::Session;
}

/// Outcome of one navigation's prefetching.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrefetchResult {
    pub navigation: NavigationId,
    pub key_type: PrefetchKeyType,
    pub requests: Vec<PrefetchRequest>,
}

impl PrefetchResult {
    pub fn count(&self, status: PrefetchStatus) -> usize {
        self.requests.iter().filter(|r| r.status == status).count()
    }
}

#[derive(Debug)]
struct LivePrefetch<S> {
    navigation: NavigationId,
    key_type: PrefetchKeyType,
    coordinator: PrefetchCoordinator<S>,
}

/// Adapts a shared factory into one coordinator's delegate.
struct Routed<'a, F> {
    factory: &'a mut F,
    key: &'a NavigationKey,
    finished: Option<Vec<PrefetchRequest>>,
}

impl<F: SessionFactory> PrefetchDelegate for Routed<'_, F> {
    type Session = F::Session;

    fn create_fetch_session(&mut self, id: SessionId, target: &PrefetchTarget) -> F::Session {
        self.factory.create_fetch_session(self.key, id, target)
    }

    fn on_finished(&mut self, requests: &[PrefetchRequest]) {
        self.finished = Some(requests.to_vec());
    }
}

/// Owns every live coordinator and routes session completions to them.
#[derive(Debug)]
pub struct PrefetchManager<S> {
    config: PrefetchConfig,
    live: HashMap<NavigationKey, LivePrefetch<S>>,
    finished: Vec<PrefetchResult>,
}

impl<S> PrefetchManager<S> {
    pub fn new(config: PrefetchConfig) -> Self {
        Self {
            config,
            live: HashMap::new(),
            finished: Vec::new(),
        }
    }

    /// Start prefetching `targets` for `navigation` unless a prefetch for the
    /// same key is already live. Returns whether a new prefetch was started.
    pub fn maybe_add_prefetch<F>(
        &mut self,
        navigation: NavigationId,
        key_type: PrefetchKeyType,
        targets: Vec<PrefetchTarget>,
        factory: &mut F,
    ) -> bool
    where
        F: SessionFactory<Session = S>,
    {
        let key = NavigationKey::for_navigation(&navigation, key_type);
        if self.live.contains_key(&key) {
            tracing::debug!(%key, "prefetch already running for key");
            return false;
        }
        tracing::info!(%key, targets = targets.len(), "starting prefetch");
        let mut coordinator = PrefetchCoordinator::new(targets, self.config);
        let mut delegate = Routed {
            factory,
            key: &key,
            finished: None,
        };
        coordinator.start(&mut delegate);
        let finished = delegate.finished.take();
        let live = LivePrefetch {
            navigation,
            key_type,
            coordinator,
        };
        match finished {
            Some(requests) => self.retire(live, requests),
            None => {
                self.live.insert(key, live);
            }
        }
        true
    }

    /// Stop every live prefetch started for `navigation`.
    pub fn maybe_remove_prefetch(&mut self, navigation: &NavigationId) {
        for (key, live) in self.live.iter_mut() {
            if &live.navigation == navigation {
                tracing::debug!(%key, "stopping prefetch for navigation");
                live.coordinator.stop();
            }
        }
    }

    /// Route a session completion to its coordinator. Returns the session
    /// handle, or `None` if the key or session is unknown.
    pub fn on_session_complete<F>(
        &mut self,
        key: &NavigationKey,
        id: SessionId,
        status: PrefetchStatus,
        factory: &mut F,
    ) -> Option<S>
    where
        F: SessionFactory<Session = S>,
    {
        let Some(live) = self.live.get_mut(key) else {
            tracing::warn!(%key, session = %id, "completion for unknown prefetch");
            return None;
        };
        let mut delegate = Routed {
            factory,
            key,
            finished: None,
        };
        let session = live.coordinator.on_session_complete(id, status, &mut delegate);
        if let Some(requests) = delegate.finished.take() {
            if let Some(live) = self.live.remove(key) {
                self.retire(live, requests);
            }
        }
        session
    }

    fn retire(&mut self, live: LivePrefetch<S>, requests: Vec<PrefetchRequest>) {
        debug_assert_eq!(live.coordinator.state(), CoordinatorState::Finished);
        self.finished.push(PrefetchResult {
            navigation: live.navigation,
            key_type: live.key_type,
            requests,
        });
    }

    /// Stop all live prefetches; they finish once their sessions drain.
    pub fn stop_all(&mut self) {
        for live in self.live.values_mut() {
            live.coordinator.stop();
        }
    }

    pub fn take_finished(&mut self) -> Vec<PrefetchResult> {
        std::mem::take(&mut self.finished)
    }

    pub fn is_idle(&self) -> bool {
        self.live.is_empty()
    }

    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    pub fn coordinator(&self, key: &NavigationKey) -> Option<&PrefetchCoordinator<S>> {
        self.live.get(key).map(|l| &l.coordinator)
    }

    pub fn session_mut(&mut self, key: &NavigationKey, id: SessionId) -> Option<&mut S> {
        self.live
            .get_mut(key)
            .and_then(|l| l.coordinator.session_mut(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Factory double: records (key, session) pairs; the handle is the URL.
    #[derive(Default)]
    struct RecordingFactory {
        started: Vec<(NavigationKey, SessionId, String)>,
    }

    impl SessionFactory for RecordingFactory {
        type Session = String;

        fn create_fetch_session(
            &mut self,
            key: &NavigationKey,
            id: SessionId,
            target: &PrefetchTarget,
        ) -> String {
            self.started
                .push((key.clone(), id, target.url().to_string()));
            target.url().to_string()
        }
    }

    fn nav(tab: u32, url: &str) -> NavigationId {
        NavigationId::new(tab, url::Url::parse(url).unwrap())
    }

    fn targets(urls: &[&str]) -> Vec<PrefetchTarget> {
        urls.iter()
            .map(|u| PrefetchTarget::parse(u).unwrap())
            .collect()
    }

    fn caps(global: usize, per_host: usize) -> PrefetchConfig {
        PrefetchConfig {
            max_global_in_flight: global,
            max_per_host_in_flight: per_host,
        }
    }

    #[test]
    fn key_for_url_and_host() {
        let n = nav(1, "http://www.example.com/page?q=1");
        assert_eq!(
            NavigationKey::for_navigation(&n, PrefetchKeyType::Url).key,
            "http://www.example.com/page?q=1"
        );
        let host = NavigationKey::for_navigation(&n, PrefetchKeyType::Host);
        assert_eq!(host.key, "www.example.com");
        assert_eq!(host.to_string(), "host:www.example.com");
    }

    #[test]
    fn duplicate_key_is_ignored() {
        let mut factory = RecordingFactory::default();
        let mut m = PrefetchManager::new(caps(5, 3));
        assert!(m.maybe_add_prefetch(
            nav(1, "http://site.com/a"),
            PrefetchKeyType::Host,
            targets(&["http://cdn.com/1"]),
            &mut factory,
        ));
        assert!(!m.maybe_add_prefetch(
            nav(2, "http://site.com/b"),
            PrefetchKeyType::Host,
            targets(&["http://cdn.com/2"]),
            &mut factory,
        ));
        assert_eq!(m.live_count(), 1);
        assert_eq!(factory.started.len(), 1);
    }

    #[test]
    fn empty_prefetch_finishes_immediately() {
        let mut factory = RecordingFactory::default();
        let mut m: PrefetchManager<String> = PrefetchManager::new(caps(5, 3));
        assert!(m.maybe_add_prefetch(
            nav(1, "http://site.com/"),
            PrefetchKeyType::Url,
            Vec::new(),
            &mut factory,
        ));
        assert!(m.is_idle());
        let done = m.take_finished();
        assert_eq!(done.len(), 1);
        assert!(done[0].requests.is_empty());
        assert!(m.take_finished().is_empty());
    }

    #[test]
    fn completions_route_to_owning_coordinator() {
        let mut factory = RecordingFactory::default();
        let mut m = PrefetchManager::new(caps(1, 1));
        m.maybe_add_prefetch(
            nav(1, "http://one.com/"),
            PrefetchKeyType::Host,
            targets(&["http://cdn.com/a", "http://cdn.com/b"]),
            &mut factory,
        );
        m.maybe_add_prefetch(
            nav(2, "http://two.com/"),
            PrefetchKeyType::Host,
            targets(&["http://cdn.com/c"]),
            &mut factory,
        );
        assert_eq!(factory.started.len(), 2);

        let (key_two, id_two, _) = factory.started[1].clone();
        let handle =
            m.on_session_complete(&key_two, id_two, PrefetchStatus::FromNetwork, &mut factory);
        assert_eq!(handle.as_deref(), Some("http://cdn.com/c"));
        let done = m.take_finished();
        assert_eq!(done.len(), 1);
        assert_eq!(done[0].navigation.tab_id, 2);
        assert_eq!(done[0].count(PrefetchStatus::FromNetwork), 1);

        let (key_one, id_a, _) = factory.started[0].clone();
        m.on_session_complete(&key_one, id_a, PrefetchStatus::Redirected, &mut factory);
        assert_eq!(factory.started.len(), 3, "second target of navigation one admitted");
        let (_, id_b, url_b) = factory.started[2].clone();
        assert_eq!(url_b, "http://cdn.com/b");
        m.on_session_complete(&key_one, id_b, PrefetchStatus::FromNetwork, &mut factory);

        assert!(m.is_idle());
        let done = m.take_finished();
        assert_eq!(done[0].count(PrefetchStatus::Redirected), 1);
        assert_eq!(done[0].count(PrefetchStatus::FromNetwork), 1);
    }

    #[test]
    fn remove_prefetch_stops_only_matching_navigation() {
        let mut factory = RecordingFactory::default();
        let mut m = PrefetchManager::new(caps(1, 1));
        let first = nav(1, "http://one.com/");
        m.maybe_add_prefetch(
            first.clone(),
            PrefetchKeyType::Url,
            targets(&["http://cdn.com/a", "http://cdn.com/b"]),
            &mut factory,
        );
        m.maybe_add_prefetch(
            nav(2, "http://two.com/"),
            PrefetchKeyType::Url,
            targets(&["http://cdn.com/c", "http://cdn.com/d"]),
            &mut factory,
        );

        m.maybe_remove_prefetch(&first);
        let key_one = NavigationKey::for_navigation(&first, PrefetchKeyType::Url);
        assert_eq!(
            m.coordinator(&key_one).map(|c| c.state()),
            Some(CoordinatorState::Stopped)
        );

        let (_, id_a, _) = factory.started[0].clone();
        m.on_session_complete(&key_one, id_a, PrefetchStatus::FromNetwork, &mut factory);
        let done = m.take_finished();
        assert_eq!(done.len(), 1);
        assert_eq!(done[0].count(PrefetchStatus::NotStarted), 1);
        assert_eq!(m.live_count(), 1, "other navigation still running");
        assert_eq!(factory.started.len(), 2);
    }

    #[test]
    fn stop_all_then_drain_leaves_manager_idle() {
        let mut factory = RecordingFactory::default();
        let mut m = PrefetchManager::new(caps(1, 1));
        m.maybe_add_prefetch(
            nav(1, "http://one.com/"),
            PrefetchKeyType::Url,
            targets(&["http://cdn.com/a", "http://cdn.com/b"]),
            &mut factory,
        );
        m.stop_all();
        let (key, id, _) = factory.started[0].clone();
        if let Some(handle) = m.session_mut(&key, id) {
            handle.push_str("?seen");
        }
        let handle = m.on_session_complete(&key, id, PrefetchStatus::Failed, &mut factory);
        assert_eq!(handle.as_deref(), Some("http://cdn.com/a?seen"));
        assert!(m.is_idle());
        assert!(m
            .on_session_complete(&key, id, PrefetchStatus::Failed, &mut factory)
            .is_none());
    }
}
