//! Prefetch coordinator: queue, admission and in-flight sessions for one navigation.
//!
//! The coordinator is driven from a single thread. It never blocks: it admits
//! as many targets as the caps allow, then waits for the transport to report
//! completions through [`PrefetchCoordinator::on_session_complete`]. Once the
//! queue and the in-flight set are both empty (or the coordinator was stopped
//! and the in-flight set drained) it moves to `Finished` and tells the
//! delegate exactly once.

mod state;

use std::collections::HashMap;

use crate::admission::{try_admit_one, HostCounters};
use crate::config::PrefetchConfig;
use crate::queue::RequestQueue;
use crate::session::SessionId;
use crate::target::{PrefetchRequest, PrefetchStatus, PrefetchTarget};

pub use state::CoordinatorState;

/// Collaborator that starts real fetches and hears about the end of prefetching.
///
/// `Session` is whatever handle the transport needs to keep alive while a
/// fetch runs; the coordinator owns it until the session completes.
pub trait PrefetchDelegate {
    type Session;

    /// Start fetching `target`. Completion must later be reported with
    /// `on_session_complete(id, ..)` on the coordinator's thread, never from
    /// inside this call.
    fn create_fetch_session(&mut self, id: SessionId, target: &PrefetchTarget) -> Self::Session;

    /// Called once when the coordinator reaches `Finished`.
    fn on_finished(&mut self, requests: &[PrefetchRequest]);
}

#[derive(Debug)]
struct InFlight<S> {
    request_index: usize,
    host: String,
    session: S,
}

/// Schedules one navigation's prefetch targets under global and per-host caps.
#[derive(Debug)]
pub struct PrefetchCoordinator<S> {
    config: PrefetchConfig,
    state: CoordinatorState,
    queue: RequestQueue,
    counters: HostCounters,
    in_flight: HashMap<SessionId, InFlight<S>>,
    requests: Vec<PrefetchRequest>,
    next_session_id: u64,
}

impl<S> PrefetchCoordinator<S> {
    /// Create a coordinator for `targets`, admitted in the given order.
    ///
    /// Panics if either cap is zero.
    pub fn new(targets: Vec<PrefetchTarget>, config: PrefetchConfig) -> Self {
        assert!(
            config.max_global_in_flight > 0,
            "max_global_in_flight must be at least 1"
        );
        assert!(
            config.max_per_host_in_flight > 0,
            "max_per_host_in_flight must be at least 1"
        );
        let queue: RequestQueue = targets.iter().cloned().collect();
        let requests = targets.into_iter().map(PrefetchRequest::new).collect();
        Self {
            config,
            state: CoordinatorState::Initialized,
            queue,
            counters: HostCounters::new(),
            in_flight: HashMap::new(),
            requests,
            next_session_id: 0,
        }
    }

    pub fn state(&self) -> CoordinatorState {
        self.state
    }

    pub fn config(&self) -> &PrefetchConfig {
        &self.config
    }

    pub fn in_flight_count(&self) -> usize {
        self.in_flight.len()
    }

    pub fn queued_count(&self) -> usize {
        self.queue.len()
    }

    /// In-flight sessions for `host`.
    pub fn host_in_flight(&self, host: &str) -> usize {
        self.counters.get(host)
    }

    /// Every request in input order with its current status.
    pub fn requests(&self) -> &[PrefetchRequest] {
        &self.requests
    }

    pub fn session(&self, id: SessionId) -> Option<&S> {
        self.in_flight.get(&id).map(|f| &f.session)
    }

    pub fn session_mut(&mut self, id: SessionId) -> Option<&mut S> {
        self.in_flight.get_mut(&id).map(|f| &mut f.session)
    }

    /// Ids of the sessions currently in flight, in admission order.
    pub fn in_flight_ids(&self) -> Vec<SessionId> {
        let mut ids: Vec<SessionId> = self.in_flight.keys().copied().collect();
        ids.sort();
        ids
    }

    /// Begin admitting. Panics unless the coordinator is `Initialized`.
    pub fn start<D>(&mut self, delegate: &mut D)
    where
        D: PrefetchDelegate<Session = S>,
    {
        assert_eq!(
            self.state,
            CoordinatorState::Initialized,
            "start() called twice or after stop()"
        );
        self.state = CoordinatorState::Running;
        tracing::debug!(targets = self.requests.len(), "prefetch coordinator started");
        self.drive(delegate);
    }

    /// Stop admitting new targets. In-flight sessions keep running.
    pub fn stop(&mut self) {
        if self.state.is_finished() {
            return;
        }
        if self.state != CoordinatorState::Stopped {
            tracing::debug!(
                in_flight = self.in_flight.len(),
                dropped = self.queue.len(),
                "prefetch coordinator stopped"
            );
        }
        self.state = CoordinatorState::Stopped;
    }

    /// Retire a finished session and admit replacement work.
    ///
    /// Returns the session handle so the transport can release it, or `None`
    /// (with a warning) if `id` is not in flight.
    pub fn on_session_complete<D>(
        &mut self,
        id: SessionId,
        status: PrefetchStatus,
        delegate: &mut D,
    ) -> Option<S>
    where
        D: PrefetchDelegate<Session = S>,
    {
        let Some(done) = self.in_flight.remove(&id) else {
            tracing::warn!(session = %id, "completion for unknown prefetch session");
            return None;
        };
        let status = if status.is_terminal() {
            status
        } else {
            tracing::warn!(
                session = %id,
                %status,
                "non-terminal completion status, recording failure"
            );
            PrefetchStatus::Failed
        };
        self.counters.decrement(&done.host);
        self.requests[done.request_index].status = status;
        tracing::debug!(
            session = %id,
            url = %self.requests[done.request_index].target,
            %status,
            "prefetch session complete"
        );
        self.drive(delegate);
        Some(done.session)
    }

    fn drive<D>(&mut self, delegate: &mut D)
    where
        D: PrefetchDelegate<Session = S>,
    {
        if self.state.is_finished() {
            return;
        }

        while self.state == CoordinatorState::Running {
            let Some(pending) = try_admit_one(
                &mut self.queue,
                &mut self.counters,
                self.in_flight.len(),
                &self.config,
            ) else {
                break;
            };
            let id = SessionId(self.next_session_id);
            self.next_session_id += 1;
            self.requests[pending.request_index].status = PrefetchStatus::Started;
            tracing::debug!(session = %id, url = %pending.target, "admitting prefetch");
            let session = delegate.create_fetch_session(id, &pending.target);
            self.in_flight.insert(
                id,
                InFlight {
                    request_index: pending.request_index,
                    host: pending.target.host().to_string(),
                    session,
                },
            );
        }

        if self.in_flight.is_empty() {
            assert!(
                self.counters.is_empty(),
                "host counters non-empty with nothing in flight: {:?}",
                self.counters
            );
            assert!(
                self.state == CoordinatorState::Stopped || self.queue.is_empty(),
                "queue non-empty with nothing in flight while {}",
                self.state
            );
            self.state = CoordinatorState::Finished;
            tracing::info!(
                requests = self.requests.len(),
                succeeded = self.requests.iter().filter(|r| r.status.is_success()).count(),
                not_started = self.queue.len(),
                "prefetching finished"
            );
            delegate.on_finished(&self.requests);
        }
    }
}
