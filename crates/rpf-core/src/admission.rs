//! Admission control: global and per-host in-flight caps.
//!
//! The coordinator asks for one target at a time; a target is admitted only
//! when the navigation has a free global slot and its host has a free
//! per-host slot.

use std::collections::HashMap;

use crate::config::PrefetchConfig;
use crate::queue::{PendingRequest, RequestQueue};

/// In-flight count per host. A host is present iff its count is > 0.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostCounters {
    counts: HashMap<String, usize>,
}

impl HostCounters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current count for `host` (0 if absent).
    pub fn get(&self, host: &str) -> usize {
        self.counts.get(host).copied().unwrap_or(0)
    }

    pub fn increment(&mut self, host: &str) -> usize {
        let count = self.counts.entry(host.to_string()).or_insert(0);
        *count += 1;
        *count
    }

    /// Decrement `host`, dropping the entry at zero. Returns the new count.
    ///
    /// Panics if the host has no in-flight requests.
    pub fn decrement(&mut self, host: &str) -> usize {
        let count = self
            .counts
            .get_mut(host)
            .unwrap_or_else(|| panic!("host counter underflow for {host}"));
        *count -= 1;
        let remaining = *count;
        if remaining == 0 {
            self.counts.remove(host);
        }
        remaining
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Number of hosts with at least one in-flight request.
    pub fn hosts(&self) -> usize {
        self.counts.len()
    }

    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }
}

/// Admit the next eligible target, if any.
///
/// Returns `None` when the global cap is reached or every queued target's host
/// is saturated. On success the host counter has already been incremented.
pub fn try_admit_one(
    queue: &mut RequestQueue,
    counters: &mut HostCounters,
    in_flight_count: usize,
    config: &PrefetchConfig,
) -> Option<PendingRequest> {
    if in_flight_count >= config.max_global_in_flight {
        return None;
    }
    let index = queue.peek_next_admissible(counters, config.max_per_host_in_flight)?;
    let pending = queue.remove(index)?;
    counters.increment(pending.target.host());
    Some(pending)
}
