//! FIFO of targets waiting for an admission slot.

use std::collections::VecDeque;

use crate::admission::HostCounters;
use crate::target::PrefetchTarget;

/// A queued target and its position in the coordinator's request list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingRequest {
    pub request_index: usize,
    pub target: PrefetchTarget,
}

/// Pending targets in arrival order.
///
/// Admission picks the first target whose host still has a free slot, so a
/// saturated host does not block later targets for other hosts.
#[derive(Debug, Clone, Default)]
pub struct RequestQueue {
    pending: VecDeque<PendingRequest>,
}

impl RequestQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_back(&mut self, request_index: usize, target: PrefetchTarget) {
        self.pending.push_back(PendingRequest {
            request_index,
            target,
        });
    }

    /// Position of the first target whose host count is below `per_host_cap`.
    /// Scans from the front every call.
    pub fn peek_next_admissible(
        &self,
        counters: &HostCounters,
        per_host_cap: usize,
    ) -> Option<usize> {
        self.pending
            .iter()
            .position(|p| counters.get(p.target.host()) < per_host_cap)
    }

    /// Remove the entry at `index`, keeping the others in order.
    pub fn remove(&mut self, index: usize) -> Option<PendingRequest> {
        self.pending.remove(index)
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PendingRequest> {
        self.pending.iter()
    }
}

impl FromIterator<PrefetchTarget> for RequestQueue {
    fn from_iter<I: IntoIterator<Item = PrefetchTarget>>(iter: I) -> Self {
        let mut queue = RequestQueue::new();
        for (i, target) in iter.into_iter().enumerate() {
            queue.push_back(i, target);
        }
        queue
    }
}
