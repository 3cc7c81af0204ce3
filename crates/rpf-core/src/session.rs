//! Fetch session policy: turns transport signals into a terminal status.
//!
//! Prefetching is best effort. Anything other than a plain successful
//! response whose body reads to EOF ends the session immediately: redirects
//! are not followed, auth and certificate prompts are not answered, and
//! nothing is retried.

use std::fmt;

use crate::target::PrefetchStatus;

/// Identity of one admitted fetch session within a coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Result of one body read from the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadResult {
    /// `n > 0` bytes were read.
    Data(usize),
    /// End of body.
    Eof,
    /// Nothing available yet; the transport will call again.
    WouldBlock,
    /// Read failed.
    Error,
}

impl ReadResult {
    /// Map a signed byte count (`< 0` error, `0` EOF) to a read result.
    pub fn from_count(n: isize) -> Self {
        match n {
            n if n > 0 => ReadResult::Data(n as usize),
            0 => ReadResult::Eof,
            _ => ReadResult::Error,
        }
    }
}

/// Signals a transport reports about one outbound fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    Redirect,
    AuthRequired,
    /// Server asked for a client certificate.
    CertificateRequested,
    CertificateError,
    ResponseStarted { status: u32, was_cached: bool },
    Read(ReadResult),
    /// Transport-level failure (DNS, connect, reset, timeout).
    Failed,
}

/// What the transport should do after an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStep {
    Continue,
    Finished(PrefetchStatus),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    AwaitingResponse,
    Reading { was_cached: bool },
    Done(PrefetchStatus),
}

/// Per-fetch state machine shared by every transport.
#[derive(Debug, Clone)]
pub struct FetchSession {
    phase: Phase,
    bytes_read: u64,
}

impl Default for FetchSession {
    fn default() -> Self {
        Self::new()
    }
}

impl FetchSession {
    pub fn new() -> Self {
        Self {
            phase: Phase::AwaitingResponse,
            bytes_read: 0,
        }
    }

    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }

    /// Terminal status, once the session has finished.
    pub fn outcome(&self) -> Option<PrefetchStatus> {
        match self.phase {
            Phase::Done(status) => Some(status),
            _ => None,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.outcome().is_some()
    }

    /// Feed one transport signal. Events after the session finished are
    /// ignored and report the recorded outcome again.
    pub fn on_event(&mut self, event: SessionEvent) -> SessionStep {
        if let Phase::Done(status) = self.phase {
            return SessionStep::Finished(status);
        }
        match (self.phase, event) {
            (_, SessionEvent::Redirect) => self.finish(PrefetchStatus::Redirected),
            (_, SessionEvent::AuthRequired) => self.finish(PrefetchStatus::AuthRequired),
            (_, SessionEvent::CertificateRequested) => self.finish(PrefetchStatus::CertRequired),
            (_, SessionEvent::CertificateError) => self.finish(PrefetchStatus::CertError),
            (_, SessionEvent::Failed) => self.finish(PrefetchStatus::Failed),
            (Phase::AwaitingResponse, SessionEvent::ResponseStarted { status, was_cached }) => {
                if (200..300).contains(&status) {
                    self.phase = Phase::Reading { was_cached };
                    SessionStep::Continue
                } else {
                    self.finish(PrefetchStatus::Failed)
                }
            }
            // A second response start mid-body is a transport bug; treat as failure.
            (Phase::Reading { .. }, SessionEvent::ResponseStarted { .. }) => {
                self.finish(PrefetchStatus::Failed)
            }
            (Phase::AwaitingResponse, SessionEvent::Read(_)) => self.finish(PrefetchStatus::Failed),
            (Phase::Reading { was_cached }, SessionEvent::Read(read)) => match read {
                ReadResult::Data(n) => {
                    self.bytes_read += n as u64;
                    SessionStep::Continue
                }
                ReadResult::WouldBlock => SessionStep::Continue,
                ReadResult::Eof => self.finish(if was_cached {
                    PrefetchStatus::FromCache
                } else {
                    PrefetchStatus::FromNetwork
                }),
                ReadResult::Error => self.finish(PrefetchStatus::Failed),
            },
            (Phase::Done(status), _) => SessionStep::Finished(status),
        }
    }

    fn finish(&mut self, status: PrefetchStatus) -> SessionStep {
        self.phase = Phase::Done(status);
        SessionStep::Finished(status)
    }
}
