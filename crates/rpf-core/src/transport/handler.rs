//! Easy2 Handler for one prefetch: parses the status line, feeds the session
//! policy and drains the body without storing it.

use std::str;

use crate::session::{FetchSession, ReadResult, SessionEvent, SessionStep};
use crate::target::PrefetchStatus;

/// Parse the status code from an HTTP status line ("HTTP/1.1 200 OK").
pub(super) fn parse_status_line(line: &str) -> Option<u32> {
    let rest = line.strip_prefix("HTTP/")?;
    rest.split_whitespace().nth(1)?.parse().ok()
}

/// Map the status that ends a header block to a session event.
pub(super) fn event_for_status(status: u32) -> SessionEvent {
    match status {
        // 304 is a non-OK response, not a redirect.
        300..=303 | 305..=399 => SessionEvent::Redirect,
        401 | 407 => SessionEvent::AuthRequired,
        _ => SessionEvent::ResponseStarted {
            status,
            was_cached: false,
        },
    }
}

/// Map a curl failure to a session event.
pub(super) fn event_for_curl_error(e: &curl::Error) -> SessionEvent {
    if e.is_ssl_certproblem() {
        return SessionEvent::CertificateRequested;
    }
    if e.is_peer_failed_verification() || e.is_ssl_cacert() || e.is_ssl_cacert_badfile() {
        return SessionEvent::CertificateError;
    }
    SessionEvent::Failed
}

/// Handler state for one prefetch transfer.
#[derive(Debug, Default)]
pub struct PrefetchHandler {
    session: FetchSession,
    status: Option<u32>,
}

impl PrefetchHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bytes_read(&self) -> u64 {
        self.session.bytes_read()
    }

    pub fn response_status(&self) -> Option<u32> {
        self.status
    }

    /// Resolve the final status once curl reports the transfer done.
    ///
    /// A policy decision made mid-transfer wins over the curl result, since
    /// aborting the transfer is how that decision is enforced.
    pub fn finish(&mut self, result: Result<(), &curl::Error>) -> PrefetchStatus {
        if let Some(status) = self.session.outcome() {
            return status;
        }
        let event = match result {
            Ok(()) => SessionEvent::Read(ReadResult::Eof),
            Err(e) => event_for_curl_error(e),
        };
        match self.session.on_event(event) {
            SessionStep::Finished(status) => status,
            SessionStep::Continue => PrefetchStatus::Failed,
        }
    }
}

impl curl::easy::Handler for PrefetchHandler {
    fn header(&mut self, data: &[u8]) -> bool {
        let Ok(line) = str::from_utf8(data) else {
            return true;
        };
        let line = line.trim_end();
        if line.starts_with("HTTP/") {
            self.status = parse_status_line(line);
            return true;
        }
        if !line.is_empty() {
            return true;
        }
        // End of a header block. 1xx blocks are followed by the real response.
        match self.status {
            Some(status) if status >= 200 => {
                !matches!(self.session.on_event(event_for_status(status)), SessionStep::Finished(_))
            }
            _ => true,
        }
    }

    fn write(&mut self, data: &[u8]) -> Result<usize, curl::easy::WriteError> {
        match self.session.on_event(SessionEvent::Read(ReadResult::Data(data.len()))) {
            SessionStep::Continue => Ok(data.len()),
            // Short write aborts the transfer.
            SessionStep::Finished(_) => Ok(0),
        }
    }
}
