//! Minimal HTTP/1.1 server for prefetch integration tests.
//!
//! Routes by path prefix:
//! - `/ok/...`       200 with a small body
//! - `/slow/...`     200 after a short delay (used to observe concurrency)
//! - `/redirect/...` 302 to `/ok/target`
//! - `/auth/...`     401 with a Basic challenge
//! - anything else   404
//!
//! Tracks how many requests are being handled at once.

use std::io::{Read, Write};
use std::net::TcpListener;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

const SLOW_DELAY: Duration = Duration::from_millis(150);

#[derive(Debug, Default)]
pub struct ServerStats {
    active: AtomicUsize,
    max_active: AtomicUsize,
    requests: AtomicUsize,
}

impl ServerStats {
    pub fn max_active(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    fn enter(&self) {
        self.requests.fetch_add(1, Ordering::SeqCst);
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now, Ordering::SeqCst);
    }

    fn leave(&self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Starts the server in a background thread. Returns the base URL
/// (e.g. "http://127.0.0.1:12345") and shared request stats.
pub fn start() -> (String, Arc<ServerStats>) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    let stats = Arc::new(ServerStats::default());
    let server_stats = Arc::clone(&stats);
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            let stats = Arc::clone(&server_stats);
            thread::spawn(move || handle(stream, &stats));
        }
    });
    (format!("http://127.0.0.1:{}", port), stats)
}

fn handle(mut stream: std::net::TcpStream, stats: &ServerStats) {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(2)));
    let _ = stream.set_write_timeout(Some(Duration::from_secs(2)));
    let mut buf = [0u8; 8192];
    let n = match stream.read(&mut buf) {
        Ok(0) | Err(_) => return,
        Ok(n) => n,
    };
    let Ok(request) = std::str::from_utf8(&buf[..n]) else {
        return;
    };
    let path = request
        .lines()
        .next()
        .and_then(|l| l.split_whitespace().nth(1))
        .unwrap_or("/")
        .to_string();

    stats.enter();
    let response = if path.starts_with("/ok/") {
        ok_response(&path)
    } else if path.starts_with("/slow/") {
        thread::sleep(SLOW_DELAY);
        ok_response(&path)
    } else if path.starts_with("/redirect/") {
        "HTTP/1.1 302 Found\r\nLocation: /ok/target\r\nContent-Length: 0\r\nConnection: close\r\n\r\n"
            .to_string()
    } else if path.starts_with("/auth/") {
        "HTTP/1.1 401 Unauthorized\r\nWWW-Authenticate: Basic realm=\"rpf\"\r\nContent-Length: 0\r\nConnection: close\r\n\r\n"
            .to_string()
    } else {
        "HTTP/1.1 404 Not Found\r\nContent-Length: 9\r\nConnection: close\r\n\r\nnot found".to_string()
    };
    // Leave before writing: once the client sees the response it may start
    // the next request, which must not overlap this one in the stats.
    stats.leave();
    let _ = stream.write_all(response.as_bytes());
    let _ = stream.flush();
}

fn ok_response(path: &str) -> String {
    let body = format!("/* prefetched {path} */\n").repeat(64);
    format!(
        "HTTP/1.1 200 OK\r\nContent-Type: text/css\r\nCache-Control: max-age=3600\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        body.len(),
        body
    )
}
