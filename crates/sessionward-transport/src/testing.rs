//! A scripted [`HttpTransport`] that records what it was asked to send.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::{HttpRequest, HttpResponse, HttpTransport, TransportError};

/// What the transport answers with.
pub type Reply = Result<HttpResponse, TransportError>;

/// A reply with `code` and an empty body.
pub fn status(code: u16) -> Reply {
    Ok(HttpResponse::new(code, Vec::new()))
}

/// A reply with `code` and a JSON body.
pub fn json(code: u16, body: &str) -> Reply {
    Ok(HttpResponse::new(code, body.as_bytes().to_vec()))
}

/// No response at all.
pub fn unreachable() -> Reply {
    Err(TransportError::Connect("connection refused".into()))
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

fn route(path: &str) -> &str {
    path.split_once('?').map_or(path, |(p, _)| p)
}

/// Replies per path (query string ignored).
///
/// Queued replies are used first, in order; after that the path's standing
/// reply; paths with neither get a 404.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    queued: Mutex<HashMap<String, VecDeque<Reply>>>,
    standing: Mutex<HashMap<String, Reply>>,
    requests: Mutex<Vec<HttpRequest>>,
    delay: Mutex<Duration>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues one reply for `path`.
    pub fn push(&self, path: &str, reply: Reply) {
        lock(&self.queued)
            .entry(path.to_string())
            .or_default()
            .push_back(reply);
    }

    /// Sets the reply `path` gets whenever nothing is queued.
    pub fn respond(&self, path: &str, reply: Reply) {
        lock(&self.standing).insert(path.to_string(), reply);
    }

    /// Makes every request take `delay` (tokio time).
    pub fn set_delay(&self, delay: Duration) {
        *lock(&self.delay) = delay;
    }

    /// Every request sent so far.
    pub fn requests(&self) -> Vec<HttpRequest> {
        lock(&self.requests).clone()
    }

    /// Requests sent to `path`.
    pub fn requests_to(&self, path: &str) -> Vec<HttpRequest> {
        lock(&self.requests)
            .iter()
            .filter(|r| route(&r.path) == path)
            .cloned()
            .collect()
    }

    pub fn count(&self, path: &str) -> usize {
        self.requests_to(path).len()
    }

    fn next_reply(&self, path: &str) -> Reply {
        let queued = lock(&self.queued).get_mut(path).and_then(VecDeque::pop_front);
        queued
            .or_else(|| lock(&self.standing).get(path).cloned())
            .unwrap_or_else(|| status(404))
    }
}

impl HttpTransport for ScriptedTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let reply = self.next_reply(route(&request.path));
        lock(&self.requests).push(request);
        let delay = *lock(&self.delay);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        reply
    }
}
