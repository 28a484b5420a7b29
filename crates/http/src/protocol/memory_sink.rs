use std::io;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use bytes::Bytes;
use http::{HeaderMap, StatusCode};

use crate::protocol::{ResponseHead, ResponseSink, WebSocketUpgrade};

/// A response captured by [`MemorySink`].
#[derive(Debug, Default)]
pub struct RecordedResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub chunks: Vec<Bytes>,
    pub finished: bool,
    pub upgrade: Option<WebSocketUpgrade>,
}

impl RecordedResponse {
    /// All body chunks joined together.
    pub fn body(&self) -> Bytes {
        self.chunks.concat().into()
    }

    fn is_complete(&self) -> bool {
        self.finished || self.upgrade.is_some()
    }
}

#[derive(Debug, Default)]
struct Shared {
    response: Mutex<RecordedResponse>,
    completed: Condvar,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, RecordedResponse> {
        self.response.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// A [`ResponseSink`] that keeps the response in memory.
///
/// Useful to call handlers in-process and in tests. The paired [`ResponseRecord`] lets
/// another thread wait for the response to complete.
#[derive(Debug)]
pub struct MemorySink {
    shared: Arc<Shared>,
    accept_upgrade: bool,
}

/// Read side of a [`MemorySink`].
#[derive(Debug, Clone)]
pub struct ResponseRecord {
    shared: Arc<Shared>,
}

impl MemorySink {
    pub fn new() -> (Self, ResponseRecord) {
        let shared = Arc::new(Shared::default());
        (Self { shared: Arc::clone(&shared), accept_upgrade: false }, ResponseRecord { shared })
    }

    /// Lets [`ResponseSink::upgrade`] succeed.
    #[must_use]
    pub fn accepting_upgrades(mut self) -> Self {
        self.accept_upgrade = true;
        self
    }
}

impl ResponseSink for MemorySink {
    fn send_head(&mut self, head: &ResponseHead) -> io::Result<()> {
        let mut response = self.shared.lock();
        response.status = head.status();
        response.headers = head.headers().clone();
        Ok(())
    }

    fn send_chunk(&mut self, chunk: Bytes) -> io::Result<()> {
        self.shared.lock().chunks.push(chunk);
        Ok(())
    }

    fn finish(&mut self) -> io::Result<()> {
        self.shared.lock().finished = true;
        self.shared.completed.notify_all();
        Ok(())
    }

    fn upgrade(&mut self, upgrade: WebSocketUpgrade) -> io::Result<bool> {
        if !self.accept_upgrade {
            return Ok(false);
        }
        self.shared.lock().upgrade = Some(upgrade);
        self.shared.completed.notify_all();
        Ok(true)
    }
}

impl ResponseRecord {
    /// Takes the response if it completed (finished or upgraded).
    pub fn take(&self) -> Option<RecordedResponse> {
        let mut response = self.shared.lock();
        response.is_complete().then(|| std::mem::take(&mut *response))
    }

    /// Waits up to `timeout` for the response to complete, then takes it.
    pub fn wait(&self, timeout: Duration) -> Option<RecordedResponse> {
        let response = self.shared.lock();
        let (mut response, _) = self
            .shared
            .completed
            .wait_timeout_while(response, timeout, |response| !response.is_complete())
            .unwrap_or_else(PoisonError::into_inner);
        response.is_complete().then(|| std::mem::take(&mut *response))
    }
}
