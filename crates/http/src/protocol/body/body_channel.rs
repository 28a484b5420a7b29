use std::collections::VecDeque;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use bytes::{Buf, Bytes};
use once_cell::sync::OnceCell;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::ensure;
use crate::protocol::{PayloadItem, ProtocolError};

const DEFAULT_IDLE_TIMEOUT_MS: u64 = 120_000;
const DEFAULT_MAX_QUEUED_BYTES: usize = 8 * 1024 * 1024;

/// Limits applied to every request body channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ChannelConfig {
    idle_timeout_ms: u64,
    max_queued_bytes: usize,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self { idle_timeout_ms: DEFAULT_IDLE_TIMEOUT_MS, max_queued_bytes: DEFAULT_MAX_QUEUED_BYTES }
    }
}

impl ChannelConfig {
    /// How long a read waits for the next chunk before failing with `ReadTimeout`
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_millis(self.idle_timeout_ms)
    }

    /// Upper bound of bytes queued by the reactor and not yet read by the worker
    pub fn max_queued_bytes(&self) -> usize {
        self.max_queued_bytes
    }

    #[must_use]
    pub fn with_idle_timeout(mut self, idle_timeout: Duration) -> Self {
        self.idle_timeout_ms = u64::try_from(idle_timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    #[must_use]
    pub fn with_max_queued_bytes(mut self, max_queued_bytes: usize) -> Self {
        self.max_queued_bytes = max_queued_bytes;
        self
    }
}

/// An ordered chunk queue that turns pushed body chunks into blocking pulls.
///
/// The reactor is the only writer: [`push`](Self::push) and [`close`](Self::close) never
/// wait on the reader. The worker is the only reader: [`read`](Self::read) parks the
/// thread until a chunk arrives, the stream ends, or the idle timeout elapses.
#[derive(Debug)]
pub struct ByteChannel {
    state: Mutex<ChannelState>,
    readable: Condvar,
    config: ChannelConfig,
}

#[derive(Debug)]
struct ChannelState {
    queue: VecDeque<PayloadItem>,
    queued_bytes: usize,
    current: PayloadItem,
    eof_queued: bool,
    discarding: bool,
    discarded_bytes: usize,
    failure: Option<ProtocolError>,
}

impl ByteChannel {
    pub fn new(config: ChannelConfig) -> Self {
        let state = ChannelState {
            queue: VecDeque::new(),
            queued_bytes: 0,
            current: PayloadItem::Chunk(Bytes::new()),
            eof_queued: false,
            discarding: false,
            discarded_bytes: 0,
            failure: None,
        };
        Self { state: Mutex::new(state), readable: Condvar::new(), config }
    }

    /// Creates a channel that already carries its end marker.
    pub fn closed(config: ChannelConfig) -> Self {
        let channel = Self::new(config);
        channel.close();
        channel
    }

    pub fn config(&self) -> &ChannelConfig {
        &self.config
    }

    fn lock(&self) -> MutexGuard<'_, ChannelState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Enqueues a body chunk. Called from the reactor thread, never blocks.
    ///
    /// Empty chunks are ignored. Pushing after the end marker fails with
    /// `ChunkAfterEnd`; exceeding `max_queued_bytes` fails the channel with `BodyOverflow`
    /// and the reader observes that error on its next read.
    pub fn push(&self, chunk: Bytes) -> Result<(), ProtocolError> {
        let mut state = self.lock();

        if state.discarding {
            state.discarded_bytes += chunk.len();
            return Ok(());
        }

        ensure!(!state.eof_queued, ProtocolError::ChunkAfterEnd);

        if chunk.is_empty() {
            return Ok(());
        }

        let queued = state.queued_bytes + chunk.len();
        if queued > self.config.max_queued_bytes {
            let error = ProtocolError::body_overflow(queued, self.config.max_queued_bytes);
            warn!(queued = queued, max_size = self.config.max_queued_bytes, "request body overflow, failing the channel");
            state.queue.clear();
            state.queued_bytes = 0;
            state.eof_queued = true;
            state.failure = Some(error.clone());
            drop(state);
            self.readable.notify_one();
            return Err(error);
        }

        state.queued_bytes = queued;
        state.queue.push_back(PayloadItem::Chunk(chunk));
        drop(state);
        self.readable.notify_one();
        Ok(())
    }

    /// Enqueues the end marker. Idempotent and non-blocking; wakes a pending read.
    pub fn close(&self) {
        let mut state = self.lock();
        if !state.eof_queued {
            state.eof_queued = true;
            state.queue.push_back(PayloadItem::Eof);
        }
        drop(state);
        self.readable.notify_one();
    }

    /// Drops every queued chunk and silently swallows later pushes.
    ///
    /// Used once the worker is done with the request so an unread body does not stay
    /// buffered until the reactor delivers its last chunk.
    pub fn discard(&self) {
        let mut state = self.lock();
        if state.discarding {
            return;
        }
        let unread = state.current.remaining() + state.queued_bytes;
        state.discarding = true;
        state.discarded_bytes += unread;
        state.queue.clear();
        state.queued_bytes = 0;
        state.current = PayloadItem::Eof;
        state.eof_queued = true;
        drop(state);
        self.readable.notify_one();

        if unread > 0 {
            debug!(size = unread, "skip request body");
        }
    }

    /// Bytes remaining in the chunk currently being read, without blocking.
    pub fn available(&self) -> usize {
        self.lock().current.remaining()
    }

    /// Reads body bytes into `buf`, blocking while no chunk is available.
    ///
    /// Returns `Ok(0)` at end of stream. Once at least one byte was copied, the read also
    /// drains chunks that are already queued but never waits for more.
    pub fn read(&self, buf: &mut [u8]) -> Result<usize, ProtocolError> {
        if buf.is_empty() {
            return Ok(0);
        }

        let mut state = self.lock();
        let mut filled = 0;

        loop {
            if let Some(failure) = &state.failure {
                return Err(failure.clone());
            }

            match &mut state.current {
                PayloadItem::Eof => return Ok(filled),
                PayloadItem::Chunk(data) if data.has_remaining() => {
                    let n = data.remaining().min(buf.len() - filled);
                    data.copy_to_slice(&mut buf[filled..filled + n]);
                    filled += n;
                    if filled == buf.len() {
                        return Ok(filled);
                    }
                }
                PayloadItem::Chunk(_) => {}
            }

            let next = state.queue.pop_front();
            match next {
                Some(item) => {
                    state.queued_bytes -= item.remaining();
                    state.current = item;
                }
                None if filled > 0 => return Ok(filled),
                None => state = self.wait_for_item(state)?,
            }
        }
    }

    fn wait_for_item<'a>(&self, state: MutexGuard<'a, ChannelState>) -> Result<MutexGuard<'a, ChannelState>, ProtocolError> {
        let timeout = self.config.idle_timeout();
        let (state, result) = self
            .readable
            .wait_timeout_while(state, timeout, |state| state.queue.is_empty() && state.failure.is_none())
            .unwrap_or_else(PoisonError::into_inner);

        if result.timed_out() && state.queue.is_empty() && state.failure.is_none() {
            debug!(timeout = ?timeout, "request body read timed out");
            return Err(ProtocolError::read_timeout(timeout));
        }
        Ok(state)
    }
}

/// The per-request slot holding the lazily created [`ByteChannel`].
///
/// Both the reactor (writer) and the worker (reader) reach the channel through this slot;
/// whichever side touches it first creates it, and it is never replaced afterwards.
#[derive(Debug)]
pub struct BodySlot {
    channel: OnceCell<ByteChannel>,
    config: ChannelConfig,
}

impl BodySlot {
    pub fn new(config: ChannelConfig) -> Self {
        Self { channel: OnceCell::new(), config }
    }

    /// Returns the channel, creating it on first use.
    pub fn channel(&self) -> &ByteChannel {
        self.channel.get_or_init(|| ByteChannel::new(self.config))
    }

    /// Returns the channel only if one was created already.
    pub fn existing(&self) -> Option<&ByteChannel> {
        self.channel.get()
    }

    /// Signals end of body.
    ///
    /// Closes the channel if it exists; otherwise installs an already closed one so a
    /// later read ends immediately instead of waiting for the idle timeout.
    pub fn close(&self) {
        match self.channel.get() {
            Some(channel) => channel.close(),
            None => {
                if self.channel.set(ByteChannel::closed(self.config)).is_err() {
                    // lost the race against a first chunk or a first read
                    self.channel().close();
                }
            }
        }
    }

    /// Discards any unread body, see [`ByteChannel::discard`].
    pub fn discard(&self) {
        if let Some(channel) = self.channel.get() {
            channel.discard();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::mpsc;
    use std::thread;
    use std::time::Instant;

    fn channel() -> Arc<ByteChannel> {
        Arc::new(ByteChannel::new(ChannelConfig::default()))
    }

    #[test]
    fn read_returns_what_is_available_then_the_rest_after_completion() {
        let channel = channel();
        let (proceed_tx, proceed_rx) = mpsc::channel::<()>();

        let writer = {
            let channel = Arc::clone(&channel);
            thread::spawn(move || {
                channel.push(Bytes::from_static(&[1, 2, 3, 4])).unwrap();
                proceed_rx.recv().unwrap();
                channel.push(Bytes::from_static(&[5, 6])).unwrap();
                channel.push(Bytes::from_static(&[7])).unwrap();
                channel.close();
            })
        };

        let mut buffer = [0u8; 5];
        assert_eq!(channel.read(&mut buffer).unwrap(), 4);
        assert_eq!(buffer, [1, 2, 3, 4, 0]);
        assert_eq!(channel.available(), 0);

        proceed_tx.send(()).unwrap();
        writer.join().unwrap();

        let mut buffer = [0u8; 5];
        assert_eq!(channel.read(&mut buffer).unwrap(), 3);
        assert_eq!(buffer, [5, 6, 7, 0, 0]);
        assert_eq!(channel.read(&mut buffer).unwrap(), 0);
    }

    #[test]
    fn available_reports_the_current_chunk_only() {
        let channel = channel();
        channel.push(Bytes::from_static(b"hello")).unwrap();
        channel.push(Bytes::from_static(b"world")).unwrap();
        assert_eq!(channel.available(), 0);

        let mut buffer = [0u8; 2];
        assert_eq!(channel.read(&mut buffer).unwrap(), 2);
        assert_eq!(&buffer, b"he");
        assert_eq!(channel.available(), 3);
    }

    #[test]
    fn close_before_any_chunk_ends_the_stream_immediately() {
        let channel = Arc::new(ByteChannel::new(ChannelConfig::default().with_idle_timeout(Duration::from_secs(30))));
        channel.close();

        let started = Instant::now();
        let mut buffer = [0u8; 8];
        assert_eq!(channel.read(&mut buffer).unwrap(), 0);
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn close_unblocks_a_pending_read() {
        let channel = channel();
        let reader = {
            let channel = Arc::clone(&channel);
            thread::spawn(move || {
                let mut buffer = [0u8; 8];
                channel.read(&mut buffer)
            })
        };

        thread::sleep(Duration::from_millis(50));
        channel.close();
        assert_eq!(reader.join().unwrap().unwrap(), 0);
    }

    #[test]
    fn close_is_idempotent() {
        let channel = channel();
        channel.push(Bytes::from_static(b"ab")).unwrap();
        channel.close();
        channel.close();

        let mut buffer = [0u8; 8];
        assert_eq!(channel.read(&mut buffer).unwrap(), 2);
        assert_eq!(channel.read(&mut buffer).unwrap(), 0);
        assert_eq!(channel.read(&mut buffer).unwrap(), 0);
    }

    #[test]
    fn idle_read_times_out() {
        let channel = ByteChannel::new(ChannelConfig::default().with_idle_timeout(Duration::from_millis(50)));

        let mut buffer = [0u8; 8];
        let error = channel.read(&mut buffer).unwrap_err();
        assert!(error.is_timeout());
    }

    #[test]
    fn push_after_end_is_rejected() {
        let channel = channel();
        channel.close();
        assert!(matches!(channel.push(Bytes::from_static(b"late")), Err(ProtocolError::ChunkAfterEnd)));
    }

    #[test]
    fn overflow_fails_the_reader() {
        let channel = ByteChannel::new(ChannelConfig::default().with_max_queued_bytes(4));
        channel.push(Bytes::from_static(b"abc")).unwrap();
        assert!(matches!(channel.push(Bytes::from_static(b"de")), Err(ProtocolError::BodyOverflow { queued: 5, max_size: 4 })));

        let mut buffer = [0u8; 8];
        assert!(matches!(channel.read(&mut buffer), Err(ProtocolError::BodyOverflow { .. })));
    }

    #[test]
    fn discard_swallows_later_chunks() {
        let channel = channel();
        channel.push(Bytes::from_static(b"unread")).unwrap();
        channel.discard();

        assert!(channel.push(Bytes::from_static(b"more")).is_ok());
        let mut buffer = [0u8; 8];
        assert_eq!(channel.read(&mut buffer).unwrap(), 0);
    }

    #[test]
    fn slot_close_without_channel_installs_a_closed_one() {
        let slot = BodySlot::new(ChannelConfig::default());
        assert!(slot.existing().is_none());

        slot.close();

        let mut buffer = [0u8; 4];
        assert_eq!(slot.channel().read(&mut buffer).unwrap(), 0);
    }
}
