use std::io::{self, Read};
use std::sync::Arc;

use bytes::{Bytes, BytesMut};

use crate::protocol::body::{BodySlot, ByteChannel};

/// Blocking, pull-based access to a request body.
///
/// `BodyReader` is handed to handlers on the worker thread. Each read parks the worker
/// until the reactor delivers the next chunk, so handler code can consume the body with
/// plain `std::io::Read` calls.
#[derive(Debug)]
pub struct BodyReader {
    slot: Arc<BodySlot>,
}

impl BodyReader {
    pub fn new(slot: Arc<BodySlot>) -> Self {
        Self { slot }
    }

    fn channel(&self) -> &ByteChannel {
        self.slot.channel()
    }

    /// Bytes that can be read without blocking from the current chunk
    pub fn available(&self) -> usize {
        self.channel().available()
    }

    /// Reads the remaining body into memory.
    pub fn read_to_bytes(&mut self) -> io::Result<Bytes> {
        let mut body = BytesMut::new();
        let mut buffer = [0u8; 8 * 1024];
        loop {
            match self.read(&mut buffer)? {
                0 => return Ok(body.freeze()),
                n => body.extend_from_slice(&buffer[..n]),
            }
        }
    }

    /// Drops whatever the handler did not read.
    pub(crate) fn discard(&self) {
        self.slot.discard();
    }
}

impl Read for BodyReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.channel().read(buf).map_err(io::Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::body::ChannelConfig;
    use std::time::Duration;

    #[test]
    fn read_to_bytes_collects_every_chunk() {
        let slot = Arc::new(BodySlot::new(ChannelConfig::default()));
        slot.channel().push(Bytes::from_static(b"hello ")).unwrap();
        slot.channel().push(Bytes::from_static(b"world")).unwrap();
        slot.close();

        let mut reader = BodyReader::new(slot);
        assert_eq!(reader.read_to_bytes().unwrap(), Bytes::from_static(b"hello world"));
    }

    #[test]
    fn timeout_surfaces_as_timed_out_io_error() {
        let config = ChannelConfig::default().with_idle_timeout(Duration::from_millis(30));
        let mut reader = BodyReader::new(Arc::new(BodySlot::new(config)));

        let mut buffer = [0u8; 4];
        let error = reader.read(&mut buffer).unwrap_err();
        assert_eq!(error.kind(), io::ErrorKind::TimedOut);
    }
}
