use std::io;
use std::time::Duration;
use thiserror::Error;

/// Errors raised by the request body stream.
///
/// They are surfaced to the reading worker as a failed read and never reach the
/// reactor thread.
#[derive(Error, Debug, Clone)]
pub enum ProtocolError {
    #[error("no body data arrived within the idle timeout of {timeout:?}")]
    ReadTimeout { timeout: Duration },

    #[error("queued body size {queued} would exceed the limit {max_size}")]
    BodyOverflow { queued: usize, max_size: usize },

    #[error("body chunk received after end of stream")]
    ChunkAfterEnd,
}

impl ProtocolError {
    pub fn read_timeout(timeout: Duration) -> Self {
        Self::ReadTimeout { timeout }
    }

    pub fn body_overflow(queued: usize, max_size: usize) -> Self {
        Self::BodyOverflow { queued, max_size }
    }

    /// Returns true if the error was caused by the idle read timeout
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::ReadTimeout { .. })
    }
}

impl From<ProtocolError> for io::Error {
    fn from(e: ProtocolError) -> Self {
        let kind = if e.is_timeout() { io::ErrorKind::TimedOut } else { io::ErrorKind::InvalidData };
        io::Error::new(kind, e)
    }
}

#[derive(Error, Debug)]
pub enum SendError {
    #[error("response already committed")]
    AlreadyCommitted,

    #[error("invalid header {name}: {reason}")]
    InvalidHeader { name: &'static str, reason: String },

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl SendError {
    pub fn invalid_header<S: ToString>(name: &'static str, reason: S) -> Self {
        Self::InvalidHeader { name, reason: reason.to_string() }
    }

    pub fn io<E: Into<io::Error>>(e: E) -> Self {
        Self::Io { source: e.into() }
    }
}

impl From<SendError> for io::Error {
    fn from(e: SendError) -> Self {
        match e {
            SendError::Io { source } => source,
            other => io::Error::other(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_maps_to_timed_out_io_error() {
        let io_error: io::Error = ProtocolError::read_timeout(Duration::from_millis(20)).into();
        assert_eq!(io_error.kind(), io::ErrorKind::TimedOut);

        let io_error: io::Error = ProtocolError::body_overflow(10, 8).into();
        assert_eq!(io_error.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn send_errors_become_io_errors() {
        let io_error: io::Error = SendError::invalid_header("location", "bad byte").into();
        assert_eq!(io_error.kind(), io::ErrorKind::Other);
        assert_eq!(io_error.to_string(), "invalid header location: bad byte");

        let io_error: io::Error = SendError::io(io::Error::from(io::ErrorKind::BrokenPipe)).into();
        assert_eq!(io_error.kind(), io::ErrorKind::BrokenPipe);
    }
}
