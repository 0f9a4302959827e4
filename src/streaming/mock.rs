//! Mock transport for testing

use super::transport::{Received, Transport};
use crate::error::{Error, Result};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

/// In-memory transport; clones share the same buffers
///
/// Injected reads are delivered one chunk per `receive`, preserving the
/// boundaries a real socket read would have.
#[derive(Clone, Default)]
pub struct MockTransport {
    inner: Arc<Mutex<MockTransportInner>>,
}

#[derive(Default)]
struct MockTransportInner {
    read_chunks: VecDeque<Vec<u8>>,
    written: Vec<Vec<u8>>,
    closed: bool,
    refuse_sends: bool,
    fail_receive: bool,
    fail_flush: bool,
    rejected_sends: usize,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue one chunk to be returned by a future `receive`
    pub fn inject_read(&self, data: &[u8]) {
        self.inner.lock().read_chunks.push_back(data.to_vec());
    }

    /// After queued chunks are consumed, report the peer as closed
    pub fn close_peer(&self) {
        self.inner.lock().closed = true;
    }

    /// Make every `send` fail as if the peer were not ready
    pub fn refuse_sends(&self, refuse: bool) {
        self.inner.lock().refuse_sends = refuse;
    }

    /// Make `receive` fail with a broken-pipe I/O error
    pub fn fail_receive(&self, fail: bool) {
        self.inner.lock().fail_receive = fail;
    }

    /// Make `flush` fail with a broken-pipe I/O error
    pub fn fail_flush(&self, fail: bool) {
        self.inner.lock().fail_flush = fail;
    }

    /// Messages accepted by `send`, in order
    pub fn sent_messages(&self) -> Vec<Vec<u8>> {
        self.inner.lock().written.clone()
    }

    /// Number of `send` calls that were refused
    pub fn rejected_sends(&self) -> usize {
        self.inner.lock().rejected_sends
    }
}

impl Transport for MockTransport {
    fn receive(&mut self, buffer: &mut [u8]) -> Result<Received> {
        let mut inner = self.inner.lock();
        if inner.fail_receive {
            return Err(broken_pipe());
        }
        let Some(mut chunk) = inner.read_chunks.pop_front() else {
            return Ok(if inner.closed {
                Received::Closed
            } else {
                Received::Idle
            });
        };

        let n = chunk.len().min(buffer.len());
        buffer[..n].copy_from_slice(&chunk[..n]);
        if n < chunk.len() {
            // Remainder is delivered on the next receive
            inner.read_chunks.push_front(chunk.split_off(n));
        }
        Ok(Received::Data(n))
    }

    fn send(&mut self, data: &[u8]) -> Result<()> {
        let mut inner = self.inner.lock();
        if inner.refuse_sends {
            inner.rejected_sends += 1;
            return Err(Error::PeerNotReady);
        }
        inner.written.push(data.to_vec());
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        if self.inner.lock().fail_flush {
            return Err(broken_pipe());
        }
        Ok(())
    }
}

fn broken_pipe() -> Error {
    Error::Io(std::io::Error::new(
        std::io::ErrorKind::BrokenPipe,
        "injected transport failure",
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunks_are_split_by_buffer_size() {
        let mock = MockTransport::new();
        mock.inject_read(b"abcdef");
        let mut transport = mock.clone();
        let mut buf = [0u8; 4];

        assert_eq!(transport.receive(&mut buf).unwrap(), Received::Data(4));
        assert_eq!(&buf, b"abcd");
        assert_eq!(transport.receive(&mut buf).unwrap(), Received::Data(2));
        assert_eq!(&buf[..2], b"ef");
        assert_eq!(transport.receive(&mut buf).unwrap(), Received::Idle);

        mock.close_peer();
        assert_eq!(transport.receive(&mut buf).unwrap(), Received::Closed);
    }

    #[test]
    fn test_refused_sends_are_counted() {
        let mock = MockTransport::new();
        let mut transport = mock.clone();
        mock.refuse_sends(true);
        assert!(transport.send(b"x").is_err());
        mock.refuse_sends(false);
        transport.send(b"y").unwrap();

        assert_eq!(mock.rejected_sends(), 1);
        assert_eq!(mock.sent_messages(), vec![b"y".to_vec()]);
    }

    #[test]
    fn test_injected_failures() {
        let mock = MockTransport::new();
        let mut transport = mock.clone();
        let mut buf = [0u8; 4];
        mock.inject_read(b"kept");

        mock.fail_receive(true);
        mock.fail_flush(true);
        assert!(matches!(transport.receive(&mut buf), Err(Error::Io(_))));
        assert!(matches!(transport.flush(), Err(Error::Io(_))));

        mock.fail_receive(false);
        assert_eq!(transport.receive(&mut buf).unwrap(), Received::Data(4));
    }
}
