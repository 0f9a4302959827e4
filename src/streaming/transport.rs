//! Peer transport abstraction
//!
//! The bridge loop only needs three operations from its peer connection,
//! all of which must return immediately:
//!
//! - `receive`: read whatever bytes are available
//! - `send`: queue one complete outbound message
//! - `flush`: push queued bytes out as far as the socket allows
//!
//! [`TcpTransport`] keeps at most one outbound message in flight. A send
//! while the previous message is still draining fails with
//! [`Error::PeerNotReady`] and the new message is dropped, so a slow client
//! always gets whole messages and never a backlog of stale frames.

use crate::error::{Error, Result};
use log::{debug, warn};
use std::io::{ErrorKind, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream};

/// Outcome of a non-blocking receive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Received {
    /// `n` bytes were read into the buffer
    Data(usize),
    /// Nothing available right now
    Idle,
    /// Peer closed the connection
    Closed,
}

/// Non-blocking peer connection
pub trait Transport: Send {
    /// Read available bytes into `buffer`
    fn receive(&mut self, buffer: &mut [u8]) -> Result<Received>;

    /// Queue one complete message for sending
    fn send(&mut self, data: &[u8]) -> Result<()>;

    /// Write queued bytes without blocking
    fn flush(&mut self) -> Result<()>;

    /// Bytes queued but not yet written
    fn pending(&self) -> usize {
        0
    }
}

/// Transport over a non-blocking TCP stream
pub struct TcpTransport {
    stream: TcpStream,
    peer: Option<SocketAddr>,
    outbound: Vec<u8>,
    written: usize,
}

impl TcpTransport {
    /// Wrap a connected stream, switching it to non-blocking mode
    pub fn new(stream: TcpStream) -> Result<Self> {
        stream.set_nonblocking(true)?;
        if let Err(e) = stream.set_nodelay(true) {
            warn!("Failed to set TCP_NODELAY: {}", e);
        }
        let peer = stream.peer_addr().ok();

        Ok(Self {
            stream,
            peer,
            outbound: Vec::new(),
            written: 0,
        })
    }
}

impl Transport for TcpTransport {
    fn receive(&mut self, buffer: &mut [u8]) -> Result<Received> {
        match self.stream.read(buffer) {
            Ok(0) => Ok(Received::Closed),
            Ok(n) => Ok(Received::Data(n)),
            Err(e) if e.kind() == ErrorKind::WouldBlock || e.kind() == ErrorKind::Interrupted => {
                Ok(Received::Idle)
            }
            Err(e)
                if e.kind() == ErrorKind::ConnectionReset
                    || e.kind() == ErrorKind::ConnectionAborted =>
            {
                debug!("Peer reset connection: {}", e);
                Ok(Received::Closed)
            }
            Err(e) => Err(Error::Io(e)),
        }
    }

    fn send(&mut self, data: &[u8]) -> Result<()> {
        if self.pending() > 0 {
            return Err(Error::PeerNotReady);
        }
        self.outbound.clear();
        self.outbound.extend_from_slice(data);
        self.written = 0;
        self.flush()
    }

    fn flush(&mut self) -> Result<()> {
        while self.written < self.outbound.len() {
            match self.stream.write(&self.outbound[self.written..]) {
                Ok(0) => {
                    self.outbound.clear();
                    self.written = 0;
                    return Err(Error::Io(ErrorKind::WriteZero.into()));
                }
                Ok(n) => self.written += n,
                Err(e) if e.kind() == ErrorKind::WouldBlock => return Ok(()),
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    // Partial message can't be resumed on a broken stream
                    self.outbound.clear();
                    self.written = 0;
                    return Err(Error::Io(e));
                }
            }
        }
        self.outbound.clear();
        self.written = 0;
        Ok(())
    }

    fn pending(&self) -> usize {
        self.outbound.len() - self.written
    }
}

impl Drop for TcpTransport {
    fn drop(&mut self) {
        let _ = self.stream.shutdown(Shutdown::Both);
        if let Some(peer) = self.peer {
            debug!("Transport to {} shut down", peer);
        }
    }
}
