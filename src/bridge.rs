//! Duplex bridge loop
//!
//! Owns the single client connection from accept to close and drives the
//! robot through an [`ActuatorSession`] while it is open.
//!
//! # Connection Lifecycle
//!
//! ```text
//! Listening ──accept──▶ Connected ──DISCONNECT / peer close / error / signal──▶ Closed
//! ```
//!
//! 1. Listener polls `accept` (non-blocking, 10ms back-off)
//! 2. Peer accepted: state `Connected`, actuator session opened, greeting spoken
//! 3. Each tick: non-blocking receive -> complete lines to dispatcher, then one egress message
//! 4. Loop ends: transport shut down, session dropped (camera released, robot at rest)
//!
//! `Closed` is terminal; the process serves one client per run.
//!
//! # Tick
//!
//! The loop runs at a fixed rate (`bridge.tick_ms`). Work that finishes
//! early sleeps for the rest of the tick, which bounds both CPU use and the
//! rate of pose commands/queries sent to the robot.

use crate::config::{Config, EgressMode};
use crate::core::driver::Device;
use crate::core::types::Limb;
use crate::error::{Error, Result};
use crate::protocol::{DispatchResult, Dispatcher, LineAssembler};
use crate::session::ActuatorSession;
use crate::streaming::encoder::FrameEncoder;
use crate::streaming::transport::{Received, TcpTransport, Transport};
use log::{debug, error, info, warn};
use std::io::ErrorKind;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

/// Accept poll interval while listening
const ACCEPT_POLL: Duration = Duration::from_millis(10);

/// Log a warning every this many dropped outbound messages
const DROP_WARN_INTERVAL: u64 = 100;

/// Connection lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Listening,
    Connected,
    Closed,
}

impl ConnectionState {
    /// Listening -> Connected
    pub fn connect(&mut self) -> Result<()> {
        match self {
            ConnectionState::Listening => {
                *self = ConnectionState::Connected;
                Ok(())
            }
            other => Err(Error::InvalidState(format!(
                "cannot accept a peer while {:?}",
                other
            ))),
        }
    }

    /// Any state -> Closed
    pub fn close(&mut self) {
        *self = ConnectionState::Closed;
    }
}

/// Bind the listening socket
pub fn bind(address: &str) -> Result<TcpListener> {
    TcpListener::bind(address).map_err(|source| Error::Bind {
        address: address.to_string(),
        source,
    })
}

/// Per-connection loop state
pub struct Bridge {
    state: ConnectionState,
    dispatcher: Dispatcher,
    encoder: FrameEncoder,
    egress: EgressMode,
    telemetry_limb: Limb,
    tick: Duration,
    recv_buffer: Vec<u8>,
    lines: LineAssembler,
    running: Arc<AtomicBool>,
    sent: u64,
    dropped: u64,
    flush_errors: u64,
}

impl Bridge {
    pub fn new(config: &Config, running: Arc<AtomicBool>) -> Self {
        Self {
            state: ConnectionState::Listening,
            dispatcher: Dispatcher::from_config(&config.bridge),
            encoder: FrameEncoder::new(config.bridge.framing),
            egress: config.bridge.egress,
            telemetry_limb: config.bridge.telemetry_limb,
            tick: config.bridge.tick(),
            recv_buffer: vec![0u8; config.network.recv_buffer_size],
            lines: LineAssembler::default(),
            running,
            sent: 0,
            dropped: 0,
            flush_errors: 0,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Messages sent to the peer so far
    pub fn sent(&self) -> u64 {
        self.sent
    }

    /// Outbound messages dropped because the peer was not ready
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    /// Failed attempts to drain an already-sent message
    pub fn flush_errors(&self) -> u64 {
        self.flush_errors
    }

    /// Record that a peer was accepted
    pub fn attach(&mut self, peer: &str) -> Result<()> {
        self.state.connect()?;
        info!("Client connected: {}", peer);
        Ok(())
    }

    /// Speak the connection greeting through the normal SAY path
    pub fn greet(&mut self, greeting: &str, session: &mut ActuatorSession) {
        if greeting.is_empty() {
            return;
        }
        let line = format!("SAY|{}", greeting);
        self.dispatcher.dispatch(&line, Some(session));
    }

    /// Run ticks until the connection closes or shutdown is requested
    pub fn run(
        &mut self,
        transport: &mut dyn Transport,
        session: &mut ActuatorSession,
    ) -> Result<()> {
        while self.state == ConnectionState::Connected {
            if !self.running.load(Ordering::Relaxed) {
                info!("Shutdown requested, closing connection");
                self.state.close();
                break;
            }

            let tick_start = Instant::now();
            self.step(transport, session)?;

            let elapsed = tick_start.elapsed();
            if self.state == ConnectionState::Connected && elapsed < self.tick {
                thread::sleep(self.tick - elapsed);
            }
        }

        info!(
            "Connection closed ({} messages sent, {} dropped, {} flush errors)",
            self.sent, self.dropped, self.flush_errors
        );
        Ok(())
    }

    /// One loop iteration: receive/dispatch, then egress
    ///
    /// An idle receive is not an error and leaves the state untouched. A
    /// receive error closes the connection and is returned.
    pub fn step(
        &mut self,
        transport: &mut dyn Transport,
        session: &mut ActuatorSession,
    ) -> Result<()> {
        if self.state != ConnectionState::Connected {
            return Err(Error::InvalidState(format!(
                "step while {:?}",
                self.state
            )));
        }

        match transport.receive(&mut self.recv_buffer) {
            Ok(Received::Data(n)) => {
                if let Err(e) = self.lines.push(&self.recv_buffer[..n]) {
                    warn!("{}", e);
                }
                if self.dispatch_complete_lines(session) == DispatchResult::Disconnect {
                    info!("Client requested disconnect");
                    self.state.close();
                    return Ok(());
                }
            }
            Ok(Received::Idle) => {}
            Ok(Received::Closed) => {
                // Last line may lack its newline
                if let Some(rest) = self.lines.take_partial() {
                    self.dispatch_line(&rest, session);
                }
                info!("Client closed the connection");
                self.state.close();
                return Ok(());
            }
            Err(e) => {
                error!("Receive failed: {}", e);
                self.state.close();
                return Err(e);
            }
        }

        self.send_egress(transport, session);
        if let Err(e) = transport.flush() {
            self.flush_errors += 1;
            warn!("Flush failed, partial message discarded: {}", e);
        }
        Ok(())
    }

    fn dispatch_complete_lines(&mut self, session: &mut ActuatorSession) -> DispatchResult {
        while let Some(line) = self.lines.next_line() {
            if self.dispatch_line(&line, session) == DispatchResult::Disconnect {
                return DispatchResult::Disconnect;
            }
        }
        DispatchResult::Continue
    }

    fn dispatch_line(&self, line: &[u8], session: &mut ActuatorSession) -> DispatchResult {
        match std::str::from_utf8(line) {
            Ok(text) => self.dispatcher.dispatch(text, Some(session)),
            Err(e) => {
                warn!("Skipping line that is not UTF-8: {}", e);
                DispatchResult::Continue
            }
        }
    }

    fn send_egress(&mut self, transport: &mut dyn Transport, session: &mut ActuatorSession) {
        let result = match self.egress {
            EgressMode::Off => return,
            EgressMode::Image => {
                let frame = match session.grab_frame() {
                    Ok(Some(frame)) => frame,
                    Ok(None) => return,
                    Err(e) => {
                        debug!("Frame grab failed: {}", e);
                        return;
                    }
                };
                let result = self
                    .encoder
                    .image(&frame)
                    .and_then(|bytes| transport.send(bytes));
                if let Err(e) = session.release_frame() {
                    debug!("Frame release failed: {}", e);
                }
                result
            }
            EgressMode::Telemetry => {
                let limb = self.telemetry_limb;
                let pose = match session.limb_pose(limb) {
                    Ok(pose) => pose,
                    Err(e) => {
                        debug!("Pose query for {} failed: {}", limb, e);
                        return;
                    }
                };
                self.encoder
                    .pose(limb.telemetry_tag(), &pose)
                    .and_then(|bytes| transport.send(bytes))
            }
        };

        match result {
            Ok(()) => self.sent += 1,
            Err(e) => self.record_drop(&e),
        }
    }

    fn record_drop(&mut self, e: &Error) {
        self.dropped += 1;
        if e.is_transient() {
            debug!("Outbound message dropped: {}", e);
        } else {
            warn!("Outbound message failed: {}", e);
        }
        if self.dropped % DROP_WARN_INTERVAL == 0 {
            warn!(
                "{} outbound messages dropped so far (last: {})",
                self.dropped, e
            );
        }
    }
}

/// Wait for one client, then bridge it to the robot until the connection closes
///
/// Returns `Ok(())` if shutdown is requested before a client connects.
pub fn serve(
    listener: TcpListener,
    device: Device,
    config: &Config,
    running: Arc<AtomicBool>,
) -> Result<()> {
    let mut bridge = Bridge::new(config, Arc::clone(&running));

    listener.set_nonblocking(true)?;
    if let Ok(addr) = listener.local_addr() {
        info!("Listening on {}", addr);
    }

    let Some((stream, addr)) = wait_for_peer(&listener, &running)? else {
        info!("Shutdown requested before a client connected");
        bridge.state.close();
        return Ok(());
    };
    // Only one client per run; later connection attempts are refused
    drop(listener);

    let mut transport = TcpTransport::new(stream)?;
    bridge.attach(&addr.to_string())?;
    serve_connection(&mut bridge, &mut transport, device, config)
}

/// Bridge an attached peer to the robot until the connection closes
///
/// The actuator session is closed on every exit path, including a
/// receive error, before the result is returned.
pub fn serve_connection(
    bridge: &mut Bridge,
    transport: &mut dyn Transport,
    device: Device,
    config: &Config,
) -> Result<()> {
    let camera = (config.bridge.egress == EgressMode::Image).then_some(&config.camera);
    let mut session = match ActuatorSession::open(device, &config.session, camera) {
        Ok(session) => session,
        Err(e) => {
            error!("Failed to open actuator session: {}", e);
            bridge.state.close();
            return Err(e);
        }
    };

    info!("Bridging to {}", session.device_name());
    bridge.greet(&config.bridge.greeting, &mut session);
    let result = bridge.run(transport, &mut session);
    session.close();
    result
}

fn wait_for_peer(
    listener: &TcpListener,
    running: &AtomicBool,
) -> Result<Option<(TcpStream, SocketAddr)>> {
    while running.load(Ordering::Relaxed) {
        match listener.accept() {
            Ok(pair) => return Ok(Some(pair)),
            Err(e) if e.kind() == ErrorKind::WouldBlock => thread::sleep(ACCEPT_POLL),
            Err(e)
                if e.kind() == ErrorKind::Interrupted
                    || e.kind() == ErrorKind::ConnectionAborted =>
            {
                debug!("Transient accept error: {}", e);
            }
            Err(e) => {
                error!("Accept error: {}", e);
                return Err(Error::Io(e));
            }
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_transitions() {
        let mut state = ConnectionState::Listening;
        state.connect().unwrap();
        assert_eq!(state, ConnectionState::Connected);
        assert!(state.connect().is_err());
        state.close();
        assert_eq!(state, ConnectionState::Closed);
        assert!(state.connect().is_err());
    }

    #[test]
    fn test_bind_failure_is_reported() {
        let first = bind("127.0.0.1:0").unwrap();
        let taken = first.local_addr().unwrap().to_string();
        let err = bind(&taken).unwrap_err();
        assert!(matches!(err, Error::Bind { ref address, .. } if *address == taken));
    }
}
