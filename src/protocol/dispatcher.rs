//! Command dispatcher
//!
//! Turns a received text buffer into actuator and speech calls on an
//! [`ActuatorSession`]. No network I/O happens here; the bridge loop feeds
//! buffers in and acts on the returned [`DispatchResult`].
//!
//! Errors never leave this module: malformed lines and actuator faults are
//! logged and the next line is processed.

use crate::config::BridgeConfig;
use crate::core::types::{Limb, Vec3};
use crate::protocol::command::Command;
use crate::session::ActuatorSession;
use crate::transform::transform;
use log::{debug, info, warn};

/// Spoken after each executed move
pub const MOVE_ACK: &str = "MOVE";

/// What the connection should do after a buffer is processed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchResult {
    Continue,
    Disconnect,
}

/// Executes protocol commands against a session
#[derive(Debug, Clone)]
pub struct Dispatcher {
    scale: f32,
    move_speed: f32,
    move_ack: bool,
}

impl Dispatcher {
    pub fn new(scale: f32, move_speed: f32, move_ack: bool) -> Self {
        Self {
            scale,
            move_speed,
            move_ack,
        }
    }

    pub fn from_config(config: &BridgeConfig) -> Self {
        Self::new(config.arm_length, config.move_speed, config.move_ack)
    }

    /// Process a newline-delimited buffer in arrival order
    ///
    /// Stops at the first `DISCONNECT`; later lines in the buffer are never
    /// executed.
    pub fn dispatch(
        &self,
        buffer: &str,
        mut session: Option<&mut ActuatorSession>,
    ) -> DispatchResult {
        for line in buffer.lines() {
            let line = line.trim_end_matches('\r');
            if line.trim().is_empty() {
                continue;
            }
            if self.process_line(line, session.as_deref_mut()) == DispatchResult::Disconnect {
                return DispatchResult::Disconnect;
            }
        }
        DispatchResult::Continue
    }

    /// Process one line
    pub fn process_line(
        &self,
        line: &str,
        session: Option<&mut ActuatorSession>,
    ) -> DispatchResult {
        let command = match Command::parse(line) {
            Ok(command) => command,
            Err(e) => {
                warn!("Skipping {:?}: {}", line, e);
                return DispatchResult::Continue;
            }
        };

        match command {
            Command::Disconnect => {
                info!("Received DISCONNECT");
                return DispatchResult::Disconnect;
            }
            Command::Move { limb, position, .. } => self.handle_move(&limb, position, session),
            Command::Say { text } => {
                debug!("SAY: {}", text);
                if let Some(session) = session
                    && let Err(e) = session.say(&text)
                {
                    warn!("Speech failed: {}", e);
                }
            }
            Command::Unknown { tag } => {
                debug!("Ignoring unknown command tag {:?}", tag);
            }
        }
        DispatchResult::Continue
    }

    fn handle_move(&self, name: &str, tracked: Vec3, session: Option<&mut ActuatorSession>) {
        let Some(limb) = Limb::from_name(name) else {
            debug!("MOVE for unsupported limb {:?} ignored", name);
            return;
        };
        debug!("MOVE {} to {:?}", limb, tracked);

        let Some(session) = session else {
            return;
        };

        let target = transform(session.reference_pose(limb), tracked, self.scale);
        if let Err(e) = session.move_limb(limb, target, self.move_speed) {
            warn!("Move {} failed: {}", limb, e);
            return;
        }
        if self.move_ack
            && let Err(e) = session.say(MOVE_ACK)
        {
            warn!("Speech failed: {}", e);
        }
    }
}
