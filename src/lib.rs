//! hasta-bridge - Hand-tracking to humanoid robot bridge
//!
//! A tracking client streams hand positions and speech requests over TCP;
//! the bridge maps them onto robot arm targets and talks back with camera
//! frames (or pose telemetry).
//!
//! ## Modules
//!
//! - [`protocol`]: `MOVE` / `SAY` / `DISCONNECT` line parsing and dispatch
//! - [`transform`]: tracker space to robot torso frame
//! - [`session`]: scoped ownership of the robot for one connection
//! - [`bridge`]: the non-blocking duplex loop
//! - [`streaming`]: outbound encoding and the peer transport
//! - [`devices`]: robot implementations (simulated NAO)

pub mod bridge;
pub mod config;
pub mod core;
pub mod devices;
pub mod error;
pub mod protocol;
pub mod session;
pub mod snapshot;
pub mod streaming;
pub mod transform;

// Re-export commonly used types
pub use config::Config;
pub use error::{Error, Result};
