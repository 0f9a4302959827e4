//! Configuration for hasta-bridge
//!
//! Loaded from a TOML file. Every field has a default, so an empty file (or
//! no file at all) gives a working bridge on `localhost:10000` driving the
//! simulated robot.

use crate::core::types::{ColorSpace, Limb, Resolution};
use crate::error::{Error, Result};
use crate::streaming::encoder::Framing;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Top-level configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub device: DeviceConfig,
    #[serde(default)]
    pub bridge: BridgeConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub camera: CameraConfig,
}

/// Listening socket settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NetworkConfig {
    /// TCP bind address for the tracking client
    ///
    /// Examples:
    /// - `localhost:10000` - Local client only
    /// - `0.0.0.0:10000` - Bind to all interfaces
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// Bytes read per receive (commands are short text lines)
    #[serde(default = "default_recv_buffer_size")]
    pub recv_buffer_size: usize,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            recv_buffer_size: default_recv_buffer_size(),
        }
    }
}

/// Robot device selection
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DeviceConfig {
    /// Device type ("mock")
    #[serde(rename = "type", default = "default_device_type")]
    pub device_type: String,

    /// Human-readable device name
    #[serde(default = "default_device_name")]
    pub name: String,

    /// Simulated robot parameters (used by the "mock" device)
    #[serde(default)]
    pub simulation: SimulationConfig,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            device_type: default_device_type(),
            name: default_device_name(),
            simulation: SimulationConfig::default(),
        }
    }
}

/// Simulated robot parameters
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SimulationConfig {
    /// Motion update rate in Hz
    #[serde(default = "default_rate_hz")]
    pub rate_hz: f32,

    /// Hand speed in m/s at speed fraction 1.0
    #[serde(default = "default_max_speed")]
    pub max_speed: f32,

    /// Left hand resting position, torso frame (metres)
    #[serde(default = "default_left_arm_rest")]
    pub left_arm_rest: [f32; 3],

    /// Right hand resting position, torso frame (metres)
    #[serde(default = "default_right_arm_rest")]
    pub right_arm_rest: [f32; 3],

    /// Gaussian noise on sensed hand positions (metres)
    #[serde(default = "default_pose_noise_stddev")]
    pub pose_noise_stddev: f32,

    /// Peak uniform noise added to each camera byte
    #[serde(default = "default_pixel_noise")]
    pub pixel_noise: u8,

    /// Seed for sensor noise (0 = random each run)
    #[serde(default)]
    pub random_seed: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            rate_hz: default_rate_hz(),
            max_speed: default_max_speed(),
            left_arm_rest: default_left_arm_rest(),
            right_arm_rest: default_right_arm_rest(),
            pose_noise_stddev: default_pose_noise_stddev(),
            pixel_noise: default_pixel_noise(),
            random_seed: 0,
        }
    }
}

/// What the bridge loop sends back to the client each tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EgressMode {
    /// Camera frames (`IMG|...`)
    #[default]
    Image,
    /// Limb pose lines (`LARM|...`)
    Telemetry,
    /// Nothing
    Off,
}

/// Bridge loop and command handling
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BridgeConfig {
    /// Tracker units to metres (arm length)
    #[serde(default = "default_arm_length")]
    pub arm_length: f32,

    /// Fraction of maximum speed for MOVE targets
    #[serde(default = "default_move_speed")]
    pub move_speed: f32,

    /// Speak "MOVE" after each executed move
    #[serde(default = "default_true")]
    pub move_ack: bool,

    /// Spoken once when a client connects
    #[serde(default = "default_greeting")]
    pub greeting: String,

    /// Loop period in milliseconds
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,

    #[serde(default)]
    pub egress: EgressMode,

    #[serde(default)]
    pub framing: Framing,

    /// Limb reported in telemetry mode
    #[serde(default = "default_telemetry_limb")]
    pub telemetry_limb: Limb,
}

impl BridgeConfig {
    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            arm_length: default_arm_length(),
            move_speed: default_move_speed(),
            move_ack: true,
            greeting: default_greeting(),
            tick_ms: default_tick_ms(),
            egress: EgressMode::default(),
            framing: Framing::default(),
            telemetry_limb: default_telemetry_limb(),
        }
    }
}

/// Actuator session start-up
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SessionConfig {
    /// Posture assumed before reference poses are captured
    #[serde(default = "default_posture")]
    pub posture: String,

    #[serde(default = "default_posture_speed")]
    pub posture_speed: f32,

    /// Arm stiffness while connected (0.0..=1.0)
    #[serde(default = "default_stiffness")]
    pub stiffness: f32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            posture: default_posture(),
            posture_speed: default_posture_speed(),
            stiffness: default_stiffness(),
        }
    }
}

/// Camera subscription
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CameraConfig {
    #[serde(default)]
    pub resolution: Resolution,
    #[serde(default)]
    pub color_space: ColorSpace,
    #[serde(default = "default_fps")]
    pub fps: u32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            resolution: Resolution::default(),
            color_space: ColorSpace::default(),
            fps: default_fps(),
        }
    }
}

// Default value functions
fn default_bind_address() -> String {
    "localhost:10000".to_string()
}
fn default_recv_buffer_size() -> usize {
    1024
}
fn default_device_type() -> String {
    "mock".to_string()
}
fn default_device_name() -> String {
    "Simulated NAO".to_string()
}
fn default_rate_hz() -> f32 {
    50.0
}
fn default_max_speed() -> f32 {
    0.5
}
fn default_left_arm_rest() -> [f32; 3] {
    [0.05, 0.11, -0.08]
}
fn default_right_arm_rest() -> [f32; 3] {
    [0.05, -0.11, -0.08]
}
fn default_pose_noise_stddev() -> f32 {
    0.0005
}
fn default_pixel_noise() -> u8 {
    6
}
fn default_arm_length() -> f32 {
    0.21
}
fn default_move_speed() -> f32 {
    0.2
}
fn default_true() -> bool {
    true
}
fn default_greeting() -> String {
    "Connected to robot".to_string()
}
fn default_tick_ms() -> u64 {
    33
} // ~30 Hz, matches default camera rate
fn default_telemetry_limb() -> Limb {
    Limb::LeftArm
}
fn default_posture() -> String {
    "StandInit".to_string()
}
fn default_posture_speed() -> f32 {
    0.5
}
fn default_stiffness() -> f32 {
    1.0
}
fn default_fps() -> u32 {
    30
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the bridge cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.network.recv_buffer_size == 0 {
            return Err(Error::Config("network.recv_buffer_size must be > 0".into()));
        }
        if !self.bridge.arm_length.is_finite() || self.bridge.arm_length <= 0.0 {
            return Err(Error::Config("bridge.arm_length must be positive".into()));
        }
        if !(0.0..=1.0).contains(&self.bridge.move_speed) {
            return Err(Error::Config("bridge.move_speed must be in 0.0..=1.0".into()));
        }
        if !(0.0..=1.0).contains(&self.session.stiffness) {
            return Err(Error::Config("session.stiffness must be in 0.0..=1.0".into()));
        }
        if self.camera.fps == 0 {
            return Err(Error::Config("camera.fps must be > 0".into()));
        }
        self.device.simulation.validate()
    }
}

impl SimulationConfig {
    /// Motion rate bounds accepted by the simulator
    pub const RATE_HZ_RANGE: std::ops::RangeInclusive<f32> = 1.0..=1000.0;

    /// Reject parameters the simulated robot cannot run with
    pub fn validate(&self) -> Result<()> {
        if !Self::RATE_HZ_RANGE.contains(&self.rate_hz) {
            return Err(Error::Config(format!(
                "device.simulation.rate_hz must be in {:?}, got {}",
                Self::RATE_HZ_RANGE,
                self.rate_hz
            )));
        }
        if !self.max_speed.is_finite() || self.max_speed < 0.0 {
            return Err(Error::Config(
                "device.simulation.max_speed must be >= 0".into(),
            ));
        }
        if !self.pose_noise_stddev.is_finite() || self.pose_noise_stddev < 0.0 {
            return Err(Error::Config(
                "device.simulation.pose_noise_stddev must be >= 0".into(),
            ));
        }
        Ok(())
    }
}
