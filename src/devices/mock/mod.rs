//! Mock device for hardware-free bridge testing
//!
//! Simulates the parts of a humanoid robot the bridge uses:
//!
//! | Component | Simulation Method |
//! |-----------|-------------------|
//! | Arms (LArm/RArm) | Hand position slews toward target at `speed * max_speed` |
//! | Stiffness | Limp arms (stiffness 0) ignore targets |
//! | Posture | Named postures reset both hands to their rest positions |
//! | Speech | Logged and kept in a short history |
//! | Camera | Synthetic frames from a capture thread per subscription |
//!
//! # Configuration
//!
//! ```toml
//! [device]
//! type = "mock"
//! name = "Simulated NAO"
//!
//! [device.simulation]
//! rate_hz = 50.0
//! max_speed = 0.5
//! left_arm_rest = [0.05, 0.11, -0.08]
//! right_arm_rest = [0.05, -0.11, -0.08]
//! pose_noise_stddev = 0.0005
//! random_seed = 42      # 0 = random each run
//! ```
//!
//! # Thread Model
//!
//! ```text
//! ┌─────────────────┐     ┌─────────────────┐
//! │  Bridge thread  │────▶│   SharedState   │◀──── mock-motion (rate_hz)
//! │ (trait calls)   │     │ (parking_lot)   │
//! └────────┬────────┘     └─────────────────┘
//!          │ get_frame
//!          ▼
//! ┌─────────────────┐
//! │ bounded(1) chan │◀──── mock-camera-N (fps)
//! └─────────────────┘
//! ```

mod camera;
mod noise;

pub use camera::{FrameGenerator, MockCamera};
pub use noise::NoiseGenerator;

use crate::config::{DeviceConfig, SimulationConfig};
use crate::core::driver::{Device, Motion, Speech};
use crate::core::types::{AxisMask, Frame, Limb, Pose6, Vec3};
use crate::error::{Error, Result};
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Postures the simulated robot knows
pub const POSTURES: [&str; 8] = [
    "Stand",
    "StandInit",
    "StandZero",
    "Crouch",
    "Sit",
    "SitRelax",
    "LyingBelly",
    "LyingBack",
];

/// Posture assumed on `rest()`
const REST_POSTURE: &str = "Crouch";

/// Torso origin height above the ground plane (World/Robot frames)
const TORSO_HEIGHT: f32 = 0.33;

/// Utterances kept for inspection
const SPEECH_HISTORY: usize = 64;

/// Simulated state of one arm
#[derive(Debug, Clone, Copy)]
struct ArmState {
    rest: Vec3,
    current: Vec3,
    target: Vec3,
    speed: f32,
    stiffness: f32,
}

impl ArmState {
    fn new(rest: Vec3) -> Self {
        Self {
            rest,
            current: rest,
            target: rest,
            speed: 0.0,
            stiffness: 0.0,
        }
    }

    fn reset(&mut self) {
        self.current = self.rest;
        self.target = self.rest;
    }

    /// Advance toward target by at most `speed * max_speed * dt`
    fn step(&mut self, dt: f32, max_speed: f32) {
        if self.stiffness <= 0.0 {
            return;
        }
        let delta = self.target - self.current;
        let distance = delta.norm();
        let max_step = self.speed * max_speed * dt;
        if distance <= max_step {
            self.current = self.target;
        } else if distance > 0.0 {
            self.current = self.current + delta * (max_step / distance);
        }
    }
}

/// Robot state shared between trait objects and the motion thread
struct RobotState {
    awake: bool,
    posture: String,
    arms: [ArmState; 2],
    spoken: Vec<String>,
}

impl RobotState {
    fn new(config: &SimulationConfig) -> Self {
        Self {
            awake: false,
            posture: REST_POSTURE.to_string(),
            arms: [
                ArmState::new(Vec3::from(config.left_arm_rest)),
                ArmState::new(Vec3::from(config.right_arm_rest)),
            ],
            spoken: Vec::new(),
        }
    }

    fn arm(&self, limb: Limb) -> &ArmState {
        &self.arms[arm_index(limb)]
    }

    fn arm_mut(&mut self, limb: Limb) -> &mut ArmState {
        &mut self.arms[arm_index(limb)]
    }
}

fn arm_index(limb: Limb) -> usize {
    match limb {
        Limb::LeftArm => 0,
        Limb::RightArm => 1,
    }
}

struct SharedState {
    robot: Mutex<RobotState>,
    shutdown: AtomicBool,
}

/// Read-only view of the simulated robot, for tests and diagnostics
#[derive(Clone)]
pub struct MockInspector {
    shared: Arc<SharedState>,
}

impl MockInspector {
    pub fn is_awake(&self) -> bool {
        self.shared.robot.lock().awake
    }

    pub fn posture(&self) -> String {
        self.shared.robot.lock().posture.clone()
    }

    pub fn stiffness(&self, limb: Limb) -> f32 {
        self.shared.robot.lock().arm(limb).stiffness
    }

    /// Simulated (noise-free) hand position
    pub fn hand_position(&self, limb: Limb) -> Vec3 {
        self.shared.robot.lock().arm(limb).current
    }

    pub fn hand_target(&self, limb: Limb) -> Vec3 {
        self.shared.robot.lock().arm(limb).target
    }

    pub fn spoken(&self) -> Vec<String> {
        self.shared.robot.lock().spoken.clone()
    }
}

/// Build the simulated robot described by `config`
pub fn create_mock_device(config: &DeviceConfig) -> Result<(Device, MockInspector)> {
    config.simulation.validate()?;
    let sim = config.simulation.clone();
    let shared = Arc::new(SharedState {
        robot: Mutex::new(RobotState::new(&sim)),
        shutdown: AtomicBool::new(false),
    });

    let motion = MockMotion::start(sim.clone(), Arc::clone(&shared))?;
    let speech = MockSpeech {
        name: config.name.clone(),
        shared: Arc::clone(&shared),
    };
    let camera = MockCamera::new(sim.pixel_noise, sim.random_seed);

    log::info!("Mock device '{}' ready", config.name);

    let device = Device {
        name: config.name.clone(),
        motion: Box::new(motion),
        speech: Box::new(speech),
        camera: Box::new(camera),
    };
    Ok((device, MockInspector { shared }))
}

/// Simulated motion subsystem
pub struct MockMotion {
    shared: Arc<SharedState>,
    noise: NoiseGenerator,
    pose_noise_stddev: f32,
    simulation_handle: Option<JoinHandle<()>>,
}

impl MockMotion {
    fn start(config: SimulationConfig, shared: Arc<SharedState>) -> Result<Self> {
        let noise = NoiseGenerator::new(config.random_seed);
        let pose_noise_stddev = config.pose_noise_stddev;
        let thread_shared = Arc::clone(&shared);

        let handle = thread::Builder::new()
            .name("mock-motion".to_string())
            .spawn(move || simulation_loop(config, thread_shared))
            .map_err(|e| Error::Other(format!("Failed to spawn motion thread: {}", e)))?;

        Ok(Self {
            shared,
            noise,
            pose_noise_stddev,
            simulation_handle: Some(handle),
        })
    }

    fn shutdown(&mut self) {
        self.shared.shutdown.store(true, Ordering::Relaxed);
        if let Some(handle) = self.simulation_handle.take() {
            let _ = handle.join();
        }
    }
}

/// Torso-frame offset of a reference frame's origin
fn frame_offset(frame: Frame) -> Vec3 {
    match frame {
        Frame::Torso => Vec3::zero(),
        Frame::World | Frame::Robot => Vec3::new(0.0, 0.0, TORSO_HEIGHT),
    }
}

fn check_speed(speed: f32) -> Result<()> {
    if !(0.0..=1.0).contains(&speed) {
        return Err(Error::InvalidParameter(format!(
            "speed must be in 0.0..=1.0, got {}",
            speed
        )));
    }
    Ok(())
}

impl Motion for MockMotion {
    fn wake_up(&mut self) -> Result<()> {
        let mut robot = self.shared.robot.lock();
        robot.awake = true;
        for arm in robot.arms.iter_mut() {
            arm.stiffness = 1.0;
        }
        log::info!("Mock robot awake");
        Ok(())
    }

    fn rest(&mut self) -> Result<()> {
        let mut robot = self.shared.robot.lock();
        robot.awake = false;
        robot.posture = REST_POSTURE.to_string();
        for arm in robot.arms.iter_mut() {
            arm.reset();
            arm.stiffness = 0.0;
        }
        log::info!("Mock robot resting");
        Ok(())
    }

    fn go_to_posture(&mut self, name: &str, speed: f32) -> Result<()> {
        check_speed(speed)?;
        if !POSTURES.contains(&name) {
            return Err(Error::InvalidParameter(format!("unknown posture {:?}", name)));
        }

        let mut robot = self.shared.robot.lock();
        if !robot.awake {
            return Err(Error::Actuator(format!(
                "cannot go to {} while not awake",
                name
            )));
        }
        robot.posture = name.to_string();
        for arm in robot.arms.iter_mut() {
            arm.reset();
        }
        log::info!("Mock robot posture: {}", name);
        Ok(())
    }

    fn set_stiffness(&mut self, limbs: &[Limb], values: &[f32]) -> Result<()> {
        if limbs.len() != values.len() {
            return Err(Error::InvalidParameter(format!(
                "{} limbs but {} stiffness values",
                limbs.len(),
                values.len()
            )));
        }

        let mut robot = self.shared.robot.lock();
        for (limb, value) in limbs.iter().zip(values) {
            robot.arm_mut(*limb).stiffness = value.clamp(0.0, 1.0);
        }
        log::debug!("Stiffness {:?} = {:?}", limbs, values);
        Ok(())
    }

    fn get_pose(&mut self, limb: Limb, frame: Frame, use_sensor: bool) -> Result<Pose6> {
        let position = {
            let robot = self.shared.robot.lock();
            let arm = robot.arm(limb);
            if use_sensor { arm.current } else { arm.target }
        };

        let mut position = position + frame_offset(frame);
        if use_sensor {
            let stddev = self.pose_noise_stddev;
            position = position
                + Vec3::new(
                    self.noise.gaussian(stddev),
                    self.noise.gaussian(stddev),
                    self.noise.gaussian(stddev),
                );
        }
        Ok(Pose6::from_position(position))
    }

    fn move_to(
        &mut self,
        limb: Limb,
        target: Pose6,
        speed: f32,
        frame: Frame,
        mask: AxisMask,
    ) -> Result<()> {
        check_speed(speed)?;

        let mut robot = self.shared.robot.lock();
        if !robot.awake || robot.arm(limb).stiffness <= 0.0 {
            log::warn!("{} move ignored: arm not stiff (wake up first)", limb);
            return Ok(());
        }
        if mask == AxisMask::Full {
            log::debug!("{} rotation target ignored by simulation", limb);
        }

        let arm = robot.arm_mut(limb);
        arm.target = target.position() - frame_offset(frame);
        arm.speed = speed;
        Ok(())
    }
}

impl Drop for MockMotion {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Simulated speech: logs and records utterances
pub struct MockSpeech {
    name: String,
    shared: Arc<SharedState>,
}

impl Speech for MockSpeech {
    fn say(&mut self, text: &str) -> Result<()> {
        log::info!("[{}] says: {}", self.name, text);
        let mut robot = self.shared.robot.lock();
        if robot.spoken.len() == SPEECH_HISTORY {
            robot.spoken.remove(0);
        }
        robot.spoken.push(text.to_string());
        Ok(())
    }
}

/// Motion simulation loop
fn simulation_loop(config: SimulationConfig, shared: Arc<SharedState>) {
    let interval = Duration::from_secs_f32(1.0 / config.rate_hz);
    let mut last_time = Instant::now();

    log::debug!("Motion simulation started: interval={:?}", interval);

    while !shared.shutdown.load(Ordering::Relaxed) {
        let loop_start = Instant::now();
        let dt = loop_start.duration_since(last_time).as_secs_f32();
        last_time = loop_start;

        {
            let mut robot = shared.robot.lock();
            for arm in robot.arms.iter_mut() {
                arm.step(dt, config.max_speed);
            }
        }

        let elapsed = loop_start.elapsed();
        if elapsed < interval {
            thread::sleep(interval - elapsed);
        }
    }

    log::debug!("Motion simulation terminated");
}
