//! Actuator session: scoped ownership of the robot for one client connection
//!
//! Opening a session wakes the robot, puts it in the start posture, stiffens
//! the arms, captures each arm's reference position and (optionally)
//! subscribes to the camera. Dropping the session undoes all of it, whatever
//! path the bridge loop exits through.
//!
//! ```text
//! open:  wake_up -> go_to_posture -> set_stiffness -> capture refs -> subscribe
//! drop:  unsubscribe -> rest
//! ```

use crate::config::{CameraConfig, SessionConfig};
use crate::core::driver::Device;
use crate::core::types::{AxisMask, CameraHandle, Frame, ImageFrame, Limb, Pose6, Vec3};
use crate::error::Result;
use log::{debug, info, warn};

/// Per-limb anchor positions, captured once at session start
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ReferencePoses {
    left_arm: Vec3,
    right_arm: Vec3,
}

impl ReferencePoses {
    pub fn new(left_arm: Vec3, right_arm: Vec3) -> Self {
        Self {
            left_arm,
            right_arm,
        }
    }

    /// Reference position for a limb
    pub fn get(&self, limb: Limb) -> Vec3 {
        match limb {
            Limb::LeftArm => self.left_arm,
            Limb::RightArm => self.right_arm,
        }
    }
}

/// The robot, as owned by one connection
pub struct ActuatorSession {
    device: Device,
    references: ReferencePoses,
    camera: Option<CameraHandle>,
    closed: bool,
}

impl ActuatorSession {
    /// Acquire the robot for a connection
    ///
    /// If any step fails the partially opened session is dropped, which
    /// sends the robot back to rest.
    pub fn open(
        device: Device,
        config: &SessionConfig,
        camera: Option<&CameraConfig>,
    ) -> Result<Self> {
        let mut session = Self {
            device,
            references: ReferencePoses::default(),
            camera: None,
            closed: false,
        };
        info!("Opening actuator session on {}", session.device.name);

        let motion = session.device.motion.as_mut();
        motion.wake_up()?;
        motion.go_to_posture(&config.posture, config.posture_speed)?;
        let stiffness = vec![config.stiffness; Limb::ALL.len()];
        motion.set_stiffness(&Limb::ALL, &stiffness)?;

        let left = motion.get_pose(Limb::LeftArm, Frame::Torso, true)?;
        let right = motion.get_pose(Limb::RightArm, Frame::Torso, true)?;
        session.references = ReferencePoses::new(left.position(), right.position());
        info!(
            "Reference poses captured: LArm={:?} RArm={:?}",
            session.references.left_arm, session.references.right_arm
        );

        if let Some(cam) = camera {
            let handle = session
                .device
                .camera
                .subscribe(cam.resolution, cam.color_space, cam.fps)?;
            info!(
                "Camera subscribed: {:?} {:?} @ {} fps",
                cam.resolution, cam.color_space, cam.fps
            );
            session.camera = Some(handle);
        }

        Ok(session)
    }

    pub fn device_name(&self) -> &str {
        &self.device.name
    }

    /// Reference position captured for `limb` at session start
    pub fn reference_pose(&self, limb: Limb) -> Vec3 {
        self.references.get(limb)
    }

    /// Send a limb to an absolute torso-frame position
    pub fn move_limb(&mut self, limb: Limb, target: Pose6, speed: f32) -> Result<()> {
        debug!("move_to {} -> {:?} (speed {})", limb, target.to_array(), speed);
        self.device
            .motion
            .move_to(limb, target, speed, Frame::Torso, AxisMask::Position)
    }

    /// Current sensed pose of a limb, torso frame
    pub fn limb_pose(&mut self, limb: Limb) -> Result<Pose6> {
        self.device.motion.get_pose(limb, Frame::Torso, true)
    }

    pub fn say(&mut self, text: &str) -> Result<()> {
        self.device.speech.say(text)
    }

    /// Whether the session holds a camera subscription
    pub fn has_camera(&self) -> bool {
        self.camera.is_some()
    }

    /// Freshest camera frame, `None` without a subscription or new frame
    pub fn grab_frame(&mut self) -> Result<Option<ImageFrame>> {
        match self.camera {
            Some(handle) => self.device.camera.get_frame(handle),
            None => Ok(None),
        }
    }

    /// Hand the last grabbed frame buffer back to the camera
    pub fn release_frame(&mut self) -> Result<()> {
        match self.camera {
            Some(handle) => self.device.camera.release_frame(handle),
            None => Ok(()),
        }
    }

    /// Tear the session down now instead of at drop
    pub fn close(mut self) {
        self.teardown();
    }

    fn teardown(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        info!("Closing actuator session on {}", self.device.name);

        if let Some(handle) = self.camera.take()
            && let Err(e) = self.device.camera.unsubscribe(handle)
        {
            warn!("Camera unsubscribe failed: {}", e);
        }
        if let Err(e) = self.device.motion.rest() {
            warn!("Failed to return robot to rest: {}", e);
        }
    }
}

impl Drop for ActuatorSession {
    fn drop(&mut self) {
        self.teardown();
    }
}
