//! Collaborator traits for robot hardware
//!
//! The bridge never talks to a robot SDK directly. A device implementation
//! provides one object per concern, bundled in a [`Device`].

use crate::core::types::{
    AxisMask, CameraHandle, ColorSpace, Frame, ImageFrame, Limb, Pose6, Resolution,
};
use crate::error::Result;

/// Motion subsystem: posture, stiffness and Cartesian limb control
pub trait Motion: Send {
    /// Power up the joints
    fn wake_up(&mut self) -> Result<()>;

    /// Go to a safe resting position and remove stiffness
    fn rest(&mut self) -> Result<()>;

    /// Move the whole body to a named posture
    fn go_to_posture(&mut self, name: &str, speed: f32) -> Result<()>;

    /// Set stiffness per limb, `values` in 0.0..=1.0, one per limb
    fn set_stiffness(&mut self, limbs: &[Limb], values: &[f32]) -> Result<()>;

    /// Current pose of a limb's end effector
    fn get_pose(&mut self, limb: Limb, frame: Frame, use_sensor: bool) -> Result<Pose6>;

    /// Move a limb to an absolute pose
    ///
    /// `speed` is a fraction of maximum speed (0.0..=1.0).
    fn move_to(
        &mut self,
        limb: Limb,
        target: Pose6,
        speed: f32,
        frame: Frame,
        mask: AxisMask,
    ) -> Result<()>;
}

/// Speech synthesizer
pub trait Speech: Send {
    fn say(&mut self, text: &str) -> Result<()>;
}

/// Camera source
pub trait Camera: Send {
    /// Start capturing; frames become available through `get_frame`
    fn subscribe(
        &mut self,
        resolution: Resolution,
        color_space: ColorSpace,
        fps: u32,
    ) -> Result<CameraHandle>;

    /// Freshest frame captured since the last call, or `None` if none is ready
    fn get_frame(&mut self, handle: CameraHandle) -> Result<Option<ImageFrame>>;

    /// Return the frame buffer obtained by the last `get_frame`
    fn release_frame(&mut self, handle: CameraHandle) -> Result<()>;

    /// Stop capturing
    fn unsubscribe(&mut self, handle: CameraHandle) -> Result<()>;
}

/// Set of collaborators that make up one robot
pub struct Device {
    pub name: String,
    pub motion: Box<dyn Motion>,
    pub speech: Box<dyn Speech>,
    pub camera: Box<dyn Camera>,
}

impl std::fmt::Debug for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Device").field("name", &self.name).finish()
    }
}
