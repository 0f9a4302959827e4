//! Recording robot double shared by the integration tests

#![allow(dead_code)]

use hasta_bridge::core::{
    AxisMask, Camera, CameraHandle, ColorSpace, Device, Frame, ImageFrame, Limb, Motion, Pose6,
    Resolution, Speech, Vec3,
};
use hasta_bridge::{Error, Result};
use parking_lot::Mutex;
use std::sync::Arc;

/// One collaborator call, in the order it was made
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    WakeUp,
    Rest,
    GoToPosture(String),
    SetStiffness(Vec<Limb>, Vec<f32>),
    GetPose(Limb),
    MoveTo(Limb, Pose6, f32),
    Say(String),
    Subscribe(Resolution, ColorSpace, u32),
    GetFrame,
    ReleaseFrame,
    Unsubscribe,
}

#[derive(Default)]
struct RecorderInner {
    calls: Vec<Call>,
    left_reference: Vec3,
    right_reference: Vec3,
    fail_moves: bool,
    fail_speech: bool,
    fail_posture: bool,
    frame: Option<ImageFrame>,
}

/// Handle on the double's call log and behaviour switches
#[derive(Clone, Default)]
pub struct Recorder {
    inner: Arc<Mutex<RecorderInner>>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Positions reported by `get_pose` for each arm
    pub fn set_references(&self, left: Vec3, right: Vec3) {
        let mut inner = self.inner.lock();
        inner.left_reference = left;
        inner.right_reference = right;
    }

    pub fn fail_moves(&self, fail: bool) {
        self.inner.lock().fail_moves = fail;
    }

    pub fn fail_speech(&self, fail: bool) {
        self.inner.lock().fail_speech = fail;
    }

    pub fn fail_posture(&self, fail: bool) {
        self.inner.lock().fail_posture = fail;
    }

    /// Frame returned by every `get_frame`
    pub fn set_frame(&self, frame: ImageFrame) {
        self.inner.lock().frame = Some(frame);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.inner.lock().calls.clone()
    }

    pub fn clear(&self) {
        self.inner.lock().calls.clear();
    }

    pub fn count(&self, matches: impl Fn(&Call) -> bool) -> usize {
        self.inner.lock().calls.iter().filter(|c| matches(c)).count()
    }

    pub fn moves(&self) -> Vec<(Limb, Pose6, f32)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::MoveTo(limb, pose, speed) => Some((limb, pose, speed)),
                _ => None,
            })
            .collect()
    }

    pub fn spoken(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Say(text) => Some(text),
                _ => None,
            })
            .collect()
    }

    /// Device whose collaborators all log into this recorder
    pub fn device(&self) -> Device {
        Device {
            name: "Recording NAO".to_string(),
            motion: Box::new(RecordingMotion(self.clone())),
            speech: Box::new(RecordingSpeech(self.clone())),
            camera: Box::new(RecordingCamera(self.clone())),
        }
    }

    fn record(&self, call: Call) {
        self.inner.lock().calls.push(call);
    }
}

struct RecordingMotion(Recorder);

impl Motion for RecordingMotion {
    fn wake_up(&mut self) -> Result<()> {
        self.0.record(Call::WakeUp);
        Ok(())
    }

    fn rest(&mut self) -> Result<()> {
        self.0.record(Call::Rest);
        Ok(())
    }

    fn go_to_posture(&mut self, name: &str, _speed: f32) -> Result<()> {
        self.0.record(Call::GoToPosture(name.to_string()));
        if self.0.inner.lock().fail_posture {
            return Err(Error::Actuator("posture failed".into()));
        }
        Ok(())
    }

    fn set_stiffness(&mut self, limbs: &[Limb], values: &[f32]) -> Result<()> {
        self.0
            .record(Call::SetStiffness(limbs.to_vec(), values.to_vec()));
        Ok(())
    }

    fn get_pose(&mut self, limb: Limb, _frame: Frame, _use_sensor: bool) -> Result<Pose6> {
        self.0.record(Call::GetPose(limb));
        let inner = self.0.inner.lock();
        let position = match limb {
            Limb::LeftArm => inner.left_reference,
            Limb::RightArm => inner.right_reference,
        };
        Ok(Pose6::from_position(position))
    }

    fn move_to(
        &mut self,
        limb: Limb,
        target: Pose6,
        speed: f32,
        _frame: Frame,
        _mask: AxisMask,
    ) -> Result<()> {
        self.0.record(Call::MoveTo(limb, target, speed));
        if self.0.inner.lock().fail_moves {
            return Err(Error::Actuator("joint limit".into()));
        }
        Ok(())
    }
}

struct RecordingSpeech(Recorder);

impl Speech for RecordingSpeech {
    fn say(&mut self, text: &str) -> Result<()> {
        self.0.record(Call::Say(text.to_string()));
        if self.0.inner.lock().fail_speech {
            return Err(Error::Actuator("tts unavailable".into()));
        }
        Ok(())
    }
}

struct RecordingCamera(Recorder);

impl Camera for RecordingCamera {
    fn subscribe(
        &mut self,
        resolution: Resolution,
        color_space: ColorSpace,
        fps: u32,
    ) -> Result<CameraHandle> {
        self.0.record(Call::Subscribe(resolution, color_space, fps));
        Ok(CameraHandle(7))
    }

    fn get_frame(&mut self, _handle: CameraHandle) -> Result<Option<ImageFrame>> {
        self.0.record(Call::GetFrame);
        Ok(self.0.inner.lock().frame.clone())
    }

    fn release_frame(&mut self, _handle: CameraHandle) -> Result<()> {
        self.0.record(Call::ReleaseFrame);
        Ok(())
    }

    fn unsubscribe(&mut self, _handle: CameraHandle) -> Result<()> {
        self.0.record(Call::Unsubscribe);
        Ok(())
    }
}
