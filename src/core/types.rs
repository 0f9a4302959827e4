//! Core data types shared by the protocol, the bridge and device drivers.
//!
//! Key types for device implementers:
//! - [`Limb`]: The enumerated set of limbs the bridge can drive
//! - [`Pose6`]: Position + orientation, the unit of motion targets and pose queries
//! - [`ImageFrame`]: One raw camera buffer handed out by a [`Camera`](super::driver::Camera)

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Mul, Sub};

/// 3-component vector (metres in the robot frame, tracker units in the client frame)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    /// Create new vector
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Zero vector
    pub const fn zero() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }

    /// Euclidean length
    pub fn norm(&self) -> f32 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }
}

impl Add for Vec3 {
    type Output = Vec3;

    fn add(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Vec3 {
    type Output = Vec3;

    fn sub(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul<f32> for Vec3 {
    type Output = Vec3;

    fn mul(self, rhs: f32) -> Vec3 {
        Vec3::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

impl From<[f32; 3]> for Vec3 {
    fn from(v: [f32; 3]) -> Self {
        Self::new(v[0], v[1], v[2])
    }
}

/// 6-DOF pose: position (x, y, z) and rotation (wx, wy, wz)
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Pose6 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub wx: f32,
    pub wy: f32,
    pub wz: f32,
}

impl Pose6 {
    /// Pose at `position` with zero rotation
    pub fn from_position(position: Vec3) -> Self {
        Self {
            x: position.x,
            y: position.y,
            z: position.z,
            ..Self::default()
        }
    }

    /// Position part of the pose
    pub fn position(&self) -> Vec3 {
        Vec3::new(self.x, self.y, self.z)
    }

    /// Rotation part of the pose
    pub fn rotation(&self) -> Vec3 {
        Vec3::new(self.wx, self.wy, self.wz)
    }

    /// Components in wire order
    pub fn to_array(&self) -> [f32; 6] {
        [self.x, self.y, self.z, self.wx, self.wy, self.wz]
    }
}

/// Limbs the bridge is allowed to drive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Limb {
    #[serde(rename = "LArm")]
    LeftArm,
    #[serde(rename = "RArm")]
    RightArm,
}

impl Limb {
    /// Every supported limb
    pub const ALL: [Limb; 2] = [Limb::LeftArm, Limb::RightArm];

    /// Exact, case-sensitive lookup by effector name
    pub fn from_name(name: &str) -> Option<Limb> {
        Self::ALL.into_iter().find(|limb| limb.name() == name)
    }

    /// Effector name used by the protocol and the motion driver
    pub fn name(&self) -> &'static str {
        match self {
            Limb::LeftArm => "LArm",
            Limb::RightArm => "RArm",
        }
    }

    /// Tag used for outbound pose telemetry
    pub fn telemetry_tag(&self) -> &'static str {
        match self {
            Limb::LeftArm => "LARM",
            Limb::RightArm => "RARM",
        }
    }
}

impl fmt::Display for Limb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Reference frame for pose queries and targets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Frame {
    Torso = 0,
    World = 1,
    Robot = 2,
}

/// Which pose axes a motion target controls
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum AxisMask {
    /// x, y, z only
    Position = 7,
    /// Position and rotation
    Full = 63,
}

/// Camera resolution presets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Resolution {
    Qqvga,
    #[default]
    Qvga,
    Vga,
}

impl Resolution {
    /// (width, height) in pixels
    pub fn dimensions(&self) -> (u32, u32) {
        match self {
            Resolution::Qqvga => (160, 120),
            Resolution::Qvga => (320, 240),
            Resolution::Vga => (640, 480),
        }
    }
}

/// Pixel layout of camera frames
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorSpace {
    #[default]
    Rgb,
    Bgr,
    Yuv422,
    /// Luma only (grayscale)
    Y,
}

impl ColorSpace {
    /// Bytes used per pixel
    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            ColorSpace::Rgb | ColorSpace::Bgr => 3,
            ColorSpace::Yuv422 => 2,
            ColorSpace::Y => 1,
        }
    }
}

/// Opaque handle for a camera subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CameraHandle(pub u32);

/// One raw camera buffer
#[derive(Debug, Clone, PartialEq)]
pub struct ImageFrame {
    pub width: u32,
    pub height: u32,
    pub color_space: ColorSpace,
    pub data: Vec<u8>,
}

impl ImageFrame {
    /// Payload length in bytes
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Byte count implied by dimensions and color space
    pub fn expected_len(&self) -> usize {
        self.width as usize * self.height as usize * self.color_space.bytes_per_pixel()
    }
}
