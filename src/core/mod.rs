//! Core types and collaborator traits

pub mod driver;
pub mod types;

pub use driver::{Camera, Device, Motion, Speech};
pub use types::{
    AxisMask, CameraHandle, ColorSpace, Frame, ImageFrame, Limb, Pose6, Resolution, Vec3,
};
