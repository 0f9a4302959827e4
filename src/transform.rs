//! Tracker-to-robot coordinate transform
//!
//! The tracking client reports hand positions relative to the tracked
//! shoulder, in its own axis convention:
//!
//! ```text
//! tracker:  x = right,   y = up,   z = forward (depth)
//! robot:    x = forward, y = left, z = up
//! ```
//!
//! The basis change is therefore `(x, y, z) -> (z, -x, y)`. The result is
//! scaled by the arm length and added to the limb's reference position.

use crate::core::types::{Pose6, Vec3};

/// Map a tracker-frame vector onto robot axes (no scaling)
#[inline]
pub fn permute(tracked: Vec3) -> Vec3 {
    Vec3::new(tracked.z, -tracked.x, tracked.y)
}

/// Compute the absolute target pose for a tracked hand position
///
/// Orientation is always zero; rotation is not controlled. Inputs must be
/// finite; the protocol parser rejects anything else.
pub fn transform(reference: Vec3, tracked: Vec3, scale: f32) -> Pose6 {
    Pose6::from_position(reference + permute(tracked) * scale)
}
