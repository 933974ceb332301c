/*!
Math aliases and the rigid pose type exchanged between the scene and the solver.

This module intentionally contains no algorithms beyond pose composition. The
scene side speaks in world position/rotation pairs; the solver side speaks in
isometries. `Pose` is the bridge between the two.
*/

use nalgebra as na;

/// Common math aliases for clarity and consistency.
pub type Vec3 = na::Vector3<f32>;
pub type Quat = na::UnitQuaternion<f32>;
pub type Iso = na::Isometry3<f32>;
pub type Point3 = na::Point3<f32>;

/// A rigid transform (translation + rotation, no scale).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Pose {
    pub translation: Vec3,
    pub rotation: Quat,
}

impl Default for Pose {
    fn default() -> Self {
        Self::identity()
    }
}

impl Pose {
    #[inline]
    pub fn identity() -> Self {
        Self::new(Vec3::zeros(), Quat::identity())
    }

    #[inline]
    pub fn new(translation: Vec3, rotation: Quat) -> Self {
        Self {
            translation,
            rotation,
        }
    }

    #[inline]
    pub fn from_translation(translation: Vec3) -> Self {
        Self::new(translation, Quat::identity())
    }

    /// Convert to nalgebra `Isometry3` for use as a rapier position or joint frame.
    #[inline]
    pub fn iso(&self) -> Iso {
        Iso::from_parts(
            na::Translation3::new(self.translation.x, self.translation.y, self.translation.z),
            self.rotation,
        )
    }

    /// Express `child` (a world pose) in the local frame of `self`.
    pub fn relative(&self, child: &Pose) -> Pose {
        let inv = self.rotation.inverse();
        Pose::new(
            inv * (child.translation - self.translation),
            inv * child.rotation,
        )
    }

    /// Transform a point expressed in this pose's local frame into world space.
    #[inline]
    pub fn transform_point(&self, local: &Vec3) -> Vec3 {
        self.translation + self.rotation * local
    }
}
