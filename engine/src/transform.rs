use physics::{Quat, Vec3};

/// Parent-relative transform of a GameObject (translation, rotation, scale).
///
/// World transforms are obtained by composing from the root down with
/// [`Transform::then`]. Scale is composed component-wise; shear from rotated,
/// non-uniformly scaled parents is ignored.
#[derive(Debug, PartialEq, Clone, Copy)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::zeros(),
            rotation: Quat::identity(),
            scale: Vec3::repeat(1.0),
        }
    }
}

impl Transform {
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Self::default()
        }
    }

    pub fn with_rotation(mut self, rotation: Quat) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn with_scale(mut self, scale: Vec3) -> Self {
        self.scale = scale;
        self
    }

    /// World transform of a child whose local transform is `local`, when `self`
    /// is the parent's world transform.
    pub fn then(&self, local: &Transform) -> Transform {
        Transform {
            position: self.position + self.rotation * self.scale.component_mul(&local.position),
            rotation: self.rotation * local.rotation,
            scale: self.scale.component_mul(&local.scale),
        }
    }

    /// Local position/rotation a child needs to sit at the given world pose,
    /// when `self` is the parent's world transform.
    pub fn local_from_world(&self, position: &Vec3, rotation: &Quat) -> (Vec3, Quat) {
        let inv = self.rotation.inverse();
        let local = inv * (position - self.position);
        let scale = self.scale.map(|s| if s.abs() > f32::EPSILON { s } else { 1.0 });
        (local.component_div(&scale), inv * rotation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    fn approx(a: &Vec3, b: &Vec3) -> bool {
        (a - b).norm() < 1e-5
    }

    #[test]
    fn then_applies_parent_scale_and_rotation() {
        let parent = Transform::from_position(Vec3::new(10.0, 0.0, 0.0))
            .with_rotation(Quat::from_euler_angles(0.0, FRAC_PI_2, 0.0))
            .with_scale(Vec3::new(2.0, 2.0, 2.0));
        let child = Transform::from_position(Vec3::new(1.0, 0.0, 0.0));

        let world = parent.then(&child);
        // +X rotated a quarter turn around Y lands on -Z.
        assert!(approx(&world.position, &Vec3::new(10.0, 0.0, -2.0)));
        assert!(approx(&world.scale, &Vec3::new(2.0, 2.0, 2.0)));
    }

    #[test]
    fn local_from_world_inverts_then() {
        let parent = Transform::from_position(Vec3::new(1.0, 2.0, 3.0))
            .with_rotation(Quat::from_euler_angles(0.3, -0.2, 0.9))
            .with_scale(Vec3::new(1.0, 3.0, 0.5));
        let local = Transform::from_position(Vec3::new(-4.0, 0.5, 2.0))
            .with_rotation(Quat::from_euler_angles(0.1, 0.0, 0.0));

        let world = parent.then(&local);
        let (p, r) = parent.local_from_world(&world.position, &world.rotation);
        assert!(approx(&p, &local.position));
        assert!(r.angle_to(&local.rotation) < 1e-5);
    }
}
