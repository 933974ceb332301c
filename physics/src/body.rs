/*!
Native rigid bodies: one dynamic body per Rigidbody component, one static body
per collider that has no rigidbody above it.

The body wrapper mirrors the component's parameters (`RigidbodyDesc`) and the
last read-back velocities, so the scene can read them without touching the
solver. All mutation goes through the world's `RigidBodySet`.
*/

use rapier3d::prelude::*;

use crate::constants::{DEFAULT_INERTIA, DEFAULT_MASS, POSE_EPS};
use crate::flags::RotationLocks;
use crate::ids::{ColliderId, ObjectId};
use crate::types::{Point3, Pose, Vec3};
use crate::world::SimulationWorld;

/// Parameters authored on a Rigidbody component.
#[derive(Clone, Debug, PartialEq)]
pub struct RigidbodyDesc {
    pub mass: f32,
    pub use_gravity: bool,
    pub is_kinematic: bool,
    pub rotation_locks: RotationLocks,
}

impl Default for RigidbodyDesc {
    fn default() -> Self {
        Self {
            mass: DEFAULT_MASS,
            use_gravity: true,
            is_kinematic: false,
            rotation_locks: RotationLocks::default(),
        }
    }
}

/// How a force or torque is applied.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ForceMode {
    /// Continuous force (N), integrated over the next step.
    Force,
    /// Instant change of momentum (N·s).
    Impulse,
    /// Instant change of velocity, mass ignored.
    VelocityChange,
    /// Continuous acceleration, mass ignored.
    Acceleration,
}

fn body_type(desc: &RigidbodyDesc) -> RigidBodyType {
    if desc.is_kinematic {
        RigidBodyType::KinematicPositionBased
    } else {
        RigidBodyType::Dynamic
    }
}

#[derive(Debug)]
pub struct BodyWrapper {
    handle: RigidBodyHandle,
    owner: ObjectId,
    desc: RigidbodyDesc,
    linear_velocity: Vec3,
    angular_velocity: Vec3,
    pub(crate) shapes: Vec<ColliderId>,
}

impl BodyWrapper {
    pub(crate) fn create(
        world: &mut SimulationWorld,
        owner: ObjectId,
        pose: &Pose,
        desc: &RigidbodyDesc,
    ) -> Self {
        let rb = RigidBodyBuilder::new(body_type(desc))
            .translation(pose.translation)
            .rotation(pose.rotation.scaled_axis())
            .build();
        let handle = world.bodies.insert(rb);
        let mut body = Self {
            handle,
            owner,
            desc: desc.clone(),
            linear_velocity: Vec3::zeros(),
            angular_velocity: Vec3::zeros(),
            shapes: Vec::new(),
        };
        body.set_parameters(world, desc);
        log::debug!("created rigid body for {owner:?}");
        body
    }

    pub fn handle(&self) -> RigidBodyHandle {
        self.handle
    }

    pub fn owner(&self) -> ObjectId {
        self.owner
    }

    pub fn desc(&self) -> &RigidbodyDesc {
        &self.desc
    }

    /// Colliders whose shapes are attached to this body.
    pub fn shapes(&self) -> &[ColliderId] {
        &self.shapes
    }

    /// Re-apply every authored parameter to the native body.
    pub fn set_parameters(&mut self, world: &mut SimulationWorld, desc: &RigidbodyDesc) {
        self.desc = desc.clone();
        let Some(rb) = world.bodies.get_mut(self.handle) else {
            return;
        };
        rb.set_body_type(body_type(desc), true);
        rb.set_additional_mass_properties(
            MassProperties::new(
                Point3::origin(),
                desc.mass.max(0.0),
                Vec3::repeat(DEFAULT_INERTIA),
            ),
            true,
        );
        rb.set_gravity_scale(if desc.use_gravity { 1.0 } else { 0.0 }, true);
        let (x, y, z) = desc.rotation_locks.enabled_rotations();
        rb.set_enabled_rotations(x, y, z, true);
    }

    pub fn add_force(&self, world: &mut SimulationWorld, force: Vec3, mode: ForceMode) {
        let mass = self.desc.mass.max(0.0);
        let Some(rb) = world.bodies.get_mut(self.handle) else {
            return;
        };
        match mode {
            ForceMode::Force => rb.add_force(force, true),
            ForceMode::Acceleration => rb.add_force(force * mass, true),
            ForceMode::Impulse => rb.apply_impulse(force, true),
            ForceMode::VelocityChange => {
                let v = *rb.linvel() + force;
                rb.set_linvel(v, true);
            }
        }
    }

    /// Apply a torque. `Acceleration` is integrated over the current step length.
    pub fn add_torque(&self, world: &mut SimulationWorld, torque: Vec3, mode: ForceMode) {
        let dt = world.integration_parameters.dt;
        let Some(rb) = world.bodies.get_mut(self.handle) else {
            return;
        };
        match mode {
            ForceMode::Force => rb.add_torque(torque, true),
            ForceMode::Impulse => rb.apply_torque_impulse(torque, true),
            ForceMode::VelocityChange => {
                let w = *rb.angvel() + torque;
                rb.set_angvel(w, true);
            }
            ForceMode::Acceleration => {
                let w = *rb.angvel() + torque * dt;
                rb.set_angvel(w, true);
            }
        }
    }

    /// Velocity as of the last read-back.
    pub fn linear_velocity(&self) -> Vec3 {
        self.linear_velocity
    }

    pub fn angular_velocity(&self) -> Vec3 {
        self.angular_velocity
    }

    pub fn set_linear_velocity(&mut self, world: &mut SimulationWorld, v: Vec3) {
        self.linear_velocity = v;
        if let Some(rb) = world.bodies.get_mut(self.handle) {
            rb.set_linvel(v, true);
        }
    }

    pub fn set_angular_velocity(&mut self, world: &mut SimulationWorld, w: Vec3) {
        self.angular_velocity = w;
        if let Some(rb) = world.bodies.get_mut(self.handle) {
            rb.set_angvel(w, true);
        }
    }

    pub fn wake_up(&self, world: &mut SimulationWorld) {
        if let Some(rb) = world.bodies.get_mut(self.handle) {
            rb.wake_up(true);
        }
    }

    /// Drop the forces and torques accumulated for the step that just ran.
    pub(crate) fn clear_forces(&self, world: &mut SimulationWorld) {
        if let Some(rb) = world.bodies.get_mut(self.handle) {
            rb.reset_forces(false);
            rb.reset_torques(false);
        }
    }

    /// Overwrite the native pose with the scene pose.
    ///
    /// Kinematic bodies get it as their next target so the solver derives a
    /// velocity and pushes dynamic bodies out of the way.
    pub(crate) fn write_pose(&self, world: &mut SimulationWorld, pose: &Pose) {
        let Some(rb) = world.bodies.get_mut(self.handle) else {
            return;
        };
        if self.desc.is_kinematic {
            rb.set_next_kinematic_translation(pose.translation);
            rb.set_next_kinematic_rotation(pose.rotation);
        } else {
            let wake = has_moved(rb, pose);
            rb.set_translation(pose.translation, wake);
            rb.set_rotation(pose.rotation, wake);
        }
    }

    /// Read the simulated pose and refresh the velocity mirror.
    pub(crate) fn read_pose(&mut self, world: &SimulationWorld) -> Option<Pose> {
        let rb = world.bodies.get(self.handle)?;
        self.linear_velocity = *rb.linvel();
        self.angular_velocity = *rb.angvel();
        Some(Pose::new(*rb.translation(), *rb.rotation()))
    }

    /// Remove the native body together with its joints and any shapes still on it.
    pub(crate) fn release(self, world: &mut SimulationWorld) {
        world.remove_body(self.handle);
    }
}

/// Whether the scene moved the body since the last read-back.
/// Unmoved bodies are written without waking them so they can still sleep.
fn has_moved(rb: &RigidBody, pose: &Pose) -> bool {
    (rb.translation() - pose.translation).norm_squared() > POSE_EPS * POSE_EPS
        || rb.rotation().angle_to(&pose.rotation) > POSE_EPS
}

/// A fixed body synthesized for a collider with no rigidbody, holding exactly one shape.
#[derive(Debug)]
pub struct StaticBody {
    handle: RigidBodyHandle,
    owner: ObjectId,
}

impl StaticBody {
    pub(crate) fn create(world: &mut SimulationWorld, owner: ObjectId, pose: &Pose) -> Self {
        let rb = RigidBodyBuilder::fixed()
            .translation(pose.translation)
            .rotation(pose.rotation.scaled_axis())
            .build();
        let handle = world.bodies.insert(rb);
        log::debug!("created static body for {owner:?}");
        Self { handle, owner }
    }

    pub fn handle(&self) -> RigidBodyHandle {
        self.handle
    }

    pub fn owner(&self) -> ObjectId {
        self.owner
    }

    pub(crate) fn write_pose(&self, world: &mut SimulationWorld, pose: &Pose) {
        if let Some(rb) = world.bodies.get_mut(self.handle) {
            rb.set_translation(pose.translation, false);
            rb.set_rotation(pose.rotation, false);
        }
    }

    pub(crate) fn release(self, world: &mut SimulationWorld) {
        world.remove_body(self.handle);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flags::RotationLock;
    use crate::settings::PhysicsSettings;

    fn world() -> SimulationWorld {
        SimulationWorld::new(&PhysicsSettings::without_gravity())
    }

    #[test]
    fn create_applies_parameters() {
        let mut w = world();
        let mut locks = RotationLocks::default();
        locks.add(RotationLock::X);
        let desc = RigidbodyDesc {
            mass: 3.0,
            use_gravity: false,
            is_kinematic: false,
            rotation_locks: locks,
        };
        let pose = Pose::from_translation(Vec3::new(1.0, 2.0, 3.0));
        let body = BodyWrapper::create(&mut w, ObjectId::new(0, 0), &pose, &desc);

        let rb = &w.bodies[body.handle()];
        assert!(rb.is_dynamic());
        assert_eq!(rb.gravity_scale(), 0.0);
        assert!((rb.translation() - pose.translation).norm() < 1e-6);
        assert_eq!(body.desc(), &desc);
    }

    #[test]
    fn kinematic_toggle_changes_body_type() {
        let mut w = world();
        let mut body = BodyWrapper::create(
            &mut w,
            ObjectId::new(1, 0),
            &Pose::identity(),
            &RigidbodyDesc::default(),
        );
        let kinematic = RigidbodyDesc {
            is_kinematic: true,
            ..RigidbodyDesc::default()
        };
        body.set_parameters(&mut w, &kinematic);
        assert!(w.bodies[body.handle()].is_kinematic());
        body.set_parameters(&mut w, &RigidbodyDesc::default());
        assert!(w.bodies[body.handle()].is_dynamic());
    }

    #[test]
    fn velocity_change_ignores_mass() {
        let mut w = world();
        let desc = RigidbodyDesc {
            mass: 10.0,
            ..RigidbodyDesc::default()
        };
        let body = BodyWrapper::create(&mut w, ObjectId::new(2, 0), &Pose::identity(), &desc);
        body.add_force(&mut w, Vec3::new(0.0, 0.0, 2.0), ForceMode::VelocityChange);
        assert!((w.bodies[body.handle()].linvel().z - 2.0).abs() < 1e-6);
    }

    #[test]
    fn release_removes_native_body() {
        let mut w = world();
        let body = StaticBody::create(&mut w, ObjectId::new(3, 0), &Pose::identity());
        let handle = body.handle();
        body.release(&mut w);
        assert!(w.bodies.get(handle).is_none());
    }
}
