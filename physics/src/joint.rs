/*!
Joints between two rigid bodies.

A joint is described twice:
- [`ConstraintDesc`] is the flat, authored form stored on the Constraint
  component (every field for every kind, as serialized);
- [`JointKind`] is the native form: one variant per kind, carrying only the
  parameters that kind uses.

Frames
- Body 1 is the constraint's own (local) body, body 2 the remote body.
- The first frame is identity. The second frame is the local body's position
  relative to the remote body plus the local body's world rotation, so a joint
  created between two resting bodies starts satisfied.
- Distance and spring joints keep identity frames on both sides. The distance
  between body origins is constrained through coupled linear axes instead.

Spring joints are distance joints with a soft core: both ends of the range
are hard limits, and inside it a spring pulls toward the rest length (the
distance at creation, clamped into the range). The max honors "limit to
current distance"; the min always comes from the authored field.
*/

use rapier3d::prelude::*;

use crate::body::BodyWrapper;
use crate::constants::{DRIVE_FACTOR, SPHERICAL_CONE_TOLERANCE};
use crate::ids::{ConstraintId, ObjectId};
use crate::types::Pose;
use crate::world::SimulationWorld;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ConstraintKind {
    Fixed = 0,
    Distance = 1,
    Spring = 2,
    Revolute = 3,
    Spherical = 4,
    Prismatic = 5,
}

impl ConstraintKind {
    pub fn from_u8(v: u8) -> Option<Self> {
        Some(match v {
            0 => ConstraintKind::Fixed,
            1 => ConstraintKind::Distance,
            2 => ConstraintKind::Spring,
            3 => ConstraintKind::Revolute,
            4 => ConstraintKind::Spherical,
            5 => ConstraintKind::Prismatic,
            _ => return None,
        })
    }
}

/// Authored constraint parameters.
#[derive(Clone, Debug, PartialEq)]
pub struct ConstraintDesc {
    pub kind: ConstraintKind,
    /// Distance range `[min, max]` (meters). Prismatic uses it as the slide range.
    pub distance: [f32; 2],
    pub stiffness: f32,
    pub damping: f32,
    /// Pin distance limits to the bodies' distance at creation time.
    pub limit_to_distance: bool,
    /// Gate for angular limits (revolute, spherical) and prismatic limits.
    pub enable_limit: bool,
    /// Angle range `[min, max]` in degrees.
    pub angle: [f32; 2],
    /// Drive target velocity (rad/s for revolute, m/s for prismatic). Zero disables the drive.
    pub drive_velocity: f32,
}

impl ConstraintDesc {
    pub fn new(kind: ConstraintKind) -> Self {
        Self {
            kind,
            distance: [0.0, 1.0],
            stiffness: 10.0,
            damping: 1.0,
            limit_to_distance: false,
            enable_limit: false,
            angle: [-45.0, 45.0],
            drive_velocity: 0.0,
        }
    }
}

/// Native joint parameters, one variant per kind.
#[derive(Clone, Debug, PartialEq)]
pub enum JointKind {
    Fixed,
    Distance {
        min: f32,
        max: f32,
    },
    Spring {
        min: f32,
        max: f32,
        rest: f32,
        stiffness: f32,
        damping: f32,
    },
    Revolute {
        /// Radians.
        limits: Option<[f32; 2]>,
        drive_velocity: f32,
    },
    Spherical {
        /// Cone half-angles around Y and Z (radians).
        cone: Option<[f32; 2]>,
    },
    Prismatic {
        limits: Option<[f32; 2]>,
        drive_velocity: f32,
    },
}

fn ordered(a: f32, b: f32) -> [f32; 2] {
    if a <= b { [a, b] } else { [b, a] }
}

fn rest_length(min: f32, max: f32, distance: f32) -> f32 {
    let [lo, hi] = ordered(min, max);
    distance.clamp(lo, hi)
}

impl JointKind {
    /// Resolve authored parameters. `current_distance` is the live distance
    /// between the two bodies.
    pub fn from_desc(desc: &ConstraintDesc, current_distance: f32) -> Self {
        let [min, max] = ordered(desc.distance[0], desc.distance[1]);
        let angles = || {
            ordered(
                desc.angle[0].to_radians(),
                desc.angle[1].to_radians(),
            )
        };
        match desc.kind {
            ConstraintKind::Fixed => JointKind::Fixed,
            ConstraintKind::Distance if desc.limit_to_distance => JointKind::Distance {
                min: current_distance,
                max: current_distance,
            },
            ConstraintKind::Distance => JointKind::Distance { min, max },
            ConstraintKind::Spring => {
                let min = desc.distance[0];
                let max = if desc.limit_to_distance {
                    current_distance
                } else {
                    desc.distance[1]
                };
                JointKind::Spring {
                    min,
                    max,
                    rest: rest_length(min, max, current_distance),
                    stiffness: desc.stiffness.max(0.0),
                    damping: desc.damping.max(0.0),
                }
            }
            ConstraintKind::Revolute => JointKind::Revolute {
                limits: desc.enable_limit.then(angles),
                drive_velocity: desc.drive_velocity,
            },
            ConstraintKind::Spherical => JointKind::Spherical {
                cone: desc.enable_limit.then(|| {
                    [
                        desc.angle[0].to_radians().abs().max(SPHERICAL_CONE_TOLERANCE),
                        desc.angle[1].to_radians().abs().max(SPHERICAL_CONE_TOLERANCE),
                    ]
                }),
            },
            ConstraintKind::Prismatic => JointKind::Prismatic {
                limits: desc.enable_limit.then_some([min, max]),
                drive_velocity: desc.drive_velocity,
            },
        }
    }

    pub fn constraint_kind(&self) -> ConstraintKind {
        match self {
            JointKind::Fixed => ConstraintKind::Fixed,
            JointKind::Distance { .. } => ConstraintKind::Distance,
            JointKind::Spring { .. } => ConstraintKind::Spring,
            JointKind::Revolute { .. } => ConstraintKind::Revolute,
            JointKind::Spherical { .. } => ConstraintKind::Spherical,
            JointKind::Prismatic { .. } => ConstraintKind::Prismatic,
        }
    }

    /// Build the native joint. `frame2` is ignored by distance-based kinds.
    fn native(&self, frame2: &Pose) -> GenericJoint {
        let framed = |mask: JointAxesMask| {
            GenericJointBuilder::new(mask)
                .local_frame1(Pose::identity().iso())
                .local_frame2(frame2.iso())
        };
        match self {
            JointKind::Fixed => framed(JointAxesMask::LOCKED_FIXED_AXES).build(),

            JointKind::Distance { min, max } => distance_builder()
                .limits(JointAxis::LinX, [*min, *max])
                .build(),

            JointKind::Spring {
                min,
                max,
                rest,
                stiffness,
                damping,
            } => distance_builder()
                .limits(JointAxis::LinX, ordered(*min, *max))
                .motor_model(JointAxis::LinX, MotorModel::ForceBased)
                .motor_position(JointAxis::LinX, *rest, *stiffness, *damping)
                .build(),

            JointKind::Revolute {
                limits,
                drive_velocity,
            } => {
                let mut b = framed(JointAxesMask::LOCKED_REVOLUTE_AXES);
                if let Some(l) = limits {
                    b = b.limits(JointAxis::AngX, *l);
                }
                b.motor_velocity(JointAxis::AngX, *drive_velocity, drive_factor(*drive_velocity))
                    .build()
            }

            JointKind::Spherical { cone } => {
                let mut b = framed(JointAxesMask::LOCKED_SPHERICAL_AXES);
                if let Some([y, z]) = cone {
                    b = b
                        .limits(JointAxis::AngY, [-*y, *y])
                        .limits(JointAxis::AngZ, [-*z, *z]);
                }
                b.build()
            }

            JointKind::Prismatic {
                limits,
                drive_velocity,
            } => {
                let mut b = framed(JointAxesMask::LOCKED_PRISMATIC_AXES);
                if let Some(l) = limits {
                    b = b.limits(JointAxis::LinX, *l);
                }
                b.motor_velocity(JointAxis::LinX, *drive_velocity, drive_factor(*drive_velocity))
                    .build()
            }
        }
    }
}

fn distance_builder() -> GenericJointBuilder {
    GenericJointBuilder::new(JointAxesMask::empty()).coupled_axes(JointAxesMask::LIN_AXES)
}

fn drive_factor(velocity: f32) -> f32 {
    if velocity != 0.0 { DRIVE_FACTOR } else { 0.0 }
}

/// A live native joint.
#[derive(Debug)]
pub struct JointWrapper {
    handle: ImpulseJointHandle,
    constraint: ConstraintId,
    kind: JointKind,
    local: ObjectId,
    remote: ObjectId,
    visualize: bool,
}

impl JointWrapper {
    pub(crate) fn create(
        world: &mut SimulationWorld,
        constraint: ConstraintId,
        local: &BodyWrapper,
        remote: &BodyWrapper,
        local_pose: &Pose,
        remote_pose: &Pose,
        desc: &ConstraintDesc,
    ) -> Self {
        let dif = local_pose.translation - remote_pose.translation;
        let frame2 = Pose::new(dif, local_pose.rotation);
        let kind = JointKind::from_desc(desc, dif.norm());

        let handle = world.impulse_joints.insert(
            local.handle(),
            remote.handle(),
            kind.native(&frame2),
            true,
        );
        log::debug!(
            "created {:?} joint {constraint:?} between {:?} and {:?}",
            desc.kind,
            local.owner(),
            remote.owner()
        );
        Self {
            handle,
            constraint,
            kind,
            local: local.owner(),
            remote: remote.owner(),
            // Editor aid only.
            visualize: true,
        }
    }

    pub fn handle(&self) -> ImpulseJointHandle {
        self.handle
    }

    pub fn constraint(&self) -> ConstraintId {
        self.constraint
    }

    pub fn kind(&self) -> &JointKind {
        &self.kind
    }

    pub fn is_visualized(&self) -> bool {
        self.visualize
    }

    /// Whether `object` is either end of the joint.
    pub fn involves(&self, object: ObjectId) -> bool {
        self.local == object || self.remote == object
    }

    fn data_mut(
        world: &mut SimulationWorld,
        handle: ImpulseJointHandle,
    ) -> Option<&mut GenericJoint> {
        world
            .impulse_joints
            .get_mut(handle, true)
            .map(|joint| &mut joint.data)
    }

    pub fn set_distance(&mut self, world: &mut SimulationWorld, min: f32, max: f32) {
        let handle = self.handle;
        match &mut self.kind {
            JointKind::Distance { min: lo, max: hi } => {
                [*lo, *hi] = ordered(min, max);
                let limits = [*lo, *hi];
                if let Some(data) = Self::data_mut(world, handle) {
                    data.set_limits(JointAxis::LinX, limits);
                }
            }
            JointKind::Spring {
                min: lo,
                max: hi,
                rest,
                stiffness,
                damping,
            } => {
                *lo = min;
                *hi = max;
                *rest = rest_length(min, max, *rest);
                let (rest, stiffness, damping) = (*rest, *stiffness, *damping);
                if let Some(data) = Self::data_mut(world, handle) {
                    data.set_limits(JointAxis::LinX, ordered(min, max));
                    data.set_motor_position(JointAxis::LinX, rest, stiffness, damping);
                }
            }
            JointKind::Prismatic {
                limits: Some(limits),
                ..
            } => {
                *limits = ordered(min, max);
                let limits = *limits;
                if let Some(data) = Self::data_mut(world, handle) {
                    data.set_limits(JointAxis::LinX, limits);
                }
            }
            JointKind::Prismatic { limits: None, .. }
            | JointKind::Fixed
            | JointKind::Revolute { .. }
            | JointKind::Spherical { .. } => {
                log::debug!("{:?} joint has no distance to set", self.kind.constraint_kind());
            }
        }
    }

    pub fn set_stiffness(&mut self, world: &mut SimulationWorld, value: f32) {
        let handle = self.handle;
        if let JointKind::Spring {
            rest,
            stiffness,
            damping,
            ..
        } = &mut self.kind
        {
            *stiffness = value.max(0.0);
            let (rest, stiffness, damping) = (*rest, *stiffness, *damping);
            if let Some(data) = Self::data_mut(world, handle) {
                data.set_motor_position(JointAxis::LinX, rest, stiffness, damping);
            }
        }
    }

    pub fn set_damping(&mut self, world: &mut SimulationWorld, value: f32) {
        let handle = self.handle;
        if let JointKind::Spring {
            rest,
            stiffness,
            damping,
            ..
        } = &mut self.kind
        {
            *damping = value.max(0.0);
            let (rest, stiffness, damping) = (*rest, *stiffness, *damping);
            if let Some(data) = Self::data_mut(world, handle) {
                data.set_motor_position(JointAxis::LinX, rest, stiffness, damping);
            }
        }
    }

    pub fn set_drive_velocity(&mut self, world: &mut SimulationWorld, velocity: f32) {
        let handle = self.handle;
        let axis = match &mut self.kind {
            JointKind::Revolute { drive_velocity, .. } => {
                *drive_velocity = velocity;
                JointAxis::AngX
            }
            JointKind::Prismatic { drive_velocity, .. } => {
                *drive_velocity = velocity;
                JointAxis::LinX
            }
            JointKind::Fixed
            | JointKind::Distance { .. }
            | JointKind::Spring { .. }
            | JointKind::Spherical { .. } => return,
        };
        if let Some(data) = Self::data_mut(world, handle) {
            data.set_motor_velocity(axis, velocity, drive_factor(velocity));
        }
    }

    /// Re-apply min/max distance, stiffness and damping from the component.
    pub fn set_parameters(&mut self, world: &mut SimulationWorld, desc: &ConstraintDesc) {
        self.set_distance(world, desc.distance[0], desc.distance[1]);
        self.set_stiffness(world, desc.stiffness);
        self.set_damping(world, desc.damping);
    }

    /// Linear limits currently set on the native joint.
    pub fn distance_limits(&self, world: &SimulationWorld) -> Option<[f32; 2]> {
        let joint = world.impulse_joints.get(self.handle)?;
        joint
            .data
            .limits(JointAxis::LinX)
            .map(|limits| [limits.min, limits.max])
    }

    pub(crate) fn release(self, world: &mut SimulationWorld) {
        world.impulse_joints.remove(self.handle, true);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::RigidbodyDesc;
    use crate::settings::PhysicsSettings;
    use crate::types::Vec3;

    #[test]
    fn limit_to_distance_pins_both_ends() {
        let mut desc = ConstraintDesc::new(ConstraintKind::Distance);
        desc.limit_to_distance = true;
        assert_eq!(
            JointKind::from_desc(&desc, 5.0),
            JointKind::Distance { min: 5.0, max: 5.0 }
        );
    }

    #[test]
    fn spring_min_ignores_limit_to_distance() {
        let mut desc = ConstraintDesc::new(ConstraintKind::Spring);
        desc.distance = [0.5, 2.0];
        desc.limit_to_distance = true;
        match JointKind::from_desc(&desc, 3.0) {
            JointKind::Spring { min, max, .. } => {
                assert!((min - 0.5).abs() < 1e-6);
                assert!((max - 3.0).abs() < 1e-6);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn angular_limits_are_gated_and_converted() {
        let mut desc = ConstraintDesc::new(ConstraintKind::Revolute);
        desc.angle = [90.0, -30.0];
        assert_eq!(
            JointKind::from_desc(&desc, 0.0),
            JointKind::Revolute {
                limits: None,
                drive_velocity: 0.0
            }
        );

        desc.enable_limit = true;
        match JointKind::from_desc(&desc, 0.0) {
            JointKind::Revolute {
                limits: Some([lo, hi]),
                ..
            } => {
                assert!((lo + 30f32.to_radians()).abs() < 1e-6);
                assert!((hi - std::f32::consts::FRAC_PI_2).abs() < 1e-6);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn spherical_cone_never_collapses() {
        let mut desc = ConstraintDesc::new(ConstraintKind::Spherical);
        desc.enable_limit = true;
        desc.angle = [0.0, 20.0];
        match JointKind::from_desc(&desc, 0.0) {
            JointKind::Spherical { cone: Some([y, z]) } => {
                assert!((y - SPHERICAL_CONE_TOLERANCE).abs() < 1e-6);
                assert!((z - 20f32.to_radians()).abs() < 1e-6);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn setters_update_native_limits() {
        let mut world = SimulationWorld::new(&PhysicsSettings::without_gravity());
        let a = BodyWrapper::create(
            &mut world,
            ObjectId::new(0, 0),
            &Pose::identity(),
            &RigidbodyDesc::default(),
        );
        let b_pose = Pose::from_translation(Vec3::new(0.0, 0.0, 2.0));
        let b = BodyWrapper::create(
            &mut world,
            ObjectId::new(1, 0),
            &b_pose,
            &RigidbodyDesc::default(),
        );

        let mut joint = JointWrapper::create(
            &mut world,
            ConstraintId(7),
            &a,
            &b,
            &Pose::identity(),
            &b_pose,
            &ConstraintDesc::new(ConstraintKind::Distance),
        );
        assert!(joint.is_visualized());
        assert!(joint.involves(ObjectId::new(1, 0)));

        joint.set_distance(&mut world, 3.0, 1.0);
        assert_eq!(joint.distance_limits(&world), Some([1.0, 3.0]));
        assert_eq!(joint.kind(), &JointKind::Distance { min: 1.0, max: 3.0 });

        // Not a spring: stiffness is ignored.
        joint.set_stiffness(&mut world, 50.0);
        assert_eq!(joint.kind(), &JointKind::Distance { min: 1.0, max: 3.0 });

        let handle = joint.handle();
        joint.release(&mut world);
        assert!(world.impulse_joints().get(handle).is_none());
    }

    /// A joint between a body at the origin and one `separation` meters up +Z.
    fn joint_at(
        world: &mut SimulationWorld,
        separation: f32,
        desc: &ConstraintDesc,
    ) -> JointWrapper {
        let local = BodyWrapper::create(
            world,
            ObjectId::new(0, 0),
            &Pose::identity(),
            &RigidbodyDesc::default(),
        );
        let remote_pose = Pose::from_translation(Vec3::new(0.0, 0.0, separation));
        let remote = BodyWrapper::create(
            world,
            ObjectId::new(1, 0),
            &remote_pose,
            &RigidbodyDesc::default(),
        );
        JointWrapper::create(
            world,
            ConstraintId(1),
            &local,
            &remote,
            &Pose::identity(),
            &remote_pose,
            desc,
        )
    }

    fn native(world: &SimulationWorld, joint: &JointWrapper) -> GenericJoint {
        world.impulse_joints().get(joint.handle()).unwrap().data
    }

    #[test]
    fn spring_rests_inside_its_range() {
        let mut desc = ConstraintDesc::new(ConstraintKind::Spring);
        desc.distance = [1.0, 4.0];
        match JointKind::from_desc(&desc, 6.0) {
            JointKind::Spring { rest, .. } => assert!((rest - 4.0).abs() < 1e-6),
            other => panic!("unexpected {other:?}"),
        }
        match JointKind::from_desc(&desc, 2.5) {
            JointKind::Spring { rest, .. } => assert!((rest - 2.5).abs() < 1e-6),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn native_spring_limits_both_ends_and_pulls_to_rest() {
        let mut world = SimulationWorld::new(&PhysicsSettings::without_gravity());
        let mut desc = ConstraintDesc::new(ConstraintKind::Spring);
        desc.distance = [1.0, 3.0];
        desc.stiffness = 20.0;
        desc.damping = 2.0;
        let mut joint = joint_at(&mut world, 2.0, &desc);

        assert_eq!(joint.distance_limits(&world), Some([1.0, 3.0]));
        let data = native(&world, &joint);
        let motor = data.motor(JointAxis::LinX).unwrap();
        assert!((motor.target_pos - 2.0).abs() < 1e-5);
        assert!((motor.stiffness - 20.0).abs() < 1e-6);
        assert!((motor.damping - 2.0).abs() < 1e-6);

        // Shrinking the range drags the rest length along.
        joint.set_distance(&mut world, 0.5, 1.5);
        assert_eq!(joint.distance_limits(&world), Some([0.5, 1.5]));
        let data = native(&world, &joint);
        assert!((data.motor(JointAxis::LinX).unwrap().target_pos - 1.5).abs() < 1e-5);

        joint.set_stiffness(&mut world, 50.0);
        joint.set_damping(&mut world, -1.0);
        let data = native(&world, &joint);
        let motor = data.motor(JointAxis::LinX).unwrap();
        assert!((motor.stiffness - 50.0).abs() < 1e-6);
        assert_eq!(motor.damping, 0.0);
    }

    #[test]
    fn revolute_gets_limits_and_drive() {
        let mut world = SimulationWorld::new(&PhysicsSettings::without_gravity());
        let mut desc = ConstraintDesc::new(ConstraintKind::Revolute);
        desc.enable_limit = true;
        desc.angle = [-30.0, 60.0];
        desc.drive_velocity = 2.0;
        let mut joint = joint_at(&mut world, 1.0, &desc);

        let data = native(&world, &joint);
        let limits = data.limits(JointAxis::AngX).unwrap();
        assert!((limits.min + 30f32.to_radians()).abs() < 1e-5);
        assert!((limits.max - 60f32.to_radians()).abs() < 1e-5);
        assert!((data.motor(JointAxis::AngX).unwrap().target_vel - 2.0).abs() < 1e-6);

        joint.set_drive_velocity(&mut world, -1.0);
        let data = native(&world, &joint);
        assert!((data.motor(JointAxis::AngX).unwrap().target_vel + 1.0).abs() < 1e-6);
        assert_eq!(
            joint.kind(),
            &JointKind::Revolute {
                limits: Some([-30f32.to_radians(), 60f32.to_radians()]),
                drive_velocity: -1.0,
            }
        );
    }

    #[test]
    fn prismatic_slides_within_distance_range() {
        let mut world = SimulationWorld::new(&PhysicsSettings::without_gravity());
        let mut desc = ConstraintDesc::new(ConstraintKind::Prismatic);
        desc.enable_limit = true;
        desc.distance = [2.0, 0.0];
        desc.drive_velocity = 0.5;
        let mut joint = joint_at(&mut world, 1.0, &desc);

        assert_eq!(joint.distance_limits(&world), Some([0.0, 2.0]));
        let data = native(&world, &joint);
        assert!((data.motor(JointAxis::LinX).unwrap().target_vel - 0.5).abs() < 1e-6);

        joint.set_distance(&mut world, 0.25, 0.75);
        assert_eq!(joint.distance_limits(&world), Some([0.25, 0.75]));

        // Drive velocity only means something to revolute and prismatic joints.
        let mut fixed = joint_at(&mut world, 1.0, &ConstraintDesc::new(ConstraintKind::Fixed));
        fixed.set_drive_velocity(&mut world, 3.0);
        assert_eq!(fixed.kind(), &JointKind::Fixed);
    }

    #[test]
    fn kind_byte_round_trip() {
        for v in 0..6u8 {
            let kind = ConstraintKind::from_u8(v).unwrap();
            assert_eq!(kind as u8, v);
        }
        assert!(ConstraintKind::from_u8(6).is_none());
    }
}
