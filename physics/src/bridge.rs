/*!
The contract between the adapter and the scene graph that owns the GameObjects.

The adapter never reaches into the scene directly. Everything it needs (world
poses, liveness, writing simulated poses back, delivering contact callbacks)
goes through [`SceneBridge`]. The engine crate implements it for its scene;
tests can implement it for anything.
*/

use crate::ids::{ColliderId, ObjectId};
use crate::types::{Pose, Quat, Vec3};

/// Contact and overlap transitions delivered to a GameObject.
///
/// Trigger events come from pairs where at least one collider is a trigger.
/// Collision events come from every other touching pair.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ContactEvent {
    CollisionEnter,
    CollisionStay,
    CollisionExit,
    TriggerEnter,
    TriggerStay,
    TriggerExit,
}

/// Clock state the adapter needs to decide whether to step.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct FrameTime {
    /// Seconds since the previous frame, already multiplied by the time scale.
    pub delta: f32,
    pub time_scale: f32,
    pub playing: bool,
}

impl FrameTime {
    pub fn playing(delta: f32) -> Self {
        Self {
            delta,
            time_scale: 1.0,
            playing: true,
        }
    }

    /// True when a step should happen this frame.
    pub fn should_step(&self) -> bool {
        self.playing && self.time_scale > 0.0 && self.delta > 0.0
    }
}

/// What the adapter consumes from the scene graph.
pub trait SceneBridge {
    /// Whether the handle still names a live GameObject.
    fn is_alive(&self, object: ObjectId) -> bool;

    fn world_position(&self, object: ObjectId) -> Option<Vec3>;

    fn world_rotation(&self, object: ObjectId) -> Option<Quat>;

    fn world_scale(&self, object: ObjectId) -> Option<Vec3>;

    /// Overwrite the object's world pose.
    ///
    /// With `propagate_to_children == false` the children keep their current
    /// world poses (their local transforms are recomputed instead).
    fn set_world_transform(
        &mut self,
        object: ObjectId,
        position: Vec3,
        rotation: Quat,
        propagate_to_children: bool,
    );

    /// Deliver `event` to every behaviour on `object`, naming the other collider.
    fn dispatch(&mut self, object: ObjectId, event: ContactEvent, other: ColliderId);

    fn world_pose(&self, object: ObjectId) -> Option<Pose> {
        Some(Pose::new(
            self.world_position(object)?,
            self.world_rotation(object)?,
        ))
    }
}
