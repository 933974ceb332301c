use physics::ObjectId;

use crate::deferred::DeferredRef;
use crate::scene::Scene;

use super::constraint::has_rigidbody;

/// Drives a set of wheel bodies with a torque around their local X axis.
#[derive(Clone, Debug, Default)]
pub struct Vehicle {
    pub wheels: Vec<Option<DeferredRef>>,
    /// Torque (N·m) applied to every wheel each frame.
    pub drive_torque: f32,
}

impl Vehicle {
    pub fn new(wheels: Vec<Option<DeferredRef>>, drive_torque: f32) -> Self {
        Self {
            wheels,
            drive_torque,
        }
    }

    /// Wheels that are resolved, alive and carry a rigidbody.
    pub fn wheel_targets(&self, scene: &Scene) -> Vec<ObjectId> {
        self.wheels
            .iter()
            .flatten()
            .filter_map(|wheel| wheel.target(scene, has_rigidbody))
            .collect()
    }
}
