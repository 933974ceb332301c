/*!
Runtime configuration for [`PhysicManager`](crate::manager::PhysicManager).

Every field defaults to the matching value in [`constants`](crate::constants),
so `PhysicsSettings::default()` is the normal way to start the adapter. Games
that need different gravity or a fixed worker count override single fields.
*/

use crate::constants::{GRAVITY_MPS2, MAX_STEP_SECONDS};
use crate::material::PhysicsMaterial;
use crate::types::Vec3;

#[derive(Clone, Debug)]
pub struct PhysicsSettings {
    /// World gravity vector (m/s^2).
    pub gravity: Vec3,
    /// Clamp for a single step (seconds).
    pub max_step_seconds: f32,
    /// Worker threads for the dispatcher. `None` picks `available_parallelism - 1`.
    pub worker_threads: Option<usize>,
    /// Material applied to colliders that name none, or name an unknown path.
    pub default_material: PhysicsMaterial,
}

impl Default for PhysicsSettings {
    fn default() -> Self {
        Self {
            gravity: Vec3::new(0.0, -GRAVITY_MPS2, 0.0),
            max_step_seconds: MAX_STEP_SECONDS,
            worker_threads: None,
            default_material: PhysicsMaterial::default(),
        }
    }
}

impl PhysicsSettings {
    /// Same defaults with gravity turned off. Handy for scenes (and tests) that
    /// only care about overlap events.
    pub fn without_gravity() -> Self {
        Self {
            gravity: Vec3::zeros(),
            ..Self::default()
        }
    }
}
