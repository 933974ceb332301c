use physics::{ConstraintDesc, ConstraintId, ObjectId};

use crate::deferred::DeferredRef;
use crate::scene::{GameObject, Scene};

/// Joint between the owning GameObject's rigidbody and a remote one.
#[derive(Clone, Debug)]
pub struct Constraint {
    id: ConstraintId,
    pub desc: ConstraintDesc,
    /// Remote GameObject. `None` leaves the constraint unconnected.
    pub remote: Option<DeferredRef>,
    started: bool,
}

impl Constraint {
    pub(crate) fn new(id: ConstraintId, desc: ConstraintDesc, remote: Option<DeferredRef>) -> Self {
        Self {
            id,
            desc,
            remote,
            started: false,
        }
    }

    pub fn id(&self) -> ConstraintId {
        self.id
    }

    /// Whether the constraint has gone through start in the current play session.
    pub fn is_started(&self) -> bool {
        self.started
    }

    pub(crate) fn set_started(&mut self, started: bool) {
        self.started = started;
    }

    /// The remote object, when resolved, alive and carrying a rigidbody.
    pub fn remote_target(&self, scene: &Scene) -> Option<ObjectId> {
        self.remote?.target(scene, has_rigidbody)
    }
}

pub(crate) fn has_rigidbody(object: &GameObject) -> bool {
    object.rigidbody.is_some()
}
