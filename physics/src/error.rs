use thiserror::Error;

use crate::ids::{ColliderId, ConstraintId, MeshId, ObjectId};

/// Errors surfaced by the physics adapter.
///
/// Only [`PhysicsError::Foundation`] is fatal. Everything else is logged at the
/// call site inside the update boundary and the operation is abandoned.
#[derive(Debug, Error)]
pub enum PhysicsError {
    #[error("failed to create physics foundation: {0}")]
    Foundation(String),

    #[error("no active simulation world")]
    NoWorld,

    #[error("owner {0:?} is not alive in the scene")]
    MissingOwner(ObjectId),

    #[error("failed to cook mesh {mesh:?}: {reason}")]
    Cooking { mesh: MeshId, reason: String },

    #[error("collider {0:?} is not registered")]
    UnknownCollider(ColliderId),

    #[error("no rigid body registered for {0:?}")]
    UnknownBody(ObjectId),

    #[error("constraint {constraint:?} needs a body on {object:?}")]
    MissingBody {
        constraint: ConstraintId,
        object: ObjectId,
    },
}
