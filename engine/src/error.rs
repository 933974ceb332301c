use physics::{ObjectId, PhysicsError};
use thiserror::Error;

use crate::serialize::ReadError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Physics(#[from] PhysicsError),

    #[error("game object {0:?} does not exist")]
    NoObject(ObjectId),

    #[error("scene index {0} leaves no room for another object")]
    SceneIndexExhausted(u32),

    #[error("failed to read component: {0}")]
    Read(#[from] ReadError),
}
