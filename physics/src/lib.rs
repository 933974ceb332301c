//! Physics adapter between a parent-relative scene graph and rapier.
//!
//! The scene owns GameObjects and their transforms; this crate owns the
//! simulation world, the native bodies/shapes/joints created for the scene's
//! physics components, and the contact bookkeeping that turns solver pairs into
//! enter/stay/exit callbacks. See [`manager::PhysicManager`] for the per-frame flow.

// Re-export rapier so the scene crate can inspect native objects
// without depending on `rapier3d` directly.
pub use rapier3d;

pub mod body;
pub mod bridge;
pub mod constants;
pub mod dispatcher;
pub mod error;
pub mod flags;
pub mod ids;
pub mod joint;
pub mod manager;
pub mod material;
pub mod mesh;
pub mod registry;
pub mod settings;
pub mod shape;
pub mod types;
pub mod world;

pub use body::{BodyWrapper, ForceMode, RigidbodyDesc, StaticBody};
pub use bridge::{ContactEvent, FrameTime, SceneBridge};
pub use error::PhysicsError;
pub use flags::{RotationLock, RotationLocks};
pub use ids::{ColliderId, ConstraintId, MeshId, ObjectId};
pub use joint::{ConstraintDesc, ConstraintKind, JointKind, JointWrapper};
pub use manager::PhysicManager;
pub use material::{MaterialHandle, PhysicsMaterial};
pub use mesh::MeshData;
pub use settings::PhysicsSettings;
pub use shape::{Attachment, ColliderDesc, ColliderShape, ShapeWrapper};
pub use types::{Point3, Pose, Quat, Vec3};
