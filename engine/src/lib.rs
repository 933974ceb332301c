//! Scene side of the physics integration: GameObjects with parent-relative
//! transforms, the physics components that live on them, their text format,
//! and the play-mode loop that drives [`physics::PhysicManager`] once per frame.

pub mod components;
pub mod deferred;
pub mod engine;
pub mod error;
pub mod main_thread;
pub mod material_asset;
pub mod scene;
pub mod serialize;
pub mod transform;

pub use components::{Behaviour, Collider, Constraint, Rigidbody, Vehicle};
pub use deferred::DeferredRef;
pub use engine::{Engine, PlayState};
pub use error::EngineError;
pub use main_thread::MainThreadQueue;
pub use material_asset::PhysicsMaterialAsset;
pub use scene::{GameObject, Scene};
pub use transform::Transform;
