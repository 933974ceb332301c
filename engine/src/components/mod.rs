mod behaviour;
mod collider;
mod constraint;
mod rigidbody;
mod vehicle;

pub use behaviour::Behaviour;
pub use collider::Collider;
pub use constraint::Constraint;
pub(crate) use constraint::has_rigidbody;
pub use rigidbody::Rigidbody;
pub use vehicle::Vehicle;
