use physics::ColliderId;

/// Script-side receiver for contact callbacks.
///
/// `other` is the collider on the far side of the pair. Every callback defaults
/// to a no-op so a behaviour only implements what it listens for.
pub trait Behaviour {
    fn on_collision_enter(&mut self, _other: ColliderId) {}
    fn on_collision_stay(&mut self, _other: ColliderId) {}
    fn on_collision_exit(&mut self, _other: ColliderId) {}
    fn on_trigger_enter(&mut self, _other: ColliderId) {}
    fn on_trigger_stay(&mut self, _other: ColliderId) {}
    fn on_trigger_exit(&mut self, _other: ColliderId) {}
}
