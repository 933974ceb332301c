/*!
References to other GameObjects that survive a save/load round trip.

A loaded reference only knows the target's scene-local index. It is resolved
to a live handle lazily, one attempt per frame, because the target may not
have been loaded (or may not carry the component it needs) yet.
*/

use physics::ObjectId;

use crate::scene::{GameObject, Scene};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DeferredRef {
    /// Scene-local index read from a saved scene.
    Unresolved(u32),
    Resolved(ObjectId),
}

impl DeferredRef {
    /// Try once to turn a scene index into a handle. Returns whether the
    /// reference is resolved afterwards.
    pub fn resolve(&mut self, scene: &Scene, accept: impl Fn(&GameObject) -> bool) -> bool {
        let DeferredRef::Unresolved(index) = *self else {
            return true;
        };
        match scene.find_by_scene_index(index) {
            Some(id) if scene.get(id).is_some_and(&accept) => {
                *self = DeferredRef::Resolved(id);
                true
            }
            _ => false,
        }
    }

    /// The live target. A resolved handle is re-validated on every use.
    pub fn target(&self, scene: &Scene, accept: impl Fn(&GameObject) -> bool) -> Option<ObjectId> {
        match *self {
            DeferredRef::Resolved(id) if scene.get(id).is_some_and(accept) => Some(id),
            _ => None,
        }
    }

    /// Scene index to save. A resolved handle whose object is gone saves nothing.
    pub fn scene_index(&self, scene: &Scene) -> Option<u32> {
        match *self {
            DeferredRef::Unresolved(index) => Some(index),
            DeferredRef::Resolved(id) => scene.scene_index(id),
        }
    }
}
