/*!
The scene object table: GameObjects in a generational slot arena.

- Handles are [`ObjectId`]s (slot index + generation). Destroying an object
  bumps its slot's generation, so old handles stop resolving instead of
  pointing at whatever reuses the slot.
- Each object also has a scene-local index. Saved cross-references use it,
  since handles do not survive a save/load round trip.
- Transforms are parent-relative. World transforms are composed on demand.
*/

use std::collections::HashMap;

use physics::{ColliderId, ContactEvent, ObjectId, Quat, SceneBridge, Vec3};

use crate::components::{Behaviour, Collider, Constraint, Rigidbody, Vehicle};
use crate::error::EngineError;
use crate::transform::Transform;

pub struct GameObject {
    pub name: String,
    /// Local (parent-relative) transform.
    pub transform: Transform,
    parent: Option<ObjectId>,
    children: Vec<ObjectId>,
    scene_index: u32,
    pub rigidbody: Option<Rigidbody>,
    pub colliders: Vec<Collider>,
    pub constraints: Vec<Constraint>,
    pub vehicle: Option<Vehicle>,
    behaviours: Vec<Box<dyn Behaviour>>,
}

impl GameObject {
    fn new(name: String, scene_index: u32) -> Self {
        Self {
            name,
            transform: Transform::default(),
            parent: None,
            children: Vec::new(),
            scene_index,
            rigidbody: None,
            colliders: Vec::new(),
            constraints: Vec::new(),
            vehicle: None,
            behaviours: Vec::new(),
        }
    }

    pub fn parent(&self) -> Option<ObjectId> {
        self.parent
    }

    pub fn children(&self) -> &[ObjectId] {
        &self.children
    }

    pub fn scene_index(&self) -> u32 {
        self.scene_index
    }

    pub fn collider(&self, id: ColliderId) -> Option<&Collider> {
        self.colliders.iter().find(|c| c.id() == id)
    }

    pub fn add_behaviour(&mut self, behaviour: Box<dyn Behaviour>) {
        self.behaviours.push(behaviour);
    }
}

struct Slot {
    generation: u32,
    object: Option<GameObject>,
}

#[derive(Default)]
pub struct Scene {
    slots: Vec<Slot>,
    free: Vec<u32>,
    by_scene_index: HashMap<u32, ObjectId>,
    next_scene_index: u32,
    next_component: u64,
    prefab_preview: bool,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    /// A prefab preview scene never drives physics.
    pub fn prefab_preview() -> Self {
        Self {
            prefab_preview: true,
            ..Self::default()
        }
    }

    pub fn is_prefab_preview(&self) -> bool {
        self.prefab_preview
    }

    pub fn spawn(&mut self, name: impl Into<String>) -> Result<ObjectId, EngineError> {
        let index = self.next_scene_index;
        self.insert(GameObject::new(name.into(), index))
    }

    /// Spawn with a saved scene-local index. A taken index is replaced by a fresh one.
    /// `u32::MAX` is never handed out, so the index space ends one below it.
    pub fn spawn_with_index(
        &mut self,
        name: impl Into<String>,
        scene_index: u32,
    ) -> Result<ObjectId, EngineError> {
        let index = if self.by_scene_index.contains_key(&scene_index) {
            log::warn!(
                "scene index {scene_index} already in use, assigning {}",
                self.next_scene_index
            );
            self.next_scene_index
        } else {
            scene_index
        };
        self.insert(GameObject::new(name.into(), index))
    }

    fn insert(&mut self, object: GameObject) -> Result<ObjectId, EngineError> {
        let scene_index = object.scene_index;
        let next = scene_index
            .checked_add(1)
            .ok_or(EngineError::SceneIndexExhausted(scene_index))?;
        self.next_scene_index = self.next_scene_index.max(next);

        let id = match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                slot.object = Some(object);
                ObjectId::new(index, slot.generation)
            }
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    object: Some(object),
                });
                ObjectId::new(self.slots.len() as u32 - 1, 0)
            }
        };
        self.by_scene_index.insert(scene_index, id);
        Ok(id)
    }

    /// Remove `id` and all of its descendants. Components are dropped without
    /// touching physics, so outside this crate objects go through
    /// [`Engine::destroy`](crate::engine::Engine::destroy).
    pub(crate) fn despawn(&mut self, id: ObjectId) {
        if !self.contains(id) {
            return;
        }
        if let Some(parent) = self.get(id).and_then(GameObject::parent) {
            if let Some(p) = self.get_mut(parent) {
                p.children.retain(|c| *c != id);
            }
        }
        for object in self.subtree(id) {
            let slot = &mut self.slots[object.index as usize];
            if let Some(removed) = slot.object.take() {
                self.by_scene_index.remove(&removed.scene_index);
                slot.generation = slot.generation.wrapping_add(1);
                self.free.push(object.index);
            }
        }
    }

    pub fn contains(&self, id: ObjectId) -> bool {
        self.get(id).is_some()
    }

    pub fn get(&self, id: ObjectId) -> Option<&GameObject> {
        let slot = self.slots.get(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.object.as_ref()
    }

    pub fn get_mut(&mut self, id: ObjectId) -> Option<&mut GameObject> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.object.as_mut()
    }

    /// Live objects in slot order.
    pub fn objects(&self) -> Vec<ObjectId> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.object.is_some())
            .map(|(i, slot)| ObjectId::new(i as u32, slot.generation))
            .collect()
    }

    pub fn find_by_scene_index(&self, scene_index: u32) -> Option<ObjectId> {
        self.by_scene_index
            .get(&scene_index)
            .copied()
            .filter(|id| self.contains(*id))
    }

    pub fn scene_index(&self, id: ObjectId) -> Option<u32> {
        self.get(id).map(GameObject::scene_index)
    }

    /// Re-parent `child`, keeping its local transform. Refuses cycles.
    pub fn set_parent(&mut self, child: ObjectId, parent: Option<ObjectId>) -> bool {
        if !self.contains(child) {
            return false;
        }
        if let Some(p) = parent {
            if !self.contains(p) || self.subtree(child).contains(&p) {
                return false;
            }
        }
        if let Some(old) = self.get(child).and_then(GameObject::parent) {
            if let Some(o) = self.get_mut(old) {
                o.children.retain(|c| *c != child);
            }
        }
        if let Some(p) = parent.and_then(|p| self.get_mut(p)) {
            p.children.push(child);
        }
        if let Some(c) = self.get_mut(child) {
            c.parent = parent;
        }
        true
    }

    /// `id` followed by all of its descendants, parents before children.
    pub fn subtree(&self, id: ObjectId) -> Vec<ObjectId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            let Some(object) = self.get(next) else {
                continue;
            };
            out.push(next);
            stack.extend(object.children.iter().rev());
        }
        out
    }

    /// The nearest GameObject carrying a Rigidbody, starting at `id` itself.
    pub fn rigidbody_owner(&self, id: ObjectId) -> Option<ObjectId> {
        let mut current = Some(id);
        while let Some(next) = current {
            let object = self.get(next)?;
            if object.rigidbody.is_some() {
                return Some(next);
            }
            current = object.parent;
        }
        None
    }

    pub fn world_transform(&self, id: ObjectId) -> Option<Transform> {
        let object = self.get(id)?;
        Some(match object.parent {
            Some(parent) => self.world_transform(parent)?.then(&object.transform),
            None => object.transform,
        })
    }

    /// Place `id` at a world pose.
    ///
    /// With `propagate_to_children == false` every child keeps its world pose.
    pub fn set_world_pose(
        &mut self,
        id: ObjectId,
        position: Vec3,
        rotation: Quat,
        propagate_to_children: bool,
    ) {
        let Some(object) = self.get(id) else {
            return;
        };
        let parent_world = object
            .parent
            .and_then(|p| self.world_transform(p))
            .unwrap_or_default();
        let pinned: Vec<(ObjectId, Transform)> = if propagate_to_children {
            Vec::new()
        } else {
            object
                .children
                .iter()
                .filter_map(|c| Some((*c, self.world_transform(*c)?)))
                .collect()
        };

        let (local_position, local_rotation) = parent_world.local_from_world(&position, &rotation);
        if let Some(object) = self.get_mut(id) {
            object.transform.position = local_position;
            object.transform.rotation = local_rotation;
        }
        for (child, world) in pinned {
            self.set_world_pose(child, world.position, world.rotation, true);
        }
    }

    pub fn next_component_id(&mut self) -> u64 {
        self.next_component += 1;
        self.next_component
    }
}

impl SceneBridge for Scene {
    fn is_alive(&self, object: ObjectId) -> bool {
        self.contains(object)
    }

    fn world_position(&self, object: ObjectId) -> Option<Vec3> {
        self.world_transform(object).map(|t| t.position)
    }

    fn world_rotation(&self, object: ObjectId) -> Option<Quat> {
        self.world_transform(object).map(|t| t.rotation)
    }

    fn world_scale(&self, object: ObjectId) -> Option<Vec3> {
        self.world_transform(object).map(|t| t.scale)
    }

    fn set_world_transform(
        &mut self,
        object: ObjectId,
        position: Vec3,
        rotation: Quat,
        propagate_to_children: bool,
    ) {
        self.set_world_pose(object, position, rotation, propagate_to_children);
    }

    fn dispatch(&mut self, object: ObjectId, event: ContactEvent, other: ColliderId) {
        let Some(object) = self.get_mut(object) else {
            return;
        };
        for behaviour in object.behaviours.iter_mut() {
            match event {
                ContactEvent::CollisionEnter => behaviour.on_collision_enter(other),
                ContactEvent::CollisionStay => behaviour.on_collision_stay(other),
                ContactEvent::CollisionExit => behaviour.on_collision_exit(other),
                ContactEvent::TriggerEnter => behaviour.on_trigger_enter(other),
                ContactEvent::TriggerStay => behaviour.on_trigger_stay(other),
                ContactEvent::TriggerExit => behaviour.on_trigger_exit(other),
            }
        }
    }
}
