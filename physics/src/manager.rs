/*!
`PhysicManager`: owner of the dispatcher, the material cache, the active
simulation world and every registry tying native objects back to the scene.

Lifecycle
- [`PhysicManager::initialize`] builds the foundation (dispatcher + default
  material). Failure here is fatal for the caller.
- [`PhysicManager::create_scene`] / [`PhysicManager::delete_scene`] bracket play
  mode. Every body, shape and joint belongs to the world that was active when it
  was created, and is dropped with it.
- [`PhysicManager::delete`] tears everything down. It is safe on a partially
  initialized manager and safe to call twice.

Per frame, [`PhysicManager::update`]:
1. writes scene poses into dynamic bodies (kinematic ones get targets),
2. writes scene poses into static bodies,
3. rotates the pair sets,
4. steps by `min(max_step, delta)` and waits,
5. dispatches trigger enter/stay/exit,
6. dispatches collision enter/stay/exit,
7. writes simulated poses back into the scene without moving children.

Entries whose owner is gone are skipped at every step. Before each callback
the collider must still be registered and its owner alive.
*/

use std::collections::BTreeMap;

use rapier3d::prelude::Collider;

use crate::body::{BodyWrapper, ForceMode, RigidbodyDesc, StaticBody};
use crate::bridge::{ContactEvent, FrameTime, SceneBridge};
use crate::dispatcher::Dispatcher;
use crate::error::PhysicsError;
use crate::ids::{ColliderId, ConstraintId, ObjectId};
use crate::joint::{ConstraintDesc, JointWrapper};
use crate::material::{MaterialCache, MaterialHandle, PhysicsMaterial};
use crate::registry::{ColliderPair, CollisionRegistry, Transition};
use crate::settings::PhysicsSettings;
use crate::shape::{Attachment, ColliderDesc, ShapeWrapper, build_geometry, native_collider};
use crate::types::{Pose, Vec3};
use crate::world::{SharedHooks, SimulationWorld};

pub struct PhysicManager {
    settings: PhysicsSettings,
    dispatcher: Option<Dispatcher>,
    materials: Option<MaterialCache>,
    world: Option<SimulationWorld>,
    bodies: BTreeMap<ObjectId, BodyWrapper>,
    statics: BTreeMap<ColliderId, StaticBody>,
    registry: CollisionRegistry,
    joints: BTreeMap<ConstraintId, JointWrapper>,
    hooks: Option<SharedHooks>,
}

impl PhysicManager {
    /// Build the foundation: worker pool and default material.
    pub fn initialize(settings: PhysicsSettings) -> Result<Self, PhysicsError> {
        let workers = settings
            .worker_threads
            .unwrap_or_else(Dispatcher::default_worker_count);
        let dispatcher = Dispatcher::new(workers)?;
        log::info!("physics foundation ready ({workers} worker threads)");

        Ok(Self {
            materials: Some(MaterialCache::new(settings.default_material)),
            settings,
            dispatcher: Some(dispatcher),
            world: None,
            bodies: BTreeMap::new(),
            statics: BTreeMap::new(),
            registry: CollisionRegistry::default(),
            joints: BTreeMap::new(),
            hooks: None,
        })
    }

    pub fn is_initialized(&self) -> bool {
        self.dispatcher.is_some()
    }

    /// Release any previous world and start a fresh, empty one.
    pub fn create_scene(&mut self) {
        self.delete_scene();
        let mut world = SimulationWorld::new(&self.settings);
        if let Some(hooks) = &self.hooks {
            world.set_hooks(hooks.clone());
        }
        self.world = Some(world);
        log::info!("physics world created");
    }

    /// Install contact-modification hooks on the current world and every later one.
    pub fn set_contact_hooks(&mut self, hooks: SharedHooks) {
        if let Some(world) = self.world.as_mut() {
            world.set_hooks(hooks.clone());
        }
        self.hooks = Some(hooks);
    }

    /// Release the world with all of its bodies, shapes, joints and pair state.
    pub fn delete_scene(&mut self) {
        self.joints.clear();
        self.bodies.clear();
        self.statics.clear();
        self.registry.clear();
        if self.world.take().is_some() {
            log::info!("physics world destroyed");
        }
    }

    /// Tear down in dependency order: world (and its mesh caches), materials, dispatcher.
    pub fn delete(&mut self) {
        self.delete_scene();
        if self.materials.take().is_some() {
            log::debug!("physics materials released");
        }
        if self.dispatcher.take().is_some() {
            log::info!("physics foundation released");
        }
    }

    pub fn has_world(&self) -> bool {
        self.world.is_some()
    }

    pub fn world(&self) -> Option<&SimulationWorld> {
        self.world.as_ref()
    }

    pub fn settings(&self) -> &PhysicsSettings {
        &self.settings
    }

    pub fn registry(&self) -> &CollisionRegistry {
        &self.registry
    }

    pub fn update<S: SceneBridge>(&mut self, time: FrameTime, scene: &mut S) {
        if !time.should_step() {
            return;
        }
        let (Some(world), Some(dispatcher)) = (self.world.as_mut(), self.dispatcher.as_ref())
        else {
            return;
        };

        for body in self.bodies.values() {
            if !scene.is_alive(body.owner()) {
                continue;
            }
            if let Some(pose) = scene.world_pose(body.owner()) {
                body.write_pose(world, &pose);
            }
        }
        for body in self.statics.values() {
            if !scene.is_alive(body.owner()) {
                continue;
            }
            if let Some(pose) = scene.world_pose(body.owner()) {
                body.write_pose(world, &pose);
            }
        }

        self.registry.begin_step();
        world.step(time.delta.min(self.settings.max_step_seconds), dispatcher);
        self.registry.capture(&world.touching_pairs());

        for (pair, transition) in self.registry.triggers.transitions() {
            let event = match transition {
                Transition::Enter => ContactEvent::TriggerEnter,
                Transition::Stay => ContactEvent::TriggerStay,
                Transition::Exit => ContactEvent::TriggerExit,
            };
            dispatch_pair(&self.registry, scene, pair, event);
        }
        for (pair, transition) in self.registry.collisions.transitions() {
            let event = match transition {
                Transition::Enter => ContactEvent::CollisionEnter,
                Transition::Stay => ContactEvent::CollisionStay,
                Transition::Exit => ContactEvent::CollisionExit,
            };
            dispatch_pair(&self.registry, scene, pair, event);
        }

        for body in self.bodies.values_mut() {
            body.clear_forces(world);
            if !scene.is_alive(body.owner()) {
                continue;
            }
            if let Some(pose) = body.read_pose(world) {
                scene.set_world_transform(body.owner(), pose.translation, pose.rotation, false);
            }
        }
    }

    // --- Bodies ---

    /// Create the dynamic body for `object` if it does not exist yet.
    pub fn create_body<S: SceneBridge>(
        &mut self,
        object: ObjectId,
        desc: &RigidbodyDesc,
        scene: &S,
    ) -> Result<(), PhysicsError> {
        let world = self.world.as_mut().ok_or(PhysicsError::NoWorld)?;
        if self.bodies.contains_key(&object) {
            return Ok(());
        }
        let pose = scene
            .world_pose(object)
            .ok_or(PhysicsError::MissingOwner(object))?;
        let body = BodyWrapper::create(world, object, &pose, desc);
        self.bodies.insert(object, body);
        Ok(())
    }

    pub fn has_body(&self, object: ObjectId) -> bool {
        self.bodies.contains_key(&object)
    }

    pub fn body(&self, object: ObjectId) -> Option<&BodyWrapper> {
        self.bodies.get(&object)
    }

    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    /// Colliders whose shapes hang off `object`'s body.
    pub fn attached_colliders(&self, object: ObjectId) -> Vec<ColliderId> {
        self.bodies
            .get(&object)
            .map(|body| body.shapes().to_vec())
            .unwrap_or_default()
    }

    /// Release `object`'s body together with its joints and remaining shapes.
    pub fn remove_body(&mut self, object: ObjectId) {
        let Some(body) = self.bodies.remove(&object) else {
            return;
        };
        let joints: Vec<ConstraintId> = self
            .joints
            .iter()
            .filter(|(_, joint)| joint.involves(object))
            .map(|(id, _)| *id)
            .collect();
        for id in joints {
            self.destroy_joint(id);
        }
        for collider in body.shapes().to_vec() {
            self.registry.unregister(collider);
        }
        if let Some(world) = self.world.as_mut() {
            body.release(world);
        }
    }

    fn with_body<R>(
        &mut self,
        object: ObjectId,
        f: impl FnOnce(&mut BodyWrapper, &mut SimulationWorld) -> R,
    ) -> Result<R, PhysicsError> {
        let world = self.world.as_mut().ok_or(PhysicsError::NoWorld)?;
        let body = self
            .bodies
            .get_mut(&object)
            .ok_or(PhysicsError::UnknownBody(object))?;
        Ok(f(body, world))
    }

    pub fn set_body_parameters(
        &mut self,
        object: ObjectId,
        desc: &RigidbodyDesc,
    ) -> Result<(), PhysicsError> {
        self.with_body(object, |body, world| body.set_parameters(world, desc))
    }

    pub fn add_force(
        &mut self,
        object: ObjectId,
        force: Vec3,
        mode: ForceMode,
    ) -> Result<(), PhysicsError> {
        self.with_body(object, |body, world| body.add_force(world, force, mode))
    }

    pub fn add_torque(
        &mut self,
        object: ObjectId,
        torque: Vec3,
        mode: ForceMode,
    ) -> Result<(), PhysicsError> {
        self.with_body(object, |body, world| body.add_torque(world, torque, mode))
    }

    pub fn set_linear_velocity(&mut self, object: ObjectId, v: Vec3) -> Result<(), PhysicsError> {
        self.with_body(object, |body, world| body.set_linear_velocity(world, v))
    }

    pub fn set_angular_velocity(&mut self, object: ObjectId, w: Vec3) -> Result<(), PhysicsError> {
        self.with_body(object, |body, world| body.set_angular_velocity(world, w))
    }

    pub fn wake_up(&mut self, object: ObjectId) -> Result<(), PhysicsError> {
        self.with_body(object, |body, world| body.wake_up(world))
    }

    // --- Colliders ---

    /// Build and register the shape for a collider component.
    ///
    /// `body` names the GameObject whose rigidbody the collider resolves to (its
    /// own or the nearest ancestor's) together with that rigidbody's parameters.
    /// The body is created if needed. With `body == None` the shape gets its own
    /// static body at the owner's world pose.
    pub fn create_collider<S: SceneBridge>(
        &mut self,
        collider: ColliderId,
        owner: ObjectId,
        desc: &ColliderDesc,
        body: Option<(ObjectId, &RigidbodyDesc)>,
        scene: &S,
    ) -> Result<(), PhysicsError> {
        if self.world.is_none() {
            return Err(PhysicsError::NoWorld);
        }
        if !scene.is_alive(owner) {
            return Err(PhysicsError::MissingOwner(owner));
        }
        if self.registry.shape(collider).is_some() {
            return Ok(());
        }
        if let Some((body_owner, body_desc)) = body {
            self.create_body(body_owner, body_desc, scene)?;
        }

        let materials = self
            .materials
            .as_ref()
            .ok_or_else(|| PhysicsError::Foundation("materials released".into()))?;
        let material_handle = materials.resolve(desc.material.as_deref());
        let material = materials.material(material_handle);

        let Some(world) = self.world.as_mut() else {
            return Err(PhysicsError::NoWorld);
        };
        let scale = scene.world_scale(owner).unwrap_or_else(|| Vec3::repeat(1.0));
        let geometry = build_geometry(&desc.shape, &scale, &mut world.meshes)?;

        let (handle, attachment) = match body {
            Some((body_owner, _)) => {
                let local = shape_local_pose(scene, owner, body_owner, &desc.center)
                    .ok_or(PhysicsError::MissingOwner(body_owner))?;
                let body = self
                    .bodies
                    .get_mut(&body_owner)
                    .ok_or(PhysicsError::UnknownBody(body_owner))?;
                let native = native_collider(geometry, &local, &material, desc.is_trigger);
                let handle = world.colliders.insert_with_parent(
                    native,
                    body.handle(),
                    &mut world.bodies,
                );
                body.shapes.push(collider);
                (handle, Attachment::Body(body_owner))
            }
            None => {
                let pose = scene
                    .world_pose(owner)
                    .ok_or(PhysicsError::MissingOwner(owner))?;
                let static_body = StaticBody::create(world, owner, &pose);
                let native = native_collider(
                    geometry,
                    &Pose::from_translation(desc.center),
                    &material,
                    desc.is_trigger,
                );
                let handle = world.colliders.insert_with_parent(
                    native,
                    static_body.handle(),
                    &mut world.bodies,
                );
                self.statics.insert(collider, static_body);
                (handle, Attachment::Static)
            }
        };

        self.registry.register(ShapeWrapper::new(
            handle,
            collider,
            owner,
            attachment,
            material_handle,
            desc,
        ));
        Ok(())
    }

    /// Detach and release a collider's shape, purge its pairs and drop its static body.
    pub fn remove_collider(&mut self, collider: ColliderId) {
        let Some(shape) = self.registry.unregister(collider) else {
            return;
        };
        let Some(world) = self.world.as_mut() else {
            return;
        };
        match shape.attachment() {
            Attachment::Body(body_owner) => {
                world.remove_collider(shape.handle());
                if let Some(body) = self.bodies.get_mut(&body_owner) {
                    body.shapes.retain(|c| *c != collider);
                }
            }
            Attachment::Static => {
                if let Some(static_body) = self.statics.remove(&collider) {
                    static_body.release(world);
                }
            }
        }
    }

    /// Move a shape that currently sits on its own static body onto `body_owner`'s body.
    pub fn attach_collider<S: SceneBridge>(
        &mut self,
        collider: ColliderId,
        body_owner: ObjectId,
        center: &Vec3,
        scene: &S,
    ) -> Result<(), PhysicsError> {
        let world = self.world.as_mut().ok_or(PhysicsError::NoWorld)?;
        let shape = self
            .registry
            .shape_mut(collider)
            .ok_or(PhysicsError::UnknownCollider(collider))?;
        if shape.attachment() != Attachment::Static {
            return Ok(());
        }
        let body = self
            .bodies
            .get_mut(&body_owner)
            .ok_or(PhysicsError::UnknownBody(body_owner))?;
        let local = shape_local_pose(scene, shape.owner(), body_owner, center)
            .ok_or(PhysicsError::MissingOwner(shape.owner()))?;

        world
            .colliders
            .set_parent(shape.handle(), Some(body.handle()), &mut world.bodies);
        shape.set_local_pose(&mut world.colliders, &local);
        shape.attachment = Attachment::Body(body_owner);
        body.shapes.push(collider);

        // The shape has left it, so this only drops the empty fixed body.
        if let Some(static_body) = self.statics.remove(&collider) {
            static_body.release(world);
        }
        Ok(())
    }

    pub fn collider_shape(&self, collider: ColliderId) -> Option<&ShapeWrapper> {
        self.registry.shape(collider)
    }

    pub fn native_collider(&self, collider: ColliderId) -> Option<&Collider> {
        let shape = self.registry.shape(collider)?;
        self.world.as_ref()?.colliders.get(shape.handle())
    }

    pub fn static_body(&self, collider: ColliderId) -> Option<&StaticBody> {
        self.statics.get(&collider)
    }

    pub fn static_body_count(&self) -> usize {
        self.statics.len()
    }

    /// Rebuild the collider's native geometry for a new world scale.
    pub fn set_collider_scale(
        &mut self,
        collider: ColliderId,
        scale: &Vec3,
    ) -> Result<(), PhysicsError> {
        let world = self.world.as_mut().ok_or(PhysicsError::NoWorld)?;
        let shape = self
            .registry
            .shape(collider)
            .ok_or(PhysicsError::UnknownCollider(collider))?;
        shape.set_scale(&mut world.colliders, &mut world.meshes, scale)
    }

    /// Recompute the shape's pose relative to its body from the collider's center.
    pub fn set_collider_offset<S: SceneBridge>(
        &mut self,
        collider: ColliderId,
        center: &Vec3,
        scene: &S,
    ) -> Result<(), PhysicsError> {
        let world = self.world.as_mut().ok_or(PhysicsError::NoWorld)?;
        let shape = self
            .registry
            .shape(collider)
            .ok_or(PhysicsError::UnknownCollider(collider))?;
        let local = match shape.attachment() {
            Attachment::Body(body_owner) => {
                shape_local_pose(scene, shape.owner(), body_owner, center)
                    .ok_or(PhysicsError::MissingOwner(body_owner))?
            }
            Attachment::Static => Pose::from_translation(*center),
        };
        shape.set_local_pose(&mut world.colliders, &local);
        Ok(())
    }

    pub fn set_collider_trigger(
        &mut self,
        collider: ColliderId,
        is_trigger: bool,
    ) -> Result<(), PhysicsError> {
        let world = self.world.as_mut().ok_or(PhysicsError::NoWorld)?;
        let shape = self
            .registry
            .shape_mut(collider)
            .ok_or(PhysicsError::UnknownCollider(collider))?;
        shape.set_trigger(&mut world.colliders, is_trigger);
        Ok(())
    }

    pub fn set_collider_material(
        &mut self,
        collider: ColliderId,
        path: Option<&str>,
    ) -> Result<(), PhysicsError> {
        let world = self.world.as_mut().ok_or(PhysicsError::NoWorld)?;
        let materials = self
            .materials
            .as_ref()
            .ok_or_else(|| PhysicsError::Foundation("materials released".into()))?;
        let shape = self
            .registry
            .shape_mut(collider)
            .ok_or(PhysicsError::UnknownCollider(collider))?;
        let handle = materials.resolve(path);
        shape.set_material(&mut world.colliders, handle, &materials.material(handle));
        Ok(())
    }

    // --- Materials ---

    /// Handle for `path`, creating the material if it is new. `None` after `delete`.
    pub fn create_material(
        &mut self,
        path: &str,
        material: PhysicsMaterial,
    ) -> Option<MaterialHandle> {
        Some(self.materials.as_mut()?.create(path, material))
    }

    /// Change a material in place and push the new values to every live shape using it.
    pub fn update_material(
        &mut self,
        path: &str,
        material: PhysicsMaterial,
    ) -> Option<MaterialHandle> {
        let materials = self.materials.as_mut()?;
        let handle = materials.update(path, material)?;
        let material = materials.material(handle);
        if let Some(world) = self.world.as_mut() {
            for shape in self.registry.shapes_mut().filter(|s| s.material() == handle) {
                shape.set_material(&mut world.colliders, handle, &material);
            }
        }
        Some(handle)
    }

    pub fn material_handle(&self, path: &str) -> Option<MaterialHandle> {
        self.materials.as_ref()?.get(path)
    }

    pub fn material(&self, handle: MaterialHandle) -> Option<PhysicsMaterial> {
        Some(self.materials.as_ref()?.material(handle))
    }

    pub fn material_count(&self) -> usize {
        self.materials.as_ref().map(MaterialCache::len).unwrap_or(0)
    }

    /// Number of cached `(convex hulls, triangle meshes)` in the active world.
    pub fn mesh_cache_counts(&self) -> (usize, usize) {
        self.world
            .as_ref()
            .map(|w| (w.meshes.convex_len(), w.meshes.triangle_len()))
            .unwrap_or((0, 0))
    }

    // --- Joints ---

    /// Create the joint for `constraint` between `local`'s and `remote`'s bodies.
    /// A second call for the same constraint is a no-op.
    pub fn create_joint<S: SceneBridge>(
        &mut self,
        constraint: ConstraintId,
        local: ObjectId,
        remote: ObjectId,
        desc: &ConstraintDesc,
        scene: &S,
    ) -> Result<(), PhysicsError> {
        let world = self.world.as_mut().ok_or(PhysicsError::NoWorld)?;
        if self.joints.contains_key(&constraint) {
            return Ok(());
        }
        let missing = |object| PhysicsError::MissingBody { constraint, object };
        let local_body = self.bodies.get(&local).ok_or_else(|| missing(local))?;
        let remote_body = self.bodies.get(&remote).ok_or_else(|| missing(remote))?;
        let local_pose = scene
            .world_pose(local)
            .ok_or(PhysicsError::MissingOwner(local))?;
        let remote_pose = scene
            .world_pose(remote)
            .ok_or(PhysicsError::MissingOwner(remote))?;

        let joint = JointWrapper::create(
            world,
            constraint,
            local_body,
            remote_body,
            &local_pose,
            &remote_pose,
            desc,
        );
        self.joints.insert(constraint, joint);
        Ok(())
    }

    /// Release the constraint's joint. No-op when there is none.
    pub fn destroy_joint(&mut self, constraint: ConstraintId) {
        let Some(joint) = self.joints.remove(&constraint) else {
            return;
        };
        if let Some(world) = self.world.as_mut() {
            joint.release(world);
        }
    }

    pub fn joint(&self, constraint: ConstraintId) -> Option<&JointWrapper> {
        self.joints.get(&constraint)
    }

    pub fn has_joint(&self, constraint: ConstraintId) -> bool {
        self.joints.contains_key(&constraint)
    }

    pub fn joint_count(&self) -> usize {
        self.joints.len()
    }

    fn with_joint<R>(
        &mut self,
        constraint: ConstraintId,
        f: impl FnOnce(&mut JointWrapper, &mut SimulationWorld) -> R,
    ) -> Option<R> {
        let world = self.world.as_mut()?;
        let joint = self.joints.get_mut(&constraint)?;
        Some(f(joint, world))
    }

    /// Re-apply min/max distance, stiffness and damping to an existing joint.
    pub fn set_joint_parameters(
        &mut self,
        constraint: ConstraintId,
        desc: &ConstraintDesc,
    ) -> bool {
        self.with_joint(constraint, |joint, world| joint.set_parameters(world, desc))
            .is_some()
    }

    pub fn set_joint_drive_velocity(&mut self, constraint: ConstraintId, velocity: f32) -> bool {
        self.with_joint(constraint, |joint, world| {
            joint.set_drive_velocity(world, velocity)
        })
        .is_some()
    }

    /// Linear limits on the native joint, for inspection.
    pub fn joint_distance_limits(&self, constraint: ConstraintId) -> Option<[f32; 2]> {
        self.joints.get(&constraint)?.distance_limits(self.world.as_ref()?)
    }
}

/// Pose of a collider's shape relative to the body it is attached to.
///
/// Same GameObject: the center is used directly. Descendant: the center is
/// carried into world space through the collider's GameObject and then into
/// the body's frame.
fn shape_local_pose<S: SceneBridge>(
    scene: &S,
    owner: ObjectId,
    body_owner: ObjectId,
    center: &Vec3,
) -> Option<Pose> {
    if owner == body_owner {
        return Some(Pose::from_translation(*center));
    }
    let body = scene.world_pose(body_owner)?;
    let collider = scene.world_pose(owner)?;
    let world_center = Pose::new(collider.transform_point(center), collider.rotation);
    Some(body.relative(&world_center))
}

fn dispatch_pair<S: SceneBridge>(
    registry: &CollisionRegistry,
    scene: &mut S,
    pair: ColliderPair,
    event: ContactEvent,
) {
    let (Some(a), Some(b)) = (
        registry.owner_of(pair.first()),
        registry.owner_of(pair.second()),
    ) else {
        return;
    };
    if scene.is_alive(a) {
        scene.dispatch(a, event, pair.second());
    }
    if scene.is_alive(b) {
        scene.dispatch(b, event, pair.first());
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use rapier3d::pipeline::{ContactModificationContext, PhysicsHooks};

    use super::*;
    use crate::shape::ColliderShape;
    use crate::types::Quat;

    /// Flat scene: no hierarchy, every object is a root.
    #[derive(Default)]
    struct FlatScene {
        objects: HashMap<ObjectId, (Pose, Vec3)>,
        events: Vec<(ObjectId, ContactEvent, ColliderId)>,
        writes: usize,
    }

    impl FlatScene {
        fn spawn(&mut self, index: u32, at: Vec3) -> ObjectId {
            let id = ObjectId::new(index, 0);
            self.objects
                .insert(id, (Pose::from_translation(at), Vec3::repeat(1.0)));
            id
        }

        fn move_to(&mut self, id: ObjectId, at: Vec3) {
            if let Some((pose, _)) = self.objects.get_mut(&id) {
                pose.translation = at;
            }
        }

        fn take_events(&mut self) -> Vec<(ObjectId, ContactEvent, ColliderId)> {
            std::mem::take(&mut self.events)
        }
    }

    impl SceneBridge for FlatScene {
        fn is_alive(&self, object: ObjectId) -> bool {
            self.objects.contains_key(&object)
        }

        fn world_position(&self, object: ObjectId) -> Option<Vec3> {
            self.objects.get(&object).map(|(p, _)| p.translation)
        }

        fn world_rotation(&self, object: ObjectId) -> Option<Quat> {
            self.objects.get(&object).map(|(p, _)| p.rotation)
        }

        fn world_scale(&self, object: ObjectId) -> Option<Vec3> {
            self.objects.get(&object).map(|(_, s)| *s)
        }

        fn set_world_transform(
            &mut self,
            object: ObjectId,
            position: Vec3,
            rotation: Quat,
            _: bool,
        ) {
            if let Some((pose, _)) = self.objects.get_mut(&object) {
                *pose = Pose::new(position, rotation);
                self.writes += 1;
            }
        }

        fn dispatch(&mut self, object: ObjectId, event: ContactEvent, other: ColliderId) {
            self.events.push((object, event, other));
        }
    }

    fn manager() -> PhysicManager {
        manager_with(PhysicsSettings::without_gravity())
    }

    fn manager_with(settings: PhysicsSettings) -> PhysicManager {
        let settings = PhysicsSettings {
            worker_threads: Some(0),
            ..settings
        };
        let mut m = PhysicManager::initialize(settings).unwrap();
        m.create_scene();
        m
    }

    fn count(
        events: &[(ObjectId, ContactEvent, ColliderId)],
        object: ObjectId,
        event: ContactEvent,
    ) -> usize {
        events
            .iter()
            .filter(|(o, e, _)| *o == object && *e == event)
            .count()
    }

    /// A ball that does not bounce, resting on a 1x1x1 static box at the origin, under gravity.
    fn ball_on_box(m: &mut PhysicManager, scene: &mut FlatScene) -> (ObjectId, ObjectId) {
        let ground = scene.spawn(0, Vec3::zeros());
        let ball = scene.spawn(1, Vec3::new(0.0, 0.98, 0.0));
        m.create_material("clay.mat", PhysicsMaterial::new(0.5, 0.5, 0.0));
        let ground_box = unit_box().material("clay.mat");
        m.create_collider(ColliderId(1), ground, &ground_box, None, &*scene)
            .unwrap();
        let sphere = ColliderDesc::new(ColliderShape::Sphere { radius: 0.5 }).material("clay.mat");
        m.create_collider(
            ColliderId(2),
            ball,
            &sphere,
            Some((ball, &RigidbodyDesc::default())),
            &*scene,
        )
        .unwrap();
        (ground, ball)
    }

    fn unit_box() -> ColliderDesc {
        ColliderDesc::new(ColliderShape::Box {
            half_extents: Vec3::repeat(0.5),
        })
    }

    fn no_gravity() -> RigidbodyDesc {
        RigidbodyDesc {
            use_gravity: false,
            ..RigidbodyDesc::default()
        }
    }

    #[test]
    fn update_is_gated_on_play_state() {
        let mut m = manager();
        let mut scene = FlatScene::default();
        let a = scene.spawn(0, Vec3::zeros());
        m.create_body(a, &no_gravity(), &scene).unwrap();

        let paused = FrameTime {
            playing: false,
            ..FrameTime::playing(0.016)
        };
        let frozen = FrameTime {
            time_scale: 0.0,
            ..FrameTime::playing(0.016)
        };
        m.update(paused, &mut scene);
        m.update(frozen, &mut scene);
        m.update(FrameTime::playing(0.0), &mut scene);
        assert_eq!(scene.writes, 0);

        m.update(FrameTime::playing(0.016), &mut scene);
        assert_eq!(scene.writes, 1);
    }

    #[test]
    fn scene_pose_is_written_before_the_step() {
        let mut m = manager();
        let mut scene = FlatScene::default();
        let a = scene.spawn(0, Vec3::zeros());
        m.create_body(a, &no_gravity(), &scene).unwrap();

        scene.move_to(a, Vec3::new(3.0, 4.0, 5.0));
        m.update(FrameTime::playing(0.016), &mut scene);

        let handle = m.body(a).unwrap().handle();
        let native = m.world().unwrap().bodies()[handle].translation();
        assert!((native - Vec3::new(3.0, 4.0, 5.0)).norm() < 1e-4);
        assert!((scene.world_position(a).unwrap() - Vec3::new(3.0, 4.0, 5.0)).norm() < 1e-4);
    }

    #[test]
    fn no_world_means_no_creation() {
        let mut m = PhysicManager::initialize(PhysicsSettings {
            worker_threads: Some(0),
            ..PhysicsSettings::default()
        })
        .unwrap();
        let mut scene = FlatScene::default();
        let a = scene.spawn(0, Vec3::zeros());

        assert!(matches!(
            m.create_collider(ColliderId(1), a, &unit_box(), None, &scene),
            Err(PhysicsError::NoWorld)
        ));
        assert!(m.registry().is_empty());
    }

    #[test]
    fn dead_owner_is_not_registered() {
        let mut m = manager();
        let scene = FlatScene::default();
        let ghost = ObjectId::new(42, 3);

        assert!(matches!(
            m.create_collider(ColliderId(1), ghost, &unit_box(), None, &scene),
            Err(PhysicsError::MissingOwner(_))
        ));
        assert!(m.registry().is_empty());
        assert_eq!(m.static_body_count(), 0);
    }

    #[test]
    fn trigger_enter_stay_exit_over_frames() {
        let mut m = manager();
        let mut scene = FlatScene::default();
        let zone = scene.spawn(0, Vec3::zeros());
        let ball = scene.spawn(1, Vec3::new(50.0, 0.0, 0.0));

        m.create_collider(ColliderId(1), zone, &unit_box().trigger(true), None, &scene)
            .unwrap();
        m.create_collider(
            ColliderId(2),
            ball,
            &ColliderDesc::new(ColliderShape::Sphere { radius: 0.5 }),
            Some((ball, &no_gravity())),
            &scene,
        )
        .unwrap();

        // Frame 1: apart.
        m.update(FrameTime::playing(0.016), &mut scene);
        assert!(scene.take_events().is_empty());

        // Frame 2: overlapping.
        scene.move_to(ball, Vec3::zeros());
        m.update(FrameTime::playing(0.016), &mut scene);
        let events = scene.take_events();
        assert!(events.contains(&(zone, ContactEvent::TriggerEnter, ColliderId(2))));
        assert!(events.contains(&(ball, ContactEvent::TriggerEnter, ColliderId(1))));
        assert_eq!(events.len(), 2);

        // Frame 3: still overlapping.
        m.update(FrameTime::playing(0.016), &mut scene);
        let events = scene.take_events();
        assert!(events.iter().all(|(_, e, _)| *e == ContactEvent::TriggerStay));
        assert_eq!(events.len(), 2);

        // Frame 4: apart again.
        scene.move_to(ball, Vec3::new(50.0, 0.0, 0.0));
        m.update(FrameTime::playing(0.016), &mut scene);
        let events = scene.take_events();
        assert!(events.iter().all(|(_, e, _)| *e == ContactEvent::TriggerExit));
        assert_eq!(events.len(), 2);

        // Frame 5: nothing.
        m.update(FrameTime::playing(0.016), &mut scene);
        assert!(scene.take_events().is_empty());
    }

    #[test]
    fn collision_enter_stay_exit_reach_both_owners() {
        let mut m = manager_with(PhysicsSettings::default());
        let mut scene = FlatScene::default();
        let (ground, ball) = ball_on_box(&mut m, &mut scene);

        let mut events = Vec::new();
        for _ in 0..10 {
            m.update(FrameTime::playing(0.016), &mut scene);
            events.extend(scene.take_events());
        }
        assert!(events.contains(&(ground, ContactEvent::CollisionEnter, ColliderId(2))));
        assert!(events.contains(&(ball, ContactEvent::CollisionEnter, ColliderId(1))));
        for owner in [ground, ball] {
            assert_eq!(count(&events, owner, ContactEvent::CollisionEnter), 1);
            assert!(count(&events, owner, ContactEvent::CollisionStay) >= 1);
            assert_eq!(count(&events, owner, ContactEvent::CollisionExit), 0);
        }
        assert!(events.iter().all(|(_, e, _)| !matches!(
            e,
            ContactEvent::TriggerEnter | ContactEvent::TriggerStay | ContactEvent::TriggerExit
        )));

        scene.move_to(ball, Vec3::new(50.0, 50.0, 0.0));
        m.update(FrameTime::playing(0.016), &mut scene);
        let events = scene.take_events();
        assert!(events.contains(&(ground, ContactEvent::CollisionExit, ColliderId(2))));
        assert!(events.contains(&(ball, ContactEvent::CollisionExit, ColliderId(1))));
        assert_eq!(events.len(), 2);

        m.update(FrameTime::playing(0.016), &mut scene);
        assert!(scene.take_events().is_empty());
    }

    #[test]
    fn static_trigger_ignores_static_geometry() {
        let mut m = manager();
        let mut scene = FlatScene::default();
        let zone = scene.spawn(0, Vec3::zeros());
        let wall = scene.spawn(1, Vec3::new(0.25, 0.0, 0.0));

        m.create_collider(ColliderId(1), zone, &unit_box().trigger(true), None, &scene)
            .unwrap();
        m.create_collider(ColliderId(2), wall, &unit_box(), None, &scene)
            .unwrap();

        for _ in 0..3 {
            m.update(FrameTime::playing(0.016), &mut scene);
            assert!(scene.take_events().is_empty());
        }
        assert!(m.registry().triggers().current().is_empty());
    }

    #[test]
    fn kinematic_body_follows_scene_as_a_target() {
        let mut m = manager();
        let mut scene = FlatScene::default();
        let platform = scene.spawn(0, Vec3::zeros());
        let desc = RigidbodyDesc {
            is_kinematic: true,
            ..no_gravity()
        };
        m.create_body(platform, &desc, &scene).unwrap();

        scene.move_to(platform, Vec3::new(0.1, 0.0, 0.0));
        m.update(FrameTime::playing(0.016), &mut scene);

        let body = m.body(platform).unwrap();
        let rb = &m.world().unwrap().bodies()[body.handle()];
        assert!(rb.is_kinematic());
        assert!((rb.translation() - Vec3::new(0.1, 0.0, 0.0)).norm() < 1e-4);
        // The solver derived a velocity from the move instead of teleporting.
        assert!(body.linear_velocity().x > 0.0);
    }

    #[derive(Default)]
    struct CountingHooks(AtomicUsize);

    impl PhysicsHooks for CountingHooks {
        fn modify_solver_contacts(&self, _: &mut ContactModificationContext<'_>) {
            self.0.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[test]
    fn contact_hooks_survive_world_rebuilds() {
        let mut m = manager_with(PhysicsSettings::default());
        let hooks = Arc::new(CountingHooks::default());
        m.set_contact_hooks(hooks.clone());
        m.create_scene();

        let mut scene = FlatScene::default();
        ball_on_box(&mut m, &mut scene);
        for _ in 0..3 {
            m.update(FrameTime::playing(0.016), &mut scene);
        }
        assert!(hooks.0.load(Ordering::Relaxed) > 0);
    }

    #[test]
    fn removed_collider_never_exits() {
        let mut m = manager();
        let mut scene = FlatScene::default();
        let zone = scene.spawn(0, Vec3::zeros());
        let ball = scene.spawn(1, Vec3::zeros());

        m.create_collider(ColliderId(1), zone, &unit_box().trigger(true), None, &scene)
            .unwrap();
        m.create_collider(
            ColliderId(2),
            ball,
            &ColliderDesc::new(ColliderShape::Sphere { radius: 0.5 }),
            Some((ball, &no_gravity())),
            &scene,
        )
        .unwrap();
        m.update(FrameTime::playing(0.016), &mut scene);
        assert_eq!(scene.take_events().len(), 2);

        m.remove_collider(ColliderId(1));
        assert!(m.registry().triggers().current().is_empty());
        assert!(m.registry().triggers().previous().is_empty());
        assert_eq!(m.static_body_count(), 0);

        m.update(FrameTime::playing(0.016), &mut scene);
        assert!(scene.take_events().is_empty());

        // Removing twice is harmless.
        m.remove_collider(ColliderId(1));
    }

    #[test]
    fn material_update_reaches_live_shapes() {
        let mut m = manager();
        let mut scene = FlatScene::default();
        let a = scene.spawn(0, Vec3::zeros());

        let h = m
            .create_material("ice.mat", PhysicsMaterial::new(0.1, 0.1, 0.0))
            .unwrap();
        assert_eq!(m.create_material("ice.mat", PhysicsMaterial::default()), Some(h));
        assert_eq!(m.material_count(), 1);

        m.create_collider(ColliderId(1), a, &unit_box().material("ice.mat"), None, &scene)
            .unwrap();
        assert!((m.native_collider(ColliderId(1)).unwrap().friction() - 0.1).abs() < 1e-6);

        m.update_material("ice.mat", PhysicsMaterial::new(0.3, 0.05, -1.0));
        let native = m.native_collider(ColliderId(1)).unwrap();
        assert!((native.friction() - 0.05).abs() < 1e-6);
        assert_eq!(native.restitution(), 0.0);
    }

    #[test]
    fn delete_tolerates_repeats() {
        let mut m = manager();
        m.delete();
        assert!(!m.has_world());
        assert!(!m.is_initialized());
        m.delete();
        m.delete_scene();
        assert!(m.create_material("x.mat", PhysicsMaterial::default()).is_none());
    }
}
