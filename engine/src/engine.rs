/*!
The play-mode loop: owns the scene and the physics adapter and keeps the two in
step.

Component add/remove calls work in every state. In edit mode (and in prefab
preview scenes) they only touch the scene; while a simulation world exists
they also create or release the native counterparts.
*/

use std::sync::Arc;

use physics::{
    Attachment, ColliderDesc, ColliderId, ConstraintDesc, ConstraintId, ForceMode, FrameTime,
    MeshData, MeshId, ObjectId, PhysicManager, PhysicsError, PhysicsSettings, RigidbodyDesc,
    ShapeWrapper, Vec3,
};

use crate::components::{Collider, Constraint, Rigidbody, Vehicle, has_rigidbody};
use crate::deferred::DeferredRef;
use crate::error::EngineError;
use crate::main_thread::MainThreadQueue;
use crate::scene::Scene;
use crate::serialize::{TokenReader, read_collider, read_constraint, read_rigidbody, read_vehicle};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PlayState {
    Edit,
    Playing,
    Paused,
}

/// Where an unresolved reference lives, so it can be written back after resolution.
enum RefSlot {
    Constraint(ConstraintId),
    Wheel(usize),
}

pub struct Engine {
    scene: Scene,
    physics: PhysicManager,
    state: PlayState,
    time_scale: f32,
    queue: MainThreadQueue,
}

impl Engine {
    pub fn new(settings: PhysicsSettings) -> Result<Self, PhysicsError> {
        Self::with_scene(settings, Scene::new())
    }

    pub fn with_scene(settings: PhysicsSettings, scene: Scene) -> Result<Self, PhysicsError> {
        let physics = PhysicManager::initialize(settings)?;
        Ok(Self {
            scene,
            physics,
            state: PlayState::Edit,
            time_scale: 1.0,
            queue: MainThreadQueue::new(),
        })
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut Scene {
        &mut self.scene
    }

    pub fn physics(&self) -> &PhysicManager {
        &self.physics
    }

    pub fn physics_mut(&mut self) -> &mut PhysicManager {
        &mut self.physics
    }

    pub fn state(&self) -> PlayState {
        self.state
    }

    pub fn time_scale(&self) -> f32 {
        self.time_scale
    }

    pub fn set_time_scale(&mut self, time_scale: f32) {
        self.time_scale = time_scale.max(0.0);
    }

    /// Handle other threads use to post work for the next tick.
    pub fn queue(&self) -> MainThreadQueue {
        self.queue.clone()
    }

    fn physics_live(&self) -> bool {
        self.physics.has_world() && !self.scene.is_prefab_preview()
    }

    // --- Play state ---

    /// Enter play mode: fresh world, then bodies, colliders and constraints in that order.
    pub fn play(&mut self) {
        if self.state != PlayState::Edit {
            return;
        }
        self.state = PlayState::Playing;
        if self.scene.is_prefab_preview() {
            return;
        }
        self.physics.create_scene();

        let objects = self.scene.objects();
        for &object in &objects {
            let desc = self
                .scene
                .get(object)
                .and_then(|o| o.rigidbody.as_ref())
                .map(|rb| rb.desc.clone());
            if let Some(desc) = desc {
                self.awake_rigidbody(object, &desc);
            }
        }
        for &object in &objects {
            for collider in self.collider_ids(object) {
                self.awake_collider(object, collider);
            }
        }
        for &object in &objects {
            for constraint in self.constraint_ids(object) {
                self.start_constraint(object, constraint);
            }
        }
    }

    /// Leave play mode. The world goes away with every native object in it.
    pub fn stop(&mut self) {
        if self.state == PlayState::Edit {
            return;
        }
        self.physics.delete_scene();
        for object in self.scene.objects() {
            if let Some(o) = self.scene.get_mut(object) {
                for constraint in o.constraints.iter_mut() {
                    constraint.set_started(false);
                }
            }
        }
        self.state = PlayState::Edit;
    }

    pub fn pause(&mut self) {
        if self.state == PlayState::Playing {
            self.state = PlayState::Paused;
        }
    }

    pub fn resume(&mut self) {
        if self.state == PlayState::Paused {
            self.state = PlayState::Playing;
        }
    }

    /// Release the world, the materials and the worker pool.
    pub fn shutdown(&mut self) {
        self.stop();
        self.physics.delete();
    }

    /// Run one frame.
    pub fn tick(&mut self, dt: f32) {
        for job in self.queue.drain() {
            job(self);
        }
        if self.state != PlayState::Playing || !self.physics_live() {
            return;
        }

        self.resolve_references();
        self.connect_constraints();
        self.drive_vehicles();

        let time = FrameTime {
            delta: dt * self.time_scale,
            time_scale: self.time_scale,
            playing: true,
        };
        self.physics.update(time, &mut self.scene);
    }

    /// One resolution attempt for every unresolved reference.
    fn resolve_references(&mut self) {
        let mut pending = Vec::new();
        for object in self.scene.objects() {
            let Some(o) = self.scene.get(object) else {
                continue;
            };
            for constraint in &o.constraints {
                if let Some(r @ DeferredRef::Unresolved(_)) = constraint.remote {
                    pending.push((object, RefSlot::Constraint(constraint.id()), r));
                }
            }
            if let Some(vehicle) = &o.vehicle {
                for (i, wheel) in vehicle.wheels.iter().enumerate() {
                    if let Some(r @ DeferredRef::Unresolved(_)) = *wheel {
                        pending.push((object, RefSlot::Wheel(i), r));
                    }
                }
            }
        }

        for (object, slot, mut r) in pending {
            if !r.resolve(&self.scene, has_rigidbody) {
                continue;
            }
            let Some(o) = self.scene.get_mut(object) else {
                continue;
            };
            match slot {
                RefSlot::Constraint(id) => {
                    if let Some(c) = o.constraints.iter_mut().find(|c| c.id() == id) {
                        c.remote = Some(r);
                    }
                }
                RefSlot::Wheel(i) => {
                    if let Some(wheel) = o.vehicle.as_mut().and_then(|v| v.wheels.get_mut(i)) {
                        *wheel = Some(r);
                    }
                }
            }
        }
    }

    /// Create joints for started constraints that are still waiting on their remote.
    fn connect_constraints(&mut self) {
        let waiting: Vec<(ObjectId, ConstraintId)> = self
            .scene
            .objects()
            .into_iter()
            .flat_map(|object| {
                self.scene
                    .get(object)
                    .map(|o| {
                        o.constraints
                            .iter()
                            .filter(|c| c.is_started() && !self.physics.has_joint(c.id()))
                            .map(|c| (object, c.id()))
                            .collect::<Vec<_>>()
                    })
                    .unwrap_or_default()
            })
            .collect();
        for (object, constraint) in waiting {
            self.try_create_joint(object, constraint);
        }
    }

    fn drive_vehicles(&mut self) {
        let mut drives = Vec::new();
        for object in self.scene.objects() {
            let Some(vehicle) = self.scene.get(object).and_then(|o| o.vehicle.as_ref()) else {
                continue;
            };
            if vehicle.drive_torque == 0.0 {
                continue;
            }
            for wheel in vehicle.wheel_targets(&self.scene) {
                if let Some(t) = self.scene.world_transform(wheel) {
                    drives.push((wheel, t.rotation * Vec3::x() * vehicle.drive_torque));
                }
            }
        }
        for (wheel, torque) in drives {
            if let Err(err) = self.physics.add_torque(wheel, torque, ForceMode::Force) {
                log::debug!("vehicle wheel {wheel:?} not driven: {err}");
            }
        }
    }

    // --- Rigidbody ---

    pub fn add_rigidbody(
        &mut self,
        object: ObjectId,
        rigidbody: Rigidbody,
    ) -> Result<(), EngineError> {
        let o = self
            .scene
            .get_mut(object)
            .ok_or(EngineError::NoObject(object))?;
        let desc = rigidbody.desc.clone();
        o.rigidbody = Some(rigidbody);
        if !self.physics_live() {
            return Ok(());
        }
        if self.physics.has_body(object) {
            self.set_rigidbody_parameters(object, desc)?;
            return Ok(());
        }
        self.awake_rigidbody(object, &desc);

        // Static shapes at or below this object now belong to the new body.
        for id in self.scene.subtree(object) {
            if self.scene.rigidbody_owner(id) != Some(object) {
                continue;
            }
            for collider in self.collider_ids(id) {
                let is_static = self
                    .physics
                    .collider_shape(collider)
                    .is_some_and(|s| s.attachment() == Attachment::Static);
                let center = self
                    .scene
                    .get(id)
                    .and_then(|o| o.collider(collider))
                    .map(|c| c.desc.center);
                let (true, Some(center)) = (is_static, center) else {
                    continue;
                };
                let attached = self
                    .physics
                    .attach_collider(collider, object, &center, &self.scene);
                if let Err(err) = attached {
                    log::error!("failed to attach collider {collider:?} to {object:?}: {err}");
                }
            }
        }
        Ok(())
    }

    fn awake_rigidbody(&mut self, object: ObjectId, desc: &RigidbodyDesc) {
        if let Err(err) = self.physics.create_body(object, desc, &self.scene) {
            log::error!("failed to create body for {object:?}: {err}");
        }
    }

    pub fn set_rigidbody_parameters(
        &mut self,
        object: ObjectId,
        desc: RigidbodyDesc,
    ) -> Result<(), EngineError> {
        let rigidbody = self
            .scene
            .get_mut(object)
            .and_then(|o| o.rigidbody.as_mut())
            .ok_or(EngineError::NoObject(object))?;
        rigidbody.desc = desc.clone();
        if self.physics_live() {
            self.physics.set_body_parameters(object, &desc)?;
        }
        Ok(())
    }

    /// Remove the Rigidbody component. In play, every collider attached to the
    /// body loses its component too, then the body is released.
    pub fn remove_rigidbody(&mut self, object: ObjectId) -> bool {
        let has = self
            .scene
            .get(object)
            .is_some_and(|o| o.rigidbody.is_some());
        if !has {
            return false;
        }
        if self.physics_live() {
            let attached: Vec<(ColliderId, Option<ObjectId>)> = self
                .physics
                .attached_colliders(object)
                .into_iter()
                .map(|c| (c, self.physics.collider_shape(c).map(ShapeWrapper::owner)))
                .collect();
            for (collider, owner) in attached {
                match owner {
                    Some(owner) => {
                        self.remove_collider(owner, collider);
                    }
                    None => self.physics.remove_collider(collider),
                }
            }
            self.physics.remove_body(object);
        }
        if let Some(o) = self.scene.get_mut(object) {
            o.rigidbody = None;
        }
        true
    }

    // --- Colliders ---

    pub fn add_collider(
        &mut self,
        object: ObjectId,
        desc: ColliderDesc,
    ) -> Result<ColliderId, EngineError> {
        if !self.scene.contains(object) {
            return Err(EngineError::NoObject(object));
        }
        let id = ColliderId(self.scene.next_component_id());
        if let Some(o) = self.scene.get_mut(object) {
            o.colliders.push(Collider::new(id, desc));
        }
        if self.physics_live() {
            self.awake_collider(object, id);
        }
        Ok(id)
    }

    fn awake_collider(&mut self, object: ObjectId, collider: ColliderId) {
        let Some(desc) = self
            .scene
            .get(object)
            .and_then(|o| o.collider(collider))
            .map(|c| c.desc.clone())
        else {
            return;
        };
        let owner = self.scene.rigidbody_owner(object);
        let body_desc = owner
            .and_then(|o| self.scene.get(o))
            .and_then(|o| o.rigidbody.as_ref())
            .map(|rb| rb.desc.clone());
        let body = owner.zip(body_desc.as_ref());
        if let Err(err) = self
            .physics
            .create_collider(collider, object, &desc, body, &self.scene)
        {
            log::error!("failed to create collider {collider:?} on {object:?}: {err}");
        }
    }

    pub fn remove_collider(&mut self, object: ObjectId, collider: ColliderId) -> bool {
        let Some(o) = self.scene.get_mut(object) else {
            return false;
        };
        let before = o.colliders.len();
        o.colliders.retain(|c| c.id() != collider);
        let removed = o.colliders.len() != before;
        if self.physics_live() {
            self.physics.remove_collider(collider);
        }
        removed
    }

    /// Rebuild the collider's geometry from its GameObject's current world scale.
    pub fn refresh_collider_scale(
        &mut self,
        object: ObjectId,
        collider: ColliderId,
    ) -> Result<(), EngineError> {
        let scale = self
            .scene
            .world_transform(object)
            .ok_or(EngineError::NoObject(object))?
            .scale;
        if self.physics_live() {
            self.physics.set_collider_scale(collider, &scale)?;
        }
        Ok(())
    }

    pub fn set_collider_center(
        &mut self,
        object: ObjectId,
        collider: ColliderId,
        center: Vec3,
    ) -> Result<(), EngineError> {
        self.collider_desc_mut(object, collider)?.center = center;
        if self.physics_live() {
            self.physics
                .set_collider_offset(collider, &center, &self.scene)?;
        }
        Ok(())
    }

    pub fn set_collider_trigger(
        &mut self,
        object: ObjectId,
        collider: ColliderId,
        is_trigger: bool,
    ) -> Result<(), EngineError> {
        self.collider_desc_mut(object, collider)?.is_trigger = is_trigger;
        if self.physics_live() {
            self.physics.set_collider_trigger(collider, is_trigger)?;
        }
        Ok(())
    }

    pub fn set_collider_material(
        &mut self,
        object: ObjectId,
        collider: ColliderId,
        path: Option<&str>,
    ) -> Result<(), EngineError> {
        self.collider_desc_mut(object, collider)?.material = path.map(str::to_owned);
        if self.physics_live() {
            self.physics.set_collider_material(collider, path)?;
        }
        Ok(())
    }

    fn collider_desc_mut(
        &mut self,
        object: ObjectId,
        collider: ColliderId,
    ) -> Result<&mut ColliderDesc, EngineError> {
        self.scene
            .get_mut(object)
            .ok_or(EngineError::NoObject(object))?
            .colliders
            .iter_mut()
            .find(|c| c.id() == collider)
            .map(|c| &mut c.desc)
            .ok_or(EngineError::Physics(PhysicsError::UnknownCollider(collider)))
    }

    fn collider_ids(&self, object: ObjectId) -> Vec<ColliderId> {
        self.scene
            .get(object)
            .map(|o| o.colliders.iter().map(Collider::id).collect())
            .unwrap_or_default()
    }

    // --- Constraints ---

    pub fn add_constraint(
        &mut self,
        object: ObjectId,
        desc: ConstraintDesc,
        remote: Option<DeferredRef>,
    ) -> Result<ConstraintId, EngineError> {
        if !self.scene.contains(object) {
            return Err(EngineError::NoObject(object));
        }
        let id = ConstraintId(self.scene.next_component_id());
        if let Some(o) = self.scene.get_mut(object) {
            o.constraints.push(Constraint::new(id, desc, remote));
        }
        if self.physics_live() {
            self.start_constraint(object, id);
        }
        Ok(id)
    }

    /// Mark the constraint started and try to build its joint. Returns whether
    /// the joint exists afterwards; otherwise the tick keeps retrying.
    pub fn start_constraint(&mut self, object: ObjectId, constraint: ConstraintId) -> bool {
        let Some(c) = self.constraint_mut(object, constraint) else {
            return false;
        };
        c.set_started(true);
        self.try_create_joint(object, constraint)
    }

    fn try_create_joint(&mut self, object: ObjectId, constraint: ConstraintId) -> bool {
        if !self.physics_live() {
            return false;
        }
        if self.physics.has_joint(constraint) {
            return true;
        }
        let Some(c) = self
            .scene
            .get(object)
            .and_then(|o| o.constraints.iter().find(|c| c.id() == constraint))
        else {
            return false;
        };
        if !c.is_started() {
            return false;
        }
        let Some(remote) = c.remote_target(&self.scene) else {
            return false;
        };
        if remote == object {
            log::warn!("constraint {constraint:?} on {object:?} targets its own body");
            return false;
        }
        let desc = c.desc.clone();
        match self
            .physics
            .create_joint(constraint, object, remote, &desc, &self.scene)
        {
            Ok(()) => true,
            Err(err) => {
                log::debug!("joint for {constraint:?} not created yet: {err}");
                false
            }
        }
    }

    pub fn set_constraint_parameters(
        &mut self,
        object: ObjectId,
        constraint: ConstraintId,
        desc: ConstraintDesc,
    ) -> Result<(), EngineError> {
        let c = self
            .constraint_mut(object, constraint)
            .ok_or(EngineError::NoObject(object))?;
        c.desc = desc.clone();
        if self.physics_live() {
            self.physics.set_joint_parameters(constraint, &desc);
        }
        Ok(())
    }

    /// Change the drive target of a revolute or prismatic constraint.
    pub fn set_constraint_drive_velocity(
        &mut self,
        object: ObjectId,
        constraint: ConstraintId,
        velocity: f32,
    ) -> Result<(), EngineError> {
        self.constraint_mut(object, constraint)
            .ok_or(EngineError::NoObject(object))?
            .desc
            .drive_velocity = velocity;
        if self.physics_live() {
            self.physics.set_joint_drive_velocity(constraint, velocity);
        }
        Ok(())
    }

    pub fn remove_constraint(&mut self, object: ObjectId, constraint: ConstraintId) -> bool {
        self.physics.destroy_joint(constraint);
        let Some(o) = self.scene.get_mut(object) else {
            return false;
        };
        let before = o.constraints.len();
        o.constraints.retain(|c| c.id() != constraint);
        o.constraints.len() != before
    }

    fn constraint_mut(
        &mut self,
        object: ObjectId,
        constraint: ConstraintId,
    ) -> Option<&mut Constraint> {
        self.scene
            .get_mut(object)?
            .constraints
            .iter_mut()
            .find(|c| c.id() == constraint)
    }

    fn constraint_ids(&self, object: ObjectId) -> Vec<ConstraintId> {
        self.scene
            .get(object)
            .map(|o| o.constraints.iter().map(Constraint::id).collect())
            .unwrap_or_default()
    }

    // --- Vehicle ---

    pub fn add_vehicle(&mut self, object: ObjectId, vehicle: Vehicle) -> Result<(), EngineError> {
        self.scene
            .get_mut(object)
            .ok_or(EngineError::NoObject(object))?
            .vehicle = Some(vehicle);
        Ok(())
    }

    // --- Loading ---

    pub fn load_rigidbody(
        &mut self,
        object: ObjectId,
        r: &mut TokenReader,
    ) -> Result<(), EngineError> {
        let desc = read_rigidbody(r)?;
        self.add_rigidbody(object, Rigidbody::new(desc))
    }

    pub fn load_collider(
        &mut self,
        object: ObjectId,
        r: &mut TokenReader,
        meshes: impl Fn(MeshId) -> Option<Arc<MeshData>>,
    ) -> Result<ColliderId, EngineError> {
        let desc = read_collider(r, meshes)?;
        self.add_collider(object, desc)
    }

    /// The remote comes back as a scene index and is resolved by later ticks.
    pub fn load_constraint(
        &mut self,
        object: ObjectId,
        r: &mut TokenReader,
    ) -> Result<ConstraintId, EngineError> {
        let (desc, remote) = read_constraint(r)?;
        self.add_constraint(object, desc, remote)
    }

    pub fn load_vehicle(
        &mut self,
        object: ObjectId,
        r: &mut TokenReader,
    ) -> Result<(), EngineError> {
        let vehicle = read_vehicle(r)?;
        self.add_vehicle(object, vehicle)
    }

    // --- Objects ---

    /// Destroy `object` and its descendants, releasing their physics first.
    pub fn destroy(&mut self, object: ObjectId) {
        let subtree = self.scene.subtree(object);
        if self.physics_live() {
            for &id in subtree.iter().rev() {
                for constraint in self.constraint_ids(id) {
                    self.remove_constraint(id, constraint);
                }
                for collider in self.collider_ids(id) {
                    self.remove_collider(id, collider);
                }
                self.remove_rigidbody(id);
            }
        }
        self.scene.despawn(object);
    }
}
