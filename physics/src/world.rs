//! The active simulation world: rapier sets, pipeline and per-world caches.
//!
//! At most one world exists at a time; it is owned by the
//! [`PhysicManager`](crate::manager::PhysicManager) and recreated on every
//! entry into play mode.
//!
//! Contact modification goes through a [`PhysicsHooks`] object installed with
//! [`SimulationWorld::set_hooks`]. The default hooks leave every pair untouched.
//!
//! Determinism
//! - Touching pairs are reported as raw handle pairs; the registry maps them to
//!   collider ids and orders them, so dispatch order never depends on hashing.

use std::sync::Arc;

use rapier3d::prelude::*;

use crate::dispatcher::Dispatcher;
use crate::mesh::MeshCache;
use crate::settings::PhysicsSettings;
use crate::types::Vec3;

/// Handle pairs that are touching (collisions) or overlapping (triggers) after a step.
#[derive(Debug, Default)]
pub struct TouchingPairs {
    pub contacts: Vec<(ColliderHandle, ColliderHandle)>,
    pub intersections: Vec<(ColliderHandle, ColliderHandle)>,
}

/// Contact hooks. The manager keeps one across world rebuilds.
pub type SharedHooks = Arc<dyn PhysicsHooks + Send + Sync>;

pub struct SimulationWorld {
    pub(crate) gravity: Vec3,
    pub(crate) integration_parameters: IntegrationParameters,
    pub(crate) pipeline: PhysicsPipeline,
    pub(crate) islands: IslandManager,
    pub(crate) broad_phase: BroadPhaseBvh,
    pub(crate) narrow_phase: NarrowPhase,
    pub(crate) bodies: RigidBodySet,
    pub(crate) colliders: ColliderSet,
    pub(crate) impulse_joints: ImpulseJointSet,
    pub(crate) multibody_joints: MultibodyJointSet,
    pub(crate) ccd_solver: CCDSolver,
    pub(crate) hooks: SharedHooks,
    pub(crate) meshes: MeshCache,
}

impl SimulationWorld {
    pub fn new(settings: &PhysicsSettings) -> Self {
        Self {
            gravity: settings.gravity,
            integration_parameters: IntegrationParameters::default(),
            pipeline: PhysicsPipeline::new(),
            islands: IslandManager::new(),
            broad_phase: BroadPhaseBvh::new(),
            narrow_phase: NarrowPhase::new(),
            bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            hooks: Arc::new(()),
            meshes: MeshCache::new(),
        }
    }

    /// Advance the simulation by `dt` seconds on the dispatcher and wait for it.
    pub fn step(&mut self, dt: f32, dispatcher: &Dispatcher) {
        let Self {
            gravity,
            integration_parameters,
            pipeline,
            islands,
            broad_phase,
            narrow_phase,
            bodies,
            colliders,
            impulse_joints,
            multibody_joints,
            ccd_solver,
            hooks,
            meshes: _,
        } = self;
        let hooks: &(dyn PhysicsHooks + Send + Sync) = &**hooks;
        integration_parameters.dt = dt;

        dispatcher.run(|| {
            pipeline.step(
                gravity,
                integration_parameters,
                islands,
                broad_phase,
                narrow_phase,
                bodies,
                colliders,
                impulse_joints,
                multibody_joints,
                ccd_solver,
                hooks,
                &(),
            )
        });
    }

    /// Replace the hooks consulted for every solver contact from the next step on.
    pub fn set_hooks(&mut self, hooks: SharedHooks) {
        self.hooks = hooks;
    }

    /// Every pair currently touching (with at least one active contact) or overlapping.
    pub fn touching_pairs(&self) -> TouchingPairs {
        TouchingPairs {
            contacts: self
                .narrow_phase
                .contact_pairs()
                .filter(|pair| pair.has_any_active_contact)
                .map(|pair| (pair.collider1, pair.collider2))
                .collect(),
            intersections: self
                .narrow_phase
                .intersection_pairs()
                .filter(|(_, _, intersecting)| *intersecting)
                .map(|(a, b, _)| (a, b))
                .collect(),
        }
    }

    /// Remove a body, its joints, and any colliders still attached to it.
    pub(crate) fn remove_body(&mut self, handle: RigidBodyHandle) {
        self.bodies.remove(
            handle,
            &mut self.islands,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            true,
        );
    }

    pub(crate) fn remove_collider(&mut self, handle: ColliderHandle) {
        self.colliders
            .remove(handle, &mut self.islands, &mut self.bodies, true);
    }

    pub fn gravity(&self) -> Vec3 {
        self.gravity
    }

    pub fn bodies(&self) -> &RigidBodySet {
        &self.bodies
    }

    pub fn colliders(&self) -> &ColliderSet {
        &self.colliders
    }

    pub fn impulse_joints(&self) -> &ImpulseJointSet {
        &self.impulse_joints
    }

    pub fn meshes(&self) -> &MeshCache {
        &self.meshes
    }
}
