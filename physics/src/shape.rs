/*!
Collider geometry definitions and the live shape wrapper.

`ColliderShape` is the schema-agnostic description of a collider's geometry as
authored on the component (unscaled). The native geometry is derived from it
and the GameObject's world scale:
- box half-extents = `half_extents * scale`
- sphere radius = `radius * |scale.x|`
- capsule radius = `radius * |scale.x|`, half height = `half_height * |scale.y|`
- mesh geometry = cooked mesh rescaled component-wise

The authored values are never modified by rescaling; [`ShapeWrapper::set_scale`]
rebuilds only the native geometry.
*/

use std::sync::Arc;

use rapier3d::prelude::*;

use crate::constants::MIN_SCALE;
use crate::error::PhysicsError;
use crate::ids::{ColliderId, ObjectId};
use crate::material::{MaterialHandle, PhysicsMaterial};
use crate::mesh::{MeshCache, MeshData, scaled_mesh};
use crate::types::{Pose, Vec3};

/// Supported collider shapes.
#[derive(Clone, Debug)]
pub enum ColliderShape {
    /// Oriented box with given half-extents (meters).
    Box { half_extents: Vec3 },

    /// Sphere/ball (meters).
    Sphere { radius: f32 },

    /// Y-aligned capsule (meters).
    ///
    /// `half_height` is the half-length of the cylinder section, so the total
    /// height is `2 * half_height + 2 * radius`.
    Capsule { radius: f32, half_height: f32 },

    /// Mesh resource, cooked as a convex hull or a triangle mesh.
    ///
    /// `mesh` is `None` when the resource reference is unset; such a collider
    /// never produces a shape.
    Mesh {
        mesh: Option<Arc<MeshData>>,
        convex: bool,
    },
}

impl ColliderShape {
    pub fn kind_name(&self) -> &'static str {
        match self {
            ColliderShape::Box { .. } => "box",
            ColliderShape::Sphere { .. } => "sphere",
            ColliderShape::Capsule { .. } => "capsule",
            ColliderShape::Mesh { .. } => "mesh",
        }
    }
}

/// Everything the adapter needs from a collider component to build its shape.
#[derive(Clone, Debug)]
pub struct ColliderDesc {
    pub shape: ColliderShape,
    pub is_trigger: bool,
    /// Material asset path. `None` uses the default material.
    pub material: Option<String>,
    /// Offset of the shape from its GameObject, in the GameObject's local frame.
    pub center: Vec3,
}

impl ColliderDesc {
    pub fn new(shape: ColliderShape) -> Self {
        Self {
            shape,
            is_trigger: false,
            material: None,
            center: Vec3::zeros(),
        }
    }

    pub fn trigger(mut self, is_trigger: bool) -> Self {
        self.is_trigger = is_trigger;
        self
    }

    pub fn material(mut self, path: impl Into<String>) -> Self {
        self.material = Some(path.into());
        self
    }

    pub fn center(mut self, center: Vec3) -> Self {
        self.center = center;
        self
    }
}

fn safe_scale(v: f32) -> f32 {
    v.abs().max(MIN_SCALE)
}

/// Build native geometry for `shape` under world scale `scale`.
pub(crate) fn build_geometry(
    shape: &ColliderShape,
    scale: &Vec3,
    meshes: &mut MeshCache,
) -> Result<SharedShape, PhysicsError> {
    let s = Vec3::new(safe_scale(scale.x), safe_scale(scale.y), safe_scale(scale.z));
    match shape {
        ColliderShape::Box { half_extents } => Ok(SharedShape::cuboid(
            half_extents.x.abs() * s.x,
            half_extents.y.abs() * s.y,
            half_extents.z.abs() * s.z,
        )),

        ColliderShape::Sphere { radius } => Ok(SharedShape::ball(radius.abs() * s.x)),

        ColliderShape::Capsule {
            radius,
            half_height,
        } => Ok(SharedShape::capsule_y(half_height.abs() * s.y, radius.abs() * s.x)),

        ColliderShape::Mesh { mesh, convex } => {
            let Some(mesh) = mesh else {
                return Err(PhysicsError::Cooking {
                    mesh: crate::ids::MeshId(0),
                    reason: "collider has no mesh".into(),
                });
            };
            let cooked = if *convex {
                meshes.convex_hull(mesh)?
            } else {
                meshes.triangle_mesh(mesh)?
            };
            scaled_mesh(&cooked, &s).ok_or_else(|| PhysicsError::Cooking {
                mesh: mesh.id,
                reason: format!("geometry degenerates under scale {s:?}"),
            })
        }
    }
}

/// Pair filter for triggers: every body type except static against static.
pub(crate) fn trigger_collision_types() -> ActiveCollisionTypes {
    ActiveCollisionTypes::all().difference(ActiveCollisionTypes::FIXED_FIXED)
}

/// Configure the pair filter on a collider.
///
/// Triggers become sensors that also pair with kinematic and static bodies, so
/// a trigger on a moving object still sees level geometry. Two static shapes
/// never pair. Everything else uses the default filter and reports contacts.
pub(crate) fn apply_trigger(collider: &mut Collider, is_trigger: bool) {
    collider.set_sensor(is_trigger);
    collider.set_active_collision_types(if is_trigger {
        trigger_collision_types()
    } else {
        ActiveCollisionTypes::default()
    });
}

/// Build the native collider: geometry, local pose, material, events, filter.
pub(crate) fn native_collider(
    geometry: SharedShape,
    local: &Pose,
    material: &PhysicsMaterial,
    is_trigger: bool,
) -> Collider {
    // Mass comes from the rigidbody component, not from collider volume.
    let mut collider = ColliderBuilder::new(geometry)
        .translation(local.translation)
        .rotation(local.rotation.scaled_axis())
        .density(0.0)
        .active_events(ActiveEvents::COLLISION_EVENTS)
        .active_hooks(ActiveHooks::MODIFY_SOLVER_CONTACTS)
        .build();
    material.apply_to(&mut collider);
    apply_trigger(&mut collider, is_trigger);
    collider
}

/// What a shape is attached to.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Attachment {
    /// Attached to the rigidbody of this GameObject (own or an ancestor).
    Body(ObjectId),
    /// Attached to its own synthesized static body.
    Static,
}

/// A live native shape and the bookkeeping tying it back to its collider.
#[derive(Debug)]
pub struct ShapeWrapper {
    pub(crate) handle: ColliderHandle,
    collider: ColliderId,
    owner: ObjectId,
    pub(crate) attachment: Attachment,
    pub(crate) material: MaterialHandle,
    shape: ColliderShape,
    is_trigger: bool,
}

impl ShapeWrapper {
    pub(crate) fn new(
        handle: ColliderHandle,
        collider: ColliderId,
        owner: ObjectId,
        attachment: Attachment,
        material: MaterialHandle,
        desc: &ColliderDesc,
    ) -> Self {
        Self {
            handle,
            collider,
            owner,
            attachment,
            material,
            shape: desc.shape.clone(),
            is_trigger: desc.is_trigger,
        }
    }

    pub fn handle(&self) -> ColliderHandle {
        self.handle
    }

    pub fn collider(&self) -> ColliderId {
        self.collider
    }

    /// GameObject carrying the collider component.
    pub fn owner(&self) -> ObjectId {
        self.owner
    }

    pub fn attachment(&self) -> Attachment {
        self.attachment
    }

    pub fn material(&self) -> MaterialHandle {
        self.material
    }

    pub fn is_trigger(&self) -> bool {
        self.is_trigger
    }

    /// Rebuild native geometry for a new world scale. The authored shape is unchanged.
    pub fn set_scale(
        &self,
        colliders: &mut ColliderSet,
        meshes: &mut MeshCache,
        scale: &Vec3,
    ) -> Result<(), PhysicsError> {
        let geometry = build_geometry(&self.shape, scale, meshes)?;
        if let Some(native) = colliders.get_mut(self.handle) {
            native.set_shape(geometry);
        }
        Ok(())
    }

    /// Move the shape relative to its body.
    pub fn set_local_pose(&self, colliders: &mut ColliderSet, pose: &Pose) {
        if let Some(native) = colliders.get_mut(self.handle) {
            native.set_translation_wrt_parent(pose.translation);
            native.set_rotation_wrt_parent(pose.rotation.scaled_axis());
        }
    }

    pub fn set_trigger(&mut self, colliders: &mut ColliderSet, is_trigger: bool) {
        self.is_trigger = is_trigger;
        if let Some(native) = colliders.get_mut(self.handle) {
            apply_trigger(native, is_trigger);
        }
    }

    pub fn set_material(
        &mut self,
        colliders: &mut ColliderSet,
        handle: MaterialHandle,
        material: &PhysicsMaterial,
    ) {
        self.material = handle;
        if let Some(native) = colliders.get_mut(self.handle) {
            material.apply_to(native);
        }
    }
}
