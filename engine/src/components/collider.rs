use std::sync::Arc;

use physics::{ColliderDesc, ColliderId, ColliderShape, MeshData, Vec3};

/// Collider component. The id is assigned by the engine when the component is added.
#[derive(Clone, Debug)]
pub struct Collider {
    id: ColliderId,
    pub desc: ColliderDesc,
}

impl Collider {
    pub(crate) fn new(id: ColliderId, desc: ColliderDesc) -> Self {
        Self { id, desc }
    }

    pub fn id(&self) -> ColliderId {
        self.id
    }

    pub fn boxed(half_extents: Vec3) -> ColliderDesc {
        ColliderDesc::new(ColliderShape::Box { half_extents })
    }

    pub fn sphere(radius: f32) -> ColliderDesc {
        ColliderDesc::new(ColliderShape::Sphere { radius })
    }

    pub fn capsule(radius: f32, half_height: f32) -> ColliderDesc {
        ColliderDesc::new(ColliderShape::Capsule {
            radius,
            half_height,
        })
    }

    pub fn mesh(mesh: Option<Arc<MeshData>>, convex: bool) -> ColliderDesc {
        ColliderDesc::new(ColliderShape::Mesh { mesh, convex })
    }
}
