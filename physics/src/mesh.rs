/*!
Mesh cooking and the per-world cooked-geometry caches.

Two independent caches, both keyed by [`MeshId`]:
- convex hulls, built from vertex positions only;
- triangle meshes, built from positions + indices.

A mesh is cooked at most once per cache per world lifetime; every later
collider that references the same mesh shares the cooked `SharedShape` (an
`Arc` internally). Entries are never invalidated while the world lives.

Cooking is tolerant: duplicate vertices are merged and degenerate triangles are
dropped. Input that cannot produce a valid shape (too few points, flat point
clouds, out-of-range indices, NaNs) is rejected with [`PhysicsError::Cooking`]
instead of reaching the solver.
*/

use std::collections::{HashMap, HashSet};

use rapier3d::parry::shape::TriMeshFlags;
use rapier3d::prelude::SharedShape;

use crate::constants::UNIT_SCALE_EPS;
use crate::error::PhysicsError;
use crate::ids::MeshId;
use crate::types::{Point3, Vec3};

/// Source mesh geometry as handed over by the resource layer.
#[derive(Clone, Debug)]
pub struct MeshData {
    pub id: MeshId,
    pub vertices: Vec<Point3>,
    pub indices: Vec<[u32; 3]>,
}

impl MeshData {
    pub fn new(id: MeshId, vertices: Vec<Point3>, indices: Vec<[u32; 3]>) -> Self {
        Self {
            id,
            vertices,
            indices,
        }
    }
}

/// Smallest spread (meters) a point cloud needs along every direction to hull.
const FLAT_EPS: f32 = 1.0e-5;

#[derive(Default)]
pub struct MeshCache {
    convex: HashMap<MeshId, SharedShape>,
    triangles: HashMap<MeshId, SharedShape>,
}

impl MeshCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cooked convex hull for `mesh`, cooking it on first use.
    pub fn convex_hull(&mut self, mesh: &MeshData) -> Result<SharedShape, PhysicsError> {
        if let Some(shape) = self.convex.get(&mesh.id) {
            return Ok(shape.clone());
        }
        let shape = cook_convex(mesh)?;
        self.convex.insert(mesh.id, shape.clone());
        log::debug!("cooked convex hull for {:?}", mesh.id);
        Ok(shape)
    }

    /// Cooked triangle mesh for `mesh`, cooking it on first use.
    pub fn triangle_mesh(&mut self, mesh: &MeshData) -> Result<SharedShape, PhysicsError> {
        if let Some(shape) = self.triangles.get(&mesh.id) {
            return Ok(shape.clone());
        }
        let shape = cook_triangles(mesh)?;
        self.triangles.insert(mesh.id, shape.clone());
        log::debug!("cooked triangle mesh for {:?}", mesh.id);
        Ok(shape)
    }

    pub fn convex_len(&self) -> usize {
        self.convex.len()
    }

    pub fn triangle_len(&self) -> usize {
        self.triangles.len()
    }
}

fn cooking_error(mesh: &MeshData, reason: impl Into<String>) -> PhysicsError {
    PhysicsError::Cooking {
        mesh: mesh.id,
        reason: reason.into(),
    }
}

fn cook_convex(mesh: &MeshData) -> Result<SharedShape, PhysicsError> {
    let points = unique_points(&mesh.vertices);
    if points.len() < 4 {
        return Err(cooking_error(mesh, format!("{} unique vertices, need 4", points.len())));
    }
    if is_flat(&points) {
        return Err(cooking_error(mesh, "vertices do not span a volume"));
    }
    SharedShape::convex_hull(&points).ok_or_else(|| cooking_error(mesh, "hull computation failed"))
}

fn cook_triangles(mesh: &MeshData) -> Result<SharedShape, PhysicsError> {
    if mesh.indices.is_empty() {
        return Err(cooking_error(mesh, "no triangles"));
    }
    if mesh.vertices.iter().any(|p| !is_finite(p)) {
        return Err(cooking_error(mesh, "non-finite vertex"));
    }
    let count = mesh.vertices.len() as u32;
    if let Some(tri) = mesh.indices.iter().find(|tri| tri.iter().any(|i| *i >= count)) {
        return Err(cooking_error(mesh, format!("triangle {tri:?} indexes past {count} vertices")));
    }

    let flags = TriMeshFlags::MERGE_DUPLICATE_VERTICES
        | TriMeshFlags::DELETE_DEGENERATE_TRIANGLES
        | TriMeshFlags::DELETE_DUPLICATE_TRIANGLES;
    SharedShape::trimesh_with_flags(mesh.vertices.clone(), mesh.indices.clone(), flags)
        .map_err(|e| cooking_error(mesh, format!("{e:?}")))
}

/// Rescale cooked geometry for a collider. Unit scale shares the cached shape.
///
/// Returns `None` when `shape` is not mesh geometry or the scaled hull degenerates.
pub(crate) fn scaled_mesh(shape: &SharedShape, scale: &Vec3) -> Option<SharedShape> {
    if (scale - Vec3::repeat(1.0)).amax() < UNIT_SCALE_EPS {
        return Some(shape.clone());
    }
    if let Some(hull) = shape.as_convex_polyhedron() {
        return hull.clone().scaled(scale).map(SharedShape::new);
    }
    if let Some(mesh) = shape.as_trimesh() {
        return Some(SharedShape::new(mesh.clone().scaled(scale)));
    }
    None
}

fn is_finite(p: &Point3) -> bool {
    p.x.is_finite() && p.y.is_finite() && p.z.is_finite()
}

fn unique_points(vertices: &[Point3]) -> Vec<Point3> {
    let mut seen = HashSet::with_capacity(vertices.len());
    vertices
        .iter()
        .filter(|p| is_finite(p))
        .filter(|p| seen.insert([p.x.to_bits(), p.y.to_bits(), p.z.to_bits()]))
        .copied()
        .collect()
}

/// True when the cloud is collinear or coplanar (within `FLAT_EPS`).
fn is_flat(points: &[Point3]) -> bool {
    let p0 = points[0];
    let Some(p1) = farthest(points, |p| (p - p0).norm()) else {
        return true;
    };
    let axis = p1 - p0;
    if axis.norm() < FLAT_EPS {
        return true;
    }
    let Some(p2) = farthest(points, |p| (p - p0).cross(&axis).norm() / axis.norm()) else {
        return true;
    };
    let normal = axis.cross(&(p2 - p0));
    if normal.norm() < FLAT_EPS * axis.norm() {
        return true;
    }
    let normal = normal.normalize();
    points
        .iter()
        .all(|p| (p - p0).dot(&normal).abs() < FLAT_EPS)
}

fn farthest(points: &[Point3], metric: impl Fn(&Point3) -> f32) -> Option<Point3> {
    points
        .iter()
        .copied()
        .max_by(|a, b| metric(a).total_cmp(&metric(b)))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Unit cube centered on the origin, 8 vertices, 12 triangles.
    pub(crate) fn cube(id: u64) -> MeshData {
        let v = |x: f32, y: f32, z: f32| Point3::new(x, y, z);
        MeshData::new(
            MeshId(id),
            vec![
                v(-0.5, -0.5, -0.5),
                v(0.5, -0.5, -0.5),
                v(0.5, 0.5, -0.5),
                v(-0.5, 0.5, -0.5),
                v(-0.5, -0.5, 0.5),
                v(0.5, -0.5, 0.5),
                v(0.5, 0.5, 0.5),
                v(-0.5, 0.5, 0.5),
            ],
            vec![
                [0, 2, 1],
                [0, 3, 2],
                [4, 5, 6],
                [4, 6, 7],
                [0, 1, 5],
                [0, 5, 4],
                [3, 6, 2],
                [3, 7, 6],
                [0, 4, 7],
                [0, 7, 3],
                [1, 2, 6],
                [1, 6, 5],
            ],
        )
    }

    #[test]
    fn convex_hull_is_cooked_once_per_mesh() {
        let mut cache = MeshCache::new();
        let mesh = cube(1);

        assert!(cache.convex_hull(&mesh).is_ok());
        assert!(cache.convex_hull(&mesh).is_ok());
        assert_eq!(cache.convex_len(), 1);
        assert_eq!(cache.triangle_len(), 0);

        assert!(cache.triangle_mesh(&mesh).is_ok());
        assert_eq!(cache.convex_len(), 1);
        assert_eq!(cache.triangle_len(), 1);
    }

    #[test]
    fn duplicate_vertices_are_tolerated() {
        let mut mesh = cube(2);
        let copy = mesh.vertices.clone();
        mesh.vertices.extend(copy);

        let mut cache = MeshCache::new();
        assert!(cache.convex_hull(&mesh).is_ok());
    }

    #[test]
    fn flat_or_tiny_input_is_rejected() {
        let mut cache = MeshCache::new();
        let flat = MeshData::new(
            MeshId(3),
            vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(0.0, 0.0, 1.0),
                Point3::new(1.0, 0.0, 1.0),
            ],
            vec![],
        );
        assert!(matches!(cache.convex_hull(&flat), Err(PhysicsError::Cooking { .. })));

        let mut few = cube(4);
        few.vertices.truncate(3);
        assert!(cache.convex_hull(&few).is_err());
        assert_eq!(cache.convex_len(), 0);
    }

    #[test]
    fn out_of_range_indices_are_rejected() {
        let mut mesh = cube(5);
        mesh.indices.push([0, 1, 99]);

        let mut cache = MeshCache::new();
        assert!(cache.triangle_mesh(&mesh).is_err());
        assert_eq!(cache.triangle_len(), 0);
    }

    #[test]
    fn unit_scale_shares_geometry() {
        let mut cache = MeshCache::new();
        let hull = cache.convex_hull(&cube(6)).unwrap();

        let same = scaled_mesh(&hull, &Vec3::repeat(1.0)).unwrap();
        assert!(std::sync::Arc::ptr_eq(&hull.0, &same.0));

        let bigger = scaled_mesh(&hull, &Vec3::new(2.0, 2.0, 2.0)).unwrap();
        let aabb = bigger.compute_local_aabb();
        assert!((aabb.maxs.x - 1.0).abs() < 1e-4);
    }
}
