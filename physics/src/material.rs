/*!
Surface materials and the process-wide material cache.

A material is keyed by its asset path. The first `create` for a path builds
the entry, every later `create` for the same path returns the same handle.
Updating a material clamps all coefficients to be non-negative; the manager
then pushes the new values onto every live collider that uses it.

Notes
- The solver has a single friction coefficient per collider. Colliders get the
  dynamic coefficient. Static friction is kept on the material so assets round-trip.
- Handle 0 is always the default material.
*/

use std::collections::HashMap;

use rapier3d::prelude::Collider;

use crate::constants::{DEFAULT_DYNAMIC_FRICTION, DEFAULT_RESTITUTION, DEFAULT_STATIC_FRICTION};

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PhysicsMaterial {
    pub static_friction: f32,
    pub dynamic_friction: f32,
    pub restitution: f32,
}

impl Default for PhysicsMaterial {
    fn default() -> Self {
        Self {
            static_friction: DEFAULT_STATIC_FRICTION,
            dynamic_friction: DEFAULT_DYNAMIC_FRICTION,
            restitution: DEFAULT_RESTITUTION,
        }
    }
}

impl PhysicsMaterial {
    /// Build a material, clamping every coefficient to `>= 0`.
    pub fn new(static_friction: f32, dynamic_friction: f32, restitution: f32) -> Self {
        Self {
            static_friction,
            dynamic_friction,
            restitution,
        }
        .clamped()
    }

    pub fn clamped(self) -> Self {
        Self {
            static_friction: clamp_coefficient(self.static_friction),
            dynamic_friction: clamp_coefficient(self.dynamic_friction),
            restitution: clamp_coefficient(self.restitution),
        }
    }

    /// Write the coefficients onto a live collider.
    pub fn apply_to(&self, collider: &mut Collider) {
        collider.set_friction(self.dynamic_friction);
        collider.set_restitution(self.restitution);
    }
}

// NaN collapses to 0 as well.
fn clamp_coefficient(v: f32) -> f32 {
    if v > 0.0 { v } else { 0.0 }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MaterialHandle(u32);

impl MaterialHandle {
    pub const DEFAULT: MaterialHandle = MaterialHandle(0);
}

#[derive(Debug)]
pub struct MaterialCache {
    materials: Vec<PhysicsMaterial>,
    by_path: HashMap<String, MaterialHandle>,
}

impl MaterialCache {
    pub fn new(default: PhysicsMaterial) -> Self {
        Self {
            materials: vec![default.clamped()],
            by_path: HashMap::new(),
        }
    }

    /// Return the handle for `path`, creating the entry from `material` if it is new.
    ///
    /// An existing entry keeps its values; use [`MaterialCache::update`] to change them.
    pub fn create(&mut self, path: &str, material: PhysicsMaterial) -> MaterialHandle {
        if let Some(handle) = self.by_path.get(path) {
            return *handle;
        }
        let handle = MaterialHandle(self.materials.len() as u32);
        self.materials.push(material.clamped());
        self.by_path.insert(path.to_owned(), handle);
        log::debug!("created physics material '{path}' ({handle:?})");
        handle
    }

    /// Replace the values stored for `path`. Returns `None` for an unknown path.
    pub fn update(&mut self, path: &str, material: PhysicsMaterial) -> Option<MaterialHandle> {
        let handle = *self.by_path.get(path)?;
        self.materials[handle.0 as usize] = material.clamped();
        Some(handle)
    }

    pub fn get(&self, path: &str) -> Option<MaterialHandle> {
        self.by_path.get(path).copied()
    }

    /// Handle for an optional collider material path, falling back to the default.
    pub fn resolve(&self, path: Option<&str>) -> MaterialHandle {
        match path {
            None => MaterialHandle::DEFAULT,
            Some(path) => self.get(path).unwrap_or_else(|| {
                log::warn!("physics material '{path}' was never created, using default");
                MaterialHandle::DEFAULT
            }),
        }
    }

    pub fn material(&self, handle: MaterialHandle) -> PhysicsMaterial {
        self.materials
            .get(handle.0 as usize)
            .copied()
            .unwrap_or(self.materials[0])
    }

    /// Number of named materials (the default is not counted).
    pub fn len(&self) -> usize {
        self.by_path.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_path.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_clamps_negative_coefficients() {
        let m = PhysicsMaterial::new(-1.0, 0.3, -0.2);
        assert_eq!(m.static_friction, 0.0);
        assert!((m.dynamic_friction - 0.3).abs() < 1e-6);
        assert_eq!(m.restitution, 0.0);

        let nan = PhysicsMaterial::new(f32::NAN, 0.0, 0.0);
        assert_eq!(nan.static_friction, 0.0);
    }

    #[test]
    fn create_is_idempotent_per_path() {
        let mut cache = MaterialCache::new(PhysicsMaterial::default());
        let a = cache.create("ice.mat", PhysicsMaterial::new(0.05, 0.02, 0.0));
        let b = cache.create("ice.mat", PhysicsMaterial::new(0.9, 0.9, 0.9));

        assert_eq!(a, b);
        assert_eq!(cache.len(), 1);
        // The second create does not overwrite values.
        assert!((cache.material(a).dynamic_friction - 0.02).abs() < 1e-6);
    }

    #[test]
    fn update_clamps_and_reports_unknown_paths() {
        let mut cache = MaterialCache::new(PhysicsMaterial::default());
        let h = cache.create("rubber.mat", PhysicsMaterial::new(1.0, 0.8, 0.9));

        let bad = PhysicsMaterial {
            static_friction: -3.0,
            dynamic_friction: 0.7,
            restitution: -1.0,
        };
        assert_eq!(cache.update("rubber.mat", bad), Some(h));
        let m = cache.material(h);
        assert_eq!(m.static_friction, 0.0);
        assert_eq!(m.restitution, 0.0);
        assert!((m.dynamic_friction - 0.7).abs() < 1e-6);

        assert_eq!(cache.update("missing.mat", PhysicsMaterial::default()), None);
    }

    #[test]
    fn resolve_falls_back_to_default() {
        let mut cache = MaterialCache::new(PhysicsMaterial::default());
        let h = cache.create("a.mat", PhysicsMaterial::default());

        assert_eq!(cache.resolve(None), MaterialHandle::DEFAULT);
        assert_eq!(cache.resolve(Some("nope.mat")), MaterialHandle::DEFAULT);
        assert_eq!(cache.resolve(Some("a.mat")), h);

        let d = cache.material(MaterialHandle::DEFAULT);
        assert!((d.restitution - DEFAULT_RESTITUTION).abs() < 1e-6);
    }
}
