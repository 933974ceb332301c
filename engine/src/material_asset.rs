use physics::{MaterialHandle, PhysicManager, PhysicsMaterial};

use crate::serialize::{ReadError, TokenReader, TokenWriter};

/// A physics material resource, identified by its asset path.
#[derive(Clone, Debug)]
pub struct PhysicsMaterialAsset {
    path: String,
    material: PhysicsMaterial,
}

impl PhysicsMaterialAsset {
    pub fn new(path: impl Into<String>, material: PhysicsMaterial) -> Self {
        Self {
            path: path.into(),
            material: material.clamped(),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn material(&self) -> PhysicsMaterial {
        self.material
    }

    /// Register the native material. Repeated calls return the same handle.
    pub fn create_native(&self, physics: &mut PhysicManager) -> Option<MaterialHandle> {
        physics.create_material(&self.path, self.material)
    }

    /// Change the coefficients. Shapes already using the material pick up the
    /// new values immediately.
    pub fn update(&mut self, physics: &mut PhysicManager, material: PhysicsMaterial) {
        self.material = material.clamped();
        if physics.update_material(&self.path, self.material).is_none() {
            log::debug!("material '{}' has no native counterpart yet", self.path);
        }
    }

    /// static friction, dynamic friction, restitution
    pub fn write(&self, w: &mut TokenWriter) {
        w.f32(self.material.static_friction)
            .f32(self.material.dynamic_friction)
            .f32(self.material.restitution)
            .end();
    }

    pub fn read(path: impl Into<String>, r: &mut TokenReader) -> Result<Self, ReadError> {
        let material = PhysicsMaterial::new(r.f32()?, r.f32()?, r.f32()?);
        r.end()?;
        Ok(Self::new(path, material))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use physics::PhysicsSettings;

    #[test]
    fn create_native_is_idempotent() {
        let mut physics = PhysicManager::initialize(PhysicsSettings::default()).unwrap();
        let rubber = PhysicsMaterial::new(0.9, 0.8, 0.7);
        let asset = PhysicsMaterialAsset::new("materials/rubber", rubber);
        let first = asset.create_native(&mut physics);
        let second = asset.create_native(&mut physics);
        assert!(first.is_some());
        assert_eq!(first, second);
        assert_eq!(physics.material_count(), 1);
    }

    #[test]
    fn update_reaches_native_material() {
        let mut physics = PhysicManager::initialize(PhysicsSettings::default()).unwrap();
        let ice = PhysicsMaterial::new(0.1, 0.05, 0.0);
        let mut asset = PhysicsMaterialAsset::new("materials/ice", ice);
        let handle = asset.create_native(&mut physics).unwrap();

        asset.update(&mut physics, PhysicsMaterial::new(0.2, -1.0, 0.3));
        assert_eq!(asset.material().dynamic_friction, 0.0);
        assert_eq!(physics.material(handle), Some(asset.material()));
    }

    #[test]
    fn text_round_trip_clamps_on_read() {
        let asset = PhysicsMaterialAsset::new("m", PhysicsMaterial::new(0.4, 0.3, 0.2));
        let mut w = TokenWriter::new();
        asset.write(&mut w);
        assert_eq!(w.finish(), "0.4\n0.3\n0.2\nend\n");

        let mut r = TokenReader::new("-2\n0.3\n0.2\nend\n");
        let read = PhysicsMaterialAsset::read("m", &mut r).unwrap();
        assert_eq!(read.material(), PhysicsMaterial::new(0.0, 0.3, 0.2));
    }
}
