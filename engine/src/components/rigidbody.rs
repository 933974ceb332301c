use physics::{RigidbodyDesc, RotationLock};

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Rigidbody {
    pub desc: RigidbodyDesc,
}

impl Rigidbody {
    pub fn new(desc: RigidbodyDesc) -> Self {
        Self { desc }
    }

    pub fn kinematic() -> Self {
        Self::new(RigidbodyDesc {
            is_kinematic: true,
            ..RigidbodyDesc::default()
        })
    }

    pub fn with_mass(mut self, mass: f32) -> Self {
        self.desc.mass = mass;
        self
    }

    pub fn with_gravity(mut self, use_gravity: bool) -> Self {
        self.desc.use_gravity = use_gravity;
        self
    }

    pub fn lock_rotation(mut self, axis: RotationLock) -> Self {
        self.desc.rotation_locks.add(axis);
        self
    }
}
