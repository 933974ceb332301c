//! Identities shared between the adapter and the scene that owns it.
//!
//! All of these are plain copyable values. The adapter never holds a reference
//! into the scene, only these ids, and asks the scene whether they are still valid.

/// Generational handle to a GameObject in the scene's object table.
///
/// A slot can be reused after its object is destroyed; the generation tells a
/// stale handle apart from the new occupant.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId {
    pub index: u32,
    pub generation: u32,
}

impl ObjectId {
    #[inline]
    pub const fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }
}

/// Identity of a collider component, unique for the lifetime of the scene.
///
/// Pair sets are ordered by this id, which makes event dispatch order stable.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ColliderId(pub u64);

/// Identity of a constraint component.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConstraintId(pub u64);

/// Identity of a source mesh resource. Cooked geometry is cached under it.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MeshId(pub u64);
