/*!
Collision registry: which collider owns which native shape, and which pairs
touched this step versus the previous one.

Pair sets
- Pairs are unordered; [`ColliderPair`] stores the smaller id first so the
  same two colliders always map to the same key.
- Sets are `BTreeSet`s ordered by collider id, so transitions come out in a
  stable order from frame to frame.
- `begin_step` moves the live set into the previous set and clears the live set.
- Purging a collider removes every pair it belongs to from both sets, so a
  removed collider never produces an exit event.
*/

use std::collections::{BTreeSet, HashMap};

use rapier3d::prelude::ColliderHandle;

use crate::ids::{ColliderId, ObjectId};
use crate::shape::ShapeWrapper;
use crate::world::TouchingPairs;

/// Unordered pair of colliders, normalized so `first() <= second()`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ColliderPair(ColliderId, ColliderId);

impl ColliderPair {
    pub fn new(a: ColliderId, b: ColliderId) -> Self {
        if a <= b { Self(a, b) } else { Self(b, a) }
    }

    pub fn first(&self) -> ColliderId {
        self.0
    }

    pub fn second(&self) -> ColliderId {
        self.1
    }

    pub fn contains(&self, id: ColliderId) -> bool {
        self.0 == id || self.1 == id
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Transition {
    Enter,
    Stay,
    Exit,
}

/// Live and previous pair sets for one kind of contact.
#[derive(Debug, Default)]
pub struct PairSets {
    current: BTreeSet<ColliderPair>,
    previous: BTreeSet<ColliderPair>,
}

impl PairSets {
    pub fn begin_step(&mut self) {
        self.previous = std::mem::take(&mut self.current);
    }

    pub fn insert(&mut self, pair: ColliderPair) {
        self.current.insert(pair);
    }

    /// Enter/stay for every live pair, then exit for every pair that vanished.
    pub fn transitions(&self) -> Vec<(ColliderPair, Transition)> {
        let mut out: Vec<_> = self
            .current
            .iter()
            .map(|pair| {
                let t = if self.previous.contains(pair) {
                    Transition::Stay
                } else {
                    Transition::Enter
                };
                (*pair, t)
            })
            .collect();
        out.extend(
            self.previous
                .difference(&self.current)
                .map(|pair| (*pair, Transition::Exit)),
        );
        out
    }

    pub fn purge(&mut self, id: ColliderId) {
        self.current.retain(|pair| !pair.contains(id));
        self.previous.retain(|pair| !pair.contains(id));
    }

    pub fn current(&self) -> &BTreeSet<ColliderPair> {
        &self.current
    }

    pub fn previous(&self) -> &BTreeSet<ColliderPair> {
        &self.previous
    }

    pub fn clear(&mut self) {
        self.current.clear();
        self.previous.clear();
    }
}

#[derive(Debug, Default)]
pub struct CollisionRegistry {
    shapes: HashMap<ColliderId, ShapeWrapper>,
    by_handle: HashMap<ColliderHandle, ColliderId>,
    pub(crate) collisions: PairSets,
    pub(crate) triggers: PairSets,
}

impl CollisionRegistry {
    pub fn register(&mut self, shape: ShapeWrapper) {
        self.by_handle.insert(shape.handle(), shape.collider());
        self.shapes.insert(shape.collider(), shape);
    }

    /// Drop the collider's entries and purge it from every pair set.
    pub fn unregister(&mut self, id: ColliderId) -> Option<ShapeWrapper> {
        self.collisions.purge(id);
        self.triggers.purge(id);
        let shape = self.shapes.remove(&id)?;
        self.by_handle.remove(&shape.handle());
        Some(shape)
    }

    pub fn shape(&self, id: ColliderId) -> Option<&ShapeWrapper> {
        self.shapes.get(&id)
    }

    pub fn shape_mut(&mut self, id: ColliderId) -> Option<&mut ShapeWrapper> {
        self.shapes.get_mut(&id)
    }

    pub fn shapes(&self) -> impl Iterator<Item = &ShapeWrapper> {
        self.shapes.values()
    }

    pub fn shapes_mut(&mut self) -> impl Iterator<Item = &mut ShapeWrapper> {
        self.shapes.values_mut()
    }

    pub fn collider_for(&self, handle: ColliderHandle) -> Option<ColliderId> {
        self.by_handle.get(&handle).copied()
    }

    /// Owning GameObject of a registered collider.
    pub fn owner_of(&self, id: ColliderId) -> Option<ObjectId> {
        self.shapes.get(&id).map(ShapeWrapper::owner)
    }

    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }

    pub fn begin_step(&mut self) {
        self.collisions.begin_step();
        self.triggers.begin_step();
    }

    /// Fill the live sets from the narrow phase. Unregistered handles are skipped.
    pub fn capture(&mut self, pairs: &TouchingPairs) {
        for (a, b) in &pairs.contacts {
            if let (Some(a), Some(b)) = (self.collider_for(*a), self.collider_for(*b)) {
                self.collisions.insert(ColliderPair::new(a, b));
            }
        }
        for (a, b) in &pairs.intersections {
            if let (Some(a), Some(b)) = (self.collider_for(*a), self.collider_for(*b)) {
                self.triggers.insert(ColliderPair::new(a, b));
            }
        }
    }

    pub fn collisions(&self) -> &PairSets {
        &self.collisions
    }

    pub fn triggers(&self) -> &PairSets {
        &self.triggers
    }

    pub fn clear(&mut self) {
        self.shapes.clear();
        self.by_handle.clear();
        self.collisions.clear();
        self.triggers.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(a: u64, b: u64) -> ColliderPair {
        ColliderPair::new(ColliderId(a), ColliderId(b))
    }

    #[test]
    fn pair_is_unordered() {
        assert_eq!(pair(3, 1), pair(1, 3));
        assert_eq!(pair(3, 1).first(), ColliderId(1));
        assert!(pair(3, 1).contains(ColliderId(3)));
    }

    #[test]
    fn three_way_diff() {
        let mut sets = PairSets::default();
        sets.insert(pair(1, 2));
        sets.insert(pair(1, 3));
        sets.begin_step();
        sets.insert(pair(1, 2));
        sets.insert(pair(2, 3));

        let t = sets.transitions();
        assert_eq!(
            t,
            vec![
                (pair(1, 2), Transition::Stay),
                (pair(2, 3), Transition::Enter),
                (pair(1, 3), Transition::Exit),
            ]
        );
    }

    #[test]
    fn every_pair_gets_exactly_one_transition() {
        let mut sets = PairSets::default();
        for i in 0..5 {
            sets.insert(pair(i, i + 10));
        }
        sets.begin_step();
        for i in 3..8 {
            sets.insert(pair(i, i + 10));
        }
        let t = sets.transitions();
        let mut keys: Vec<_> = t.iter().map(|(p, _)| *p).collect();
        keys.sort();
        keys.dedup();
        assert_eq!(keys.len(), t.len());
        assert_eq!(t.len(), 8);
        assert_eq!(t.iter().filter(|(_, k)| *k == Transition::Exit).count(), 3);
        assert_eq!(t.iter().filter(|(_, k)| *k == Transition::Stay).count(), 2);
        assert_eq!(t.iter().filter(|(_, k)| *k == Transition::Enter).count(), 3);
    }

    #[test]
    fn begin_step_clears_live_set() {
        let mut sets = PairSets::default();
        sets.insert(pair(1, 2));
        sets.begin_step();
        assert!(sets.current().is_empty());
        assert!(sets.previous().contains(&pair(1, 2)));
        assert_eq!(sets.transitions(), vec![(pair(1, 2), Transition::Exit)]);
    }

    #[test]
    fn purge_removes_collider_from_both_sets() {
        let mut sets = PairSets::default();
        sets.insert(pair(1, 2));
        sets.insert(pair(4, 5));
        sets.begin_step();
        sets.insert(pair(2, 7));
        sets.insert(pair(4, 5));

        sets.purge(ColliderId(2));
        assert!(!sets.current().iter().any(|p| p.contains(ColliderId(2))));
        assert!(!sets.previous().iter().any(|p| p.contains(ColliderId(2))));
        assert_eq!(sets.transitions(), vec![(pair(4, 5), Transition::Stay)]);
    }
}
