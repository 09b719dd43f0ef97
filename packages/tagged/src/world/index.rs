use std::collections::BTreeSet;

use crate::entity::EntityId;

/// A sorted set of entity IDs.
pub type Bucket = BTreeSet<EntityId>;

/// The per-argument buckets of a single system within one world.
///
/// Bucket `k` holds every live entity satisfying the system's `k`th argument
/// constraint. The buckets are independent: an entity satisfying several
/// constraints appears in several buckets.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SystemIndex {
    buckets: Vec<Bucket>,
}

impl SystemIndex {
    /// Create a new `SystemIndex` with `arity` empty buckets.
    pub fn new(arity: usize) -> SystemIndex {
        SystemIndex {
            buckets: vec![Bucket::new(); arity],
        }
    }

    /// Return the number of argument positions.
    pub fn arity(&self) -> usize {
        self.buckets.len()
    }

    /// Fetch the bucket for one argument position.
    pub fn bucket(&self, position: usize) -> Option<&Bucket> {
        self.buckets.get(position)
    }

    /// Get all the buckets in argument order.
    pub fn buckets(&self) -> &[Bucket] {
        &self.buckets
    }

    /// Returns true if any bucket has no entities in it.
    ///
    /// Running a system with an empty bucket produces no combinations.
    pub fn has_empty_bucket(&self) -> bool {
        self.buckets.iter().any(|b| b.is_empty())
    }

    /// Insert an entity into a single argument position.
    pub(crate) fn insert(&mut self, position: usize, id: EntityId) {
        self.buckets[position].insert(id);
    }

    /// Remove an entity from every argument position.
    pub(crate) fn remove(&mut self, id: EntityId) {
        for bucket in self.buckets.iter_mut() {
            bucket.remove(&id);
        }
    }

    /// Empty every bucket.
    pub(crate) fn clear(&mut self) {
        for bucket in self.buckets.iter_mut() {
            bucket.clear();
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_remove_is_idempotent() {
        let mut index = SystemIndex::new(2);
        let id = EntityId::new(1);
        index.insert(0, id);
        index.insert(1, id);
        assert!(!index.has_empty_bucket());

        index.remove(id);
        let once = index.clone();
        index.remove(id);
        assert_eq!(index, once);
        assert!(index.has_empty_bucket());
    }

    #[test]
    fn test_arity_zero() {
        let index = SystemIndex::new(0);
        assert_eq!(index.arity(), 0);
        assert!(index.bucket(0).is_none());
        assert!(!index.has_empty_bucket());
    }
}
