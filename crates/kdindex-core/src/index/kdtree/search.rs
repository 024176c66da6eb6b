//! Branch-and-bound kNN search over the implicit tree.

use crate::collection::VectorCollection;
use crate::distance::LpNorm;
use crate::index::Neighbor;

use super::neighbors::BoundedNeighborSet;

/// Work counters for a single query.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SearchStats {
    /// Implicit nodes entered.
    pub nodes_visited: u64,
    /// Full distance computations performed.
    pub distance_computations: u64,
    /// Sibling subtrees skipped because the splitting plane was out of range.
    pub subtrees_pruned: u64,
}

/// Per-query search state. Nothing in here is shared between queries.
pub(super) struct KdSearch<'a, C: VectorCollection + ?Sized> {
    collection: &'a C,
    norm: LpNorm,
    query: &'a [f32],
    dimension: usize,
    neighbors: BoundedNeighborSet,
    stats: SearchStats,
}

impl<'a, C: VectorCollection + ?Sized> KdSearch<'a, C> {
    /// Prepares a search for the `k` nearest neighbors of `query`.
    ///
    /// `query` must already be validated against the collection dimension.
    pub(super) fn new(collection: &'a C, norm: LpNorm, query: &'a [f32], k: usize) -> Self {
        Self {
            collection,
            norm,
            query,
            dimension: collection.dimension(),
            neighbors: BoundedNeighborSet::new(k),
            stats: SearchStats::default(),
        }
    }

    /// Runs the search over the whole tree and returns the sorted neighbors.
    pub(super) fn run(mut self, slots: &[u32]) -> (Vec<Neighbor>, SearchStats) {
        if !slots.is_empty() && self.neighbors.capacity() > 0 {
            self.descend(slots, 0, f32::INFINITY);
        }
        (self.neighbors.into_sorted_vec(), self.stats)
    }

    /// Searches the node spanning `range` and returns the refreshed bound.
    fn descend(&mut self, range: &[u32], axis: usize, mut bound: f32) -> f32 {
        self.stats.nodes_visited += 1;

        let collection = self.collection;
        let middle = range.len() / 2;
        let slot = range[middle];
        let split = collection.vector(slot as usize);

        let delta = split[axis] - self.query[axis];
        let can_be_left = delta >= 0.0;
        let can_be_right = delta <= 0.0;

        let next = (axis + 1) % self.dimension;
        let (left, rest) = range.split_at(middle);
        let right = &rest[1..];

        if can_be_left && can_be_right {
            // Query on the splitting plane: neither side can be pruned.
            bound = self.evaluate(slot, split, bound);
            if !left.is_empty() {
                bound = self.descend(left, next, bound);
            }
            if !right.is_empty() {
                bound = self.descend(right, next, bound);
            }
            return bound;
        }

        let (near, far) = if can_be_left {
            (left, right)
        } else {
            (right, left)
        };

        if !near.is_empty() {
            bound = self.descend(near, next, bound);
        }

        let plane = self.norm.axis_distance(delta);
        if plane <= bound {
            bound = self.evaluate(slot, split, bound);
        }
        if !far.is_empty() {
            if plane <= bound {
                bound = self.descend(far, next, bound);
            } else {
                self.stats.subtrees_pruned += 1;
            }
        }
        bound
    }

    /// Offers the split element and returns the refreshed bound.
    fn evaluate(&mut self, slot: u32, vector: &[f32], bound: f32) -> f32 {
        self.stats.distance_computations += 1;
        let distance = self.norm.distance(self.query, vector);
        if distance <= bound {
            let id = self.collection.id_at(slot as usize);
            self.neighbors.offer(distance, slot, id);
        }
        self.neighbors.bound()
    }
}
