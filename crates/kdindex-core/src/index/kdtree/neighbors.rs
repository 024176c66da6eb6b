//! Capacity-bounded nearest-neighbor set.
//!
//! Holds the k best candidates seen so far in a max-heap keyed by
//! `(distance, id, slot)`, so the worst kept candidate is always on top and its
//! distance is the pruning bound.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::index::Neighbor;

/// Upper limit on the heap allocation made up front; larger k grow on demand.
const PREALLOC_LIMIT: usize = 1024;

#[derive(Debug, Clone, Copy)]
struct Candidate {
    distance: f32,
    id: u64,
    slot: u32,
}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.distance
            .total_cmp(&other.distance)
            .then_with(|| self.id.cmp(&other.id))
            .then_with(|| self.slot.cmp(&other.slot))
    }
}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Candidate {}

/// The k smallest `(distance, id)` pairs offered so far.
///
/// Created per query and never shared.
#[derive(Debug, Clone)]
pub struct BoundedNeighborSet {
    k: usize,
    heap: BinaryHeap<Candidate>,
}

impl BoundedNeighborSet {
    /// Creates an empty set keeping at most `k` neighbors.
    #[must_use]
    pub fn new(k: usize) -> Self {
        Self {
            k,
            heap: BinaryHeap::with_capacity(k.min(PREALLOC_LIMIT)),
        }
    }

    /// Maximum number of neighbors kept.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.k
    }

    /// Number of neighbors currently kept.
    #[must_use]
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// Returns true if no neighbor has been kept yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Returns true once k neighbors are kept.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.heap.len() >= self.k
    }

    /// Current k-th smallest distance, or `+∞` while fewer than k are kept.
    #[must_use]
    pub fn bound(&self) -> f32 {
        if self.heap.len() < self.k {
            return f32::INFINITY;
        }
        self.heap.peek().map_or(f32::INFINITY, |worst| worst.distance)
    }

    /// Offers a candidate. Returns true if it was kept.
    ///
    /// When the set is full the candidate replaces the current worst entry only
    /// if it orders strictly before it by `(distance, id, slot)`.
    pub fn offer(&mut self, distance: f32, slot: u32, id: u64) -> bool {
        if self.k == 0 {
            return false;
        }
        let candidate = Candidate { distance, id, slot };
        if self.heap.len() < self.k {
            self.heap.push(candidate);
            return true;
        }
        match self.heap.peek_mut() {
            Some(mut worst) if candidate < *worst => {
                *worst = candidate;
                true
            }
            _ => false,
        }
    }

    /// Consumes the set, returning neighbors ascending by distance, ties by id.
    #[must_use]
    pub fn into_sorted_vec(self) -> Vec<Neighbor> {
        self.heap
            .into_sorted_vec()
            .into_iter()
            .map(|c| Neighbor {
                id: c.id,
                distance: c.distance,
            })
            .collect()
    }
}
