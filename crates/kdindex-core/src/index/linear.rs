//! Exhaustive linear scan.
//!
//! Answers any metric by computing every distance. Serves as the fallback
//! when the kd-tree refuses a metric, and as the reference the kd-tree is
//! tested against.

use crate::collection::VectorCollection;
use crate::distance::{DistanceEngine, DistanceMetric, ScalarDistance};
use crate::error::{validate_vector, Error, Result};
use crate::index::{BoundedNeighborSet, KnnIndex, KnnQuery, Neighbor};

/// Brute-force kNN over a [`VectorCollection`].
#[derive(Debug, Clone)]
pub struct LinearScan<C: VectorCollection> {
    collection: C,
}

impl<C: VectorCollection> LinearScan<C> {
    /// Wraps `collection`.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidDimension`] if the collection dimension is zero.
    pub fn new(collection: C) -> Result<Self> {
        if collection.dimension() == 0 {
            return Err(Error::InvalidDimension(0));
        }
        Ok(Self { collection })
    }

    /// The scanned collection.
    #[must_use]
    pub fn collection(&self) -> &C {
        &self.collection
    }

    /// Finds the `k` nearest neighbors of `query` under `engine`.
    ///
    /// Same ordering and validation as the kd-tree: ascending by distance,
    /// ties by id. Every vector is offered, so `min(k, len)` neighbors are
    /// returned even when an engine yields NaN (ranked by `f32::total_cmp`).
    ///
    /// # Errors
    ///
    /// - [`Error::DimensionMismatch`] or [`Error::NonFiniteVector`] for a
    ///   malformed query
    /// - [`Error::Overflow`] if the collection holds more than `u32::MAX` vectors
    pub fn search<D: DistanceEngine + ?Sized>(
        &self,
        engine: &D,
        query: &[f32],
        k: usize,
    ) -> Result<Vec<Neighbor>> {
        validate_vector(query, self.collection.dimension())?;

        if k == 0 {
            return Ok(Vec::new());
        }
        let len = self.collection.len();
        let count = u32::try_from(len)
            .map_err(|_| Error::Overflow(format!("{len} vectors exceed the u32 slot range")))?;

        let mut neighbors = BoundedNeighborSet::new(k);
        for handle in 0..count {
            let slot = handle as usize;
            let distance = engine.distance(query, self.collection.vector(slot));
            neighbors.offer(distance, handle, self.collection.id_at(slot));
        }
        Ok(neighbors.into_sorted_vec())
    }
}

impl<C: VectorCollection> KnnIndex for LinearScan<C> {
    fn name(&self) -> &'static str {
        "linear scan"
    }

    fn short_name(&self) -> &'static str {
        "linear"
    }

    fn len(&self) -> usize {
        self.collection.len()
    }

    fn dimension(&self) -> usize {
        self.collection.dimension()
    }

    fn knn_query(&self, metric: &DistanceMetric) -> Option<Box<dyn KnnQuery + '_>> {
        Some(Box::new(LinearScanQuery {
            scan: self,
            engine: ScalarDistance::new(*metric),
        }))
    }
}

/// kNN query bound to one linear scan and one metric.
#[derive(Debug)]
pub struct LinearScanQuery<'a, C: VectorCollection> {
    scan: &'a LinearScan<C>,
    engine: ScalarDistance,
}

impl<C: VectorCollection> KnnQuery for LinearScanQuery<'_, C> {
    fn knn(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>> {
        self.scan.search(&self.engine, query, k)
    }
}
