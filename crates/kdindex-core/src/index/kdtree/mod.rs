//! Static in-memory kd-tree.
//!
//! A pointer-free balanced kd-tree (Bentley, "Multidimensional binary search
//! trees used for associative searching", CACM 18(9), 1975) stored as a single
//! permuted array of collection slots.
//!
//! # Module Organization
//!
//! - `builder`: median partitioning of the slot array, invariant verification
//! - `search`: recursive branch-and-bound kNN search
//! - `neighbors`: the capacity-bounded neighbor set used by every query
//!
//! # Concurrency
//!
//! The slot array and the collection are never mutated after
//! [`KdTreeIndex::build`] returns, so any number of threads may query one index
//! at once. Each query owns its neighbor set and counters.

mod builder;
pub mod neighbors;
mod search;

#[cfg(test)]
mod tests;

use std::time::Instant;

pub use neighbors::BoundedNeighborSet;
pub use search::SearchStats;

use crate::collection::VectorCollection;
use crate::config::BuildConfig;
use crate::distance::{DistanceMetric, LpNorm};
use crate::error::{validate_vector, Error, Result};
use crate::index::{KnnIndex, KnnQuery, Neighbor};

use search::KdSearch;

/// Static kd-tree over a [`VectorCollection`].
///
/// `C` is typically `&VectorStore` or `Arc<VectorStore>`: the index keeps a
/// view of the collection, it does not copy vectors.
#[derive(Debug, Clone)]
pub struct KdTreeIndex<C: VectorCollection> {
    collection: C,
    /// The tree: collection slots permuted so each range is median-partitioned.
    sorted: Vec<u32>,
    dimension: usize,
    config: BuildConfig,
}

impl<C: VectorCollection> KdTreeIndex<C> {
    /// Builds an index with the default [`BuildConfig`].
    ///
    /// # Errors
    ///
    /// See [`KdTreeIndex::build_with_config`].
    pub fn build(collection: C) -> Result<Self> {
        Self::build_with_config(collection, &BuildConfig::default())
    }

    /// Builds an index over every vector of `collection`.
    ///
    /// An empty collection yields an empty tree whose queries return nothing.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidDimension`] if the collection dimension is zero
    /// - [`Error::Overflow`] if the collection holds more than `u32::MAX` vectors
    /// - [`Error::DimensionMismatch`] / [`Error::NonFiniteVector`] if a stored
    ///   vector breaks the collection contract
    pub fn build_with_config(collection: C, config: &BuildConfig) -> Result<Self> {
        let dimension = collection.dimension();
        if dimension == 0 {
            return Err(Error::InvalidDimension(dimension));
        }
        let len = collection.len();
        let count = u32::try_from(len)
            .map_err(|_| Error::Overflow(format!("{len} vectors exceed the u32 slot range")))?;

        for slot in 0..len {
            validate_vector(collection.vector(slot), dimension)?;
        }

        let started = Instant::now();
        let mut sorted: Vec<u32> = (0..count).collect();
        builder::build(&collection, &mut sorted, config.partition);

        #[allow(clippy::cast_possible_truncation)]
        let elapsed_us = started.elapsed().as_micros() as u64;
        tracing::debug!(
            entries = len,
            dimension,
            strategy = config.partition.as_str(),
            elapsed_us,
            "kd-tree built"
        );

        Ok(Self {
            collection,
            sorted,
            dimension,
            config: *config,
        })
    }

    /// Number of indexed vectors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sorted.len()
    }

    /// Returns true if the index holds no vectors.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sorted.is_empty()
    }

    /// Dimensionality of the indexed vectors.
    #[must_use]
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Number of levels of the implicit tree (0 when empty).
    #[must_use]
    pub fn height(&self) -> usize {
        (usize::BITS - self.sorted.len().leading_zeros()) as usize
    }

    /// The collection the index reads vectors from.
    #[must_use]
    pub fn collection(&self) -> &C {
        &self.collection
    }

    /// The permuted slot array that encodes the tree.
    #[must_use]
    pub fn identifiers(&self) -> &[u32] {
        &self.sorted
    }

    /// The configuration the index was built with.
    #[must_use]
    pub fn config(&self) -> &BuildConfig {
        &self.config
    }

    /// Finds the `k` nearest neighbors of `query` under `norm`.
    ///
    /// Results are ascending by distance, ties by id, and contain
    /// `min(k, len)` entries.
    ///
    /// # Errors
    ///
    /// [`Error::DimensionMismatch`] or [`Error::NonFiniteVector`] for a
    /// malformed query.
    pub fn search(&self, norm: &LpNorm, query: &[f32], k: usize) -> Result<Vec<Neighbor>> {
        self.search_with_stats(norm, query, k)
            .map(|(neighbors, _)| neighbors)
    }

    /// Like [`KdTreeIndex::search`], also returning the work done.
    ///
    /// # Errors
    ///
    /// Same as [`KdTreeIndex::search`].
    pub fn search_with_stats(
        &self,
        norm: &LpNorm,
        query: &[f32],
        k: usize,
    ) -> Result<(Vec<Neighbor>, SearchStats)> {
        validate_vector(query, self.dimension)?;

        let (neighbors, stats) =
            KdSearch::new(&self.collection, *norm, query, k).run(&self.sorted);

        tracing::trace!(
            k,
            found = neighbors.len(),
            nodes_visited = stats.nodes_visited,
            distance_computations = stats.distance_computations,
            subtrees_pruned = stats.subtrees_pruned,
            "kd-tree knn"
        );
        Ok((neighbors, stats))
    }

    /// Returns a query object for `metric`, or `None` when the metric is not
    /// an Lp norm and the tree cannot answer it exactly.
    #[must_use]
    pub fn knn_query(&self, metric: &DistanceMetric) -> Option<KdTreeKnnQuery<'_, C>> {
        metric
            .as_lp_norm()
            .map(|norm| KdTreeKnnQuery { index: self, norm })
    }

    /// Checks the partition invariant on every implicit node.
    ///
    /// # Errors
    ///
    /// [`Error::PartitionViolation`] naming the first offending node.
    pub fn verify_partition(&self) -> Result<()> {
        builder::verify(&self.collection, &self.sorted)
    }

    /// Answers independent queries in parallel.
    ///
    /// Output order matches `queries`. Fails on the first malformed query.
    #[cfg(feature = "parallel")]
    pub fn knn_batch<Q>(&self, norm: &LpNorm, queries: &[Q], k: usize) -> Result<Vec<Vec<Neighbor>>>
    where
        Q: AsRef<[f32]> + Sync,
    {
        use rayon::prelude::*;

        queries
            .par_iter()
            .map(|query| self.search(norm, query.as_ref(), k))
            .collect()
    }
}

impl<C: VectorCollection> KnnIndex for KdTreeIndex<C> {
    fn name(&self) -> &'static str {
        "kd-tree"
    }

    fn short_name(&self) -> &'static str {
        "kdtree"
    }

    fn len(&self) -> usize {
        KdTreeIndex::len(self)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn knn_query(&self, metric: &DistanceMetric) -> Option<Box<dyn KnnQuery + '_>> {
        KdTreeIndex::knn_query(self, metric).map(|q| Box::new(q) as Box<dyn KnnQuery + '_>)
    }
}

/// kNN query bound to one kd-tree and one Lp norm.
#[derive(Debug)]
pub struct KdTreeKnnQuery<'a, C: VectorCollection> {
    index: &'a KdTreeIndex<C>,
    norm: LpNorm,
}

impl<C: VectorCollection> KdTreeKnnQuery<'_, C> {
    /// The norm this query ranks by.
    #[must_use]
    pub fn norm(&self) -> LpNorm {
        self.norm
    }

    /// Like [`KnnQuery::knn`], also returning the work done.
    pub fn knn_with_stats(&self, query: &[f32], k: usize) -> Result<(Vec<Neighbor>, SearchStats)> {
        self.index.search_with_stats(&self.norm, query, k)
    }
}

impl<C: VectorCollection> KnnQuery for KdTreeKnnQuery<'_, C> {
    fn knn(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>> {
        self.index.search(&self.norm, query, k)
    }
}
