//! Index implementations for exact k-nearest-neighbor search.
//!
//! - [`kdtree`]: static kd-tree, Lp norms only
//! - [`linear`]: exhaustive scan, any metric
//!
//! An index advertises which metrics it can answer through
//! [`KnnIndex::knn_query`]; returning `None` is how it refuses a metric.
//! [`select_knn_query`] picks the first index that accepts.

pub mod kdtree;
pub mod linear;

use serde::{Deserialize, Serialize};

use crate::distance::DistanceMetric;
use crate::error::Result;

pub use kdtree::{BoundedNeighborSet, KdTreeIndex, KdTreeKnnQuery, SearchStats};
pub use linear::{LinearScan, LinearScanQuery};

/// One kNN result.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Neighbor {
    /// External id of the vector.
    pub id: u64,
    /// Distance from the query.
    pub distance: f32,
}

/// A kNN query bound to one index and one metric.
pub trait KnnQuery: Send + Sync {
    /// Returns the `k` nearest neighbors of `query`, ascending by distance,
    /// ties by id. Fewer than `k` are returned only when the index is smaller.
    fn knn(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>>;
}

/// An index able to serve kNN queries for some metrics.
pub trait KnnIndex: Send + Sync {
    /// Human-readable name.
    fn name(&self) -> &'static str;

    /// Short identifier, used in log fields.
    fn short_name(&self) -> &'static str {
        self.name()
    }

    /// Number of indexed vectors.
    fn len(&self) -> usize;

    /// Returns true if the index is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Dimensionality of the indexed vectors.
    fn dimension(&self) -> usize;

    /// Returns a query for `metric`, or `None` if this index cannot answer it.
    fn knn_query(&self, metric: &DistanceMetric) -> Option<Box<dyn KnnQuery + '_>>;
}

/// Returns a query from the first index in `candidates` that supports `metric`.
///
/// Indexes are tried in order, so list the preferred one first and a
/// [`LinearScan`] last as the catch-all.
pub fn select_knn_query<'a>(
    candidates: &[&'a dyn KnnIndex],
    metric: &DistanceMetric,
) -> Option<Box<dyn KnnQuery + 'a>> {
    for (position, &index) in candidates.iter().enumerate() {
        if let Some(query) = index.knn_query(metric) {
            if position > 0 {
                tracing::warn!(
                    metric = metric.name(),
                    preferred = candidates[0].short_name(),
                    fallback = index.short_name(),
                    "metric not supported by preferred index, falling back"
                );
            }
            return Some(query);
        }
    }
    None
}
