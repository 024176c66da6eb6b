//! # kdindex Core
//!
//! Static in-memory kd-tree for exact k-nearest-neighbor search.
//!
//! The tree is built once over an immutable [`VectorCollection`] and then
//! answers any number of concurrent queries under an Lp norm (Manhattan,
//! Euclidean, Chebyshev or Minkowski with `p >= 1`). Results are exact: they
//! are identical to an exhaustive [`LinearScan`], ties broken by id.
//!
//! ## Features
//!
//! - **Pointer-free layout**: the tree is one permuted array of slots
//! - **Exact pruning**: plane distances use the same arithmetic as full distances
//! - **Metric fallback**: [`select_knn_query`] routes unsupported metrics to a scan
//! - **Parallel batches**: `knn_batch` behind the `parallel` feature (rayon)
//!
//! ## Quick Start
//!
//! ```rust
//! use kdindex_core::{KdTreeIndex, LpNorm, Point, VectorStore};
//!
//! fn main() -> kdindex_core::Result<()> {
//!     let store = VectorStore::from_points(
//!         2,
//!         vec![
//!             Point::new(1, vec![0.0, 0.0]),
//!             Point::new(2, vec![1.0, 0.0]),
//!             Point::new(3, vec![0.0, 1.0]),
//!             Point::new(4, vec![5.0, 5.0]),
//!         ],
//!     )?;
//!
//!     let index = KdTreeIndex::build(&store)?;
//!     let nearest = index.search(&LpNorm::euclidean(), &[0.0, 0.0], 2)?;
//!
//!     assert_eq!(nearest[0].id, 1);
//!     assert_eq!(nearest[1].id, 2);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
// Clippy lints configured in workspace Cargo.toml [workspace.lints.clippy]
#![cfg_attr(
    test,
    allow(
        clippy::doc_markdown,
        clippy::uninlined_format_args,
        clippy::cast_lossless,
        clippy::cast_possible_truncation,
        clippy::manual_assert
    )
)]

pub mod collection;
pub mod config;
pub mod distance;
pub mod error;
pub mod index;

pub use collection::{Point, VectorCollection, VectorStore};
pub use config::{
    BuildConfig, ConfigError, KdIndexConfig, LoggingConfig, PartitionStrategy, SearchConfig,
};
pub use distance::{DistanceEngine, DistanceMetric, LpNorm, ScalarDistance};
pub use error::{Error, Result};
pub use index::{
    select_knn_query, BoundedNeighborSet, KdTreeIndex, KdTreeKnnQuery, KnnIndex, KnnQuery,
    LinearScan, LinearScanQuery, Neighbor, SearchStats,
};
