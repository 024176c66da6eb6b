//! Fuzz target for kd-tree construction and kNN search.
//!
//! Builds a tree from arbitrary coordinates and checks that:
//! - malformed vectors and queries are rejected without panicking
//! - the partition invariant holds after every build
//! - every answer equals the exhaustive linear scan
//!
//! # Running
//!
//! ```bash
//! cd fuzz
//! cargo +nightly fuzz run fuzz_kdtree_knn
//! ```

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use kdindex_core::{
    BuildConfig, KdTreeIndex, LinearScan, LpNorm, PartitionStrategy, VectorStore,
};

/// Fuzzing input for one build and one query.
#[derive(Arbitrary, Debug)]
struct KnnInput {
    /// Dimension selector (reduced to 1..=8)
    dimension: u8,
    /// Flat coordinates, chunked into vectors of `dimension`
    coordinates: Vec<f32>,
    /// Query (may have the wrong length or non-finite values)
    query: Vec<f32>,
    k: u8,
    /// Norm selector; `p` is used for Minkowski
    norm: u8,
    p: f32,
    sort: bool,
}

fuzz_target!(|input: KnnInput| {
    let dimension = usize::from(input.dimension % 8) + 1;

    // Limit collection size to keep iterations fast
    let Ok(mut store) = VectorStore::new(dimension) else {
        return;
    };
    for (id, chunk) in input.coordinates.chunks_exact(dimension).take(512).enumerate() {
        // Non-finite vectors must be rejected, never stored
        if store.insert(id as u64, chunk).is_err() {
            assert!(chunk.iter().any(|c| !c.is_finite()));
        }
    }

    let norm = match input.norm % 4 {
        0 => LpNorm::manhattan(),
        1 => LpNorm::euclidean(),
        2 => LpNorm::chebyshev(),
        _ => match LpNorm::new(input.p) {
            Ok(norm) => norm,
            Err(_) => {
                assert!(input.p.is_nan() || input.p < 1.0);
                return;
            }
        },
    };
    let partition = if input.sort {
        PartitionStrategy::Sort
    } else {
        PartitionStrategy::Select
    };

    let Ok(index) = KdTreeIndex::build_with_config(&store, &BuildConfig { partition }) else {
        panic!("build rejected a store of valid vectors");
    };
    assert!(index.verify_partition().is_ok());

    let Ok(scan) = LinearScan::new(&store) else {
        return;
    };
    let k = usize::from(input.k);
    match (index.search(&norm, &input.query, k), scan.search(&norm, &input.query, k)) {
        (Ok(tree), Ok(linear)) => assert_eq!(tree, linear),
        (Err(a), Err(b)) => assert_eq!(a, b),
        (tree, linear) => panic!("tree {tree:?} disagrees with scan {linear:?}"),
    }
});
