//! Tests for the kd-tree index.

#![allow(clippy::float_cmp, clippy::cast_precision_loss)]

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::*;
use crate::collection::{Point, VectorStore};
use crate::config::PartitionStrategy;
use crate::index::LinearScan;

fn scenario_store() -> VectorStore {
    // A=(0,0) B=(1,0) C=(0,1) D=(5,5)
    VectorStore::from_points(
        2,
        vec![
            Point::new(1, vec![0.0, 0.0]),
            Point::new(2, vec![1.0, 0.0]),
            Point::new(3, vec![0.0, 1.0]),
            Point::new(4, vec![5.0, 5.0]),
        ],
    )
    .unwrap()
}

fn random_store(seed: u64, n: usize, dimension: usize) -> VectorStore {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut store = VectorStore::with_capacity(dimension, n).unwrap();
    for id in 0..n as u64 {
        let v: Vec<f32> = (0..dimension).map(|_| rng.gen_range(-10.0..10.0)).collect();
        store.insert(id, &v).unwrap();
    }
    store
}

fn both_strategies() -> [BuildConfig; 2] {
    [
        BuildConfig {
            partition: PartitionStrategy::Select,
        },
        BuildConfig {
            partition: PartitionStrategy::Sort,
        },
    ]
}

#[test]
fn test_scenario_two_nearest_of_origin() {
    let store = scenario_store();
    let index = KdTreeIndex::build(&store).unwrap();

    let result = index.search(&LpNorm::euclidean(), &[0.0, 0.0], 2).unwrap();

    assert_eq!(result.len(), 2);
    assert_eq!(result[0], Neighbor { id: 1, distance: 0.0 });
    assert_eq!(result[1].distance, 1.0);
    assert!(result[1].id == 2 || result[1].id == 3);
    // Tie between B and C is broken by id.
    assert_eq!(result[1].id, 2);
}

#[test]
fn test_scenario_far_point() {
    let store = scenario_store();
    let index = KdTreeIndex::build(&store).unwrap();

    let result = index.search(&LpNorm::euclidean(), &[5.0, 5.0], 1).unwrap();

    assert_eq!(result, vec![Neighbor { id: 4, distance: 0.0 }]);
}

#[test]
fn test_build_establishes_partition_invariant() {
    for config in both_strategies() {
        for (seed, n, dimension) in [(1, 1, 1), (2, 2, 3), (3, 17, 2), (4, 500, 3), (5, 1024, 8)] {
            let store = random_store(seed, n, dimension);
            let index = KdTreeIndex::build_with_config(&store, &config).unwrap();
            index.verify_partition().unwrap();
            assert_eq!(index.len(), n);
        }
    }
}

#[test]
fn test_build_with_duplicate_coordinates() {
    let mut store = VectorStore::new(2).unwrap();
    for id in 0..64_u64 {
        store.insert(id, &[(id % 3) as f32, 1.0]).unwrap();
    }
    for config in both_strategies() {
        let index = KdTreeIndex::build_with_config(&store, &config).unwrap();
        index.verify_partition().unwrap();
    }
}

#[test]
fn test_slot_array_is_a_permutation() {
    let store = random_store(9, 300, 4);
    let index = KdTreeIndex::build(&store).unwrap();
    let mut slots = index.identifiers().to_vec();
    slots.sort_unstable();
    assert_eq!(slots, (0..300).collect::<Vec<u32>>());
}

#[test]
fn test_build_is_deterministic() {
    let store = random_store(11, 200, 3);
    for config in both_strategies() {
        let a = KdTreeIndex::build_with_config(&store, &config).unwrap();
        let b = KdTreeIndex::build_with_config(&store, &config).unwrap();
        assert_eq!(a.identifiers(), b.identifiers());
    }
}

#[test]
fn test_verify_partition_detects_corruption() {
    let mut store = VectorStore::new(1).unwrap();
    for id in 0..7_u64 {
        store.insert(id, &[id as f32]).unwrap();
    }
    let mut index = KdTreeIndex::build(&store).unwrap();
    index.verify_partition().unwrap();

    // Swap the root split with the first element of its left range.
    index.sorted.swap(0, 3);
    let err = index.verify_partition().unwrap_err();
    assert!(matches!(err, Error::PartitionViolation(_)));
}

#[test]
fn test_matches_linear_scan_all_norms() {
    let store = random_store(21, 400, 3);
    let scan = LinearScan::new(&store).unwrap();
    let norms = [
        LpNorm::euclidean(),
        LpNorm::manhattan(),
        LpNorm::chebyshev(),
        LpNorm::new(3.0).unwrap(),
    ];
    let mut rng = StdRng::seed_from_u64(22);

    for config in both_strategies() {
        let index = KdTreeIndex::build_with_config(&store, &config).unwrap();
        for norm in &norms {
            for k in [1, 5, 37] {
                let query: Vec<f32> = (0..3).map(|_| rng.gen_range(-12.0..12.0)).collect();
                let expected = scan.search(norm, &query, k).unwrap();
                let actual = index.search(norm, &query, k).unwrap();
                assert_eq!(actual, expected, "{norm:?}, k={k}, query={query:?}");
            }
        }
    }
}

#[test]
fn test_query_on_splitting_plane() {
    let store = random_store(31, 257, 2);
    let index = KdTreeIndex::build(&store).unwrap();
    let scan = LinearScan::new(&store).unwrap();
    let norm = LpNorm::euclidean();

    // Root splits on axis 0 at the middle slot.
    let root = index.identifiers()[index.len() / 2] as usize;
    let split_x = store.vector(root)[0];
    for y in [-9.5_f32, 0.0, 3.25] {
        let query = [split_x, y];
        for k in [1, 4, 16] {
            assert_eq!(
                index.search(&norm, &query, k).unwrap(),
                scan.search(&norm, &query, k).unwrap()
            );
        }
    }

    // Query identical to an indexed vector hits delta == 0 on every axis.
    let query = store.vector(root).to_vec();
    let result = index.search(&norm, &query, 1).unwrap();
    assert_eq!(result[0].distance, 0.0);
}

#[test]
fn test_k_zero_returns_empty() {
    let store = scenario_store();
    let index = KdTreeIndex::build(&store).unwrap();
    let (result, stats) = index
        .search_with_stats(&LpNorm::euclidean(), &[0.0, 0.0], 0)
        .unwrap();
    assert!(result.is_empty());
    assert_eq!(stats, SearchStats::default());
}

#[test]
fn test_k_at_least_n_returns_everything_sorted() {
    let store = scenario_store();
    let index = KdTreeIndex::build(&store).unwrap();
    for k in [4, 5, 1_000_000] {
        let result = index.search(&LpNorm::manhattan(), &[1.0, 1.0], k).unwrap();
        let distances: Vec<f32> = result.iter().map(|n| n.distance).collect();
        assert_eq!(distances, vec![1.0, 1.0, 2.0, 8.0]);
        let ids: Vec<u64> = result.iter().map(|n| n.id).collect();
        assert_eq!(ids, vec![2, 3, 1, 4]);
    }
}

#[test]
fn test_empty_index() {
    let store = VectorStore::new(3).unwrap();
    let index = KdTreeIndex::build(&store).unwrap();
    assert!(index.is_empty());
    assert_eq!(index.height(), 0);
    index.verify_partition().unwrap();
    for k in [0, 1, 10] {
        assert!(index
            .search(&LpNorm::euclidean(), &[0.0, 0.0, 0.0], k)
            .unwrap()
            .is_empty());
    }
}

#[test]
fn test_single_point_index() {
    let store = VectorStore::from_points(2, vec![Point::new(9, vec![1.0, 1.0])]).unwrap();
    let index = KdTreeIndex::build(&store).unwrap();
    assert_eq!(index.height(), 1);
    let result = index.search(&LpNorm::chebyshev(), &[4.0, -1.0], 3).unwrap();
    assert_eq!(result, vec![Neighbor { id: 9, distance: 3.0 }]);
}

#[test]
fn test_dimension_mismatch_fails_fast() {
    let store = scenario_store();
    let index = KdTreeIndex::build(&store).unwrap();
    let err = index
        .search(&LpNorm::euclidean(), &[0.0, 0.0, 0.0], 1)
        .unwrap_err();
    assert_eq!(
        err,
        Error::DimensionMismatch {
            expected: 2,
            actual: 3
        }
    );
}

#[test]
fn test_non_finite_query_rejected() {
    let store = scenario_store();
    let index = KdTreeIndex::build(&store).unwrap();
    assert!(matches!(
        index.search(&LpNorm::euclidean(), &[f32::NAN, 0.0], 1),
        Err(Error::NonFiniteVector(_))
    ));
}

#[test]
fn test_search_with_stats_fails_like_search() {
    let store = scenario_store();
    let index = KdTreeIndex::build(&store).unwrap();
    let norm = LpNorm::euclidean();

    for query in [vec![0.0], vec![0.0, f32::INFINITY]] {
        let plain = index.search(&norm, &query, 2).unwrap_err();
        let with_stats = index.search_with_stats(&norm, &query, 2).unwrap_err();
        assert_eq!(plain, with_stats);
        assert!(with_stats.is_precondition());
    }
}

#[test]
fn test_repeated_queries_are_identical() {
    let store = random_store(41, 300, 4);
    let index = KdTreeIndex::build(&store).unwrap();
    let query = [0.5, -0.5, 2.0, 1.0];
    let first = index.search(&LpNorm::euclidean(), &query, 10).unwrap();
    for _ in 0..5 {
        assert_eq!(index.search(&LpNorm::euclidean(), &query, 10).unwrap(), first);
    }
}

#[test]
fn test_pruning_skips_most_of_a_large_tree() {
    let store = random_store(51, 4096, 2);
    let index = KdTreeIndex::build(&store).unwrap();
    let (result, stats) = index
        .search_with_stats(&LpNorm::euclidean(), &[1.0, 1.0], 5)
        .unwrap();
    assert_eq!(result.len(), 5);
    assert!(stats.subtrees_pruned > 0);
    assert!(
        stats.distance_computations < 1024,
        "expected pruning, computed {} distances",
        stats.distance_computations
    );
    assert!(stats.nodes_visited >= stats.distance_computations);
}

#[test]
fn test_height() {
    for (n, expected) in [(1, 1), (2, 2), (3, 2), (4, 3), (7, 3), (8, 4)] {
        let store = random_store(61, n, 2);
        let index = KdTreeIndex::build(&store).unwrap();
        assert_eq!(index.height(), expected, "n={n}");
    }
}

#[test]
fn test_knn_query_refuses_non_norm_metrics() {
    let store = scenario_store();
    let index = KdTreeIndex::build(&store).unwrap();
    assert!(index.knn_query(&DistanceMetric::Cosine).is_none());
    assert!(index.knn_query(&DistanceMetric::DotProduct).is_none());
    assert!(index
        .knn_query(&DistanceMetric::Minkowski { p: 0.5 })
        .is_none());

    let query = index.knn_query(&DistanceMetric::Euclidean).unwrap();
    assert_eq!(query.norm(), LpNorm::euclidean());
    let result = query.knn(&[5.0, 5.0], 1).unwrap();
    assert_eq!(result[0].id, 4);
    let (_, stats) = query.knn_with_stats(&[5.0, 5.0], 1).unwrap();
    assert!(stats.nodes_visited > 0);
}

#[test]
fn test_knn_index_trait_object() {
    let store = scenario_store();
    let index = KdTreeIndex::build(&store).unwrap();
    let dyn_index: &dyn KnnIndex = &index;
    assert_eq!(dyn_index.name(), "kd-tree");
    assert_eq!(dyn_index.short_name(), "kdtree");
    assert_eq!(dyn_index.len(), 4);
    assert_eq!(dyn_index.dimension(), 2);
    assert!(dyn_index.knn_query(&DistanceMetric::Cosine).is_none());
    assert!(dyn_index.knn_query(&DistanceMetric::Manhattan).is_some());
}

#[test]
fn test_shared_collection_handle() {
    let store = Arc::new(random_store(71, 128, 3));
    let index = KdTreeIndex::build(Arc::clone(&store)).unwrap();
    assert_eq!(index.collection().len(), 128);
    let result = index.search(&LpNorm::euclidean(), store.vector(5), 1).unwrap();
    assert_eq!(result[0].id, 5);
}

#[test]
fn test_build_rejects_zero_dimension_collection() {
    #[derive(Debug)]
    struct Flat;
    impl VectorCollection for Flat {
        fn dimension(&self) -> usize {
            0
        }
        fn len(&self) -> usize {
            0
        }
        fn id_at(&self, slot: usize) -> u64 {
            slot as u64
        }
        fn vector(&self, _slot: usize) -> &[f32] {
            &[]
        }
    }
    assert_eq!(
        KdTreeIndex::build(Flat).unwrap_err(),
        Error::InvalidDimension(0)
    );
}

#[test]
fn test_build_rejects_malformed_collection_vector() {
    #[derive(Debug)]
    struct Ragged(Vec<Vec<f32>>);
    impl VectorCollection for Ragged {
        fn dimension(&self) -> usize {
            2
        }
        fn len(&self) -> usize {
            self.0.len()
        }
        fn id_at(&self, slot: usize) -> u64 {
            slot as u64
        }
        fn vector(&self, slot: usize) -> &[f32] {
            &self.0[slot]
        }
    }
    let ragged = Ragged(vec![vec![0.0, 1.0], vec![2.0]]);
    assert!(matches!(
        KdTreeIndex::build(ragged),
        Err(Error::DimensionMismatch { .. })
    ));
}

#[cfg(feature = "parallel")]
#[test]
fn test_knn_batch_matches_sequential() {
    let store = random_store(81, 1000, 3);
    let index = KdTreeIndex::build(&store).unwrap();
    let norm = LpNorm::euclidean();
    let mut rng = StdRng::seed_from_u64(82);
    let queries: Vec<Vec<f32>> = (0..64)
        .map(|_| (0..3).map(|_| rng.gen_range(-10.0..10.0)).collect())
        .collect();

    let batch = index.knn_batch(&norm, &queries, 7).unwrap();
    assert_eq!(batch.len(), queries.len());
    for (query, result) in queries.iter().zip(&batch) {
        assert_eq!(result, &index.search(&norm, query, 7).unwrap());
    }
}

#[cfg(feature = "parallel")]
#[test]
fn test_knn_batch_propagates_errors() {
    let store = scenario_store();
    let index = KdTreeIndex::build(&store).unwrap();
    let queries = vec![vec![0.0, 0.0], vec![1.0]];
    assert!(index.knn_batch(&LpNorm::euclidean(), &queries, 1).is_err());
}
