//! Builds a kd-tree over random points and answers a few queries.
//!
//! Configuration comes from `kdindex.toml` and `KDINDEX_*` variables;
//! `RUST_LOG` overrides the configured log level.
//!
//! ```text
//! RUST_LOG=kdindex_core=trace cargo run --example knn_demo
//! ```

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use kdindex_core::{
    select_knn_query, DistanceMetric, KdIndexConfig, KdTreeIndex, KnnIndex, KnnQuery, LinearScan,
    LpNorm, VectorStore,
};

const POINTS: u64 = 50_000;
const DIMENSION: usize = 3;

fn main() -> anyhow::Result<()> {
    let config = KdIndexConfig::load()?;

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| config.logging.level.clone()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut rng = StdRng::seed_from_u64(2024);
    let mut store = VectorStore::with_capacity(DIMENSION, usize::try_from(POINTS)?)?;
    for id in 0..POINTS {
        let v: Vec<f32> = (0..DIMENSION).map(|_| rng.gen_range(-100.0..100.0)).collect();
        store.insert(id, &v)?;
    }

    let index = KdTreeIndex::build_with_config(&store, &config.build)?;
    tracing::info!(
        points = index.len(),
        height = index.height(),
        partition = config.build.partition.as_str(),
        "index ready"
    );

    let k = config.search.clamp_k(None);
    let query = [10.0_f32, -20.0, 30.0];
    let (neighbors, stats) = index.search_with_stats(&LpNorm::euclidean(), &query, k)?;
    tracing::info!(
        k,
        nodes_visited = stats.nodes_visited,
        distance_computations = stats.distance_computations,
        subtrees_pruned = stats.subtrees_pruned,
        "euclidean query"
    );
    for neighbor in &neighbors {
        println!("{:>8}  {:.4}", neighbor.id, neighbor.distance);
    }

    // Cosine is not a norm: the tree declines and the scan answers.
    let scan = LinearScan::new(&store)?;
    let candidates: [&dyn KnnIndex; 2] = [&index, &scan];
    for metric in [DistanceMetric::Manhattan, DistanceMetric::Cosine] {
        let Some(knn) = select_knn_query(&candidates, &metric) else {
            continue;
        };
        let result = knn.knn(&query, 3)?;
        println!("{}: {:?}", metric.name(), result);
    }

    Ok(())
}
