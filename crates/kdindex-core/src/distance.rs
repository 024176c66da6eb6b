//! Distance metrics and Lp norms.
//!
//! The kd-tree only accepts metrics that decompose into per-axis lower bounds,
//! which is exactly the Minkowski (Lp) family for `p >= 1`. [`DistanceMetric::as_lp_norm`]
//! is the eligibility check; every other metric is served by a linear scan.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Distance metric requested by a caller.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceMetric {
    /// L2 norm of the difference.
    Euclidean,
    /// L1 norm of the difference.
    Manhattan,
    /// L∞ norm of the difference (largest absolute coordinate difference).
    Chebyshev,
    /// General Lp norm of the difference.
    Minkowski {
        /// Exponent; must be >= 1 for the kd-tree to accept it.
        p: f32,
    },
    /// `1 - cosine similarity`. Not a norm.
    Cosine,
    /// Negated dot product (lower = more similar). Not a norm.
    DotProduct,
}

impl DistanceMetric {
    /// Returns the Lp norm behind this metric, or `None` when the metric has no
    /// per-axis lower bound and therefore cannot drive kd-tree pruning.
    #[must_use]
    pub fn as_lp_norm(&self) -> Option<LpNorm> {
        match *self {
            Self::Euclidean => Some(LpNorm::euclidean()),
            Self::Manhattan => Some(LpNorm::manhattan()),
            Self::Chebyshev => Some(LpNorm::chebyshev()),
            Self::Minkowski { p } => LpNorm::new(p).ok(),
            Self::Cosine | Self::DotProduct => None,
        }
    }

    /// Computes the distance between `a` and `b` under this metric.
    #[must_use]
    pub fn distance(&self, a: &[f32], b: &[f32]) -> f32 {
        match *self {
            Self::Euclidean => euclidean(a, b),
            Self::Manhattan => manhattan(a, b),
            Self::Chebyshev => chebyshev(a, b),
            // Valid exponents share the norm's fast paths so both index kinds agree.
            Self::Minkowski { p } => match LpNorm::new(p) {
                Ok(norm) => norm.distance(a, b),
                Err(_) => minkowski(a, b, p),
            },
            Self::Cosine => cosine_distance(a, b),
            Self::DotProduct => negated_dot(a, b),
        }
    }

    /// Short lowercase name, used in log fields.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Euclidean => "euclidean",
            Self::Manhattan => "manhattan",
            Self::Chebyshev => "chebyshev",
            Self::Minkowski { .. } => "minkowski",
            Self::Cosine => "cosine",
            Self::DotProduct => "dot_product",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum NormKind {
    Manhattan,
    Euclidean,
    Chebyshev,
    Minkowski(f32),
}

/// A validated Minkowski norm, `(Σ|xᵢ - yᵢ|^p)^(1/p)` with `p >= 1`.
///
/// `p = 1`, `p = 2` and `p = ∞` have dedicated code paths.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LpNorm {
    kind: NormKind,
}

impl LpNorm {
    /// L1 norm.
    #[must_use]
    pub const fn manhattan() -> Self {
        Self {
            kind: NormKind::Manhattan,
        }
    }

    /// L2 norm.
    #[must_use]
    pub const fn euclidean() -> Self {
        Self {
            kind: NormKind::Euclidean,
        }
    }

    /// L∞ norm.
    #[must_use]
    pub const fn chebyshev() -> Self {
        Self {
            kind: NormKind::Chebyshev,
        }
    }

    /// Creates the Lp norm for exponent `p`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidNorm`] when `p` is NaN or below 1, since the
    /// result would not satisfy the triangle inequality.
    #[allow(clippy::float_cmp)] // exact exponents select the fast paths
    pub fn new(p: f32) -> Result<Self> {
        if p.is_nan() || p < 1.0 {
            return Err(Error::InvalidNorm(format!("p must be >= 1, got {p}")));
        }
        let kind = if p == 1.0 {
            NormKind::Manhattan
        } else if p == 2.0 {
            NormKind::Euclidean
        } else if p.is_infinite() {
            NormKind::Chebyshev
        } else {
            NormKind::Minkowski(p)
        };
        Ok(Self { kind })
    }

    /// The exponent of this norm (`f32::INFINITY` for Chebyshev).
    #[must_use]
    pub fn p(&self) -> f32 {
        match self.kind {
            NormKind::Manhattan => 1.0,
            NormKind::Euclidean => 2.0,
            NormKind::Chebyshev => f32::INFINITY,
            NormKind::Minkowski(p) => p,
        }
    }

    /// The metric this norm corresponds to.
    #[must_use]
    pub fn metric(&self) -> DistanceMetric {
        match self.kind {
            NormKind::Manhattan => DistanceMetric::Manhattan,
            NormKind::Euclidean => DistanceMetric::Euclidean,
            NormKind::Chebyshev => DistanceMetric::Chebyshev,
            NormKind::Minkowski(p) => DistanceMetric::Minkowski { p },
        }
    }

    /// Norm of `a - b`.
    #[inline]
    #[must_use]
    pub fn distance(&self, a: &[f32], b: &[f32]) -> f32 {
        match self.kind {
            NormKind::Manhattan => manhattan(a, b),
            NormKind::Euclidean => euclidean(a, b),
            NormKind::Chebyshev => chebyshev(a, b),
            NormKind::Minkowski(p) => minkowski(a, b, p),
        }
    }

    /// Norm of a vector whose only non-zero component is `delta`.
    ///
    /// Uses the same per-component term and root as [`LpNorm::distance`], so
    /// `distance(q, x) >= axis_distance(x[a] - q[a])` also holds after rounding.
    #[inline]
    #[must_use]
    pub fn axis_distance(&self, delta: f32) -> f32 {
        match self.kind {
            NormKind::Manhattan | NormKind::Chebyshev => delta.abs(),
            NormKind::Euclidean => (delta * delta).sqrt(),
            NormKind::Minkowski(p) => delta.abs().powf(p).powf(p.recip()),
        }
    }
}

/// Trait for distance computation engines.
///
/// Lets the linear scan run over any metric while the kd-tree stays
/// specialised to [`LpNorm`].
pub trait DistanceEngine: Send + Sync {
    /// Computes distance between two vectors.
    fn distance(&self, a: &[f32], b: &[f32]) -> f32;

    /// Batch distance computation (one query vs many candidates).
    ///
    /// Returns distances in the same order as candidates.
    fn batch_distance(&self, query: &[f32], candidates: &[&[f32]]) -> Vec<f32> {
        candidates.iter().map(|c| self.distance(query, c)).collect()
    }

    /// Returns the metric type for this engine.
    fn metric(&self) -> DistanceMetric;
}

impl DistanceEngine for LpNorm {
    fn distance(&self, a: &[f32], b: &[f32]) -> f32 {
        LpNorm::distance(self, a, b)
    }

    fn metric(&self) -> DistanceMetric {
        LpNorm::metric(self)
    }
}

/// Scalar engine for any [`DistanceMetric`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScalarDistance {
    metric: DistanceMetric,
}

impl ScalarDistance {
    /// Creates a scalar distance engine with the given metric.
    #[must_use]
    pub fn new(metric: DistanceMetric) -> Self {
        Self { metric }
    }
}

impl DistanceEngine for ScalarDistance {
    fn distance(&self, a: &[f32], b: &[f32]) -> f32 {
        self.metric.distance(a, b)
    }

    fn metric(&self) -> DistanceMetric {
        self.metric
    }
}

// =============================================================================
// Scalar kernels
// =============================================================================

#[inline]
fn manhattan(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| (x - y).abs()).sum()
}

#[inline]
fn euclidean(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b)
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum::<f32>()
        .sqrt()
}

#[inline]
fn chebyshev(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b)
        .fold(0.0_f32, |acc, (x, y)| acc.max((x - y).abs()))
}

#[inline]
fn minkowski(a: &[f32], b: &[f32], p: f32) -> f32 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y).abs().powf(p))
        .sum::<f32>()
        .powf(p.recip())
}

// Cosine and dot product accumulate in f64: products of large finite f32
// coordinates overflow f32 and would turn into inf - inf or inf / inf.

#[inline]
#[allow(clippy::cast_possible_truncation)] // narrowing saturates to ±inf, never NaN
fn negated_dot(a: &[f32], b: &[f32]) -> f32 {
    let dot: f64 = a
        .iter()
        .zip(b)
        .map(|(&x, &y)| f64::from(x) * f64::from(y))
        .sum();
    -dot as f32
}

#[inline]
#[allow(clippy::cast_possible_truncation)] // result lies in [0, 2]
fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    let mut dot = 0.0_f64;
    let mut norm_a = 0.0_f64;
    let mut norm_b = 0.0_f64;

    for (&x, &y) in a.iter().zip(b) {
        let (x, y) = (f64::from(x), f64::from(y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom == 0.0 {
        1.0
    } else {
        (1.0 - dot / denom) as f32
    }
}
