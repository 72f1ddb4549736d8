//! Distance metrics for dense vectors.
//!
//! The index is metric-agnostic: every layer above compares raw distance
//! values and assumes **smaller is closer**. Both metrics here honor that
//! convention, which is why the inner-product metric is expressed as
//! `1 - dot(a, b)` rather than the raw (larger-is-better) dot product.

use crate::simd;

/// Distance metric for dense vectors, selected per-index at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DistanceMetric {
    /// Squared Euclidean (L2) distance.
    L2,
    /// Inner product distance `1 - <a, b>`.
    InnerProduct,
}

impl DistanceMetric {
    /// Compute the distance between two vectors.
    ///
    /// Vectors of differing length are a programming error; this
    /// debug-asserts rather than reporting a runtime failure.
    #[inline]
    #[must_use]
    pub fn compute(self, a: &[f32], b: &[f32]) -> f32 {
        debug_assert_eq!(a.len(), b.len());
        match self {
            DistanceMetric::L2 => l2_distance(a, b),
            DistanceMetric::InnerProduct => inner_product_distance(a, b),
        }
    }
}

/// Squared L2 distance.
#[inline]
#[must_use]
pub fn l2_distance(a: &[f32], b: &[f32]) -> f32 {
    simd::l2_squared(a, b)
}

/// Inner product distance `1 - <a, b>`.
///
/// For unit vectors this coincides with cosine distance; for arbitrary
/// vectors it is simply a smaller-is-closer transform of the dot product.
#[inline]
#[must_use]
pub fn inner_product_distance(a: &[f32], b: &[f32]) -> f32 {
    1.0 - simd::dot(a, b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn l2_is_squared() {
        let a = [0.0_f32, 0.0];
        let b = [3.0_f32, 4.0];
        assert!((l2_distance(&a, &b) - 25.0).abs() < 1e-6);
    }

    #[test]
    fn inner_product_identical_unit_vector_is_zero() {
        let a = [1.0_f32, 0.0, 0.0, 0.0];
        assert!(inner_product_distance(&a, &a).abs() < 1e-6);
    }

    #[test]
    fn inner_product_opposite_is_two() {
        let a = [1.0_f32, 0.0];
        let b = [-1.0_f32, 0.0];
        assert!((inner_product_distance(&a, &b) - 2.0).abs() < 1e-6);
    }

    #[test]
    fn metric_dispatch_matches_helpers() {
        let a = [0.3_f32, -1.2, 0.5];
        let b = [1.1_f32, 0.4, -0.9];
        assert_eq!(DistanceMetric::L2.compute(&a, &b), l2_distance(&a, &b));
        assert_eq!(
            DistanceMetric::InnerProduct.compute(&a, &b),
            inner_product_distance(&a, &b)
        );
    }
}
