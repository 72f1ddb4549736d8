//! Distance kernels with SIMD acceleration.
//!
//! When the `simd` feature is enabled (default), the hot kernels process
//! 8 lanes at a time with `wide::f32x8` and finish the remainder with a
//! scalar tail. The `*_plain` variants are the scalar reference
//! implementations; they are always available and the two paths agree
//! within floating-point tolerance.
//!
//! # Usage
//!
//! ```rust
//! use proxima::simd::{dot, l2_squared};
//!
//! let a = [1.0_f32, 0.0, 0.0];
//! let b = [0.0_f32, 1.0, 0.0];
//!
//! assert_eq!(dot(&a, &b), 0.0);
//! assert_eq!(l2_squared(&a, &b), 2.0);
//! ```

/// Squared L2 distance (scalar reference implementation).
///
/// The squared form is kept: only the ordering of distances matters to the
/// graph, so the sqrt is skipped.
#[inline]
#[must_use]
pub fn l2_squared_plain(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len());
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}

/// Dot product (scalar reference implementation).
#[inline]
#[must_use]
pub fn dot_plain(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len());
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

#[cfg(feature = "simd")]
mod accel {
    use wide::f32x8;

    /// Squared L2 distance, 8 floats per iteration.
    #[inline]
    #[must_use]
    pub fn l2_squared(a: &[f32], b: &[f32]) -> f32 {
        debug_assert_eq!(a.len(), b.len());

        let len = a.len();
        let chunks = len / 8;
        let mut sum = f32x8::ZERO;

        for i in 0..chunks {
            let offset = i * 8;
            let va = f32x8::from(&a[offset..offset + 8]);
            let vb = f32x8::from(&b[offset..offset + 8]);
            let diff = va - vb;
            sum = diff.mul_add(diff, sum);
        }

        let mut dist = sum.reduce_add();

        // Scalar tail for the remaining elements.
        for i in chunks * 8..len {
            let d = a[i] - b[i];
            dist += d * d;
        }

        dist
    }

    /// Dot product, 8 floats per iteration.
    #[inline]
    #[must_use]
    pub fn dot(a: &[f32], b: &[f32]) -> f32 {
        debug_assert_eq!(a.len(), b.len());

        let len = a.len();
        let chunks = len / 8;
        let mut sum = f32x8::ZERO;

        for i in 0..chunks {
            let offset = i * 8;
            let va = f32x8::from(&a[offset..offset + 8]);
            let vb = f32x8::from(&b[offset..offset + 8]);
            sum = va.mul_add(vb, sum);
        }

        let mut result = sum.reduce_add();

        for i in chunks * 8..len {
            result += a[i] * b[i];
        }

        result
    }
}

#[cfg(feature = "simd")]
pub use accel::{dot, l2_squared};

#[cfg(not(feature = "simd"))]
mod fallback {
    /// Squared L2 distance (portable build).
    #[inline]
    #[must_use]
    pub fn l2_squared(a: &[f32], b: &[f32]) -> f32 {
        super::l2_squared_plain(a, b)
    }

    /// Dot product (portable build).
    #[inline]
    #[must_use]
    pub fn dot(a: &[f32], b: &[f32]) -> f32 {
        super::dot_plain(a, b)
    }
}

#[cfg(not(feature = "simd"))]
pub use fallback::{dot, l2_squared};
