//! Precision policies.
//!
//! - The exactly representable integer range of `f32`, used when sizing GPU
//!   attribute buffers.
//! - A deterministic float ordering wrapper (`StableF64`) for sorting and
//!   priority queues.

use core::cmp::Ordering;

/// Largest integer magnitude an `f32` holds exactly (24-bit mantissa).
pub const F32_EXACT_INTEGER_LIMIT: f64 = 16_777_216.0;

/// Whether every integer in `[-max, max]` survives a round-trip through `f32`.
pub fn fits_f32_exactly(max: f64) -> bool {
    max.abs() <= F32_EXACT_INTEGER_LIMIT
}

/// Canonicalize a floating-point value for deterministic ordering.
///
/// Rules:
/// - `-0.0` becomes `0.0`
/// - all NaNs become a single canonical NaN
pub fn canonical_f64(v: f64) -> f64 {
    if v == 0.0 {
        0.0
    } else if v.is_nan() {
        f64::NAN
    } else {
        v
    }
}

/// Deterministic total ordering for floats.
pub fn stable_total_cmp_f64(a: f64, b: f64) -> Ordering {
    canonical_f64(a).total_cmp(&canonical_f64(b))
}

/// A float wrapper with a deterministic total ordering, usable as a
/// `BinaryHeap` priority.
#[derive(Debug, Copy, Clone, Default)]
pub struct StableF64(pub f64);

impl PartialEq for StableF64 {
    fn eq(&self, other: &Self) -> bool {
        stable_total_cmp_f64(self.0, other.0) == Ordering::Equal
    }
}

impl Eq for StableF64 {}

impl PartialOrd for StableF64 {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for StableF64 {
    fn cmp(&self, other: &Self) -> Ordering {
        stable_total_cmp_f64(self.0, other.0)
    }
}

#[cfg(test)]
mod tests {
    use super::{StableF64, canonical_f64, fits_f32_exactly, stable_total_cmp_f64};
    use core::cmp::Ordering;
    use std::collections::BinaryHeap;

    #[test]
    fn canonicalizes_negative_zero() {
        assert_eq!(canonical_f64(-0.0), 0.0);
        assert_eq!(canonical_f64(0.0), 0.0);
    }

    #[test]
    fn stable_cmp_is_total() {
        assert_eq!(stable_total_cmp_f64(1.0, 2.0), Ordering::Less);
        assert_eq!(stable_total_cmp_f64(f64::NAN, f64::NAN), Ordering::Equal);
        assert!(StableF64(f64::NAN) == StableF64(f64::NAN));
    }

    #[test]
    fn heap_pops_largest_first() {
        let mut heap = BinaryHeap::new();
        heap.push(StableF64(1.5));
        heap.push(StableF64(-3.0));
        heap.push(StableF64(8.25));
        assert_eq!(heap.pop(), Some(StableF64(8.25)));
        assert_eq!(heap.pop(), Some(StableF64(1.5)));
    }

    #[test]
    fn f32_exact_limit_is_two_pow_24() {
        assert!(fits_f32_exactly(16_777_216.0));
        assert!(!fits_f32_exactly(-16_777_217.0));
    }
}
