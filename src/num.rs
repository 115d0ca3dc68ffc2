//! Utilities for numerics.

use std::cmp::Ordering;

/// An `f32` that implements [`Ord`] according to the IEEE 754 totalOrder predicate.
///
/// Used to sort features and corner scores with `sort_by_key` and `max_by_key`.
#[derive(Debug, Clone, Copy)]
pub struct TotalF32(pub f32);

impl PartialEq for TotalF32 {
    fn eq(&self, other: &Self) -> bool {
        f32::total_cmp(&self.0, &other.0) == Ordering::Equal
    }
}

impl Eq for TotalF32 {}

impl PartialOrd for TotalF32 {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TotalF32 {
    fn cmp(&self, other: &Self) -> Ordering {
        f32::total_cmp(&self.0, &other.0)
    }
}

/// Truncates towards zero, saturating at the bounds of `i32`.
///
/// Potentials and group directions are computed in floating point and stored as integers.
#[inline]
pub fn trunc_i32(v: f32) -> i32 {
    v as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn total_order() {
        let mut v = [TotalF32(2.0), TotalF32(-1.0), TotalF32(f32::INFINITY), TotalF32(0.5)];
        v.sort();
        let sorted = v.iter().map(|t| t.0).collect::<Vec<_>>();
        assert_eq!(sorted, [-1.0, 0.5, 2.0, f32::INFINITY]);
    }

    #[test]
    fn truncation() {
        assert_eq!(trunc_i32(2.9), 2);
        assert_eq!(trunc_i32(-2.9), -2);
        assert_eq!(trunc_i32(f32::NAN), 0);
    }
}
