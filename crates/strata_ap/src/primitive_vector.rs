//! A sparse M-dimensional quantity of primitives.
//!
//! Tile capacities and block masses are vectors with one dimension per
//! primitive model in the architecture. Most blocks touch only a handful of
//! model types, so the vector is stored sparsely; dimensions absent from the
//! map are zero. Values are `f64` since heuristic mass weighting may produce
//! non-integral masses.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::ops::{AddAssign, MulAssign, Sub, SubAssign};

/// A sparse vector indexed by primitive-model dimension.
///
/// Equality ignores the distinction between an absent dimension and an
/// explicitly stored zero.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PrimitiveVector {
    data: HashMap<usize, f64>,
}

impl PrimitiveVector {
    /// Creates the zero vector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the value at the given dimension (zero if absent).
    pub fn get(&self, dim: usize) -> f64 {
        self.data.get(&dim).copied().unwrap_or(0.0)
    }

    /// Sets the value at the given dimension.
    pub fn set(&mut self, dim: usize, val: f64) {
        self.data.insert(dim, val);
    }

    /// Adds the value to the given dimension.
    pub fn add_to_dim(&mut self, dim: usize, val: f64) {
        *self.data.entry(dim).or_insert(0.0) += val;
    }

    /// Returns `true` if all dimensions are zero.
    pub fn is_zero(&self) -> bool {
        self.data.values().all(|&v| v == 0.0)
    }

    /// Returns `true` if any dimension is non-zero.
    pub fn is_non_zero(&self) -> bool {
        !self.is_zero()
    }

    /// Returns `true` if no dimension is negative.
    pub fn is_non_negative(&self) -> bool {
        self.data.values().all(|&v| v >= 0.0)
    }

    /// Computes the manhattan (L1) norm: the sum of the absolute values of
    /// all dimensions.
    pub fn manhattan_norm(&self) -> f64 {
        self.data.values().map(|v| v.abs()).sum()
    }

    /// Returns `true` if any dimension of `self` is strictly less than the
    /// same dimension of `rhs`.
    ///
    /// This is the compatibility test used by the legalizer (capacity vs.
    /// mass, demand vs. supply). It is not an order relation: both
    /// `a.any_dim_lt(b)` and `b.any_dim_lt(a)` can hold at once, so it must
    /// never be used as a sort key.
    pub fn any_dim_lt(&self, rhs: &Self) -> bool {
        for (&dim, &val) in &self.data {
            if val < rhs.get(dim) {
                return true;
            }
        }
        // Dimensions present only in rhs compare against an implicit zero.
        for (&dim, &val) in &rhs.data {
            if val > self.get(dim) {
                return true;
            }
        }
        false
    }

    /// Clamps all negative dimensions to zero.
    pub fn relu(&mut self) {
        for v in self.data.values_mut() {
            if *v < 0.0 {
                *v = 0.0;
            }
        }
    }

    /// Projects this vector onto the given direction vector: every dimension
    /// that is zero in `dir` becomes zero in `self`.
    ///
    /// `dir` does not need to be a unit vector.
    pub fn project(&mut self, dir: &Self) {
        for (&dim, v) in self.data.iter_mut() {
            if dir.get(dim) == 0.0 {
                *v = 0.0;
            }
        }
    }

    /// Resets this vector to the zero vector.
    pub fn clear(&mut self) {
        self.data.clear();
    }

    /// Computes the elementwise maximum of two vectors.
    pub fn max(lhs: &Self, rhs: &Self) -> Self {
        let mut res = Self::new();
        for (&dim, &val) in &rhs.data {
            res.set(dim, lhs.get(dim).max(val));
        }
        for (&dim, &val) in &lhs.data {
            res.set(dim, val.max(rhs.get(dim)));
        }
        res
    }

    /// Returns the dimensions holding a non-zero value, in ascending order.
    pub fn non_zero_dims(&self) -> Vec<usize> {
        let mut dims: Vec<usize> = self
            .data
            .iter()
            .filter(|(_, &v)| v != 0.0)
            .map(|(&d, _)| d)
            .collect();
        dims.sort_unstable();
        dims
    }
}

impl PartialEq for PrimitiveVector {
    fn eq(&self, other: &Self) -> bool {
        self.data.iter().all(|(&d, &v)| other.get(d) == v)
            && other.data.iter().all(|(&d, &v)| self.get(d) == v)
    }
}

impl AddAssign<&PrimitiveVector> for PrimitiveVector {
    fn add_assign(&mut self, rhs: &PrimitiveVector) {
        for (&dim, &val) in &rhs.data {
            self.add_to_dim(dim, val);
        }
    }
}

impl SubAssign<&PrimitiveVector> for PrimitiveVector {
    fn sub_assign(&mut self, rhs: &PrimitiveVector) {
        for (&dim, &val) in &rhs.data {
            self.add_to_dim(dim, -val);
        }
    }
}

impl Sub<&PrimitiveVector> for &PrimitiveVector {
    type Output = PrimitiveVector;

    fn sub(self, rhs: &PrimitiveVector) -> PrimitiveVector {
        let mut res = self.clone();
        res -= rhs;
        res
    }
}

impl MulAssign<f64> for PrimitiveVector {
    fn mul_assign(&mut self, rhs: f64) {
        for v in self.data.values_mut() {
            *v *= rhs;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vec_of(pairs: &[(usize, f64)]) -> PrimitiveVector {
        let mut v = PrimitiveVector::new();
        for &(d, val) in pairs {
            v.set(d, val);
        }
        v
    }

    #[test]
    fn getters_and_setters() {
        let mut vec = PrimitiveVector::new();
        assert_eq!(vec.get(42), 0.0);
        vec.set(42, 2.0);
        assert_eq!(vec.get(42), 2.0);
        vec.add_to_dim(42, 10.0);
        assert_eq!(vec.get(42), 12.0);
        vec.set(0, -2.0);
        assert_eq!(vec.get(0), -2.0);
        vec.add_to_dim(42, -4.0);
        assert_eq!(vec.get(42), 8.0);
        vec.set(42, 0.0);
        assert_eq!(vec.get(42), 0.0);
        vec.clear();
        assert_eq!(vec.get(42), 0.0);
        assert_eq!(vec.get(0), 0.0);
    }

    #[test]
    fn zero_vector_is_zero() {
        let vec = PrimitiveVector::new();
        assert!(vec.is_zero());
        assert!(!vec.is_non_zero());
        // Explicitly stored zeros still count as the zero vector.
        let mut vec = PrimitiveVector::new();
        vec.set(3, 0.0);
        assert!(vec.is_zero());
    }

    #[test]
    fn equality_ignores_absent_vs_explicit_zero() {
        let a = vec_of(&[(0, 0.0), (1, 1.0), (2, 2.0)]);
        let mut b = vec_of(&[(1, 1.0), (2, 2.0)]);
        assert_eq!(a, b);
        assert_eq!(b, a);
        b.set(10, 0.0);
        assert_eq!(a, b);
        b.set(10, 100.0);
        assert_ne!(a, b);
        assert_ne!(b, a);
    }

    #[test]
    fn addition_commutes() {
        let a = vec_of(&[(0, 1.0), (2, 3.0)]);
        let b = vec_of(&[(1, 20.0), (2, 5.0)]);
        let mut ab = a.clone();
        ab += &b;
        let mut ba = b.clone();
        ba += &a;
        assert_eq!(ab, ba);
        assert_eq!(ab.get(0), 1.0);
        assert_eq!(ab.get(1), 20.0);
        assert_eq!(ab.get(2), 8.0);
    }

    #[test]
    fn add_then_subtract_is_identity() {
        let a = vec_of(&[(0, 10.0), (3, 4.0)]);
        let b = vec_of(&[(1, 20.0), (3, 2.0)]);
        let mut r = a.clone();
        r += &b;
        r -= &b;
        assert_eq!(r, a);
        // The binary subtraction agrees with the compound assignment.
        let mut sum = a.clone();
        sum += &b;
        assert_eq!(&sum - &b, a);
    }

    #[test]
    fn scalar_multiply_doubles() {
        let mut a = vec_of(&[(0, 0.0), (1, 1.0), (2, 2.0)]);
        a *= 2.0;
        assert_eq!(a.get(0), 0.0);
        assert_eq!(a.get(1), 2.0);
        assert_eq!(a.get(2), 4.0);
    }

    #[test]
    fn max_with_zero_is_relu() {
        let a = vec_of(&[(0, -3.0), (1, 2.0), (2, -0.5)]);
        let maxed = PrimitiveVector::max(&a, &PrimitiveVector::new());
        let mut relued = a.clone();
        relued.relu();
        assert_eq!(maxed, relued);
        assert!(relued.is_non_negative());
        assert_eq!(relued.get(1), 2.0);
    }

    #[test]
    fn max_elementwise() {
        let a = vec_of(&[(0, 1.0), (1, 5.0)]);
        let b = vec_of(&[(0, 3.0), (2, 2.0)]);
        let m = PrimitiveVector::max(&a, &b);
        assert_eq!(m.get(0), 3.0);
        assert_eq!(m.get(1), 5.0);
        assert_eq!(m.get(2), 2.0);
    }

    #[test]
    fn manhattan_norm_is_symmetric_under_negation() {
        let a = vec_of(&[(0, 3.0), (1, -4.0), (5, 0.5)]);
        let mut neg = a.clone();
        neg *= -1.0;
        assert_eq!(a.manhattan_norm(), neg.manhattan_norm());
        assert_eq!(a.manhattan_norm(), 7.5);
    }

    #[test]
    fn project_zeros_masked_dims() {
        let mut a = vec_of(&[(0, 12.0), (1, 32.0), (2, 8.0), (3, 2.0)]);
        let mask = vec_of(&[(0, 2.0), (2, 2.0)]);
        a.project(&mask);
        assert_eq!(a.get(0), 12.0);
        assert_eq!(a.get(1), 0.0);
        assert_eq!(a.get(2), 8.0);
        assert_eq!(a.get(3), 0.0);
    }

    #[test]
    fn any_dim_lt_cases() {
        // Empty vector is less than any positive vector.
        let empty = PrimitiveVector::new();
        let pos = vec_of(&[(0, 10.0), (1, 20.0)]);
        assert!(empty.any_dim_lt(&pos));
        // 1-D comparisons.
        let one = vec_of(&[(0, 1.0)]);
        let two = vec_of(&[(0, 2.0)]);
        assert!(one.any_dim_lt(&two));
        assert!(!two.any_dim_lt(&one));
        let three = vec_of(&[(0, 3.0)]);
        assert!(!three.any_dim_lt(&two));
        // Mixed: each vector is larger in one dimension, so both hold. This
        // is why the relation is not an order.
        let a = vec_of(&[(0, 1.0), (1, 5.0)]);
        let b = vec_of(&[(0, 5.0), (1, 1.0)]);
        assert!(a.any_dim_lt(&b));
        assert!(b.any_dim_lt(&a));
    }

    #[test]
    fn non_zero_dims_sorted() {
        let a = vec_of(&[(7, 1.0), (2, 3.0), (5, 0.0)]);
        assert_eq!(a.non_zero_dims(), vec![2, 7]);
    }

    #[test]
    fn serde_roundtrip() {
        let a = vec_of(&[(0, 1.5), (9, -2.0)]);
        let json = serde_json::to_string(&a).unwrap();
        let restored: PrimitiveVector = serde_json::from_str(&json).unwrap();
        assert_eq!(a, restored);
    }
}
