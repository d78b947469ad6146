//! Point type for representing physical positions.

use super::Vector;
use nalgebra::{Point as NaPoint, SVector};
use serde::{Deserialize, Serialize};

/// A position in D-dimensional physical space (millimetres for DTI volumes).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point<const D: usize>(pub NaPoint<f64, D>);

impl<const D: usize> Point<D> {
    pub fn new(coords: [f64; D]) -> Self {
        Self(NaPoint::from(coords))
    }

    pub fn origin() -> Self {
        Self(NaPoint::origin())
    }

    /// Build a point from a raw coordinate vector.
    pub fn from_coords(coords: SVector<f64, D>) -> Self {
        Self(NaPoint::from(coords))
    }

    pub fn coords(&self) -> &SVector<f64, D> {
        &self.0.coords
    }

    pub fn to_array(&self) -> [f64; D] {
        self.0.coords.into()
    }

    /// Euclidean distance to another point.
    pub fn distance(&self, other: &Self) -> f64 {
        (self.0 - other.0).norm()
    }

    /// Midpoint between two positions.
    pub fn midpoint(&self, other: &Self) -> Self {
        Self::from_coords((self.0.coords + other.0.coords) * 0.5)
    }
}

impl Point<3> {
    /// Swap between RAS and LPS conventions by negating the first two axes.
    ///
    /// The operation is its own inverse.
    pub fn flip_ras_lps(&self) -> Self {
        Self::new([-self[0], -self[1], self[2]])
    }
}

impl<const D: usize> Default for Point<D> {
    fn default() -> Self {
        Self::origin()
    }
}

impl<const D: usize> From<[f64; D]> for Point<D> {
    fn from(coords: [f64; D]) -> Self {
        Self::new(coords)
    }
}

impl<const D: usize> std::ops::Index<usize> for Point<D> {
    type Output = f64;

    fn index(&self, index: usize) -> &Self::Output {
        &self.0[index]
    }
}

impl<const D: usize> std::ops::IndexMut<usize> for Point<D> {
    fn index_mut(&mut self, index: usize) -> &mut Self::Output {
        &mut self.0[index]
    }
}

impl<const D: usize> std::ops::Sub for Point<D> {
    type Output = Vector<D>;

    fn sub(self, rhs: Self) -> Self::Output {
        Vector(self.0 - rhs.0)
    }
}

impl<const D: usize> std::ops::Add<Vector<D>> for Point<D> {
    type Output = Self;

    fn add(self, rhs: Vector<D>) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl<const D: usize> std::ops::Sub<Vector<D>> for Point<D> {
    type Output = Self;

    fn sub(self, rhs: Vector<D>) -> Self::Output {
        Self(self.0 - rhs.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flip_ras_lps_is_involution() {
        let p = Point::new([1.5, -2.0, 3.0]);
        let flipped = p.flip_ras_lps();
        assert_eq!(flipped.to_array(), [-1.5, 2.0, 3.0]);
        assert_eq!(flipped.flip_ras_lps(), p);
    }

    #[test]
    fn test_point_vector_arithmetic() {
        let a = Point::new([1.0, 2.0, 3.0]);
        let b = Point::new([0.5, 0.5, 0.5]);
        let d = a - b;
        assert_eq!(d.to_array(), [0.5, 1.5, 2.5]);
        assert_eq!(b + d, a);
        assert!((a.distance(&b) - d.norm()).abs() < 1e-12);
        assert_eq!(a.midpoint(&a), a);
    }
}
