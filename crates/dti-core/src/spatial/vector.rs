//! Displacement vectors in physical space.

use nalgebra::SVector;
use serde::{Deserialize, Serialize};

/// A displacement in D-dimensional physical space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vector<const D: usize>(pub SVector<f64, D>);

impl<const D: usize> Vector<D> {
    pub fn new(components: [f64; D]) -> Self {
        Self(SVector::from(components))
    }

    pub fn zeros() -> Self {
        Self(SVector::zeros())
    }

    /// Vector with every component equal to `value`.
    pub fn repeat(value: f64) -> Self {
        Self(SVector::repeat(value))
    }

    pub fn inner(&self) -> &SVector<f64, D> {
        &self.0
    }

    pub fn to_array(&self) -> [f64; D] {
        self.0.into()
    }

    pub fn norm(&self) -> f64 {
        self.0.norm()
    }
}

impl<const D: usize> Default for Vector<D> {
    fn default() -> Self {
        Self::zeros()
    }
}

impl<const D: usize> From<SVector<f64, D>> for Vector<D> {
    fn from(v: SVector<f64, D>) -> Self {
        Self(v)
    }
}

impl<const D: usize> std::ops::Index<usize> for Vector<D> {
    type Output = f64;

    fn index(&self, index: usize) -> &Self::Output {
        &self.0[index]
    }
}

impl<const D: usize> std::ops::Add for Vector<D> {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl<const D: usize> std::ops::Sub for Vector<D> {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0 - rhs.0)
    }
}

impl<const D: usize> std::ops::Mul<f64> for Vector<D> {
    type Output = Self;

    fn mul(self, rhs: f64) -> Self::Output {
        Self(self.0 * rhs)
    }
}
