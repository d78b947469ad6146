//! Spatial types for representing points, vectors, spacing, and direction matrices.
//!
//! All types are thin wrappers over nalgebra so that the geometric code in
//! this crate reads in terms of physical quantities rather than raw arrays.

pub mod direction;
pub mod point;
pub mod spacing;
pub mod vector;

pub use direction::Direction;
pub use point::Point;
pub use spacing::Spacing;
pub use vector::Vector;

pub type Point3 = Point<3>;
pub type Vector3 = Vector<3>;
pub type Spacing3 = Spacing<3>;
pub type Direction3 = Direction<3>;
