//! Image containers and the index/physical coordinate mapping.
//!
//! Images are stored as flat buffers with the first axis varying fastest,
//! matching the voxel order of NRRD and ITK.

pub mod geometry;
pub mod grid;
pub mod image;

pub use geometry::ImageGeometry;
pub use grid::{grid_index, linear_index, trilinear_neighbourhood};
pub use image::Image;
